//! Driver Monitoring System (DMS)
//!
//! Eye-closure based drowsiness detection:
//! - Eye aspect ratio from 68-point facial landmarks
//! - Debounced Normal / Drowsy / Asleep state machine
//! - Alarm commands on level changes
//!
//! Face detection and landmark fitting are supplied by the caller through
//! [`FaceDetector`] and [`LandmarkPredictor`].

pub mod analysis;
pub mod config;
pub mod detector;
pub mod geometry;
pub mod landmarks;
pub mod state;

pub use analysis::{EyeReading, FaceReading, FrameAnalysis};
pub use config::DmsConfig;
pub use detector::{FaceDetector, FaceRegion, LandmarkPredictor};
pub use geometry::{combined_openness, eye_aspect_ratio, Point2};
pub use landmarks::{EyeLandmarks, FaceLandmarks};
pub use state::{AlarmCommand, AlertLevel, DetectionState, DrowsinessStateMachine};

use camera_capture::GrayFrame;
use thiserror::Error;
use tracing::{debug, warn};

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Degenerate eye geometry: corner points coincide")]
    DegenerateGeometry,

    #[error("No face detected")]
    NoFaceDetected,

    #[error("Expected {expected} landmarks, got {actual}")]
    LandmarkCount { expected: usize, actual: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Detection failed: {0}")]
    Detection(String),
}

/// Driver monitoring module
pub struct DmsModule {
    machine: DrowsinessStateMachine,
}

impl DmsModule {
    /// Create a new DMS module with configuration
    pub fn new(config: DmsConfig) -> Result<Self, DmsError> {
        config.validate()?;
        Ok(Self {
            machine: DrowsinessStateMachine::new(config),
        })
    }

    pub fn config(&self) -> &DmsConfig {
        self.machine.config()
    }

    /// Read both eyes of a face without touching any state
    pub fn read_eyes(&self, landmarks: &FaceLandmarks) -> (EyeReading, EyeReading, Option<f32>) {
        let left = read_eye(landmarks.left_eye(), "left");
        let right = read_eye(landmarks.right_eye(), "right");
        let openness = combined_openness(left.ear, right.ear);
        (left, right, openness)
    }

    /// Evaluate one face against the session state
    pub fn evaluate_face(
        &self,
        state: &mut DetectionState,
        region: FaceRegion,
        landmarks: &FaceLandmarks,
    ) -> FaceReading {
        let (left_eye, right_eye, openness) = self.read_eyes(landmarks);
        let command = self.machine.update(state, openness);

        FaceReading {
            region,
            left_eye,
            right_eye,
            openness,
            alert_level: state.alert_level(),
            counter: state.counter(),
            command,
        }
    }

    /// Analyze a single frame.
    ///
    /// Every detected face is applied to the same `state` in detection order.
    /// A frame without faces leaves the state untouched. Regions the landmark
    /// model fails on are skipped and counted in `rejected_regions`.
    pub fn analyze(
        &self,
        state: &mut DetectionState,
        frame: &GrayFrame,
        detector: &dyn FaceDetector,
        predictor: &dyn LandmarkPredictor,
    ) -> Result<FrameAnalysis, DmsError> {
        let regions = detector.detect(frame)?;
        metrics::counter!("dms_frames_processed").increment(1);

        if regions.is_empty() {
            debug!("Frame {}: no face detected", frame.sequence);
        }

        // Fit every region before any state changes, so a failing region
        // cannot leave a transition without its alarm command
        let mut fitted = Vec::with_capacity(regions.len());
        let mut rejected_regions = 0;
        for region in regions {
            match predictor.predict(frame, &region) {
                Ok(landmarks) => fitted.push((region, landmarks)),
                Err(DmsError::NoFaceDetected) => {
                    debug!("Frame {}: landmark model rejected region {:?}", frame.sequence, region);
                    rejected_regions += 1;
                }
                Err(e) => {
                    warn!("Frame {}: region {:?} unreadable: {}", frame.sequence, region, e);
                    rejected_regions += 1;
                }
            }
        }

        let faces = fitted
            .iter()
            .map(|(region, landmarks)| self.evaluate_face(state, *region, landmarks))
            .collect();

        Ok(FrameAnalysis {
            sequence: frame.sequence,
            faces,
            rejected_regions,
            alert_level: state.alert_level(),
            counter: state.counter(),
        })
    }
}

fn read_eye(landmarks: EyeLandmarks, side: &str) -> EyeReading {
    let ear = match eye_aspect_ratio(&landmarks) {
        Ok(ear) => Some(ear),
        Err(e) => {
            debug!("Skipping {} eye: {}", side, e);
            None
        }
    };
    EyeReading { landmarks, ear }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_capture::VideoFrame;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Eye contour with the given lid gap on a width-6 eye (EAR = gap / 6)
    fn eye_points(origin_x: f32, gap: f32) -> [Point2; 6] {
        let h = gap / 2.0;
        [
            Point2::new(origin_x, 0.0),
            Point2::new(origin_x + 2.0, -h),
            Point2::new(origin_x + 4.0, -h),
            Point2::new(origin_x + 6.0, 0.0),
            Point2::new(origin_x + 4.0, h),
            Point2::new(origin_x + 2.0, h),
        ]
    }

    fn face_with(left: [Point2; 6], right: [Point2; 6]) -> FaceLandmarks {
        let mut points = vec![Point2::new(50.0, 50.0); landmarks::FACE_LANDMARK_COUNT];
        points[landmarks::RIGHT_EYE].copy_from_slice(&right);
        points[landmarks::LEFT_EYE].copy_from_slice(&left);
        FaceLandmarks::from_points(points).unwrap()
    }

    fn face(ear: f32) -> FaceLandmarks {
        face_with(eye_points(20.0, ear * 6.0), eye_points(0.0, ear * 6.0))
    }

    struct ScriptedDetector {
        frames: RefCell<VecDeque<Vec<Option<FaceLandmarks>>>>,
        current: RefCell<VecDeque<Option<FaceLandmarks>>>,
        failing: bool,
    }

    impl ScriptedDetector {
        fn new(frames: Vec<Vec<Option<FaceLandmarks>>>) -> Self {
            Self {
                frames: RefCell::new(frames.into()),
                current: RefCell::new(VecDeque::new()),
                failing: false,
            }
        }

        /// Regions without landmarks fail with a model error instead of no face
        fn failing(frames: Vec<Vec<Option<FaceLandmarks>>>) -> Self {
            Self {
                failing: true,
                ..Self::new(frames)
            }
        }
    }

    impl FaceDetector for ScriptedDetector {
        fn detect(&self, frame: &GrayFrame) -> Result<Vec<FaceRegion>, DmsError> {
            let faces = self.frames.borrow_mut().pop_front().unwrap_or_default();
            let regions = faces.iter().map(|_| FaceRegion::full_frame(frame)).collect();
            *self.current.borrow_mut() = faces.into();
            Ok(regions)
        }
    }

    impl LandmarkPredictor for ScriptedDetector {
        fn predict(&self, _frame: &GrayFrame, _region: &FaceRegion) -> Result<FaceLandmarks, DmsError> {
            let next = self.current.borrow_mut().pop_front().flatten();
            match next {
                Some(landmarks) => Ok(landmarks),
                None if self.failing => Err(DmsError::Detection("landmark model timed out".into())),
                None => Err(DmsError::NoFaceDetected),
            }
        }
    }

    fn gray() -> GrayFrame {
        VideoFrame::blank(8, 8, 0, 0).to_grayscale()
    }

    #[test]
    fn test_read_eyes_averages() {
        let module = DmsModule::new(DmsConfig::default()).unwrap();
        let face = face_with(eye_points(20.0, 1.2), eye_points(0.0, 2.4));
        let (left, right, openness) = module.read_eyes(&face);
        assert!((left.ear.unwrap() - 0.2).abs() < 1e-6);
        assert!((right.ear.unwrap() - 0.4).abs() < 1e-6);
        assert!((openness.unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_one_degenerate_eye_uses_the_other() {
        let module = DmsModule::new(DmsConfig::default()).unwrap();
        let collapsed = [Point2::new(5.0, 5.0); 6];
        let face = face_with(collapsed, eye_points(0.0, 0.6));
        let (left, _, openness) = module.read_eyes(&face);
        assert!(left.ear.is_none());
        assert!((openness.unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_both_degenerate_carries_state() {
        let module = DmsModule::new(DmsConfig::default()).unwrap();
        let collapsed = [Point2::new(5.0, 5.0); 6];
        let mut state = DetectionState::new();
        module.evaluate_face(&mut state, FaceRegion::full_frame(&gray()), &face(0.1));
        let reading = module.evaluate_face(
            &mut state,
            FaceRegion::full_frame(&gray()),
            &face_with(collapsed, collapsed),
        );
        assert_eq!(reading.openness, None);
        assert_eq!(state.counter(), 1);
    }

    #[test]
    fn test_no_face_leaves_state() {
        let module = DmsModule::new(DmsConfig::default()).unwrap();
        let detector = ScriptedDetector::new(vec![vec![Some(face(0.1))], vec![]]);
        let mut state = DetectionState::new();

        module.analyze(&mut state, &gray(), &detector, &detector).unwrap();
        let analysis = module.analyze(&mut state, &gray(), &detector, &detector).unwrap();

        assert!(!analysis.face_detected());
        assert_eq!(analysis.counter, 1);
        assert_eq!(state.counter(), 1);
    }

    #[test]
    fn test_rejected_region_is_skipped() {
        let module = DmsModule::new(DmsConfig::default()).unwrap();
        let detector = ScriptedDetector::new(vec![vec![None, Some(face(0.1))]]);
        let mut state = DetectionState::new();

        let analysis = module.analyze(&mut state, &gray(), &detector, &detector).unwrap();
        assert_eq!(analysis.rejected_regions, 1);
        assert_eq!(analysis.faces.len(), 1);
        assert_eq!(state.counter(), 1);
    }

    #[test]
    fn test_failing_region_keeps_earlier_command() {
        let config = DmsConfig {
            eye_ar_consec_frames: 1,
            sleep_consec_frames: 5,
            ..Default::default()
        };
        let module = DmsModule::new(config).unwrap();
        let detector = ScriptedDetector::failing(vec![vec![Some(face(0.1)), None]]);
        let mut state = DetectionState::new();

        let analysis = module.analyze(&mut state, &gray(), &detector, &detector).unwrap();

        assert_eq!(state.alert_level(), AlertLevel::Drowsy);
        assert_eq!(analysis.rejected_regions, 1);
        assert_eq!(
            analysis.commands().collect::<Vec<_>>(),
            vec![AlarmCommand::Start(AlertLevel::Drowsy)]
        );
    }

    #[test]
    fn test_failing_region_alone_leaves_state() {
        let module = DmsModule::new(DmsConfig::default()).unwrap();
        let detector = ScriptedDetector::failing(vec![vec![None]]);
        let mut state = DetectionState::new();

        let analysis = module.analyze(&mut state, &gray(), &detector, &detector).unwrap();
        assert!(!analysis.face_detected());
        assert_eq!(state, DetectionState::new());
    }

    #[test]
    fn test_last_face_wins() {
        let config = DmsConfig {
            eye_ar_consec_frames: 1,
            sleep_consec_frames: 5,
            ..Default::default()
        };
        let module = DmsModule::new(config).unwrap();
        let detector = ScriptedDetector::new(vec![vec![Some(face(0.1)), Some(face(0.3))]]);
        let mut state = DetectionState::new();

        let analysis = module.analyze(&mut state, &gray(), &detector, &detector).unwrap();
        let commands: Vec<_> = analysis.commands().collect();
        assert_eq!(
            commands,
            vec![AlarmCommand::Start(AlertLevel::Drowsy), AlarmCommand::Stop]
        );
        assert_eq!(analysis.alert_level, AlertLevel::Normal);
        assert_eq!(analysis.banner(), None);
        assert_eq!(analysis.faces[1].openness_label().as_deref(), Some("EAR: 0.30"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DmsConfig {
            sleep_consec_frames: 10,
            ..Default::default()
        };
        assert!(matches!(DmsModule::new(config), Err(DmsError::Config(_))));
    }
}
