//! Recorded landmark trace replay
//!
//! A trace is JSON lines, one line per frame:
//!
//! ```text
//! {"faces": [[[x0, y0], [x1, y1], ... 68 points], ...]}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Replay yields blank
//! frames at the working resolution and serves the recorded landmarks as the
//! face and landmark detectors.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use camera_capture::{CameraError, FrameSource, GrayFrame, VideoFrame};
use dms::{DmsError, FaceDetector, FaceLandmarks, FaceRegion, LandmarkPredictor};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{CaptureSettings, MonitorError};

/// Landmarks recorded for one frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceFrame {
    #[serde(default)]
    pub faces: Vec<FaceLandmarks>,
}

/// Whole recorded trace
#[derive(Debug, Clone, Default)]
pub struct LandmarkTrace {
    frames: Vec<TraceFrame>,
}

impl LandmarkTrace {
    pub fn new(frames: Vec<TraceFrame>) -> Self {
        Self { frames }
    }

    pub fn load(path: &Path) -> Result<Self, MonitorError> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, MonitorError> {
        let mut frames = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let frame = serde_json::from_str(trimmed).map_err(|source| MonitorError::Trace {
                line: index + 1,
                source,
            })?;
            frames.push(frame);
        }
        Ok(Self { frames })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Split into the capture side and the detection side
    pub fn into_parts(self, capture: &CaptureSettings) -> (TraceSource, TraceDetector) {
        let frames = Arc::new(self.frames);
        let interval = Duration::from_secs_f64(1.0 / capture.fps.max(1) as f64);

        let source = TraceSource {
            total: frames.len() as u32,
            next: 0,
            width: capture.width,
            height: capture.height,
            interval,
            realtime: capture.realtime,
            last_frame_at: None,
            released: false,
        };
        (source, TraceDetector { frames })
    }
}

/// Yields one blank frame per trace entry
#[derive(Debug)]
pub struct TraceSource {
    total: u32,
    next: u32,
    width: u32,
    height: u32,
    interval: Duration,
    realtime: bool,
    last_frame_at: Option<Instant>,
    released: bool,
}

impl FrameSource for TraceSource {
    fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        if self.released {
            return Err(CameraError::NotInitialized);
        }
        if self.next >= self.total {
            return Ok(None);
        }

        if self.realtime {
            if let Some(last) = self.last_frame_at {
                let elapsed = last.elapsed();
                if elapsed < self.interval {
                    thread::sleep(self.interval - elapsed);
                }
            }
            self.last_frame_at = Some(Instant::now());
        }

        let sequence = self.next;
        self.next += 1;
        let timestamp_ns = self.interval.as_nanos() as u64 * sequence as u64;
        Ok(Some(VideoFrame::blank(self.width, self.height, timestamp_ns, sequence)))
    }

    fn release(&mut self) {
        debug!("Trace source released after {} of {} frames", self.next, self.total);
        self.released = true;
    }
}

/// Serves recorded landmarks by frame sequence number
#[derive(Debug, Clone)]
pub struct TraceDetector {
    frames: Arc<Vec<TraceFrame>>,
}

impl TraceDetector {
    fn faces(&self, frame: &GrayFrame) -> &[FaceLandmarks] {
        self.frames
            .get(frame.sequence as usize)
            .map(|f| f.faces.as_slice())
            .unwrap_or_default()
    }
}

/// Bounding box of all landmark points
fn bounding_region(face: &FaceLandmarks) -> FaceRegion {
    let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
    let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);
    for p in face.points() {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    FaceRegion {
        x: min_x,
        y: min_y,
        width: max_x - min_x,
        height: max_y - min_y,
        confidence: 1.0,
    }
}

impl FaceDetector for TraceDetector {
    fn detect(&self, frame: &GrayFrame) -> Result<Vec<FaceRegion>, DmsError> {
        Ok(self.faces(frame).iter().map(bounding_region).collect())
    }
}

impl LandmarkPredictor for TraceDetector {
    fn predict(&self, frame: &GrayFrame, region: &FaceRegion) -> Result<FaceLandmarks, DmsError> {
        self.faces(frame)
            .iter()
            .find(|face| bounding_region(face) == *region)
            .cloned()
            .ok_or(DmsError::NoFaceDetected)
    }
}
