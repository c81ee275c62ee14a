//! Per-frame orchestration

use alerting::AlarmController;
use camera_capture::{FrameSource, VideoFrame};
use dms::{
    AlarmCommand, AlertLevel, DetectionState, DmsConfig, DmsModule, FaceDetector, FrameAnalysis,
    LandmarkPredictor,
};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::render::{LogRenderSink, Overlay, RenderSink};
use crate::{MonitorError, QuitSignal};

/// Why the loop ended
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub enum LoopEnd {
    #[default]
    EndOfStream,
    Quit,
    CaptureFailed(String),
}

/// Counters reported when the loop exits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoopSummary {
    pub frames: u64,
    pub faces: u64,
    /// Transitions into Drowsy
    pub drowsy_episodes: u64,
    /// Transitions into Asleep
    pub sleep_episodes: u64,
    /// Alarm sessions actually started
    pub alarm_starts: u64,
    /// Stop requests issued on return to Normal
    pub alarm_stops: u64,
    pub end: LoopEnd,
}

/// Capture -> detect -> evaluate -> alarm/render loop for one driver.
///
/// Owns the session's [`DetectionState`] and [`AlarmController`]. The loop
/// runs synchronously on the calling thread; only the alarm tone runs on its
/// own worker.
pub struct FrameLoop<D> {
    module: DmsModule,
    state: DetectionState,
    detector: D,
    alarm: AlarmController,
    render: Box<dyn RenderSink>,
    quit: QuitSignal,
    working_size: (u32, u32),
    summary: LoopSummary,
}

impl<D> FrameLoop<D>
where
    D: FaceDetector + LandmarkPredictor,
{
    pub fn new(
        config: DmsConfig,
        detector: D,
        alarm: AlarmController,
        quit: QuitSignal,
    ) -> Result<Self, MonitorError> {
        Ok(Self {
            module: DmsModule::new(config)?,
            state: DetectionState::new(),
            detector,
            alarm,
            render: Box::new(LogRenderSink::default()),
            quit,
            working_size: (640, 480),
            summary: LoopSummary::default(),
        })
    }

    pub fn with_render_sink(mut self, sink: impl RenderSink + 'static) -> Self {
        self.render = Box::new(sink);
        self
    }

    /// Resolution frames are resized to before detection
    pub fn with_working_size(mut self, width: u32, height: u32) -> Self {
        self.working_size = (width, height);
        self
    }

    pub fn state(&self) -> &DetectionState {
        &self.state
    }

    pub fn alarm(&self) -> &AlarmController {
        &self.alarm
    }

    /// Run until the quit signal, end of stream, or a capture failure.
    ///
    /// Any running alarm is stopped before the source is released.
    pub fn run(&mut self, source: &mut dyn FrameSource) -> Result<LoopSummary, MonitorError> {
        let config = self.module.config();
        info!(
            "Starting frame loop (EAR < {}, drowsy after {:?}, asleep after {:?})",
            config.eye_ar_thresh,
            config.drowsy_after(),
            config.asleep_after()
        );

        let end = loop {
            if self.quit.is_triggered() {
                info!("Quit signal received");
                break LoopEnd::Quit;
            }

            let frame = match source.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("End of stream");
                    break LoopEnd::EndOfStream;
                }
                Err(e) => {
                    error!("Capture failed: {}", e);
                    break LoopEnd::CaptureFailed(e.to_string());
                }
            };

            if let Err(e) = self.process_frame(&frame) {
                warn!("Frame {} skipped: {}", frame.sequence, e);
                metrics::counter!("monitor_frames_skipped").increment(1);
            }
        };

        self.shutdown_alarm();
        source.release();

        self.summary.end = end;
        info!("Frame loop stopped: {:?}", self.summary);
        Ok(self.summary.clone())
    }

    /// Process one frame: detect, evaluate every face, apply alarm commands
    /// in order, then render.
    pub fn process_frame(&mut self, frame: &VideoFrame) -> Result<FrameAnalysis, MonitorError> {
        let (width, height) = self.working_size;
        let working = frame.resize(width, height);
        let gray = working.to_grayscale();

        let analysis = self
            .module
            .analyze(&mut self.state, &gray, &self.detector, &self.detector)?;

        self.summary.frames += 1;
        self.summary.faces += analysis.faces.len() as u64;
        metrics::gauge!("dms_closed_frames").set(analysis.counter as f64);

        for command in analysis.commands() {
            self.apply(command);
        }

        let overlay = Overlay::from_analysis(&analysis);
        if let Err(e) = self.render.render(&working, &overlay) {
            warn!("Render failed for frame {}: {}", frame.sequence, e);
        }

        debug!(
            "Frame {}: {} face(s), level {:?}, counter {}",
            analysis.sequence,
            analysis.faces.len(),
            analysis.alert_level,
            analysis.counter
        );
        Ok(analysis)
    }

    fn apply(&mut self, command: AlarmCommand) {
        match command {
            AlarmCommand::Start(level) => {
                match level {
                    AlertLevel::Drowsy => self.summary.drowsy_episodes += 1,
                    AlertLevel::Asleep => self.summary.sleep_episodes += 1,
                    AlertLevel::Normal => return,
                }
                let message = level.spoken_notice().unwrap_or_default();
                match self.alarm.start_alarm(message) {
                    Ok(true) => self.summary.alarm_starts += 1,
                    Ok(false) => debug!("Alarm already running for {:?}", level),
                    Err(e) => error!("Failed to start alarm: {}", e),
                }
            }
            AlarmCommand::Stop => {
                self.summary.alarm_stops += 1;
                if let Err(e) = self.alarm.stop_alarm() {
                    error!("Failed to stop alarm: {}", e);
                }
            }
        }
    }

    fn shutdown_alarm(&mut self) {
        match self.alarm.stop_alarm() {
            Ok(true) => info!("Alarm stopped on shutdown"),
            Ok(false) => {}
            Err(e) => error!("Failed to stop alarm on shutdown: {}", e),
        }
    }
}
