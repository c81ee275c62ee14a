//! Drowsiness Monitor
//!
//! Wires capture, drowsiness detection, alarms and overlay rendering into a
//! per-frame loop.

pub mod frame_loop;
pub mod render;
pub mod replay;
pub mod settings;

pub use frame_loop::{FrameLoop, LoopEnd, LoopSummary};
pub use render::{ImageRenderSink, LogRenderSink, Overlay, RenderSink};
pub use replay::{LandmarkTrace, TraceDetector, TraceSource};
pub use settings::{CaptureSettings, LoggingSettings, Settings};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use alerting::{AlarmController, AlertingError};
use camera_capture::CameraError;
use dms::DmsError;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

/// Monitor error types
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error(transparent)]
    Dms(#[from] DmsError),

    #[error(transparent)]
    Alerting(#[from] AlertingError),

    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error("Trace line {line}: {source}")]
    Trace {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("No landmark trace configured (set capture.trace_path)")]
    MissingTrace,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid log level {0:?} (expected trace, debug, info, warn or error)")]
    LogLevel(String),

    #[error("Render failed: {0}")]
    Render(String),

    #[error("Logging setup failed: {0}")]
    Logging(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Externally triggered stop request, checked once per frame
#[derive(Debug, Clone, Default)]
pub struct QuitSignal(Arc<AtomicBool>);

impl QuitSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Initialize logging
pub fn init_logging(settings: &LoggingSettings) -> Result<(), MonitorError> {
    let builder = FmtSubscriber::builder()
        .with_max_level(settings.max_level()?)
        .with_target(true);

    if settings.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// Replay the configured landmark trace through the full pipeline
pub fn run_replay(settings: &Settings, quit: QuitSignal) -> Result<LoopSummary, MonitorError> {
    let path = settings
        .capture
        .trace_path
        .as_deref()
        .ok_or(MonitorError::MissingTrace)?;

    let trace = LandmarkTrace::load(path)?;
    info!("Loaded landmark trace {} ({} frames)", path.display(), trace.len());

    let (mut source, detector) = trace.into_parts(&settings.capture);
    let alarm = AlarmController::from_config(settings.alarm.clone());

    let mut frame_loop = FrameLoop::new(settings.effective_dms(), detector, alarm, quit)?
        .with_working_size(settings.capture.width, settings.capture.height);

    frame_loop.run(&mut source)
}
