//! Alerting System
//!
//! Drives the in-cabin alarm: a repeating tone on a background worker plus a
//! one-shot spoken notice. Output devices are pluggable so platform
//! differences stay behind [`ToneEmitter`] and [`SpeechSynthesizer`].

mod config;
mod controller;
pub mod device;

pub use config::{AlarmBackend, AlarmConfig};
pub use controller::AlarmController;
pub use device::{SpeechSynthesizer, ToneEmitter, ToneProfile};

use thiserror::Error;

/// Alerting error types
#[derive(Error, Debug)]
pub enum AlertingError {
    #[error("Tone device failed: {0}")]
    ToneDevice(String),

    #[error("Speech synthesis failed: {0}")]
    Speech(String),

    #[error("Failed to spawn alarm worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Alarm worker for session {0} panicked")]
    WorkerPanicked(u64),
}
