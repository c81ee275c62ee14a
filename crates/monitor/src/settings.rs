//! Runtime settings

use std::path::PathBuf;

use alerting::AlarmConfig;
use dms::DmsConfig;
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::MonitorError;

/// Capture settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Working width frames are resized to before detection
    pub width: u32,
    /// Working height frames are resized to before detection
    pub height: u32,
    /// Capture rate; detection thresholds are rescaled to it
    pub fps: u32,
    /// JSON-lines landmark trace to replay
    pub trace_path: Option<PathBuf>,
    /// Pace replay at `fps` instead of running flat out
    pub realtime: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
            trace_path: None,
            realtime: true,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Max level: trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingSettings {
    pub fn max_level(&self) -> Result<Level, MonitorError> {
        self.level
            .parse::<Level>()
            .map_err(|_| MonitorError::LogLevel(self.level.clone()))
    }
}

/// All monitor settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub dms: DmsConfig,
    pub alarm: AlarmConfig,
    pub capture: CaptureSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Settings file read when `DROWSY_CONFIG` is unset
    pub const DEFAULT_FILE: &'static str = "drowsiness-monitor.toml";

    /// Prefix for environment overrides, e.g. `DROWSY__DMS__EYE_AR_THRESH=0.2`
    pub const ENV_PREFIX: &'static str = "DROWSY";

    /// Load from the default location plus environment overrides
    pub fn load() -> Result<Self, MonitorError> {
        let path = std::env::var("DROWSY_CONFIG").unwrap_or_else(|_| Self::DEFAULT_FILE.to_string());
        Self::load_from(&path)
    }

    /// Load from `path` (optional) plus environment overrides
    pub fn load_from(path: &str) -> Result<Self, MonitorError> {
        let raw = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(Self::ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = raw.try_deserialize()?;
        settings.dms.validate()?;
        settings.logging.max_level()?;
        Ok(settings)
    }

    /// Detection thresholds rescaled to the capture rate
    pub fn effective_dms(&self) -> DmsConfig {
        self.dms.for_fps(self.capture.fps)
    }
}
