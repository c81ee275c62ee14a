//! Alarm configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::device::ToneProfile;

/// Output device selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmBackend {
    /// Platform sound and speech commands
    #[default]
    System,
    /// Log only (headless runs)
    Silent,
}

/// Alarm configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    /// Tone frequency (default: 2000 Hz)
    pub tone_frequency_hz: u32,
    /// Length of one beep (default: 500 ms)
    pub tone_duration_ms: u64,
    /// Pause between beeps; also bounds how long a stop waits (default: 100 ms)
    pub poll_interval_ms: u64,
    /// Speech rate in words per minute (default: 150)
    pub speech_rate_wpm: u32,
    pub backend: AlarmBackend,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            tone_frequency_hz: 2000,
            tone_duration_ms: 500,
            poll_interval_ms: 100,
            speech_rate_wpm: 150,
            backend: AlarmBackend::System,
        }
    }
}

impl AlarmConfig {
    pub fn tone_profile(&self) -> ToneProfile {
        ToneProfile {
            frequency_hz: self.tone_frequency_hz,
            duration: Duration::from_millis(self.tone_duration_ms),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
