//! DMS configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::DmsError;

/// Drowsiness thresholds.
///
/// Frame counts are expressed at `reference_fps`; use [`DmsConfig::for_fps`]
/// when the capture rate differs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Eye aspect ratio below which an eye counts as closed
    pub eye_ar_thresh: f32,

    /// Consecutive closed frames before the drowsiness alert
    pub eye_ar_consec_frames: u32,

    /// Consecutive closed frames before the sleep alert
    pub sleep_consec_frames: u32,

    /// Capture rate the frame counts were tuned for
    pub reference_fps: u32,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            eye_ar_thresh: 0.25,
            eye_ar_consec_frames: 20, // ~0.66s at 30fps
            sleep_consec_frames: 90,  // ~3s at 30fps
            reference_fps: 30,
        }
    }
}

impl DmsConfig {
    /// Rescale the frame thresholds to a different capture rate so the
    /// alerts fire after the same wall-clock duration.
    pub fn for_fps(&self, fps: u32) -> Self {
        if fps == 0 || fps == self.reference_fps || self.reference_fps == 0 {
            return self.clone();
        }
        let scale = fps as f64 / self.reference_fps as f64;
        let drowsy = ((self.eye_ar_consec_frames as f64 * scale).round() as u32).max(1);
        let sleep = ((self.sleep_consec_frames as f64 * scale).round() as u32).max(drowsy + 1);

        Self {
            eye_ar_thresh: self.eye_ar_thresh,
            eye_ar_consec_frames: drowsy,
            sleep_consec_frames: sleep,
            reference_fps: fps,
        }
    }

    /// Eyes-closed time before the drowsiness alert
    pub fn drowsy_after(&self) -> Duration {
        self.frames_to_duration(self.eye_ar_consec_frames)
    }

    /// Eyes-closed time before the sleep alert
    pub fn asleep_after(&self) -> Duration {
        self.frames_to_duration(self.sleep_consec_frames)
    }

    fn frames_to_duration(&self, frames: u32) -> Duration {
        Duration::from_secs_f64(frames as f64 / self.reference_fps.max(1) as f64)
    }

    pub fn validate(&self) -> Result<(), DmsError> {
        if !(self.eye_ar_thresh.is_finite() && self.eye_ar_thresh > 0.0) {
            return Err(DmsError::Config(format!(
                "eye_ar_thresh must be positive, got {}",
                self.eye_ar_thresh
            )));
        }
        if self.eye_ar_consec_frames == 0 {
            return Err(DmsError::Config("eye_ar_consec_frames must be at least 1".into()));
        }
        if self.sleep_consec_frames <= self.eye_ar_consec_frames {
            return Err(DmsError::Config(format!(
                "sleep_consec_frames ({}) must exceed eye_ar_consec_frames ({})",
                self.sleep_consec_frames, self.eye_ar_consec_frames
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DmsConfig::default();
        assert_eq!(config.eye_ar_thresh, 0.25);
        assert_eq!(config.eye_ar_consec_frames, 20);
        assert_eq!(config.sleep_consec_frames, 90);
        assert!(config.validate().is_ok());
        assert_eq!(config.asleep_after(), Duration::from_secs(3));
    }

    #[test]
    fn test_for_fps_keeps_wall_clock() {
        let half = DmsConfig::default().for_fps(15);
        assert_eq!(half.eye_ar_consec_frames, 10);
        assert_eq!(half.sleep_consec_frames, 45);
        assert_eq!(half.asleep_after(), DmsConfig::default().asleep_after());

        let same = DmsConfig::default().for_fps(30);
        assert_eq!(same, DmsConfig::default());
    }

    #[test]
    fn test_for_fps_never_collapses() {
        let tiny = DmsConfig::default().for_fps(1);
        assert!(tiny.eye_ar_consec_frames >= 1);
        assert!(tiny.sleep_consec_frames > tiny.eye_ar_consec_frames);
        assert!(tiny.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_thresholds() {
        let inverted = DmsConfig {
            eye_ar_consec_frames: 90,
            sleep_consec_frames: 20,
            ..Default::default()
        };
        assert!(matches!(inverted.validate(), Err(DmsError::Config(_))));

        let negative = DmsConfig {
            eye_ar_thresh: -0.1,
            ..Default::default()
        };
        assert!(negative.validate().is_err());

    }
}
