//! DMS analysis results

use serde::{Deserialize, Serialize};

use crate::detector::FaceRegion;
use crate::landmarks::EyeLandmarks;
use crate::state::{AlarmCommand, AlertLevel};

/// One eye as seen in one frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EyeReading {
    pub landmarks: EyeLandmarks,

    /// Eye aspect ratio, `None` when the geometry was degenerate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ear: Option<f32>,
}

/// Result of evaluating one detected face
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceReading {
    pub region: FaceRegion,
    pub left_eye: EyeReading,
    pub right_eye: EyeReading,

    /// Combined openness, `None` when neither eye was readable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openness: Option<f32>,

    /// Alert level right after this face was applied
    pub alert_level: AlertLevel,

    /// Closed-frame counter right after this face was applied
    pub counter: u32,

    /// Alarm command raised by this face
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<AlarmCommand>,
}

impl FaceReading {
    /// Overlay text for the openness value
    pub fn openness_label(&self) -> Option<String> {
        self.openness.map(|ear| format!("EAR: {:.2}", ear))
    }
}

/// Complete analysis of one frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameAnalysis {
    /// Sequence number of the analyzed frame
    pub sequence: u32,

    /// Faces in detection order
    pub faces: Vec<FaceReading>,

    /// Regions the landmark model rejected
    pub rejected_regions: usize,

    /// Alert level after the whole frame
    pub alert_level: AlertLevel,

    /// Counter after the whole frame
    pub counter: u32,
}

impl FrameAnalysis {
    /// Whether any face was evaluated
    pub fn face_detected(&self) -> bool {
        !self.faces.is_empty()
    }

    /// Alarm commands in the order they were raised
    pub fn commands(&self) -> impl Iterator<Item = AlarmCommand> + '_ {
        self.faces.iter().filter_map(|f| f.command)
    }

    /// Banner for the level each face left behind (last face wins on screen)
    pub fn banner(&self) -> Option<&'static str> {
        self.faces.last().and_then(|f| f.alert_level.banner())
    }
}
