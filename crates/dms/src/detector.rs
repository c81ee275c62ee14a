//! Face and landmark detection collaborators
//!
//! The detection models themselves live outside this crate. Anything that can
//! locate faces in a grayscale frame and fit the 68-point layout to a face
//! region plugs in through these traits.

use camera_capture::GrayFrame;
use serde::{Deserialize, Serialize};

use crate::landmarks::FaceLandmarks;
use crate::DmsError;

/// Face bounding region in frame pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

impl FaceRegion {
    /// Region covering the whole frame
    pub fn full_frame(frame: &GrayFrame) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: frame.width as f32,
            height: frame.height as f32,
            confidence: 1.0,
        }
    }
}

/// Locates faces in a frame
pub trait FaceDetector {
    /// Zero regions means no face in this frame
    fn detect(&self, frame: &GrayFrame) -> Result<Vec<FaceRegion>, DmsError>;
}

/// Fits facial landmarks to a detected face region
pub trait LandmarkPredictor {
    /// Fails with [`DmsError::NoFaceDetected`] when the region holds no usable
    /// face, or [`DmsError::Detection`] when the model itself fails
    fn predict(&self, frame: &GrayFrame, region: &FaceRegion) -> Result<FaceLandmarks, DmsError>;
}
