//! Camera Capture Library for the Drowsiness Monitor
//!
//! Provides the frame types consumed by the detection pipeline and the
//! [`FrameSource`] seam behind which real camera drivers live.
//! Supports:
//! - RGB frames with resize and grayscale preprocessing
//! - Any capture backend that can hand out frames on demand

pub mod frame;
pub mod source;

pub use frame::{GrayFrame, VideoFrame};
pub use source::{FrameSource, MemorySource};

use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Invalid frame: {0}")]
    Format(String),

    #[error("Streaming error: {0}")]
    Stream(String),

    #[error("Camera not initialized")]
    NotInitialized,
}
