//! Capture source abstraction

use std::collections::VecDeque;

use tracing::debug;

use crate::{CameraError, VideoFrame};

/// Anything that hands out frames on demand.
///
/// `Ok(None)` signals end of stream. An `Err` is a device failure; both end
/// the capture loop.
pub trait FrameSource {
    /// Block until the next frame is available
    fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError>;

    /// Release the underlying device
    fn release(&mut self) {}
}

/// Source backed by a queue of pre-built frames
#[derive(Debug, Default)]
pub struct MemorySource {
    frames: VecDeque<VideoFrame>,
    fail_at_end: bool,
    released: bool,
}

impl MemorySource {
    pub fn new(frames: impl IntoIterator<Item = VideoFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            fail_at_end: false,
            released: false,
        }
    }

    /// Report a stream error instead of a clean end once the queue is drained
    pub fn failing_at_end(mut self) -> Self {
        self.fail_at_end = true;
        self
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for MemorySource {
    fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        if self.released {
            return Err(CameraError::NotInitialized);
        }
        match self.frames.pop_front() {
            Some(frame) => Ok(Some(frame)),
            None if self.fail_at_end => Err(CameraError::Stream("device disconnected".into())),
            None => Ok(None),
        }
    }

    fn release(&mut self) {
        debug!("Releasing memory source ({} frames unread)", self.frames.len());
        self.released = true;
    }
}
