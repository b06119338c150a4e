//! Camera Capture Library for the hand-sign command loop
//!
//! Provides the frame acquisition side of the pipeline:
//! - Decoded RGB frames with crop/resize helpers
//! - A `FrameSource` trait with a reported nominal frame rate
//! - Image-sequence replay of recorded camera sessions
//! - In-memory replay for tests and tooling

pub mod frame;
pub mod source;

pub use frame::{PixelRegion, VideoFrame};
pub use source::{FrameSource, ImageSequenceSource, ReplaySource};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open source: {0}")]
    Open(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Frame decode failed: {0}")]
    Decode(String),

    #[error("Streaming error: {0}")]
    Stream(String),

    #[error("End of stream")]
    EndOfStream,
}

impl CameraError {
    /// True when the source ran out of frames rather than failing
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, CameraError::EndOfStream)
    }
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Directory holding recorded frames (e.g., "./frames")
    pub frames_dir: PathBuf,
    /// Nominal frames per second reported by the source
    pub fps: f64,
    /// Block on each read until the frame interval has elapsed
    pub realtime: bool,
    /// Optional output width (frames are resized when both dimensions are set)
    pub width: Option<u32>,
    /// Optional output height
    pub height: Option<u32>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            frames_dir: PathBuf::from("frames"),
            fps: 30.0,
            realtime: true,
            width: None,
            height: None,
        }
    }
}

impl CameraConfig {
    /// Offline replay: no pacing, frames delivered as fast as they decode
    pub fn offline(frames_dir: impl Into<PathBuf>, fps: f64) -> Self {
        Self {
            frames_dir: frames_dir.into(),
            fps,
            realtime: false,
            ..Default::default()
        }
    }

    /// Output size, when both dimensions are configured
    pub fn output_size(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }
}
