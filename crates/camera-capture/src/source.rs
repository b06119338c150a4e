//! Frame sources
//!
//! Every source owns its underlying resources and releases them in `Drop`,
//! so a capture loop that exits early (cancel, read failure) never leaks the
//! device or file handles it was reading from.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::{CameraConfig, CameraError, VideoFrame};

/// File extensions recognised as recorded frames
const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// A blocking producer of frames
pub trait FrameSource {
    /// Source identifier for logging
    fn name(&self) -> &str;

    /// Frame rate the source claims to deliver, if it knows one
    fn nominal_fps(&self) -> Option<f64>;

    /// Block until the next frame is available.
    ///
    /// `CameraError::EndOfStream` means the source is exhausted; any other
    /// error means the source became unreadable.
    fn read_frame(&mut self) -> Result<VideoFrame, CameraError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn nominal_fps(&self) -> Option<f64> {
        (**self).nominal_fps()
    }

    fn read_frame(&mut self) -> Result<VideoFrame, CameraError> {
        (**self).read_frame()
    }
}

/// Timestamp for frame `sequence` at a fixed rate
fn synthetic_timestamp_ns(sequence: u32, fps: f64) -> u64 {
    if fps > 0.0 && fps.is_finite() {
        (sequence as f64 * 1e9 / fps).round() as u64
    } else {
        0
    }
}

/// In-memory source replaying pre-built frames
pub struct ReplaySource {
    frames: VecDeque<VideoFrame>,
    fps: Option<f64>,
    delivered: u32,
}

impl ReplaySource {
    /// Replay `frames` in order, reporting `fps` as the nominal rate
    pub fn new(frames: Vec<VideoFrame>, fps: Option<f64>) -> Self {
        Self {
            frames: frames.into(),
            fps,
            delivered: 0,
        }
    }

    /// `count` blank frames with timestamps spaced at `fps`
    pub fn blank(count: u32, width: u32, height: u32, fps: f64) -> Self {
        let frames = (0..count)
            .map(|seq| VideoFrame::blank(width, height, synthetic_timestamp_ns(seq, fps), seq))
            .collect();
        Self::new(frames, Some(fps))
    }

    /// Frames handed out so far
    pub fn delivered(&self) -> u32 {
        self.delivered
    }

    /// Frames still queued
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for ReplaySource {
    fn name(&self) -> &str {
        "replay"
    }

    fn nominal_fps(&self) -> Option<f64> {
        self.fps
    }

    fn read_frame(&mut self) -> Result<VideoFrame, CameraError> {
        let frame = self.frames.pop_front().ok_or(CameraError::EndOfStream)?;
        self.delivered += 1;
        Ok(frame)
    }
}

/// Replays a directory of still images as a camera stream.
///
/// Files are ordered by name. Each frame is stamped `sequence / fps` so
/// downstream timing does not depend on decode speed.
pub struct ImageSequenceSource {
    name: String,
    paths: VecDeque<PathBuf>,
    fps: f64,
    interval: Duration,
    realtime: bool,
    output_size: Option<(u32, u32)>,
    sequence: u32,
    last_frame_at: Option<Instant>,
}

impl ImageSequenceSource {
    /// Open the frame directory described by `config`
    pub fn open(config: &CameraConfig) -> Result<Self, CameraError> {
        if !(config.fps > 0.0 && config.fps.is_finite()) {
            return Err(CameraError::Format(format!(
                "nominal fps must be positive, got {}",
                config.fps
            )));
        }
        let interval = Duration::try_from_secs_f64(1.0 / config.fps).map_err(|e| {
            CameraError::Format(format!("frame interval at {} fps: {}", config.fps, e))
        })?;

        let paths = list_frames(&config.frames_dir)?;
        if paths.is_empty() {
            return Err(CameraError::Open(format!(
                "no frames found in {}",
                config.frames_dir.display()
            )));
        }

        info!(
            "Opened image sequence {} ({} frames @ {} fps, realtime={})",
            config.frames_dir.display(),
            paths.len(),
            config.fps,
            config.realtime
        );

        Ok(Self {
            name: config.frames_dir.display().to_string(),
            paths: paths.into(),
            fps: config.fps,
            interval,
            realtime: config.realtime,
            output_size: config.output_size(),
            sequence: 0,
            last_frame_at: None,
        })
    }

    /// Frames not yet read
    pub fn remaining(&self) -> usize {
        self.paths.len()
    }

    fn pace(&mut self) {
        if let Some(last) = self.last_frame_at {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                thread::sleep(self.interval - elapsed);
            }
        }
        self.last_frame_at = Some(Instant::now());
    }
}

impl FrameSource for ImageSequenceSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn nominal_fps(&self) -> Option<f64> {
        Some(self.fps)
    }

    fn read_frame(&mut self) -> Result<VideoFrame, CameraError> {
        let path = self.paths.pop_front().ok_or(CameraError::EndOfStream)?;

        if self.realtime {
            self.pace();
        }

        let bytes = fs::read(&path)
            .map_err(|e| CameraError::Stream(format!("{}: {}", path.display(), e)))?;
        let sequence = self.sequence;
        let frame = VideoFrame::decode(&bytes, synthetic_timestamp_ns(sequence, self.fps), sequence)
            .map_err(|e| CameraError::Decode(format!("{}: {}", path.display(), e)))?;
        self.sequence += 1;

        debug!("Read frame {} from {}", sequence, path.display());

        match self.output_size {
            Some((w, h)) if (w, h) != (frame.width, frame.height) => frame
                .resize(w, h)
                .ok_or_else(|| CameraError::Decode(format!("{}: cannot resize to {}x{}", path.display(), w, h))),
            _ => Ok(frame),
        }
    }
}

impl Drop for ImageSequenceSource {
    fn drop(&mut self) {
        if !self.paths.is_empty() {
            warn!(
                "Releasing image sequence {} with {} unread frames",
                self.name,
                self.paths.len()
            );
        } else {
            info!("Released image sequence {}", self.name);
        }
    }
}

fn list_frames(dir: &Path) -> Result<Vec<PathBuf>, CameraError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| CameraError::Open(format!("{}: {}", dir.display(), e)))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| CameraError::Open(format!("{}: {}", dir.display(), e)))?
            .path();
        let is_frame = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if path.is_file() && is_frame {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
