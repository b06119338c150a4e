//! Command-line interface

use clap::Parser;
use std::path::PathBuf;

use crate::settings::AppConfig;

#[derive(Parser, Debug)]
#[command(
    name = "handsign-remote",
    author,
    version,
    about = "Turn hand signs shown to a camera into discrete commands"
)]
pub struct Args {
    /// Directory of frames to read as the camera stream.
    #[arg(long, value_name = "DIR")]
    pub frames: Option<PathBuf>,

    /// TOML configuration file.
    #[arg(long, short, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Annotation script to replay instead of running the models.
    #[arg(long, value_name = "FILE")]
    pub annotations: Option<PathBuf>,

    /// Nominal frame rate of the stream.
    #[arg(long)]
    pub fps: Option<f64>,

    /// Command window length in milliseconds.
    #[arg(long)]
    pub window_ms: Option<u64>,

    /// Print commands as JSON lines.
    #[arg(long)]
    pub json: bool,

    /// Read frames as fast as they decode instead of at the nominal rate.
    #[arg(long)]
    pub no_realtime: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "HANDSIGN_LOG")]
    pub log_level: Option<String>,
}

impl Args {
    /// Apply flags on top of the loaded configuration
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(frames) = &self.frames {
            config.camera.frames_dir = frames.clone();
        }
        if let Some(annotations) = &self.annotations {
            config.annotations = Some(annotations.clone());
        }
        if let Some(fps) = self.fps {
            config.camera.fps = fps;
        }
        if let Some(window_ms) = self.window_ms {
            config.session.window_ms = window_ms;
        }
        if self.json {
            config.output.json = true;
        }
        if self.no_realtime {
            config.camera.realtime = false;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}
