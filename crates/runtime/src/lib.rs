//! handsign-remote runtime
//!
//! Wires a frame source, the face/hand-sign adapters and a command sink
//! into a [`SessionController`] and runs it until the stream ends or the
//! user cancels.

pub mod cli;
pub mod settings;

pub use cli::Args;
pub use settings::{AppConfig, LogFormat, LoggingConfig, OutputConfig};

use anyhow::{Context, Result};
use camera_capture::{FrameSource, ImageSequenceSource};
use gesture::{
    AnnotationScript, CommandSink, FaceDetector, FrameRate, HandSignClassifier, RunSummary,
    SessionController,
};
use std::str::FromStr;
use std::sync::atomic::AtomicBool;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Initialize logging.
///
/// Logs go to stderr so that stdout carries only commands.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let level = Level::from_str(&config.level)
        .with_context(|| format!("Invalid log level '{}'", config.level))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    match config.format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    }
    .context("Failed to set tracing subscriber")
}

/// Face detector and hand-sign classifier selected by the configuration
pub type Adapters = (Box<dyn FaceDetector>, Box<dyn HandSignClassifier>);

/// Annotation replay when a script is configured, otherwise the ONNX models
pub fn build_adapters(config: &AppConfig) -> Result<Adapters> {
    let vocabulary = &config.session.vocabulary;

    if let Some(path) = &config.annotations {
        let script = AnnotationScript::from_path(path)?;
        script.validate(vocabulary)?;
        info!("Replaying {} annotated frames from {}", script.len(), path.display());
        let (detector, classifier) = script.into_adapters(vocabulary);
        return Ok((Box::new(detector), Box::new(classifier)));
    }

    model_adapters(config)
}

#[cfg(feature = "onnx")]
fn model_adapters(config: &AppConfig) -> Result<Adapters> {
    let detector = gesture::OnnxFaceDetector::new(&config.models)?;
    let classifier = gesture::OnnxHandSignClassifier::new(&config.models, &config.session.vocabulary)?;
    Ok((Box::new(detector), Box::new(classifier)))
}

#[cfg(not(feature = "onnx"))]
fn model_adapters(_config: &AppConfig) -> Result<Adapters> {
    anyhow::bail!("No annotation script given and model inference is not built in (enable the `onnx` feature)")
}

/// Open the camera, run the capture loop and return why it stopped
pub fn run<S: CommandSink>(config: &AppConfig, sink: S, cancel: &AtomicBool) -> Result<RunSummary> {
    let (detector, classifier) = build_adapters(config)?;

    let mut source = ImageSequenceSource::open(&config.camera)
        .with_context(|| format!("Failed to open camera {}", config.camera.frames_dir.display()))?;
    let frame_rate = FrameRate::from_nominal(source.nominal_fps())?;

    let mut controller = SessionController::new(config.session.clone(), frame_rate, detector, classifier, sink)?;
    let summary = controller
        .run(&mut source, cancel)
        .context("Capture loop failed")?;

    info!(
        "Stopped ({:?}): {} frames, {} sessions, {} commands, {} rejected, {} closed early",
        summary.exit,
        summary.stats.frames,
        summary.stats.sessions_started,
        summary.stats.commands_emitted,
        summary.stats.commands_rejected,
        summary.stats.sessions_closed_early
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gesture::{ExitReason, MemorySink};
    use image::RgbImage;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn write_frames(dir: &Path, count: usize) {
        for i in 0..count {
            RgbImage::new(64, 48)
                .save(dir.join(format!("frame_{:03}.png", i)))
                .unwrap();
        }
    }

    /// Trigger on frame 0, then `sign` on every following frame
    fn write_script(path: &Path, frames: usize, sign: usize) {
        let face = r#"{ "x": 20, "y": 10, "width": 20, "height": 20 }"#;
        let entries: Vec<String> = (0..frames)
            .map(|i| {
                let shown = if i == 0 { 5 } else { sign };
                format!(r#"{{ "faces": [ {{ "face": {}, "sign": {} }} ] }}"#, face, shown)
            })
            .collect();
        fs::write(path, format!("[{}]", entries.join(","))).unwrap();
    }

    fn replay_config(dir: &TempDir, frames: usize) -> AppConfig {
        let frames_dir = dir.path().join("frames");
        fs::create_dir(&frames_dir).unwrap();
        write_frames(&frames_dir, frames);

        let script = dir.path().join("script.json");
        write_script(&script, frames, 2);

        let mut config = AppConfig::default();
        config.camera.frames_dir = frames_dir;
        config.camera.fps = 3.0;
        config.camera.realtime = false;
        config.session.time_base = gesture::TimeBase::Capture;
        config.annotations = Some(script);
        config
    }

    #[test]
    fn test_replay_emits_command() {
        let dir = TempDir::new().unwrap();
        // 3 fps, 3 s window: frames 1..=8 vote, frame 9 closes the window.
        let config = replay_config(&dir, 12);

        let summary = run(&config, MemorySink::new(), &AtomicBool::new(false)).unwrap();
        assert_eq!(summary.exit, ExitReason::EndOfStream);
        assert_eq!(summary.stats.frames, 12);
        assert_eq!(summary.stats.sessions_started, 1);
        assert_eq!(summary.stats.commands_emitted, 1);
    }

    #[test]
    fn test_cancel_before_first_frame() {
        let dir = TempDir::new().unwrap();
        let config = replay_config(&dir, 4);
        let cancel = AtomicBool::new(false);
        cancel.store(true, Ordering::SeqCst);

        let summary = run(&config, MemorySink::new(), &cancel).unwrap();
        assert_eq!(summary.exit, ExitReason::Cancelled);
        assert_eq!(summary.stats.frames, 0);
    }

    #[test]
    fn test_script_outside_vocabulary_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut config = replay_config(&dir, 2);
        let script = dir.path().join("bad.json");
        write_script(&script, 2, 42);
        config.annotations = Some(script);

        assert!(build_adapters(&config).is_err());
    }

    #[test]
    fn test_empty_frame_directory_fails_to_open() {
        let dir = TempDir::new().unwrap();
        let mut config = replay_config(&dir, 1);
        let empty = dir.path().join("empty");
        fs::create_dir(&empty).unwrap();
        config.camera.frames_dir = empty;

        assert!(run(&config, MemorySink::new(), &AtomicBool::new(false)).is_err());
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_models_required_without_script() {
        let config = AppConfig::default();
        assert!(build_adapters(&config).is_err());
    }
}
