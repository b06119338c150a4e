//! Hand-sign command sessions
//!
//! Turns a stream of per-frame face detections and hand-sign classifications
//! into discrete commands:
//! - Trigger selection among all visible faces
//! - Single-target tracking by bounding-box overlap
//! - Fixed-window majority voting over the signs that follow the trigger
//! - A frame-synchronous controller driving IDLE <-> SESSION_ACTIVE

pub mod adapter;
pub mod config;
pub mod controller;
#[cfg(feature = "onnx")]
pub mod detector;
pub mod geometry;
pub mod postprocess;
pub mod scripted;
pub mod session;
pub mod sink;
pub mod tracker;
pub mod trigger;
pub mod vocabulary;

pub use adapter::{ClassificationResult, FaceDetector, HandSignClassifier};
pub use config::{HandAreaConfig, HandSide, ModelConfig, SessionConfig, TimeBase};
pub use controller::{
    ControllerStats, ExitReason, FrameEvent, FrameReport, RunSummary, SessionController, SessionState,
    SkipReason,
};
#[cfg(feature = "onnx")]
pub use detector::{OnnxFaceDetector, OnnxHandSignClassifier};
pub use geometry::{overlap_score, BoundingBox};
pub use scripted::{AnnotationScript, ScriptedClassifier, ScriptedDetector, ScriptedFace, ScriptedFrame};
pub use session::{majority, CommandSession, Decision, FrameRate, Vote};
pub use sink::{CommandSink, EmittedCommand, LogSink, MemorySink, WriterSink};
pub use tracker::{BoxTracker, TrackOutcome};
pub use trigger::{TriggerMatch, TriggerSelector};
pub use vocabulary::SignVocabulary;

use camera_capture::CameraError;
use thiserror::Error;

/// Gesture pipeline error types
#[derive(Error, Debug)]
pub enum GestureError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid frame rate: {0} (must be positive and finite)")]
    InvalidFrameRate(f64),

    #[error("Frame source reports no frame rate")]
    FrameRateUnavailable,

    #[error("Frame acquisition failed: {0}")]
    Capture(#[from] CameraError),

    #[error("Annotation script error: {0}")]
    Script(String),

    #[error("Command sink failed: {0}")]
    Sink(String),
}
