//! Session and model configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::geometry::BoundingBox;
use crate::vocabulary::SignVocabulary;
use crate::GestureError;

/// Clock used to measure the command window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBase {
    /// Monotonic wall clock, started with the capture loop
    #[default]
    Wall,
    /// Capture timestamp carried by each frame
    Capture,
}

/// Command session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Length of the command window after a trigger (milliseconds)
    pub window_ms: u64,

    /// Margin the face detector adds around each face (pixels)
    pub detection_margin: u32,

    /// A tracked box only continues when its overlap is strictly above this
    pub min_track_overlap: f32,

    /// Clock used for the command window
    pub time_base: TimeBase,

    /// Hand-sign and command labels
    pub vocabulary: SignVocabulary,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            window_ms: 3000,
            detection_margin: 10,
            min_track_overlap: 0.0,
            time_base: TimeBase::Wall,
            vocabulary: SignVocabulary::default(),
        }
    }
}

impl SessionConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn validate(&self) -> Result<(), GestureError> {
        if self.window_ms == 0 {
            return Err(GestureError::Config("window_ms must be positive".into()));
        }
        if !(0.0..1.0).contains(&self.min_track_overlap) {
            return Err(GestureError::Config(format!(
                "min_track_overlap must be in [0, 1), got {}",
                self.min_track_overlap
            )));
        }
        self.vocabulary.validate()
    }
}

/// Which side of the face (in image coordinates) the hand is expected on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandSide {
    /// Image-left, i.e. the subject's right hand on a non-mirrored camera
    #[default]
    Left,
    Right,
}

/// Placement of the hand area relative to a face box
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HandAreaConfig {
    pub side: HandSide,
    /// Hand area width as a multiple of the face width
    pub width_scale: f32,
    /// Hand area height as a multiple of the face height
    pub height_scale: f32,
}

impl Default for HandAreaConfig {
    fn default() -> Self {
        Self {
            side: HandSide::Left,
            width_scale: 1.5,
            height_scale: 1.5,
        }
    }
}

impl HandAreaConfig {
    /// Hand area beside `face`, vertically centred on it and clipped to the frame.
    ///
    /// Returns `None` when nothing of the area is left inside the frame.
    pub fn locate(&self, face: &BoundingBox, frame_width: u32, frame_height: u32) -> Option<BoundingBox> {
        let width = face.width * self.width_scale;
        let height = face.height * self.height_scale;
        let (_, cy) = face.center();
        let x = match self.side {
            HandSide::Left => face.x - width,
            HandSide::Right => face.right(),
        };
        let area = BoundingBox::new(x, cy - height / 2.0, width, height)
            .clamp_to(frame_width, frame_height);
        (!area.is_degenerate()).then_some(area)
    }
}

/// Model configuration for the ONNX adapters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// SSD-style face detector (boxes + scores outputs)
    pub face_model_path: Option<String>,

    /// Square input side the face detector expects
    pub face_input_size: u32,

    /// Minimum face detection score
    pub face_confidence: f32,

    /// Hand-sign classifier (softmax over the vocabulary)
    pub classifier_model_path: Option<String>,

    /// Square input side the classifier expects
    pub classifier_input_size: u32,

    /// Minimum top-class probability for a sign to count as recognised
    pub classifier_confidence: f32,

    /// Where to look for the hand
    pub hand_area: HandAreaConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            face_model_path: None,
            face_input_size: 320,
            face_confidence: 0.7,
            classifier_model_path: None,
            classifier_input_size: 224,
            classifier_confidence: 0.6,
            hand_area: HandAreaConfig::default(),
        }
    }
}
