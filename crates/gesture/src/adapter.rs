//! Detection and classification adapters
//!
//! The session logic never looks at pixels itself. Face detection and
//! hand-sign classification are delegated to these traits so model backends
//! (ONNX, annotation replay, test doubles) can be swapped freely.

use camera_capture::VideoFrame;
use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;
use crate::GestureError;

/// A hand sign recognised near a face region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Sub-region the classifier actually looked at
    pub hand_area: BoundingBox,
    /// Index into the sign vocabulary
    pub class_index: usize,
    /// Human-readable label for `class_index`
    pub class_label: String,
}

/// Produces candidate face regions for a frame.
///
/// No identity is carried between calls and the order of the returned boxes
/// may change from frame to frame.
pub trait FaceDetector {
    fn name(&self) -> &str;

    /// Detect faces, growing each box by `margin` pixels
    fn detect(&mut self, frame: &VideoFrame, margin: u32) -> Result<Vec<BoundingBox>, GestureError>;
}

/// Classifies the hand sign shown next to a face region.
pub trait HandSignClassifier {
    fn name(&self) -> &str;

    /// `Ok(None)` means no recognisable sign near `region` in this frame
    fn classify(
        &mut self,
        frame: &VideoFrame,
        region: &BoundingBox,
    ) -> Result<Option<ClassificationResult>, GestureError>;
}

impl<T: FaceDetector + ?Sized> FaceDetector for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn detect(&mut self, frame: &VideoFrame, margin: u32) -> Result<Vec<BoundingBox>, GestureError> {
        (**self).detect(frame, margin)
    }
}

impl<T: HandSignClassifier + ?Sized> HandSignClassifier for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn classify(
        &mut self,
        frame: &VideoFrame,
        region: &BoundingBox,
    ) -> Result<Option<ClassificationResult>, GestureError> {
        (**self).classify(frame, region)
    }
}
