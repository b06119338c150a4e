//! Annotation replay adapters
//!
//! Drives the session logic from a recorded annotation file instead of live
//! models. Entry `n` of the script describes frame sequence `n`: the face
//! boxes visible in it and the sign shown beside each face.
//!
//! ```json
//! [
//!   { "faces": [ { "face": { "x": 200, "y": 120, "width": 90, "height": 90 }, "sign": 5 } ] },
//!   { "faces": [] }
//! ]
//! ```

use camera_capture::VideoFrame;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::rc::Rc;

use crate::adapter::{ClassificationResult, FaceDetector, HandSignClassifier};
use crate::geometry::{overlap_score, BoundingBox};
use crate::vocabulary::SignVocabulary;
use crate::GestureError;

/// Minimum overlap between a queried region and an annotated face
const REGION_MATCH_OVERLAP: f32 = 0.5;

/// One annotated face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedFace {
    /// Face box as the detector would report it (margin included)
    pub face: BoundingBox,
    /// Sign class shown beside the face, if any
    #[serde(default)]
    pub sign: Option<usize>,
    /// Hand area to report; defaults to the face box
    #[serde(default)]
    pub hand_area: Option<BoundingBox>,
}

impl ScriptedFace {
    pub fn new(face: BoundingBox, sign: Option<usize>) -> Self {
        Self {
            face,
            sign,
            hand_area: None,
        }
    }
}

/// Annotations for one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptedFrame {
    #[serde(default)]
    pub faces: Vec<ScriptedFace>,
}

impl ScriptedFrame {
    /// Frame with no faces
    pub fn empty() -> Self {
        Self::default()
    }

    /// Frame with a single face
    pub fn single(face: BoundingBox, sign: Option<usize>) -> Self {
        Self {
            faces: vec![ScriptedFace::new(face, sign)],
        }
    }
}

/// Per-frame annotations indexed by frame sequence number
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationScript {
    frames: Vec<ScriptedFrame>,
}

impl AnnotationScript {
    pub fn new(frames: Vec<ScriptedFrame>) -> Self {
        Self { frames }
    }

    pub fn from_json(json: &str) -> Result<Self, GestureError> {
        let frames = serde_json::from_str(json).map_err(|e| GestureError::Script(e.to_string()))?;
        Ok(Self { frames })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, GestureError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| GestureError::Script(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Annotations for frame `sequence`; frames past the end have no faces
    pub fn frame(&self, sequence: u32) -> Option<&ScriptedFrame> {
        self.frames.get(sequence as usize)
    }

    /// Check every annotated sign is a class of `vocabulary`
    pub fn validate(&self, vocabulary: &SignVocabulary) -> Result<(), GestureError> {
        for (seq, frame) in self.frames.iter().enumerate() {
            for face in &frame.faces {
                if let Some(sign) = face.sign {
                    if sign >= vocabulary.len() {
                        return Err(GestureError::Script(format!(
                            "frame {}: sign {} outside vocabulary of {}",
                            seq,
                            sign,
                            vocabulary.len()
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Detector/classifier pair sharing this script
    pub fn into_adapters(self, vocabulary: &SignVocabulary) -> (ScriptedDetector, ScriptedClassifier) {
        let script = Rc::new(self);
        (
            ScriptedDetector {
                script: Rc::clone(&script),
                calls: 0,
            },
            ScriptedClassifier {
                script,
                labels: vocabulary.hand_signs.clone(),
                calls: 0,
            },
        )
    }
}

/// Reports the annotated face boxes of each frame
pub struct ScriptedDetector {
    script: Rc<AnnotationScript>,
    calls: usize,
}

impl ScriptedDetector {
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl FaceDetector for ScriptedDetector {
    fn name(&self) -> &str {
        "scripted-detector"
    }

    fn detect(&mut self, frame: &VideoFrame, _margin: u32) -> Result<Vec<BoundingBox>, GestureError> {
        self.calls += 1;
        Ok(self
            .script
            .frame(frame.sequence)
            .map(|f| f.faces.iter().map(|face| face.face).collect())
            .unwrap_or_default())
    }
}

/// Reports the annotated sign of the face best overlapping the queried region
pub struct ScriptedClassifier {
    script: Rc<AnnotationScript>,
    labels: Vec<String>,
    calls: usize,
}

impl ScriptedClassifier {
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl HandSignClassifier for ScriptedClassifier {
    fn name(&self) -> &str {
        "scripted-classifier"
    }

    fn classify(
        &mut self,
        frame: &VideoFrame,
        region: &BoundingBox,
    ) -> Result<Option<ClassificationResult>, GestureError> {
        self.calls += 1;
        let Some(annotations) = self.script.frame(frame.sequence) else {
            return Ok(None);
        };

        let best = annotations
            .faces
            .iter()
            .map(|face| (face, overlap_score(&face.face, region)))
            .filter(|(_, score)| *score >= REGION_MATCH_OVERLAP)
            .fold(None, |best: Option<(&ScriptedFace, f32)>, (face, score)| match best {
                Some((_, s)) if s >= score => best,
                _ => Some((face, score)),
            });

        Ok(best.and_then(|(face, _)| {
            face.sign.map(|class_index| ClassificationResult {
                hand_area: face.hand_area.unwrap_or(face.face),
                class_index,
                class_label: self
                    .labels
                    .get(class_index)
                    .cloned()
                    .unwrap_or_else(|| format!("class_{}", class_index)),
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"[
        { "faces": [
            { "face": { "x": 0, "y": 0, "width": 50, "height": 50 }, "sign": 5 },
            { "face": { "x": 100, "y": 0, "width": 50, "height": 50 },
              "sign": 2, "hand_area": { "x": 40, "y": 0, "width": 60, "height": 60 } }
        ] },
        { "faces": [ { "face": { "x": 2, "y": 2, "width": 50, "height": 50 } } ] },
        {}
    ]"#;

    fn frame(sequence: u32) -> VideoFrame {
        VideoFrame::blank(2, 2, 0, sequence)
    }

    #[test]
    fn test_parse_and_detect() {
        let script = AnnotationScript::from_json(SCRIPT).unwrap();
        assert_eq!(script.len(), 3);
        script.validate(&SignVocabulary::default()).unwrap();

        let (mut detector, _) = script.into_adapters(&SignVocabulary::default());
        assert_eq!(detector.detect(&frame(0), 10).unwrap().len(), 2);
        assert_eq!(detector.detect(&frame(1), 10).unwrap().len(), 1);
        assert!(detector.detect(&frame(2), 10).unwrap().is_empty());
        assert!(detector.detect(&frame(99), 10).unwrap().is_empty());
        assert_eq!(detector.calls(), 4);
    }

    #[test]
    fn test_classify_by_region() {
        let vocab = SignVocabulary::default();
        let (_, mut classifier) = AnnotationScript::from_json(SCRIPT)
            .unwrap()
            .into_adapters(&vocab);

        let trigger = classifier
            .classify(&frame(0), &BoundingBox::new(0.0, 0.0, 50.0, 50.0))
            .unwrap()
            .unwrap();
        assert_eq!(trigger.class_index, 5);
        assert_eq!(trigger.class_label, "5_front");

        let command = classifier
            .classify(&frame(0), &BoundingBox::new(102.0, 0.0, 50.0, 50.0))
            .unwrap()
            .unwrap();
        assert_eq!(command.class_index, 2);
        assert_eq!(command.hand_area, BoundingBox::new(40.0, 0.0, 60.0, 60.0));

        // Face without a sign, and a region matching no face.
        assert!(classifier
            .classify(&frame(1), &BoundingBox::new(2.0, 2.0, 50.0, 50.0))
            .unwrap()
            .is_none());
        assert!(classifier
            .classify(&frame(0), &BoundingBox::new(300.0, 300.0, 50.0, 50.0))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_sign_outside_vocabulary() {
        let script = AnnotationScript::new(vec![ScriptedFrame::single(
            BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            Some(9),
        )]);
        assert!(matches!(
            script.validate(&SignVocabulary::default()),
            Err(GestureError::Script(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotations.json");
        std::fs::write(&path, SCRIPT).unwrap();
        assert_eq!(AnnotationScript::from_path(&path).unwrap().len(), 3);

        assert!(AnnotationScript::from_path(dir.path().join("missing.json")).is_err());
        assert!(AnnotationScript::from_json("{ not json").is_err());
    }
}
