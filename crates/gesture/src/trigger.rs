//! Trigger selection
//!
//! Picks the face to lock onto: the first candidate, in detector order,
//! whose hand sign is the trigger class. Confidences are not compared across
//! candidates, so with several people showing the trigger at once the
//! detector's ordering decides.

use camera_capture::VideoFrame;
use tracing::{debug, warn};

use crate::adapter::{ClassificationResult, HandSignClassifier};
use crate::geometry::BoundingBox;

/// Face chosen as the command target, with the sign that selected it
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerMatch {
    pub face: BoundingBox,
    pub sign: ClassificationResult,
}

/// First-match trigger selector
#[derive(Debug, Clone, Copy)]
pub struct TriggerSelector {
    trigger_index: usize,
}

impl TriggerSelector {
    pub fn new(trigger_index: usize) -> Self {
        Self { trigger_index }
    }

    /// Classify candidates in order and return the first showing the trigger.
    ///
    /// The classifier is called at most once per candidate and not at all for
    /// an empty candidate list. A classifier failure on one candidate only
    /// skips that candidate.
    pub fn select<C>(
        &self,
        frame: &VideoFrame,
        candidates: &[BoundingBox],
        classifier: &mut C,
    ) -> Option<TriggerMatch>
    where
        C: HandSignClassifier + ?Sized,
    {
        for face in candidates {
            match classifier.classify(frame, face) {
                Ok(Some(sign)) if sign.class_index == self.trigger_index => {
                    debug!("Trigger sign at {:?} (frame {})", face, frame.sequence);
                    return Some(TriggerMatch { face: *face, sign });
                }
                Ok(_) => {}
                Err(e) => warn!("{} failed on candidate {:?}: {}", classifier.name(), face, e),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GestureError;

    /// Classifier answering from a fixed list, matched by exact box
    struct FixedClassifier {
        answers: Vec<(BoundingBox, Result<usize, ()>)>,
        calls: usize,
    }

    impl HandSignClassifier for FixedClassifier {
        fn name(&self) -> &str {
            "fixed"
        }

        fn classify(
            &mut self,
            _frame: &VideoFrame,
            region: &BoundingBox,
        ) -> Result<Option<ClassificationResult>, GestureError> {
            self.calls += 1;
            match self.answers.iter().find(|(b, _)| b == region) {
                Some((b, Ok(class_index))) => Ok(Some(ClassificationResult {
                    hand_area: *b,
                    class_index: *class_index,
                    class_label: format!("class_{}", class_index),
                })),
                Some((_, Err(()))) => Err(GestureError::Inference("boom".into())),
                None => Ok(None),
            }
        }
    }

    fn face(x: f32) -> BoundingBox {
        BoundingBox::new(x, 50.0, 40.0, 40.0)
    }

    fn frame() -> VideoFrame {
        VideoFrame::blank(4, 4, 0, 0)
    }

    #[test]
    fn test_empty_candidates() {
        let mut classifier = FixedClassifier { answers: vec![], calls: 0 };
        let selector = TriggerSelector::new(5);

        assert!(selector.select(&frame(), &[], &mut classifier).is_none());
        assert_eq!(classifier.calls, 0);
    }

    #[test]
    fn test_first_match_wins() {
        let mut classifier = FixedClassifier {
            answers: vec![(face(0.0), Ok(1)), (face(100.0), Ok(5)), (face(200.0), Ok(5))],
            calls: 0,
        };
        let selector = TriggerSelector::new(5);
        let candidates = [face(0.0), face(100.0), face(200.0)];

        let selected = selector.select(&frame(), &candidates, &mut classifier).unwrap();
        assert_eq!(selected.face, face(100.0));
        assert_eq!(selected.sign.class_index, 5);
        // Stops after the first trigger.
        assert_eq!(classifier.calls, 2);
    }

    #[test]
    fn test_order_decides_between_triggers() {
        let mut classifier = FixedClassifier {
            answers: vec![(face(100.0), Ok(5)), (face(200.0), Ok(5))],
            calls: 0,
        };
        let selector = TriggerSelector::new(5);

        let selected = selector
            .select(&frame(), &[face(200.0), face(100.0)], &mut classifier)
            .unwrap();
        assert_eq!(selected.face, face(200.0));
    }

    #[test]
    fn test_no_trigger_and_failures_are_skipped() {
        let mut classifier = FixedClassifier {
            answers: vec![(face(0.0), Err(())), (face(100.0), Ok(2))],
            calls: 0,
        };
        let selector = TriggerSelector::new(5);
        let candidates = [face(0.0), face(100.0), face(300.0)];

        assert!(selector.select(&frame(), &candidates, &mut classifier).is_none());
        assert_eq!(classifier.calls, 3);

        classifier.answers.push((face(300.0), Ok(5)));
        let selected = selector.select(&frame(), &candidates, &mut classifier).unwrap();
        assert_eq!(selected.face, face(300.0));
    }
}
