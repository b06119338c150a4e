//! Single-target box tracking by overlap
//!
//! No appearance model: the continuation of a target is simply the candidate
//! box that overlaps it most, provided the overlap clears the match policy.

use tracing::debug;

use crate::geometry::{overlap_score, BoundingBox};

/// Result of matching a tracked box against a frame's candidates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackOutcome {
    /// Replacement target and its overlap with the previous one
    Matched { target: BoundingBox, score: f32 },
    /// No candidate overlapped enough; `best_score` is `None` when there were no candidates
    Lost { best_score: Option<f32> },
}

impl TrackOutcome {
    pub fn target(&self) -> Option<BoundingBox> {
        match self {
            TrackOutcome::Matched { target, .. } => Some(*target),
            TrackOutcome::Lost { .. } => None,
        }
    }
}

/// Overlap tracker
#[derive(Debug, Clone, Copy)]
pub struct BoxTracker {
    min_overlap: f32,
}

impl Default for BoxTracker {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl BoxTracker {
    /// A match requires an overlap strictly greater than `min_overlap`
    pub fn new(min_overlap: f32) -> Self {
        Self { min_overlap }
    }

    /// Best continuation of `previous` among `candidates`.
    ///
    /// Ties go to the earliest candidate, so the result is a pure function of
    /// the inputs.
    pub fn track(&self, previous: &BoundingBox, candidates: &[BoundingBox]) -> TrackOutcome {
        let mut best: Option<(BoundingBox, f32)> = None;
        for candidate in candidates {
            let score = overlap_score(previous, candidate);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((*candidate, score));
            }
        }

        match best {
            Some((target, score)) if score > self.min_overlap => {
                debug!("Tracked {:?} -> {:?} (overlap {:.3})", previous, target, score);
                TrackOutcome::Matched { target, score }
            }
            Some((_, score)) => TrackOutcome::Lost {
                best_score: Some(score),
            },
            None => TrackOutcome::Lost { best_score: None },
        }
    }
}
