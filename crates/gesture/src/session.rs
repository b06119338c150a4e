//! Command session: windowed vote collection and majority decision

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::adapter::ClassificationResult;
use crate::geometry::BoundingBox;
use crate::GestureError;

/// Nominal frame rate of the source, validated positive and finite
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct FrameRate(f64);

impl FrameRate {
    pub fn new(fps: f64) -> Result<Self, GestureError> {
        if fps.is_finite() && fps > 0.0 {
            Ok(Self(fps))
        } else {
            Err(GestureError::InvalidFrameRate(fps))
        }
    }

    /// Rate reported by a frame source; a source that reports none is rejected
    pub fn from_nominal(fps: Option<f64>) -> Result<Self, GestureError> {
        fps.ok_or(GestureError::FrameRateUnavailable).and_then(Self::new)
    }

    pub fn fps(&self) -> f64 {
        self.0
    }

    /// A decision needs strictly more winning votes than this.
    ///
    /// One third of a second's worth of frames: a slower camera needs fewer
    /// absolute votes for the same amount of evidence.
    pub fn acceptance_threshold(&self) -> f64 {
        self.0 / 3.0
    }
}

/// What a frame contributed to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    /// No sign recognised
    Abstain,
    /// Trigger still showing; keeps the session alive without voting
    Hold,
    /// Command class appended to the tally
    Recorded(usize),
}

/// Outcome of a closed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Accepted command class, if the winner cleared the threshold
    pub command: Option<usize>,
    /// Most frequent class, accepted or not
    pub winner: Option<usize>,
    /// Votes for `winner`
    pub winner_votes: usize,
    /// All command votes collected
    pub total_votes: usize,
    /// Frames that showed the trigger while the window was open
    pub hold_frames: u32,
    /// Vote count `winner_votes` had to exceed
    pub threshold: f64,
}

impl Decision {
    pub fn is_accepted(&self) -> bool {
        self.command.is_some()
    }
}

/// One live command window for a single tracked target
#[derive(Debug, Clone)]
pub struct CommandSession {
    target: BoundingBox,
    start_time: Duration,
    collected_commands: Vec<usize>,
    hold_frames: u32,
}

impl CommandSession {
    /// Open a window for `target` at time `now`
    pub fn start(target: BoundingBox, now: Duration) -> Self {
        Self {
            target,
            start_time: now,
            collected_commands: Vec::new(),
            hold_frames: 0,
        }
    }

    pub fn target(&self) -> &BoundingBox {
        &self.target
    }

    pub fn start_time(&self) -> Duration {
        self.start_time
    }

    pub fn collected_commands(&self) -> &[usize] {
        &self.collected_commands
    }

    pub fn hold_frames(&self) -> u32 {
        self.hold_frames
    }

    /// Replace the tracked target with its continuation in a newer frame
    pub fn retarget(&mut self, target: BoundingBox) {
        self.target = target;
    }

    /// Count one frame's classification towards the vote
    pub fn ingest(&mut self, classification: Option<&ClassificationResult>, trigger_index: usize) -> Vote {
        match classification {
            None => Vote::Abstain,
            Some(result) if result.class_index == trigger_index => {
                self.hold_frames += 1;
                Vote::Hold
            }
            Some(result) => {
                self.collected_commands.push(result.class_index);
                debug!(
                    "Vote {} ({}), {} collected",
                    result.class_index,
                    result.class_label,
                    self.collected_commands.len()
                );
                Vote::Recorded(result.class_index)
            }
        }
    }

    /// Time since the window opened; zero if `now` predates the start
    pub fn elapsed(&self, now: Duration) -> Duration {
        now.saturating_sub(self.start_time)
    }

    pub fn is_expired(&self, now: Duration, window: Duration) -> bool {
        self.elapsed(now) >= window
    }

    /// Close the window and decide.
    ///
    /// The winner is the most frequent class (first-collected on ties) and is
    /// accepted only if its count is strictly above `frame_rate / 3`.
    pub fn finalize(self, frame_rate: FrameRate) -> Decision {
        let threshold = frame_rate.acceptance_threshold();
        let (winner, winner_votes) = match majority(&self.collected_commands) {
            Some((class, count)) => (Some(class), count),
            None => (None, 0),
        };
        let command = winner.filter(|_| winner_votes as f64 > threshold);

        Decision {
            command,
            winner,
            winner_votes,
            total_votes: self.collected_commands.len(),
            hold_frames: self.hold_frames,
            threshold,
        }
    }
}

/// Most frequent value and its count.
///
/// Among equally frequent values the one that appears first in `values` wins.
pub fn majority(values: &[usize]) -> Option<(usize, usize)> {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for &v in values {
        *counts.entry(v).or_insert(0) += 1;
    }

    let mut best: Option<(usize, usize)> = None;
    for &v in values {
        let count = counts[&v];
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((v, count));
        }
    }
    best
}
