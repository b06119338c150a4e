//! Session controller
//!
//! Frame-synchronous state machine: each frame is detected, matched against
//! the current state, classified and folded into the session before the
//! next frame is read.
//!
//! ```text
//! IDLE --trigger selected--> SESSION_ACTIVE --window elapsed--> IDLE
//! ```
//!
//! Inside an active session, frames without faces or where the target is
//! lost are skipped without resetting the votes; only the window closes a
//! session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use camera_capture::{FrameSource, VideoFrame};
use metrics::counter;
use tracing::{debug, error, info, warn};

use crate::adapter::{FaceDetector, HandSignClassifier};
use crate::config::{SessionConfig, TimeBase};
use crate::geometry::BoundingBox;
use crate::session::{CommandSession, Decision, FrameRate, Vote};
use crate::sink::{CommandSink, EmittedCommand};
use crate::tracker::{BoxTracker, TrackOutcome};
use crate::trigger::TriggerSelector;
use crate::GestureError;

/// Controller state
#[derive(Debug, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Active(CommandSession),
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active(_))
    }

    pub fn session(&self) -> Option<&CommandSession> {
        match self {
            SessionState::Active(session) => Some(session),
            SessionState::Idle => None,
        }
    }
}

/// Why a frame contributed nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoFaces,
    TrackingLost,
    DetectorFailed,
    ClassifierFailed,
}

/// What happened to a single frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameEvent {
    /// Faces seen, none showing the trigger
    Idle,
    SessionStarted { target: BoundingBox },
    /// Target still showing the trigger
    Hold,
    /// Target tracked but showing no sign
    Abstain,
    Voted { class_index: usize },
    Skipped(SkipReason),
}

/// Per-frame result of [`SessionController::step`]
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// Decision of a session whose window elapsed before this frame
    pub closed: Option<Decision>,
    pub event: FrameEvent,
}

/// Running totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerStats {
    pub frames: u64,
    pub sessions_started: u64,
    pub commands_emitted: u64,
    pub commands_rejected: u64,
    pub sessions_closed_early: u64,
}

/// Why the capture loop ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Cancelled,
    EndOfStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub stats: ControllerStats,
    pub exit: ExitReason,
}

/// Owns the adapters, the sink and the single live session
pub struct SessionController<D, C, S> {
    config: SessionConfig,
    frame_rate: FrameRate,
    detector: D,
    classifier: C,
    sink: S,
    selector: TriggerSelector,
    tracker: BoxTracker,
    state: SessionState,
    stats: ControllerStats,
}

impl<D, C, S> SessionController<D, C, S>
where
    D: FaceDetector,
    C: HandSignClassifier,
    S: CommandSink,
{
    pub fn new(
        config: SessionConfig,
        frame_rate: FrameRate,
        detector: D,
        classifier: C,
        sink: S,
    ) -> Result<Self, GestureError> {
        config.validate()?;
        info!(
            "Session controller: window={}ms, fps={}, accept>{:.2} votes, detector={}, classifier={}",
            config.window_ms,
            frame_rate.fps(),
            frame_rate.acceptance_threshold(),
            detector.name(),
            classifier.name()
        );

        Ok(Self {
            selector: TriggerSelector::new(config.vocabulary.trigger_index),
            tracker: BoxTracker::new(config.min_track_overlap),
            config,
            frame_rate,
            detector,
            classifier,
            sink,
            state: SessionState::Idle,
            stats: ControllerStats::default(),
        })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn stats(&self) -> ControllerStats {
        self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Process one frame observed at time `now`
    pub fn step(&mut self, frame: &VideoFrame, now: Duration) -> FrameReport {
        counter!("gesture_frames_total").increment(1);
        self.stats.frames += 1;

        let mut closed = None;
        let state = match std::mem::take(&mut self.state) {
            SessionState::Active(session) if session.is_expired(now, self.config.window()) => {
                closed = Some(self.close(session, now));
                SessionState::Idle
            }
            state => state,
        };

        let (next, event) = match state {
            SessionState::Idle => self.on_idle(frame, now),
            SessionState::Active(session) => self.on_active(session, frame),
        };
        self.state = next;

        FrameReport { closed, event }
    }

    /// Read and process frames until cancelled or the source ends.
    ///
    /// `cancel` is polled once per frame. A source read failure ends the loop
    /// with an error. In every exit path a live session is closed early and
    /// its decision emitted as if the window had elapsed.
    pub fn run<F>(&mut self, source: &mut F, cancel: &AtomicBool) -> Result<RunSummary, GestureError>
    where
        F: FrameSource + ?Sized,
    {
        let epoch = Instant::now();
        info!(
            "Capture loop started on {} ({:?} clock)",
            source.name(),
            self.config.time_base
        );

        let mut now = Duration::ZERO;
        loop {
            if cancel.load(Ordering::SeqCst) {
                info!("Cancel requested");
                self.close_early("cancelled", now);
                return Ok(self.summary(ExitReason::Cancelled));
            }

            let frame = match source.read_frame() {
                Ok(frame) => frame,
                Err(e) if e.is_end_of_stream() => {
                    info!("Frame source {} exhausted", source.name());
                    self.close_early("end of stream", now);
                    return Ok(self.summary(ExitReason::EndOfStream));
                }
                Err(e) => {
                    error!("Can't receive frame from {}: {}", source.name(), e);
                    self.close_early("acquisition failure", now);
                    return Err(e.into());
                }
            };

            now = match self.config.time_base {
                TimeBase::Wall => epoch.elapsed(),
                TimeBase::Capture => Duration::from_nanos(frame.timestamp_ns),
            };
            self.step(&frame, now);
        }
    }

    fn on_idle(&mut self, frame: &VideoFrame, now: Duration) -> (SessionState, FrameEvent) {
        let faces = match self.detect(frame) {
            Ok(faces) if faces.is_empty() => {
                return (SessionState::Idle, FrameEvent::Skipped(SkipReason::NoFaces))
            }
            Ok(faces) => faces,
            Err(reason) => return (SessionState::Idle, FrameEvent::Skipped(reason)),
        };

        match self.selector.select(frame, &faces, &mut self.classifier) {
            Some(matched) => {
                info!(
                    "Trigger {} on face {:?}, collecting commands for {}ms",
                    matched.sign.class_label, matched.face, self.config.window_ms
                );
                counter!("gesture_sessions_started_total").increment(1);
                self.stats.sessions_started += 1;
                (
                    SessionState::Active(CommandSession::start(matched.face, now)),
                    FrameEvent::SessionStarted {
                        target: matched.face,
                    },
                )
            }
            None => (SessionState::Idle, FrameEvent::Idle),
        }
    }

    fn on_active(&mut self, mut session: CommandSession, frame: &VideoFrame) -> (SessionState, FrameEvent) {
        let faces = match self.detect(frame) {
            Ok(faces) if faces.is_empty() => {
                return (
                    SessionState::Active(session),
                    FrameEvent::Skipped(SkipReason::NoFaces),
                )
            }
            Ok(faces) => faces,
            Err(reason) => return (SessionState::Active(session), FrameEvent::Skipped(reason)),
        };

        let target = match self.tracker.track(session.target(), &faces) {
            TrackOutcome::Matched { target, .. } => target,
            TrackOutcome::Lost { best_score } => {
                debug!(
                    "Target {:?} lost in frame {} (best overlap {:?})",
                    session.target(),
                    frame.sequence,
                    best_score
                );
                counter!("gesture_tracking_lost_total").increment(1);
                return (
                    SessionState::Active(session),
                    FrameEvent::Skipped(SkipReason::TrackingLost),
                );
            }
        };
        session.retarget(target);

        let classification = match self.classifier.classify(frame, &target) {
            Ok(classification) => classification,
            Err(e) => {
                warn!("{} failed on frame {}: {}", self.classifier.name(), frame.sequence, e);
                return (
                    SessionState::Active(session),
                    FrameEvent::Skipped(SkipReason::ClassifierFailed),
                );
            }
        };

        let event = match session.ingest(classification.as_ref(), self.config.vocabulary.trigger_index) {
            Vote::Abstain => FrameEvent::Abstain,
            Vote::Hold => FrameEvent::Hold,
            Vote::Recorded(class_index) => FrameEvent::Voted { class_index },
        };
        (SessionState::Active(session), event)
    }

    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<BoundingBox>, SkipReason> {
        self.detector
            .detect(frame, self.config.detection_margin)
            .map_err(|e| {
                warn!("{} failed on frame {}: {}", self.detector.name(), frame.sequence, e);
                SkipReason::DetectorFailed
            })
    }

    fn close(&mut self, session: CommandSession, now: Duration) -> Decision {
        let elapsed = session.elapsed(now);
        let decision = session.finalize(self.frame_rate);

        let Some(index) = decision.command else {
            info!(
                "Session closed after {:?} without a command (winner {:?} with {} of {} votes, needed > {:.2})",
                elapsed, decision.winner, decision.winner_votes, decision.total_votes, decision.threshold
            );
            counter!("gesture_commands_rejected_total").increment(1);
            self.stats.commands_rejected += 1;
            return decision;
        };

        let label = self
            .config
            .vocabulary
            .command_label(index)
            .map(String::from)
            .unwrap_or_else(|| format!("command_{}", index));
        let command = EmittedCommand {
            index,
            label,
            votes: decision.winner_votes,
            total_votes: decision.total_votes,
            threshold: decision.threshold,
        };
        info!(
            "Session closed after {:?}: {} ({} of {} votes)",
            elapsed, command.label, command.votes, command.total_votes
        );

        match self.sink.emit(&command) {
            Ok(()) => {
                counter!("gesture_commands_emitted_total").increment(1);
                self.stats.commands_emitted += 1;
            }
            Err(e) => warn!("Failed to emit {}: {}", command.label, e),
        }
        decision
    }

    fn close_early(&mut self, reason: &str, now: Duration) {
        if let SessionState::Active(session) = std::mem::take(&mut self.state) {
            info!(
                "Closing live session early ({}) with {} votes",
                reason,
                session.collected_commands().len()
            );
            self.stats.sessions_closed_early += 1;
            self.close(session, now);
        }
    }

    fn summary(&self, exit: ExitReason) -> RunSummary {
        RunSummary {
            stats: self.stats,
            exit,
        }
    }
}
