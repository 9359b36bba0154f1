//! Multi-round session: sequencing, transitions and aggregation.
//!
//! ```text
//! NotStarted ─start─▶ Playing(1) ─▶ RoundTransition(2, 3) ─▶ Playing(2) ─▶ … ─▶ Complete
//! ```
//!
//! The aggregator owns the [`RoundController`] and forwards the 1 Hz timer,
//! the lifecycle tick and gaze points to it while a round is playing. A
//! finished [`RoundResult`] is moved into the session; the transition
//! countdown runs on the same 1 Hz timer. No transition follows the last round.

use crate::{
    round::{RoundController, RoundResult},
    types::{Millis, Position, Target, TargetId},
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub total_rounds: u32,
    /// Timer ticks between two rounds
    pub transition_ticks: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            total_rounds: 3,
            transition_ticks: 3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    NotStarted,
    Playing { round: u32 },
    RoundTransition { next_round: u32, remaining: u32 },
    Complete,
    /// Ended by [`SessionAggregator::stop`] before completion
    Stopped,
}

// ---------------------------------------------------------------------------
// SessionResult
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub total_score: u32,
    pub total_targets_popped: u32,
    pub average_accuracy: f64,
    pub average_score_per_round: f64,
    /// 1-based; earliest round wins ties. 0 for an empty session.
    pub best_round_index: usize,
    /// 1-based; earliest round wins ties. 0 for an empty session.
    pub worst_round_index: usize,
    pub total_game_time_s: u32,
    pub rounds: Vec<RoundResult>,
}

impl SessionResult {
    pub fn from_rounds(rounds: Vec<RoundResult>) -> Self {
        let total_score: u32 = rounds.iter().map(|r| r.score).sum();
        let total_targets_popped: u32 = rounds.iter().map(|r| r.targets_popped).sum();
        let total_game_time_s: u32 = rounds.iter().map(|r| r.game_time_s).sum();

        let (average_accuracy, average_score_per_round) = if rounds.is_empty() {
            (0.0, 0.0)
        } else {
            let n = rounds.len() as f64;
            (
                rounds.iter().map(|r| r.accuracy).sum::<f64>() / n,
                total_score as f64 / n,
            )
        };

        // Only a strictly better/worse score replaces the running pick.
        let mut best = 0usize;
        let mut worst = 0usize;
        for (i, r) in rounds.iter().enumerate() {
            if r.score > rounds[best].score {
                best = i;
            }
            if r.score < rounds[worst].score {
                worst = i;
            }
        }
        let (best_round_index, worst_round_index) = if rounds.is_empty() {
            (0, 0)
        } else {
            (best + 1, worst + 1)
        };

        Self {
            total_score,
            total_targets_popped,
            average_accuracy,
            average_score_per_round,
            best_round_index,
            worst_round_index,
            total_game_time_s,
            rounds,
        }
    }

    /// Popped count per round, in round order.
    pub fn round_counts(&self) -> Vec<u32> {
        self.rounds.iter().map(|r| r.targets_popped).collect()
    }
}

// ---------------------------------------------------------------------------
// SessionAggregator
// ---------------------------------------------------------------------------

pub struct SessionAggregator {
    pub config: SessionConfig,
    round: RoundController,
    phase: SessionPhase,
    rounds: Vec<RoundResult>,
    result: Option<SessionResult>,
}

impl SessionAggregator {
    pub fn new(config: SessionConfig, round: RoundController) -> Self {
        Self {
            config,
            round,
            phase: SessionPhase::NotStarted,
            rounds: Vec::new(),
            result: None,
        }
    }

    pub fn start(&mut self, now: Millis) {
        self.rounds.clear();
        self.result = None;
        info!(rounds = self.config.total_rounds, "session start");
        self.begin_round(1, now);
    }

    fn begin_round(&mut self, round: u32, now: Millis) {
        self.phase = SessionPhase::Playing { round };
        self.round.start_round(round, now);
    }

    /// 1 Hz timer. Returns the session result on the tick that completes it.
    pub fn on_timer_tick(&mut self, now: Millis) -> Option<SessionResult> {
        match self.phase {
            SessionPhase::Playing { round } => {
                let finished = self.round.on_timer_tick(now)?;
                self.rounds.push(finished);
                if round < self.config.total_rounds {
                    let next_round = round + 1;
                    if self.config.transition_ticks == 0 {
                        self.begin_round(next_round, now);
                    } else {
                        self.phase = SessionPhase::RoundTransition {
                            next_round,
                            remaining: self.config.transition_ticks,
                        };
                    }
                    None
                } else {
                    let result = SessionResult::from_rounds(self.rounds.clone());
                    info!(
                        total_score = result.total_score,
                        best = result.best_round_index,
                        worst = result.worst_round_index,
                        "session complete"
                    );
                    self.result = Some(result.clone());
                    self.phase = SessionPhase::Complete;
                    Some(result)
                }
            }
            SessionPhase::RoundTransition {
                next_round,
                remaining,
            } => {
                if remaining <= 1 {
                    self.begin_round(next_round, now);
                } else {
                    self.phase = SessionPhase::RoundTransition {
                        next_round,
                        remaining: remaining - 1,
                    };
                }
                None
            }
            SessionPhase::NotStarted | SessionPhase::Complete | SessionPhase::Stopped => None,
        }
    }

    pub fn on_lifecycle_tick(&mut self, now: Millis) {
        if let SessionPhase::Playing { .. } = self.phase {
            self.round.on_lifecycle_tick(now);
        }
    }

    pub fn on_gaze(&mut self, gaze: Position, now: Millis) -> Vec<TargetId> {
        match self.phase {
            SessionPhase::Playing { .. } => self.round.on_gaze(gaze, now),
            _ => Vec::new(),
        }
    }

    /// Abandon the session. Completed rounds stay readable.
    pub fn stop(&mut self) {
        self.round.stop();
        if self.phase != SessionPhase::Complete {
            self.phase = SessionPhase::Stopped;
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, SessionPhase::Complete | SessionPhase::Stopped)
    }

    /// Results of the rounds finished so far.
    pub fn rounds(&self) -> &[RoundResult] {
        &self.rounds
    }

    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    pub fn round(&self) -> &RoundController {
        &self.round
    }

    pub fn targets(&self) -> &[Target] {
        self.round.targets()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
