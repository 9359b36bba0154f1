//! One timed round as an explicit state machine.
//!
//! ```text
//! Idle ──start_round──▶ Countdown(2) ──1 Hz──▶ Active(15) ──1 Hz──▶ Done
//! ```
//!
//! Every transition is driven by [`RoundController::on_timer_tick`], the 1 Hz
//! authoritative clock. There is no early exit: a round always spends exactly
//! `duration_s` timer ticks in `Active`, whatever the hit pattern.
//!
//! While `Active`:
//! - [`RoundController::on_gaze`] hit-tests a gaze point, pops, scores and
//!   spawns the next target;
//! - [`RoundController::on_lifecycle_tick`] (50 ms) expires targets and, every
//!   `ensure_target_interval_ms`, re-spawns if no live target exists.
//!
//! Outside `Active` all three entry points are no-ops, so a tick delivered
//! after the round ended cannot score, spawn or expire anything.

use crate::{
    collision::{CollisionConfig, CollisionDetector},
    error::GameError,
    metrics::{self, RoundStatistics},
    spawner::{SpawnerConfig, TargetSpawner},
    types::{Millis, Position, Target, TargetId, TargetStat},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundConfig {
    /// Timer ticks spent in `Countdown` before play starts
    pub countdown_ticks: u32,
    /// Timer ticks (seconds) of active play
    pub duration_s: u32,
    /// Cadence of the fallback "ensure a target exists" check
    pub ensure_target_interval_ms: Millis,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            countdown_ticks: 2,
            duration_s: 15,
            ensure_target_interval_ms: 8_000,
        }
    }
}

// ---------------------------------------------------------------------------
// State & result
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    Idle,
    Countdown { remaining: u32 },
    Active { remaining_s: u32 },
    Done,
}

/// Frozen outcome of one round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    /// 1-based
    pub round_number: u32,
    pub score: u32,
    pub targets_popped: u32,
    pub targets_spawned: u32,
    /// Percent of spawned targets that were popped
    pub accuracy: f64,
    pub game_time_s: u32,
    pub duration_ms: Millis,
    pub target_stats: Vec<TargetStat>,
}

impl RoundResult {
    pub fn statistics(&self) -> RoundStatistics {
        RoundStatistics::from_stats(&self.target_stats, self.game_time_s as f64)
    }
}

// ---------------------------------------------------------------------------
// RoundController
// ---------------------------------------------------------------------------

pub struct RoundController {
    pub config: RoundConfig,
    spawner: TargetSpawner,
    collision: CollisionDetector,
    phase: RoundPhase,
    round_number: u32,
    targets: Vec<Target>,
    stats: Vec<TargetStat>,
    score: u32,
    popped: u32,
    last_hit: Option<Millis>,
    last_popped: Option<Position>,
    next_ensure_at: Millis,
}

impl RoundController {
    pub fn new(
        config: RoundConfig,
        spawner_config: SpawnerConfig,
        collision_config: CollisionConfig,
        seed: u64,
    ) -> Self {
        Self {
            config,
            spawner: TargetSpawner::new(spawner_config, seed),
            collision: CollisionDetector::new(collision_config),
            phase: RoundPhase::Idle,
            round_number: 0,
            targets: Vec::new(),
            stats: Vec::new(),
            score: 0,
            popped: 0,
            last_hit: None,
            last_popped: None,
            next_ensure_at: 0,
        }
    }

    /// Reset all per-round state and enter `Countdown`.
    pub fn start_round(&mut self, round_number: u32, now: Millis) {
        self.round_number = round_number;
        self.targets.clear();
        self.stats.clear();
        self.score = 0;
        self.popped = 0;
        self.last_hit = None;
        self.last_popped = None;
        info!(round = round_number, "round countdown");
        if self.config.countdown_ticks == 0 {
            self.begin_active(now);
        } else {
            self.phase = RoundPhase::Countdown {
                remaining: self.config.countdown_ticks,
            };
        }
    }

    fn begin_active(&mut self, now: Millis) {
        self.phase = RoundPhase::Active {
            remaining_s: self.config.duration_s,
        };
        self.next_ensure_at = now + self.config.ensure_target_interval_ms;
        info!(round = self.round_number, "round active");
        self.spawn_next(now);
    }

    /// 1 Hz timer. Returns the result on the tick that ends the round.
    pub fn on_timer_tick(&mut self, now: Millis) -> Option<RoundResult> {
        match self.phase {
            RoundPhase::Countdown { remaining } => {
                if remaining <= 1 {
                    self.begin_active(now);
                } else {
                    self.phase = RoundPhase::Countdown {
                        remaining: remaining - 1,
                    };
                }
                None
            }
            RoundPhase::Active { remaining_s } => {
                if remaining_s <= 1 {
                    Some(self.finish())
                } else {
                    self.phase = RoundPhase::Active {
                        remaining_s: remaining_s - 1,
                    };
                    None
                }
            }
            RoundPhase::Idle | RoundPhase::Done => None,
        }
    }

    /// 50 ms lifecycle tick: expiry, pop animations, fallback spawn.
    pub fn on_lifecycle_tick(&mut self, now: Millis) {
        if !self.is_active() {
            return;
        }
        let removed = self.spawner.tick(&mut self.targets, now);
        if removed > 0 {
            debug!(round = self.round_number, removed, "targets removed");
        }
        if now >= self.next_ensure_at {
            self.next_ensure_at = now + self.config.ensure_target_interval_ms;
            if self.targets.iter().all(|t| t.is_popping()) {
                debug!(round = self.round_number, "no live target; re-spawning");
                self.spawn_next(now);
            }
        }
    }

    /// Hit-test `gaze` and apply every hit. Returns the popped target ids.
    pub fn on_gaze(&mut self, gaze: Position, now: Millis) -> Vec<TargetId> {
        if !self.is_active() {
            return Vec::new();
        }
        let outcome = self.collision.check(gaze, &self.targets, now, self.last_hit);
        self.last_hit = outcome.last_hit_time;
        if !outcome.is_hit() {
            return Vec::new();
        }

        let mut popped = Vec::with_capacity(outcome.hits.len());
        for hit in &outcome.hits {
            let Some(target) = self.targets.iter_mut().find(|t| t.id == hit.id) else {
                continue;
            };
            if !target.mark_popping(now) {
                continue;
            }
            self.last_popped = Some(target.position);
            if let Some(stat) = self.stats.iter_mut().find(|s| s.id == hit.id) {
                stat.record_pop(now, hit.distance);
            }
            self.score += 1;
            self.popped += 1;
            debug!(round = self.round_number, target = %hit.id, distance = hit.distance, "pop");
            popped.push(hit.id);
        }
        if !popped.is_empty() {
            self.spawn_next(now);
        }
        popped
    }

    /// Freeze the round without producing a result. Later ticks are ignored.
    pub fn stop(&mut self) {
        if self.phase != RoundPhase::Done {
            info!(round = self.round_number, "round stopped");
        }
        self.phase = RoundPhase::Done;
    }

    fn spawn_next(&mut self, now: Millis) {
        let Some(outcome) = self.spawner.spawn(&self.targets, self.last_popped, now) else {
            return;
        };
        if !outcome.constraint_met {
            let err = GameError::SpawnConstraintUnsatisfiable {
                attempts: outcome.attempts,
            };
            debug!(round = self.round_number, %err, "using last spawn candidate");
        }
        self.stats.push(TargetStat::spawned(&outcome.target));
        self.targets.push(outcome.target);
    }

    fn finish(&mut self) -> RoundResult {
        self.phase = RoundPhase::Done;
        self.targets.clear();
        let spawned = self.stats.len();
        let result = RoundResult {
            round_number: self.round_number,
            score: self.score,
            targets_popped: self.popped,
            targets_spawned: spawned as u32,
            accuracy: metrics::accuracy(self.popped as usize, spawned),
            game_time_s: self.config.duration_s,
            duration_ms: self.config.duration_s as Millis * 1_000,
            target_stats: std::mem::take(&mut self.stats),
        };
        info!(
            round = result.round_number,
            score = result.score,
            spawned = result.targets_spawned,
            accuracy = result.accuracy,
            "round done"
        );
        result
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, RoundPhase::Active { .. })
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn target_stats(&self) -> &[TargetStat] {
        &self.stats
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    /// Spawns that could not honour the min-distance rule, over all rounds.
    pub fn spawn_fallbacks(&self) -> u64 {
        self.spawner.fallback_count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn controller() -> RoundController {
        RoundController::new(
            RoundConfig::default(),
            SpawnerConfig::default(),
            CollisionConfig::default(),
            11,
        )
    }

    /// Start round 1 at t=0 and run the countdown; play starts at t=2000.
    fn started() -> RoundController {
        let mut rc = controller();
        rc.start_round(1, 0);
        assert_eq!(rc.phase(), RoundPhase::Countdown { remaining: 2 });
        assert!(rc.on_timer_tick(1_000).is_none());
        assert!(rc.on_timer_tick(2_000).is_none());
        assert_eq!(rc.phase(), RoundPhase::Active { remaining_s: 15 });
        rc
    }

    fn live(rc: &RoundController) -> Target {
        rc.targets()
            .iter()
            .find(|t| !t.is_popping())
            .cloned()
            .unwrap()
    }

    #[test]
    fn countdown_then_first_spawn() {
        let rc = started();
        assert_eq!(rc.targets().len(), 1);
        assert_eq!(rc.target_stats().len(), 1);
        assert_eq!(rc.targets()[0].created_at, 2_000);
    }

    #[test]
    fn gaze_is_ignored_before_active() {
        let mut rc = controller();
        rc.start_round(1, 0);
        assert!(rc.on_gaze(Position::new(960.0, 540.0), 500).is_empty());
        assert!(rc.targets().is_empty());
    }

    #[test]
    fn hit_scores_and_respawns() {
        let mut rc = started();
        let first = live(&rc);
        let popped = rc.on_gaze(first.position, 2_500);
        assert_eq!(popped, vec![first.id]);
        assert_eq!(rc.score(), 1);

        let next = live(&rc);
        assert_ne!(next.id, first.id);
        assert!(nalgebra::distance(&next.position, &first.position) >= 300.0);
        let stat = &rc.target_stats()[0];
        assert_eq!(stat.time_to_pop_ms, Some(500));
        assert_eq!(stat.miss_distance, Some(0.0));
    }

    #[test]
    fn debounce_blocks_immediate_second_pop() {
        let mut rc = started();
        let first = live(&rc);
        rc.on_gaze(first.position, 2_500);
        let next = live(&rc);
        assert!(rc.on_gaze(next.position, 2_520).is_empty());
        assert_eq!(rc.on_gaze(next.position, 2_550), vec![next.id]);
        assert_eq!(rc.score(), 2);
    }

    #[test]
    fn round_lasts_exactly_duration_ticks() {
        let mut rc = started();
        let mut now = 2_000;
        for tick in 1..15 {
            now += 1_000;
            // Pop everything in sight to show hits never shorten the round
            let t = live(&rc);
            rc.on_gaze(t.position, now - 500);
            assert!(rc.on_timer_tick(now).is_none(), "ended early at tick {tick}");
            assert!(rc.is_active());
        }
        let result = rc.on_timer_tick(now + 1_000).unwrap();
        assert_eq!(rc.phase(), RoundPhase::Done);
        assert_eq!(result.game_time_s, 15);
        assert_eq!(result.duration_ms, 15_000);
        assert_eq!(result.round_number, 1);
        assert!(rc.targets().is_empty());
    }

    #[test]
    fn accuracy_counts_spawned_targets() {
        let mut rc = started();
        // Pop three targets
        let mut now = 2_100;
        for _ in 0..3 {
            let t = live(&rc);
            rc.on_gaze(t.position, now);
            now += 100;
        }
        // The fourth expires unpopped and the fifth is spawned by the fallback
        // check; neither is hit.
        let fourth = live(&rc);
        rc.spawner.config.max_age_ms = 1_000;
        let mut t = now;
        while rc.target_stats().len() < 5 {
            t += 50;
            rc.on_lifecycle_tick(t);
        }
        assert!(rc.targets().iter().all(|b| b.id != fourth.id));

        let mut result = None;
        for s in 1..=15 {
            result = rc.on_timer_tick(2_000 + s * 1_000);
        }
        let result = result.unwrap();
        assert_eq!(result.targets_spawned, 5);
        assert_eq!(result.targets_popped, 3);
        assert_abs_diff_eq!(result.accuracy, 60.0, epsilon = 1e-12);
        assert_eq!(result.statistics().targets_popped, 3);
    }

    #[test]
    fn zero_hit_round_is_valid() {
        let mut rc = started();
        let mut result = None;
        for s in 1..=15 {
            result = rc.on_timer_tick(2_000 + s * 1_000);
        }
        let result = result.unwrap();
        assert_eq!(result.score, 0);
        assert_eq!(result.accuracy, 0.0);
        assert_eq!(result.targets_spawned, 1);
    }

    #[test]
    fn nothing_changes_after_stop() {
        let mut rc = started();
        let t = live(&rc);
        rc.stop();
        let before: Vec<Target> = rc.targets().to_vec();

        assert!(rc.on_gaze(t.position, 3_000).is_empty());
        for i in 0..400 {
            rc.on_lifecycle_tick(3_000 + i * 50);
        }
        for s in 0..20 {
            assert!(rc.on_timer_tick(4_000 + s * 1_000).is_none());
        }
        assert_eq!(rc.score(), 0);
        assert_eq!(rc.targets(), before.as_slice());
        assert_eq!(rc.phase(), RoundPhase::Done);
    }

    #[test]
    fn ensure_check_respawns_after_expiry() {
        let mut rc = started();
        rc.spawner.config.max_age_ms = 100;
        rc.on_lifecycle_tick(2_200);
        assert!(rc.targets().is_empty());
        // Not due yet
        rc.on_lifecycle_tick(9_950);
        assert!(rc.targets().is_empty());
        rc.on_lifecycle_tick(10_000);
        assert_eq!(rc.targets().len(), 1);
        assert_eq!(rc.target_stats().len(), 2);
    }

    #[test]
    fn start_round_resets_state() {
        let mut rc = started();
        let t = live(&rc);
        rc.on_gaze(t.position, 2_100);
        rc.stop();
        rc.start_round(2, 20_000);
        assert_eq!(rc.score(), 0);
        assert!(rc.targets().is_empty());
        assert!(rc.target_stats().is_empty());
        assert_eq!(rc.round_number(), 2);
    }
}
