//! Target lifecycle: spawn placement, expiry, pop animation.
//!
//! # Policy
//! - **Single live target**: a spawn is refused while any non-popping target
//!   exists. Popping targets do not count.
//! - **Placement**: uniform inside the play area inset by `radius + margin`.
//!   When the last popped position is known, up to `max_attempts` candidates
//!   are drawn to find one at least `min_distance` away; if none qualifies the
//!   last candidate is used anyway and the fallback is counted.
//! - **Expiry**: an unpopped target older than `max_age_ms` is removed.
//! - **Pop animation**: a popping target is removed `pop_duration_ms` after
//!   its pop started.
//!
//! The spawner never owns the live set; callers pass it in. [`TargetSpawner::tick`]
//! is meant to run on a steady logical cadence (50 ms), independent of frames.

use crate::types::{BalloonColor, Millis, Position, Target, TargetId, PALETTE};
use gaze_sensor::PlayArea;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Placement and lifetime policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    pub play_area: PlayArea,
    pub target_radius: f64,
    /// Extra inset beyond the radius so targets stay fully visible
    pub margin: f64,
    /// Minimum centre distance from the last popped target
    pub min_distance: f64,
    pub max_attempts: u32,
    pub max_age_ms: Millis,
    pub pop_duration_ms: Millis,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            play_area: PlayArea::default(),
            target_radius: 50.0,
            margin: 25.0,
            min_distance: 300.0,
            max_attempts: 50,
            max_age_ms: 15_000,
            pop_duration_ms: 1_000,
        }
    }
}

/// A freshly placed target plus how the placement went.
#[derive(Clone, Debug)]
pub struct SpawnOutcome {
    pub target: Target,
    /// Candidates drawn
    pub attempts: u32,
    /// False when the min-distance search was exhausted
    pub constraint_met: bool,
}

pub struct TargetSpawner {
    pub config: SpawnerConfig,
    rng: ChaCha8Rng,
    next_id: u64,
    fallbacks: u64,
}

impl TargetSpawner {
    pub fn new(config: SpawnerConfig, seed: u64) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            next_id: 0,
            fallbacks: 0,
        }
    }

    fn next_target_id(&mut self) -> TargetId {
        let id = TargetId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Spawnable rectangle `(min, max)`. Collapses to the centre line on an
    /// axis too small to fit a target.
    pub fn safe_bounds(&self) -> (Position, Position) {
        let inset = self.config.target_radius + self.config.margin;
        let axis = |extent: f64| {
            let (lo, hi) = (inset, extent - inset);
            if hi < lo {
                (extent / 2.0, extent / 2.0)
            } else {
                (lo, hi)
            }
        };
        let (x0, x1) = axis(self.config.play_area.width);
        let (y0, y1) = axis(self.config.play_area.height);
        (Position::new(x0, y0), Position::new(x1, y1))
    }

    /// Place a new target unless a non-popping one is already live.
    pub fn spawn(
        &mut self,
        existing: &[Target],
        last_popped: Option<Position>,
        now: Millis,
    ) -> Option<SpawnOutcome> {
        if existing.iter().any(|t| !t.is_popping()) {
            return None;
        }

        let (lo, hi) = self.safe_bounds();
        let min_distance = self.config.min_distance;
        let mut attempts = 0u32;
        let mut constraint_met;
        let mut candidate;
        loop {
            candidate = Position::new(
                self.rng.gen::<f64>() * (hi.x - lo.x) + lo.x,
                self.rng.gen::<f64>() * (hi.y - lo.y) + lo.y,
            );
            attempts += 1;
            constraint_met = match last_popped {
                Some(prev) => nalgebra::distance(&candidate, &prev) >= min_distance,
                None => true,
            };
            if constraint_met || attempts >= self.config.max_attempts {
                break;
            }
        }

        if !constraint_met {
            self.fallbacks += 1;
        }

        let color = BalloonColor(self.rng.gen_range(0..PALETTE.len()) as u8);
        let target = Target {
            id: self.next_target_id(),
            position: candidate,
            radius: self.config.target_radius,
            color,
            created_at: now,
            pop_started_at: None,
        };
        Some(SpawnOutcome {
            target,
            attempts,
            constraint_met,
        })
    }

    /// Drop expired and fully popped targets. Returns how many were removed.
    pub fn tick(&self, targets: &mut Vec<Target>, now: Millis) -> usize {
        let before = targets.len();
        let (max_age, pop_duration) = (self.config.max_age_ms, self.config.pop_duration_ms);
        targets.retain(|t| match t.pop_started_at {
            Some(started) => now.saturating_sub(started) <= pop_duration,
            None => t.age(now) <= max_age,
        });
        before - targets.len()
    }

    /// Start the pop animation of target `id`. False if unknown or already popping.
    pub fn mark_popping(targets: &mut [Target], id: TargetId, now: Millis) -> bool {
        targets
            .iter_mut()
            .find(|t| t.id == id)
            .map(|t| t.mark_popping(now))
            .unwrap_or(false)
    }

    /// Number of spawns that fell back to an unconstrained position.
    pub fn fallback_count(&self) -> u64 {
        self.fallbacks
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn spawner() -> TargetSpawner {
        TargetSpawner::new(SpawnerConfig::default(), 42)
    }

    #[test]
    fn refuses_while_a_live_target_exists() {
        let mut s = spawner();
        let first = s.spawn(&[], None, 0).unwrap().target;
        assert!(s.spawn(&[first.clone()], None, 10).is_none());

        let mut popping = first;
        popping.mark_popping(20);
        assert!(s.spawn(&[popping], None, 30).is_some());
    }

    #[test]
    fn spawns_inside_safe_bounds() {
        let mut s = spawner();
        let (lo, hi) = s.safe_bounds();
        assert_eq!(lo, Position::new(75.0, 75.0));
        assert_eq!(hi, Position::new(1845.0, 1005.0));
        for i in 0..500 {
            let t = s.spawn(&[], None, i).unwrap().target;
            assert!(t.position.x >= lo.x && t.position.x <= hi.x);
            assert!(t.position.y >= lo.y && t.position.y <= hi.y);
            assert_eq!(t.radius, 50.0);
        }
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let mut s = spawner();
        let a = s.spawn(&[], None, 0).unwrap().target.id;
        let b = s.spawn(&[], None, 0).unwrap().target.id;
        assert!(b > a);
    }

    #[test]
    fn min_distance_holds_or_fallback_is_counted() {
        let mut s = spawner();
        let mut last = Position::new(960.0, 540.0);
        let mut far_enough = 0u64;
        for i in 0..1000 {
            let out = s.spawn(&[], Some(last), i).unwrap();
            let d = nalgebra::distance(&out.target.position, &last);
            if out.constraint_met {
                assert!(d >= 300.0);
                far_enough += 1;
            } else {
                assert_eq!(out.attempts, 50);
            }
            last = out.target.position;
        }
        assert_eq!(far_enough + s.fallback_count(), 1000);
        // On a 1920×1080 area the constraint is almost always satisfiable
        assert!(s.fallback_count() < 10);
    }

    #[test]
    fn tiny_area_always_falls_back_but_still_spawns() {
        let mut s = TargetSpawner::new(
            SpawnerConfig {
                play_area: PlayArea::new(100.0, 100.0),
                ..Default::default()
            },
            1,
        );
        let out = s.spawn(&[], Some(Position::new(50.0, 50.0)), 0).unwrap();
        assert!(!out.constraint_met);
        assert_eq!(out.target.position, Position::new(50.0, 50.0));
        assert_eq!(s.fallback_count(), 1);
    }

    #[test]
    fn tick_expires_unpopped_and_finished_pops() {
        let s = spawner();
        let mk = |id: u64, created_at: Millis, pop: Option<Millis>| Target {
            id: TargetId(id),
            position: Position::new(100.0, 100.0),
            radius: 50.0,
            color: BalloonColor(0),
            created_at,
            pop_started_at: pop,
        };
        let mut targets = vec![
            mk(0, 0, None),            // age 15 001 → expired
            mk(1, 5_000, None),        // age 10 001 → kept
            mk(2, 0, Some(14_000)),    // popping 1 001 → removed
            mk(3, 0, Some(14_500)),    // popping 501 → kept
        ];
        let removed = s.tick(&mut targets, 15_001);
        assert_eq!(removed, 2);
        let ids: Vec<u64> = targets.iter().map(|t| t.id.0).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn mark_popping_by_id() {
        let mut s = spawner();
        let mut targets = vec![s.spawn(&[], None, 0).unwrap().target];
        let id = targets[0].id;
        assert!(TargetSpawner::mark_popping(&mut targets, id, 100));
        assert!(!TargetSpawner::mark_popping(&mut targets, id, 200));
        assert!(!TargetSpawner::mark_popping(&mut targets, TargetId(99), 200));
        assert_eq!(targets[0].pop_started_at, Some(100));
    }

    #[test]
    fn never_more_than_one_live_target() {
        let mut s = spawner();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut targets: Vec<Target> = Vec::new();
        let mut last_popped = None;
        let mut now: Millis = 0;
        for _ in 0..5_000 {
            now += rng.gen_range(1..200);
            match rng.gen_range(0..3) {
                0 => {
                    if let Some(out) = s.spawn(&targets, last_popped, now) {
                        targets.push(out.target);
                    }
                }
                1 => {
                    if let Some(t) = targets.iter_mut().find(|t| !t.is_popping()) {
                        t.mark_popping(now);
                        last_popped = Some(t.position);
                    }
                }
                _ => {
                    s.tick(&mut targets, now);
                }
            }
            assert!(targets.iter().filter(|t| !t.is_popping()).count() <= 1);
        }
    }
}
