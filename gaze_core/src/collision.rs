//! Gaze-vs-target hit test with a global debounce.
//!
//! # Hit criterion
//! A target is hit when
//! - it is not already popping, and
//! - `‖gaze − centre‖ ≤ collision_radius`, and
//! - at least `debounce_ms` have passed since the previous hit of *any* target.
//!
//! The radius (150) is much larger than the drawn balloon (50) to absorb
//! tracker noise. The debounce is global rather than per target: with a single
//! live target it only matters across the pop/respawn boundary.

use crate::types::{Millis, Position, Target, TargetId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    pub collision_radius: f64,
    pub debounce_ms: Millis,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            collision_radius: 150.0,
            debounce_ms: 50,
        }
    }
}

/// One target hit by the gaze.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    pub id: TargetId,
    /// Gaze-to-centre distance
    pub distance: f64,
}

/// Result of one hit test.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollisionOutcome {
    pub hits: Vec<Hit>,
    /// Time of the most recent hit after this check
    pub last_hit_time: Option<Millis>,
}

impl CollisionOutcome {
    pub fn is_hit(&self) -> bool {
        !self.hits.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct CollisionDetector {
    pub config: CollisionConfig,
}

impl CollisionDetector {
    pub fn new(config: CollisionConfig) -> Self {
        Self { config }
    }

    /// True while a hit at `last_hit` still suppresses new hits at `now`.
    pub fn in_debounce(&self, now: Millis, last_hit: Option<Millis>) -> bool {
        last_hit.is_some_and(|t| now.saturating_sub(t) < self.config.debounce_ms)
    }

    /// Hit-test `gaze` against the live targets. `last_hit = None` means no
    /// hit has happened yet this round. Non-finite gaze never hits.
    pub fn check(
        &self,
        gaze: Position,
        targets: &[Target],
        now: Millis,
        last_hit: Option<Millis>,
    ) -> CollisionOutcome {
        let miss = CollisionOutcome {
            hits: Vec::new(),
            last_hit_time: last_hit,
        };
        if !gaze.x.is_finite() || !gaze.y.is_finite() || self.in_debounce(now, last_hit) {
            return miss;
        }

        let hits: Vec<Hit> = targets
            .iter()
            .filter(|t| !t.is_popping())
            .filter_map(|t| {
                let distance = nalgebra::distance(&gaze, &t.position);
                (distance <= self.config.collision_radius).then_some(Hit { id: t.id, distance })
            })
            .collect();

        if hits.is_empty() {
            return miss;
        }
        CollisionOutcome {
            hits,
            last_hit_time: Some(now),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BalloonColor;
    use approx::assert_abs_diff_eq;

    fn target(id: u64, x: f64, y: f64) -> Target {
        Target {
            id: TargetId(id),
            position: Position::new(x, y),
            radius: 50.0,
            color: BalloonColor(0),
            created_at: 0,
            pop_started_at: None,
        }
    }

    #[test]
    fn hit_inside_radius() {
        let det = CollisionDetector::default();
        let targets = [target(1, 500.0, 500.0)];
        let out = det.check(Position::new(590.0, 620.0), &targets, 1_000, None);
        assert!(out.is_hit());
        assert_eq!(out.hits[0].id, TargetId(1));
        assert_abs_diff_eq!(out.hits[0].distance, 150.0, epsilon = 1e-9);
        assert_eq!(out.last_hit_time, Some(1_000));
    }

    #[test]
    fn miss_outside_radius() {
        let det = CollisionDetector::default();
        let targets = [target(1, 500.0, 500.0)];
        let out = det.check(Position::new(700.0, 500.0), &targets, 1_000, Some(10));
        assert!(!out.is_hit());
        assert_eq!(out.last_hit_time, Some(10));
    }

    #[test]
    fn popping_targets_are_ignored() {
        let det = CollisionDetector::default();
        let mut t = target(1, 500.0, 500.0);
        t.mark_popping(900);
        let out = det.check(Position::new(500.0, 500.0), &[t], 1_000, None);
        assert!(!out.is_hit());
    }

    #[test]
    fn debounce_suppresses_second_hit() {
        let det = CollisionDetector::default();
        let a = [target(1, 500.0, 500.0)];
        let b = [target(2, 900.0, 500.0)];

        let first = det.check(Position::new(500.0, 500.0), &a, 1_000, None);
        assert_eq!(first.hits.len(), 1);

        // 30 ms later, a different target under the gaze
        let second = det.check(Position::new(900.0, 500.0), &b, 1_030, first.last_hit_time);
        assert!(!second.is_hit());
        assert_eq!(second.last_hit_time, Some(1_000));

        // Same target, still inside the window
        let third = det.check(Position::new(500.0, 500.0), &a, 1_049, first.last_hit_time);
        assert!(!third.is_hit());

        // Window elapsed
        let fourth = det.check(Position::new(900.0, 500.0), &b, 1_050, first.last_hit_time);
        assert!(fourth.is_hit());
    }

    #[test]
    fn nan_gaze_never_hits() {
        let det = CollisionDetector::default();
        let out = det.check(
            Position::new(f64::NAN, 500.0),
            &[target(1, 500.0, 500.0)],
            1_000,
            None,
        );
        assert!(!out.is_hit());
    }
}
