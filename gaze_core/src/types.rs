//! Fundamental types used across the entire workspace.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Scalars & geometry
// ---------------------------------------------------------------------------

/// Game-clock timestamp or duration in milliseconds.
pub type Millis = u64;

/// Position in play-area units.
pub type Position = Point2<f64>;

/// Velocity in play-area units per tick (filter) or per second (predictor).
pub type Velocity = Vector2<f64>;

// ---------------------------------------------------------------------------
// Identifier types
// ---------------------------------------------------------------------------

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TargetId(pub u64);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Colour
// ---------------------------------------------------------------------------

/// Balloon palette (hex RGB).
pub const PALETTE: [&str; 10] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FFEAA7", "#DDA0DD", "#98D8C8", "#F7DC6F",
    "#BB8FCE", "#85C1E9",
];

/// Index into [`PALETTE`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BalloonColor(pub u8);

impl BalloonColor {
    pub fn hex(&self) -> &'static str {
        PALETTE[self.0 as usize % PALETTE.len()]
    }
}

impl fmt::Display for BalloonColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.hex())
    }
}

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// A balloon on screen.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: TargetId,
    pub position: Position,
    pub radius: f64,
    pub color: BalloonColor,
    pub created_at: Millis,
    /// Set once, when the pop animation starts
    pub pop_started_at: Option<Millis>,
}

impl Target {
    pub fn is_popping(&self) -> bool {
        self.pop_started_at.is_some()
    }

    /// Start the pop animation. Returns false if it was already popping.
    pub fn mark_popping(&mut self, now: Millis) -> bool {
        if self.is_popping() {
            return false;
        }
        self.pop_started_at = Some(now);
        true
    }

    pub fn age(&self, now: Millis) -> Millis {
        now.saturating_sub(self.created_at)
    }
}

// ---------------------------------------------------------------------------
// Per-target statistics
// ---------------------------------------------------------------------------

/// Lifetime record of one spawned target, kept for the round result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetStat {
    pub id: TargetId,
    pub spawn_time: Millis,
    pub pop_time: Option<Millis>,
    pub time_to_pop_ms: Option<Millis>,
    /// Gaze-to-centre distance at the moment of the hit
    pub miss_distance: Option<f64>,
    pub position: Position,
    pub color: BalloonColor,
}

impl TargetStat {
    pub fn spawned(target: &Target) -> Self {
        Self {
            id: target.id,
            spawn_time: target.created_at,
            pop_time: None,
            time_to_pop_ms: None,
            miss_distance: None,
            position: target.position,
            color: target.color,
        }
    }

    pub fn record_pop(&mut self, now: Millis, distance: f64) {
        self.pop_time = Some(now);
        self.time_to_pop_ms = Some(now.saturating_sub(self.spawn_time));
        self.miss_distance = Some(distance);
    }

    pub fn is_popped(&self) -> bool {
        self.pop_time.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balloon() -> Target {
        Target {
            id: TargetId(7),
            position: Position::new(10.0, 20.0),
            radius: 50.0,
            color: BalloonColor(3),
            created_at: 1_000,
            pop_started_at: None,
        }
    }

    #[test]
    fn mark_popping_is_irreversible_and_idempotent() {
        let mut t = balloon();
        assert!(t.mark_popping(1_500));
        assert!(!t.mark_popping(1_900));
        assert_eq!(t.pop_started_at, Some(1_500));
    }

    #[test]
    fn stat_records_pop_timing() {
        let t = balloon();
        let mut s = TargetStat::spawned(&t);
        assert!(!s.is_popped());
        s.record_pop(3_250, 42.0);
        assert_eq!(s.time_to_pop_ms, Some(2_250));
        assert_eq!(s.miss_distance, Some(42.0));
    }

    #[test]
    fn palette_wraps() {
        assert_eq!(BalloonColor(0).hex(), "#FF6B6B");
        assert_eq!(BalloonColor(10).hex(), "#FF6B6B");
        assert_eq!(TargetId(4).to_string(), "B4");
    }
}
