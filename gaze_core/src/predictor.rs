//! Latency-compensating cursor predictor.
//!
//! Two stages run once per rendered frame:
//! 1. **Extrapolate** the filtered gaze along the filter's velocity:
//!    `target = filtered + v · horizon_s · 1000`.
//!    `v` is per observation tick, so the effective horizon is neither pure
//!    seconds nor pure milliseconds. The scaling is kept as-is so cursor
//!    behaviour matches the deployed game.
//! 2. **Spring** the displayed point toward that target:
//!    ```text
//!    a  = (target − p) · spring_strength
//!    iv = iv · damping + a · dt
//!    p  = p + iv · dt
//!    ```
//!
//! With the default constants both eigenvalues of the per-axis update are
//! real and in (0, 1), so the point approaches a fixed target without
//! oscillating. The predictor free-runs between observations.

use crate::types::{Position, Velocity};
use serde::{Deserialize, Serialize};

/// Spring-damper and extrapolation constants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    pub spring_strength: f64,
    pub damping: f64,
    /// Extrapolation horizon in seconds; multiplied by 1000 when applied
    pub prediction_horizon_s: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            spring_strength: 0.25,
            damping: 0.85,
            prediction_horizon_s: 0.05,
        }
    }
}

/// Displayed cursor state: position plus interpolation velocity.
#[derive(Clone, Debug)]
pub struct GazePredictor {
    pub config: PredictorConfig,
    position: Position,
    velocity: Velocity,
    seeded: bool,
}

impl GazePredictor {
    pub fn new(config: PredictorConfig) -> Self {
        Self {
            config,
            position: Position::origin(),
            velocity: Velocity::zeros(),
            seeded: false,
        }
    }

    /// Stage 1: project the filtered position forward.
    pub fn extrapolate(&self, filtered: Position, filter_velocity: Velocity) -> Position {
        filtered + filter_velocity * (self.config.prediction_horizon_s * 1000.0)
    }

    /// Stage 2: one spring-damper step toward `target` over `dt_s` seconds.
    pub fn step(&mut self, target: Position, dt_s: f64) -> Position {
        if !dt_s.is_finite() || dt_s <= 0.0 {
            return self.position;
        }
        let displacement = target - self.position;
        let spring_force = displacement * self.config.spring_strength;
        self.velocity = self.velocity * self.config.damping + spring_force * dt_s;
        self.position += self.velocity * dt_s;
        self.position
    }

    /// Both stages for one frame.
    pub fn advance(&mut self, filtered: Position, filter_velocity: Velocity, dt_s: f64) -> Position {
        let target = self.extrapolate(filtered, filter_velocity);
        self.step(target, dt_s)
    }

    /// Back to the origin with zero interpolation velocity.
    pub fn reset(&mut self) {
        self.position = Position::origin();
        self.velocity = Velocity::zeros();
        self.seeded = false;
    }

    /// Place the cursor at `at` with zero interpolation velocity.
    pub fn reset_at(&mut self, at: Position) {
        self.position = at;
        self.velocity = Velocity::zeros();
        self.seeded = true;
    }

    /// True once the cursor was placed with [`Self::reset_at`].
    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn velocity(&self) -> Velocity {
        self.velocity
    }
}

impl Default for GazePredictor {
    fn default() -> Self {
        Self::new(PredictorConfig::default())
    }
}
