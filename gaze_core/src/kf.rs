//! Scalar Kalman filter: one instance per screen axis.
//!
//! # Model
//! State is `(x, v, P)`: position estimate, per-observation velocity and the
//! error covariance of the position. Each call to [`ScalarKalmanFilter::filter`]:
//!
//! ```text
//! x⁻ = x + v          v⁻ = v          P⁻ = P + Q
//! K  = P⁻ / (P⁻ + R)
//! x  = x⁻ + K·(z − x⁻)
//! v  = v⁻ + 0.1·K·(z − x⁻)
//! P  = (1 − K)·P⁻
//! ```
//!
//! The velocity uses a tenth of the position gain so it adapts slower than
//! the position and does not amplify measurement noise.
//!
//! ## Cold start
//! The first measurement after construction or an empty reset is returned
//! unchanged and seeds the state (`v = 0`, `P = P₀`). Without this the
//! estimate would be dragged in from zero.
//!
//! Axes are independent: [`GazeFilter`] simply runs two instances.

use crate::types::{Position, Velocity};
use serde::{Deserialize, Serialize};

/// Share of the position gain applied to the velocity update.
const VELOCITY_GAIN_SCALE: f64 = 0.1;

// ---------------------------------------------------------------------------
// Config & state
// ---------------------------------------------------------------------------

/// Noise parameters of the scalar filter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalarKfConfig {
    /// Process noise Q
    pub process_noise: f64,
    /// Measurement noise R
    pub measurement_noise: f64,
    /// Error covariance P₀ after (re)initialisation
    pub initial_covariance: f64,
}

impl Default for ScalarKfConfig {
    fn default() -> Self {
        Self {
            process_noise: 1e-4,
            measurement_noise: 1e-2,
            initial_covariance: 1.0,
        }
    }
}

/// Snapshot of one axis' estimator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub estimate: f64,
    pub velocity: f64,
    pub error_covariance: f64,
    pub initialized: bool,
}

// ---------------------------------------------------------------------------
// ScalarKalmanFilter
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct ScalarKalmanFilter {
    pub config: ScalarKfConfig,
    state: FilterState,
}

impl ScalarKalmanFilter {
    pub fn new(config: ScalarKfConfig) -> Self {
        let state = FilterState {
            error_covariance: config.initial_covariance,
            ..Default::default()
        };
        Self { config, state }
    }

    /// Fold one measurement in and return the new position estimate.
    pub fn filter(&mut self, measurement: f64) -> f64 {
        if !self.state.initialized {
            self.reset(Some(measurement));
            return measurement;
        }

        let FilterState {
            estimate: x,
            velocity: v,
            error_covariance: p,
            ..
        } = self.state;

        let x_pred = x + v;
        let v_pred = v;
        let p_pred = p + self.config.process_noise;

        let gain = p_pred / (p_pred + self.config.measurement_noise);
        let innovation = measurement - x_pred;

        self.state.estimate = x_pred + gain * innovation;
        self.state.velocity = v_pred + gain * innovation * VELOCITY_GAIN_SCALE;
        self.state.error_covariance = (1.0 - gain) * p_pred;
        self.state.estimate
    }

    /// Re-initialise. `Some(v)` seeds the estimate at `v`; `None` leaves the
    /// filter waiting for a cold-start measurement.
    pub fn reset(&mut self, initial: Option<f64>) {
        self.state = FilterState {
            estimate: initial.unwrap_or(0.0),
            velocity: 0.0,
            error_covariance: self.config.initial_covariance,
            initialized: initial.is_some(),
        };
    }

    pub fn is_initialized(&self) -> bool {
        self.state.initialized
    }

    pub fn velocity(&self) -> f64 {
        self.state.velocity
    }

    pub fn estimate(&self) -> f64 {
        self.state.estimate
    }

    pub fn state(&self) -> FilterState {
        self.state
    }
}

impl Default for ScalarKalmanFilter {
    fn default() -> Self {
        Self::new(ScalarKfConfig::default())
    }
}

// ---------------------------------------------------------------------------
// GazeFilter: the x/y pair
// ---------------------------------------------------------------------------

/// Two uncoupled scalar filters smoothing a 2D gaze stream.
#[derive(Clone, Debug, Default)]
pub struct GazeFilter {
    pub x: ScalarKalmanFilter,
    pub y: ScalarKalmanFilter,
}

impl GazeFilter {
    pub fn new(config: ScalarKfConfig) -> Self {
        Self {
            x: ScalarKalmanFilter::new(config.clone()),
            y: ScalarKalmanFilter::new(config),
        }
    }

    pub fn filter(&mut self, measurement: Position) -> Position {
        Position::new(self.x.filter(measurement.x), self.y.filter(measurement.y))
    }

    /// Current smoothed position, once both axes have seen a measurement.
    pub fn position(&self) -> Option<Position> {
        (self.x.is_initialized() && self.y.is_initialized())
            .then(|| Position::new(self.x.estimate(), self.y.estimate()))
    }

    /// Per-observation velocity estimate.
    pub fn velocity(&self) -> Velocity {
        Velocity::new(self.x.velocity(), self.y.velocity())
    }

    pub fn reset(&mut self) {
        self.x.reset(None);
        self.y.reset(None);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
