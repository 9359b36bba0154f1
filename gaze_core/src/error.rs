//! Error taxonomy of the game core.
//!
//! Everything except `InvalidConfig` is recoverable and is handled inside the
//! game loop: it is logged, reflected in [`crate::game_loop::TrackingStatus`],
//! and play continues.

use gaze_sensor::SensorError;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum GameError {
    /// The gaze source errored, is unreachable or lost the user.
    #[error("tracking unavailable: {0}")]
    TrackingUnavailable(SensorError),
    /// NaN or out-of-range coordinates; dropped before the filters.
    #[error("invalid observation ({x}, {y})")]
    InvalidObservation { x: f64, y: f64 },
    /// No spawn position met the min-distance rule; the last candidate was used.
    #[error("spawn constraint unsatisfied after {attempts} attempts")]
    SpawnConstraintUnsatisfiable { attempts: u32 },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Input delivered after the game loop was stopped; ignored.
    #[error("game loop is not active")]
    Inactive,
}

impl From<SensorError> for GameError {
    fn from(e: SensorError) -> Self {
        match e {
            SensorError::InvalidSample { x, y } => Self::InvalidObservation { x, y },
            other => Self::TrackingUnavailable(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_errors_map_onto_taxonomy() {
        assert_eq!(
            GameError::from(SensorError::InvalidSample { x: 1.0, y: 2.0 }),
            GameError::InvalidObservation { x: 1.0, y: 2.0 }
        );
        assert!(matches!(
            GameError::from(SensorError::LostTracking),
            GameError::TrackingUnavailable(SensorError::LostTracking)
        ));
    }
}
