//! Errors raised at the device boundary.

use thiserror::Error;

/// Failure reported by (or about) an external tracking device.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SensorError {
    /// The device bridge could not be reached or returned an error payload.
    #[error("gaze source unavailable: {0}")]
    Unavailable(String),
    /// The device is connected but has lost the user's eyes.
    #[error("tracker lost the user's gaze")]
    LostTracking,
    /// Coordinates are NaN, infinite, or far outside the reported screen.
    #[error("invalid gaze sample ({x}, {y})")]
    InvalidSample { x: f64, y: f64 },
    /// A sibling-game classifier failed to produce a label.
    #[error("classifier failed: {0}")]
    Classifier(String),
}
