//! `gaze_core` — Gaze estimation and the balloon-pop game loop.
//!
//! # Module layout
//! - [`types`]      — Fundamental types (IDs, positions, targets, per-target stats)
//! - [`kf`]         — Scalar Kalman filter and the x/y [`GazeFilter`] pair
//! - [`predictor`]  — Extrapolate-then-spring cursor predictor
//! - [`spawner`]    — Target placement, expiry and pop lifecycle
//! - [`collision`]  — Radius hit test with global debounce
//! - [`round`]      — Timed round state machine
//! - [`session`]    — Multi-round sequencing and aggregation
//! - [`metrics`]    — Accuracy and time-to-pop statistics
//! - [`calibration`]— Four-point calibration check
//! - [`scheduler`]  — Periodic triggers on an explicit clock
//! - [`source`]     — [`GazeSource`] boundary
//! - [`game_loop`]  — Single-writer loop tying it all together
//! - [`error`]      — [`GameError`] taxonomy

pub mod calibration;
pub mod collision;
pub mod error;
pub mod game_loop;
pub mod kf;
pub mod metrics;
pub mod predictor;
pub mod round;
pub mod scheduler;
pub mod session;
pub mod source;
pub mod spawner;
pub mod types;

pub use calibration::{CalibrationReport, CalibrationSession};
pub use error::GameError;
pub use game_loop::{GameConfig, GameLoop, HitPoint, TrackingStatus};
pub use kf::{GazeFilter, ScalarKalmanFilter};
pub use metrics::RoundStatistics;
pub use predictor::GazePredictor;
pub use round::{RoundController, RoundPhase, RoundResult};
pub use scheduler::{Scheduler, Trigger};
pub use session::{SessionAggregator, SessionPhase, SessionResult};
pub use source::GazeSource;
pub use types::{Millis, Position, Target, TargetId, TargetStat};
