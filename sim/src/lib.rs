//! `sim` — Scenario simulator: simulated viewers, named scenarios, trace replay.

pub mod replay;
pub mod scenarios;
pub mod viewer;

pub use replay::{load_trace, save_trace, GazeTrace, RecordingSource, ReplaySource};
pub use scenarios::{Scenario, ScenarioKind};
pub use viewer::{Behavior, Outage, SimulatedViewer, ViewerConfig};
