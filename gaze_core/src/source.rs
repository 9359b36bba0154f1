//! Boundary to whatever produces gaze samples.

use crate::types::{Millis, Target};
use gaze_sensor::{GazeSample, SensorError};

/// A polled gaze source: a device bridge, a simulated viewer, a replayed trace.
///
/// `poll_gaze` is called once per observation tick and must not block; a
/// source with nothing new may return its last sample or an error.
pub trait GazeSource {
    fn poll_gaze(&mut self, now: Millis) -> Result<GazeSample, SensorError>;

    /// Live targets after each frame. Real devices ignore this; simulated
    /// viewers use it to decide where to look.
    fn observe_targets(&mut self, _targets: &[Target]) {}
}

impl<S: GazeSource + ?Sized> GazeSource for Box<S> {
    fn poll_gaze(&mut self, now: Millis) -> Result<GazeSample, SensorError> {
        (**self).poll_gaze(now)
    }

    fn observe_targets(&mut self, targets: &[Target]) {
        (**self).observe_targets(targets)
    }
}
