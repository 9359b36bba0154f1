//! `gaze_sensor` — Eye-tracker sample model, screen rescaling, validation and
//! the classifier boundary used by the sibling pose/speech games.

pub mod classifier;
pub mod error;
pub mod observation;

pub use classifier::{Classification, Classifier, ClassifierPoller};
pub use error::SensorError;
pub use observation::{Confidence, GazeSample, PlayArea, ScreenGeometry};
