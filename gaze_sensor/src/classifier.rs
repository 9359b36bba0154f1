//! Classifier boundary for the pose, gesture and speech games.
//!
//! Those games submit a frame or audio clip on a fixed cadence and get back a
//! `(label, confidence)` pair. A failed call must never stall the caller's
//! loop: [`ClassifierPoller`] keeps the last good classification and counts
//! failures instead.

use crate::error::SensorError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Label returned by an external classifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    /// In [0, 1]
    pub confidence: f64,
}

/// An external pose/gesture/transcription classifier.
pub trait Classifier {
    fn classify(&mut self, input: &[u8]) -> Result<Classification, SensorError>;
}

/// Polls a [`Classifier`] and tolerates failures.
pub struct ClassifierPoller<C> {
    classifier: C,
    /// Classifications below this confidence are ignored
    pub min_confidence: f64,
    last: Option<Classification>,
    failures: u64,
    consecutive_failures: u32,
}

impl<C: Classifier> ClassifierPoller<C> {
    pub fn new(classifier: C, min_confidence: f64) -> Self {
        Self {
            classifier,
            min_confidence,
            last: None,
            failures: 0,
            consecutive_failures: 0,
        }
    }

    /// Submit one input. Returns the latest accepted classification, which is
    /// the previous one when this call failed or was below threshold.
    pub fn poll(&mut self, input: &[u8]) -> Option<&Classification> {
        match self.classifier.classify(input) {
            Ok(c) if c.confidence.is_finite() && c.confidence >= self.min_confidence => {
                self.consecutive_failures = 0;
                self.last = Some(c);
            }
            Ok(c) => {
                self.consecutive_failures = 0;
                debug!(label = %c.label, confidence = c.confidence, "classification below threshold");
            }
            Err(e) => {
                self.failures += 1;
                self.consecutive_failures += 1;
                warn!(error = %e, consecutive = self.consecutive_failures, "classifier call failed");
            }
        }
        self.last.as_ref()
    }

    pub fn last(&self) -> Option<&Classification> {
        self.last.as_ref()
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}
