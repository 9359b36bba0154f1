//! Four-point calibration check.
//!
//! The user looks at and clicks each corner marker in turn. For every point
//! the filtered gaze is compared with the marker centre:
//!
//! ```text
//! accuracy = max(0, 100 − ‖gaze − marker‖ / diagonal · 100)
//! ```
//!
//! Overall accuracy is the mean over recorded points. The check only
//! reports; it does not correct the gaze mapping.

use crate::types::Position;
use gaze_sensor::PlayArea;
use serde::{Deserialize, Serialize};

/// Marker positions as fractions of the play area.
pub const CALIBRATION_POINTS: [(&str, f64, f64); 4] = [
    ("Top Left", 0.1, 0.1),
    ("Top Right", 0.9, 0.1),
    ("Bottom Left", 0.1, 0.9),
    ("Bottom Right", 0.9, 0.9),
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    /// 1-based
    pub point_id: usize,
    pub label: String,
    pub target: Position,
    pub gaze: Position,
    pub click: Position,
    /// Percent
    pub accuracy: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub records: Vec<CalibrationRecord>,
    pub overall_accuracy: f64,
}

pub struct CalibrationSession {
    area: PlayArea,
    records: Vec<CalibrationRecord>,
}

impl CalibrationSession {
    pub fn new(area: PlayArea) -> Self {
        Self {
            area,
            records: Vec::with_capacity(CALIBRATION_POINTS.len()),
        }
    }

    /// Marker the user should look at next, or `None` once all are recorded.
    pub fn current_point(&self) -> Option<(usize, &'static str, Position)> {
        let idx = self.records.len();
        CALIBRATION_POINTS.get(idx).map(|&(label, fx, fy)| {
            (
                idx + 1,
                label,
                Position::new(fx * self.area.width, fy * self.area.height),
            )
        })
    }

    /// Record the current point. Returns `None` when all points are done.
    pub fn record(&mut self, gaze: Position, click: Position) -> Option<&CalibrationRecord> {
        let (point_id, label, target) = self.current_point()?;
        let diagonal = self.area.diagonal();
        let accuracy = if diagonal > 0.0 {
            (100.0 - nalgebra::distance(&gaze, &target) / diagonal * 100.0).max(0.0)
        } else {
            0.0
        };
        self.records.push(CalibrationRecord {
            point_id,
            label: label.to_string(),
            target,
            gaze,
            click,
            accuracy,
        });
        self.records.last()
    }

    pub fn is_complete(&self) -> bool {
        self.records.len() >= CALIBRATION_POINTS.len()
    }

    pub fn overall_accuracy(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        self.records.iter().map(|r| r.accuracy).sum::<f64>() / self.records.len() as f64
    }

    pub fn records(&self) -> &[CalibrationRecord] {
        &self.records
    }

    pub fn report(&self) -> CalibrationReport {
        CalibrationReport {
            records: self.records.clone(),
            overall_accuracy: self.overall_accuracy(),
        }
    }

    pub fn reset(&mut self) {
        self.records.clear();
    }
}
