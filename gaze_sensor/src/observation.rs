//! Raw gaze samples and the mapping from device/screen space into the play area.
//!
//! # Coordinate spaces
//! - **Screen**: what the tracker reports, `[0, screen_width] × [0, screen_height]`.
//!   The device bridge usually sends its own screen size alongside each sample;
//!   when it does not, [`ScreenGeometry`] supplies a fallback (1920×1080).
//! - **Play area**: the logical game surface, `[0, width] × [0, height]`.
//!
//! Rescaling is a per-axis ratio: `play_x = screen_x / screen_width * play_width`.

use crate::error::SensorError;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

/// Tracking confidence label attached to every sample by the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    LostTracking,
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LostTracking => "LOST_TRACKING",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }

    /// Parse the label used by the device bridge. Unknown labels yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "LOST_TRACKING" => Some(Self::LostTracking),
            "LOW" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            _ => None,
        }
    }

    /// Device-level numeric code (0 = lost … 3 = high).
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::LostTracking),
            1 => Some(Self::Low),
            2 => Some(Self::Medium),
            3 => Some(Self::High),
            _ => None,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// GazeSample
// ---------------------------------------------------------------------------

/// One noisy point-of-regard sample as delivered by the tracker (~30 Hz).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GazeSample {
    /// Screen-space x (device pixels)
    pub x: f64,
    /// Screen-space y (device pixels)
    pub y: f64,
    pub confidence: Confidence,
    /// Screen size reported by the device, if any
    pub screen_width: Option<f64>,
    pub screen_height: Option<f64>,
    /// Arrival time on the game clock (ms)
    pub timestamp_ms: u64,
}

impl GazeSample {
    pub fn new(x: f64, y: f64, confidence: Confidence, timestamp_ms: u64) -> Self {
        Self {
            x,
            y,
            confidence,
            screen_width: None,
            screen_height: None,
            timestamp_ms,
        }
    }

    /// Attach the screen size the device reported with this sample.
    pub fn with_screen(mut self, width: f64, height: f64) -> Self {
        self.screen_width = Some(width);
        self.screen_height = Some(height);
        self
    }
}

// ---------------------------------------------------------------------------
// Play area
// ---------------------------------------------------------------------------

/// Logical play surface in which targets live and gaze is hit-tested.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayArea {
    pub width: f64,
    pub height: f64,
}

impl PlayArea {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn diagonal(&self) -> f64 {
        self.width.hypot(self.height)
    }

    pub fn center(&self) -> Point2<f64> {
        Point2::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

impl Default for PlayArea {
    fn default() -> Self {
        Self {
            width: 1920.0,
            height: 1080.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Screen geometry
// ---------------------------------------------------------------------------

/// Screen-to-play-area mapping with an explicit fallback screen size.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenGeometry {
    /// Used when a sample carries no (or a non-positive) screen width
    pub fallback_width: f64,
    /// Used when a sample carries no (or a non-positive) screen height
    pub fallback_height: f64,
    /// How far off-screen a sample may land, as a fraction of the screen
    /// size, before it is rejected as invalid.
    pub offscreen_tolerance: f64,
}

impl Default for ScreenGeometry {
    fn default() -> Self {
        Self {
            fallback_width: 1920.0,
            fallback_height: 1080.0,
            offscreen_tolerance: 0.25,
        }
    }
}

impl ScreenGeometry {
    /// Screen size to rescale `sample` with: the reported one, else the fallback.
    pub fn screen_size(&self, sample: &GazeSample) -> (f64, f64) {
        let pick = |reported: Option<f64>, fallback: f64| match reported {
            Some(v) if v.is_finite() && v > 0.0 => v,
            _ => fallback,
        };
        (
            pick(sample.screen_width, self.fallback_width),
            pick(sample.screen_height, self.fallback_height),
        )
    }

    /// Validate `sample` and map it into play-area coordinates.
    ///
    /// Rejects lost-tracking samples, non-finite coordinates and coordinates
    /// beyond the off-screen tolerance. The returned point is always finite.
    pub fn to_play_area(
        &self,
        sample: &GazeSample,
        area: &PlayArea,
    ) -> Result<Point2<f64>, SensorError> {
        if sample.confidence == Confidence::LostTracking {
            return Err(SensorError::LostTracking);
        }
        let invalid = || SensorError::InvalidSample {
            x: sample.x,
            y: sample.y,
        };
        if !sample.x.is_finite() || !sample.y.is_finite() {
            return Err(invalid());
        }

        let (sw, sh) = self.screen_size(sample);
        let tol_x = sw * self.offscreen_tolerance;
        let tol_y = sh * self.offscreen_tolerance;
        if sample.x < -tol_x || sample.x > sw + tol_x || sample.y < -tol_y || sample.y > sh + tol_y
        {
            return Err(invalid());
        }

        let point = Point2::new(sample.x / sw * area.width, sample.y / sh * area.height);
        if !point.x.is_finite() || !point.y.is_finite() {
            return Err(invalid());
        }
        Ok(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn confidence_labels() {
        assert_eq!(Confidence::from_label("HIGH"), Some(Confidence::High));
        assert_eq!(Confidence::from_label(" medium "), Some(Confidence::Medium));
        assert_eq!(Confidence::from_label("UNKNOWN"), None);
        assert_eq!(Confidence::from_code(0), Some(Confidence::LostTracking));
        assert_eq!(Confidence::Low.to_string(), "LOW");
    }

    #[test]
    fn rescales_with_reported_screen() {
        let geo = ScreenGeometry::default();
        let area = PlayArea::new(1000.0, 500.0);
        let s = GazeSample::new(1280.0, 360.0, Confidence::High, 0).with_screen(2560.0, 1440.0);
        let p = geo.to_play_area(&s, &area).unwrap();
        assert_abs_diff_eq!(p.x, 500.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.y, 125.0, epsilon = 1e-9);
    }

    #[test]
    fn falls_back_to_default_screen() {
        let geo = ScreenGeometry::default();
        let area = PlayArea::new(960.0, 540.0);
        // Zero width is not a usable report → 1920×1080 fallback
        let s = GazeSample::new(960.0, 540.0, Confidence::Medium, 0).with_screen(0.0, 1080.0);
        let p = geo.to_play_area(&s, &area).unwrap();
        assert_abs_diff_eq!(p.x, 480.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.y, 270.0, epsilon = 1e-9);
    }

    #[test]
    fn overridden_fallback_is_used() {
        let geo = ScreenGeometry {
            fallback_width: 1000.0,
            fallback_height: 1000.0,
            ..Default::default()
        };
        let area = PlayArea::new(100.0, 100.0);
        let p = geo
            .to_play_area(&GazeSample::new(500.0, 250.0, Confidence::High, 0), &area)
            .unwrap();
        assert_abs_diff_eq!(p.x, 50.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.y, 25.0, epsilon = 1e-9);
    }

    #[test]
    fn rejects_nan_and_far_offscreen() {
        let geo = ScreenGeometry::default();
        let area = PlayArea::default();
        let nan = GazeSample::new(f64::NAN, 10.0, Confidence::High, 0);
        assert!(matches!(
            geo.to_play_area(&nan, &area),
            Err(SensorError::InvalidSample { .. })
        ));
        let far = GazeSample::new(10_000.0, 10.0, Confidence::High, 0);
        assert!(geo.to_play_area(&far, &area).is_err());
        // Slightly off-screen is tolerated
        let near = GazeSample::new(-50.0, 10.0, Confidence::High, 0);
        assert!(geo.to_play_area(&near, &area).is_ok());
    }

    #[test]
    fn lost_tracking_is_an_error() {
        let geo = ScreenGeometry::default();
        let s = GazeSample::new(100.0, 100.0, Confidence::LostTracking, 0);
        assert_eq!(
            geo.to_play_area(&s, &PlayArea::default()),
            Err(SensorError::LostTracking)
        );
    }
}
