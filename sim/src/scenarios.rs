//! Scenario definitions.
//!
//! Each scenario is a named viewer profile. All scenarios are deterministic
//! given the same seed.

use crate::viewer::{Behavior, Outage, SimulatedViewer, ViewerConfig};
use gaze_core::types::Position;
use gaze_sensor::{Confidence, PlayArea};
use serde::{Deserialize, Serialize};

/// Which pre-defined scenario to load.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum ScenarioKind {
    /// Chases every balloon with a quick reaction and a clean signal
    Attentive,
    /// Chases balloons slowly through heavy measurement noise
    Noisy,
    /// Looks around at random, ignoring the balloons
    Distracted,
    /// Stares at the centre of the screen
    Fixated,
    /// Chases balloons over a flaky link: dropouts, lost tracking, outages
    Flaky,
    /// Tracker on a larger, differently-sized screen than the play area
    Widescreen,
}

/// A fully configured simulation scenario.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub seed: u64,
    pub viewer: ViewerConfig,
}

impl Scenario {
    /// Build the named scenario. Uses `seed` for repeatability.
    pub fn build(kind: ScenarioKind, seed: u64) -> Self {
        let viewer = match kind {
            ScenarioKind::Attentive => ViewerConfig {
                behavior: Behavior::Chase { reaction_ms: 200 },
                noise_std: 10.0,
                ..Default::default()
            },
            ScenarioKind::Noisy => ViewerConfig {
                behavior: Behavior::Chase { reaction_ms: 450 },
                noise_std: 60.0,
                confidence: Confidence::Low,
                ..Default::default()
            },
            ScenarioKind::Distracted => ViewerConfig {
                behavior: Behavior::Wander { dwell_ms: 700 },
                saccade_speed: 2_500.0,
                noise_std: 20.0,
                confidence: Confidence::Medium,
                ..Default::default()
            },
            ScenarioKind::Fixated => ViewerConfig {
                behavior: Behavior::Fixate {
                    at: Position::new(960.0, 540.0),
                },
                noise_std: 15.0,
                ..Default::default()
            },
            ScenarioKind::Flaky => ViewerConfig {
                behavior: Behavior::Chase { reaction_ms: 300 },
                noise_std: 20.0,
                dropout_probability: 0.15,
                lost_tracking_probability: 0.05,
                glitch_probability: 0.02,
                outages: vec![
                    Outage {
                        start_ms: 6_000,
                        end_ms: 9_000,
                    },
                    Outage {
                        start_ms: 30_000,
                        end_ms: 34_000,
                    },
                ],
                confidence: Confidence::Medium,
                ..Default::default()
            },
            ScenarioKind::Widescreen => ViewerConfig {
                behavior: Behavior::Chase { reaction_ms: 250 },
                screen: PlayArea::new(2560.0, 1440.0),
                saccade_speed: 8_000.0,
                noise_std: 20.0,
                ..Default::default()
            },
        };
        Self {
            name: format!("{kind:?}").to_lowercase(),
            seed,
            viewer,
        }
    }

    /// Fresh viewer for this scenario.
    pub fn viewer(&self) -> SimulatedViewer {
        SimulatedViewer::new(self.viewer.clone(), self.seed)
    }
}
