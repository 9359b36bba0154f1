//! Simulated viewer: a seeded stand-in for a person in front of an eye tracker.
//!
//! The viewer keeps a true point of regard in *screen* coordinates and moves
//! it toward a goal chosen by its [`Behavior`]. Each poll reports that point
//! plus noise, the way a device bridge would, and may instead fail:
//!
//! - scheduled **outages** (device unreachable),
//! - random **dropouts** per poll (request errors),
//! - random **lost-tracking** samples (eyes not found),
//! - random **glitches**: coordinates far off-screen.
//!
//! All randomness comes from one `ChaCha8Rng`, so a viewer is fully
//! determined by its config, its seed and the poll times.

use gaze_core::{
    source::GazeSource,
    types::{Millis, Position, Target, TargetId},
};
use gaze_sensor::{Confidence, GazeSample, PlayArea, SensorError};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Where the viewer wants to look.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Behavior {
    /// Stare at one play-area point
    Fixate { at: Position },
    /// Pick a random screen point every `dwell_ms`
    Wander { dwell_ms: Millis },
    /// Look at each new target `reaction_ms` after it appears
    Chase { reaction_ms: Millis },
}

/// A window of device unavailability on the game clock.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Outage {
    pub start_ms: Millis,
    pub end_ms: Millis,
}

impl Outage {
    pub fn contains(&self, t: Millis) -> bool {
        t >= self.start_ms && t < self.end_ms
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub behavior: Behavior,
    /// Reported screen size
    pub screen: PlayArea,
    /// Play area the game uses; target positions are mapped back to screen
    pub play_area: PlayArea,
    /// Eye movement speed (screen units/s); 0 jumps instantly
    pub saccade_speed: f64,
    /// Standard deviation of measurement noise (screen units)
    pub noise_std: f64,
    pub dropout_probability: f64,
    pub lost_tracking_probability: f64,
    pub glitch_probability: f64,
    pub outages: Vec<Outage>,
    /// Confidence label on good samples
    pub confidence: Confidence,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            behavior: Behavior::Chase { reaction_ms: 250 },
            screen: PlayArea::default(),
            play_area: PlayArea::default(),
            saccade_speed: 6_000.0,
            noise_std: 15.0,
            dropout_probability: 0.0,
            lost_tracking_probability: 0.0,
            glitch_probability: 0.0,
            outages: Vec::new(),
            confidence: Confidence::High,
        }
    }
}

pub struct SimulatedViewer {
    pub config: ViewerConfig,
    rng: ChaCha8Rng,
    /// True point of regard (screen)
    gaze: Position,
    goal: Position,
    /// Goal switch scheduled by a reaction delay
    pending: Option<(Millis, Position)>,
    last_seen: Option<TargetId>,
    next_wander_at: Millis,
    clock: Option<Millis>,
}

impl SimulatedViewer {
    pub fn new(config: ViewerConfig, seed: u64) -> Self {
        let start = config.screen.center();
        let goal = match &config.behavior {
            Behavior::Fixate { at } => Self::play_to_screen(&config, *at),
            _ => start,
        };
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            gaze: start,
            goal,
            pending: None,
            last_seen: None,
            next_wander_at: 0,
            clock: None,
            config,
        }
    }

    fn play_to_screen(config: &ViewerConfig, p: Position) -> Position {
        Position::new(
            p.x / config.play_area.width * config.screen.width,
            p.y / config.play_area.height * config.screen.height,
        )
    }

    /// True point of regard in screen coordinates.
    pub fn gaze(&self) -> Position {
        self.gaze
    }

    /// Approximately normal, zero-mean, `noise_std` deviation
    /// (sum of four uniforms).
    fn noise(&mut self) -> f64 {
        let sum: f64 = (0..4).map(|_| self.rng.gen::<f64>()).sum();
        (sum - 2.0) * 3f64.sqrt() * self.config.noise_std
    }

    fn advance(&mut self, now: Millis) {
        let dt_s = self
            .clock
            .map_or(0.0, |prev| now.saturating_sub(prev) as f64 / 1_000.0);
        self.clock = Some(now);

        if let Some((at, goal)) = self.pending {
            if now >= at {
                self.goal = goal;
                self.pending = None;
            }
        }
        if let Behavior::Wander { dwell_ms } = self.config.behavior {
            if now >= self.next_wander_at {
                self.goal = Position::new(
                    self.rng.gen::<f64>() * self.config.screen.width,
                    self.rng.gen::<f64>() * self.config.screen.height,
                );
                self.next_wander_at = now + dwell_ms.max(1);
            }
        }

        let to_goal = self.goal - self.gaze;
        let dist = to_goal.norm();
        let reach = self.config.saccade_speed * dt_s;
        if self.config.saccade_speed <= 0.0 || dist <= reach {
            self.gaze = self.goal;
        } else {
            self.gaze += to_goal * (reach / dist);
        }
    }
}

impl GazeSource for SimulatedViewer {
    fn poll_gaze(&mut self, now: Millis) -> Result<GazeSample, SensorError> {
        self.advance(now);

        if self.config.outages.iter().any(|o| o.contains(now)) {
            return Err(SensorError::Unavailable("simulated outage".into()));
        }
        if self.rng.gen::<f64>() < self.config.dropout_probability {
            return Err(SensorError::Unavailable("simulated dropout".into()));
        }

        let (w, h) = (self.config.screen.width, self.config.screen.height);
        if self.rng.gen::<f64>() < self.config.lost_tracking_probability {
            return Ok(GazeSample::new(0.0, 0.0, Confidence::LostTracking, now).with_screen(w, h));
        }
        if self.rng.gen::<f64>() < self.config.glitch_probability {
            return Ok(GazeSample::new(-10.0 * w, 10.0 * h, self.config.confidence, now)
                .with_screen(w, h));
        }

        let x = self.gaze.x + self.noise();
        let y = self.gaze.y + self.noise();
        Ok(GazeSample::new(x, y, self.config.confidence, now).with_screen(w, h))
    }

    fn observe_targets(&mut self, targets: &[Target]) {
        let Behavior::Chase { reaction_ms } = self.config.behavior else {
            return;
        };
        let Some(live) = targets.iter().find(|t| !t.is_popping()) else {
            return;
        };
        if self.last_seen == Some(live.id) {
            return;
        }
        self.last_seen = Some(live.id);
        let at = self.clock.unwrap_or(0) + reaction_ms;
        self.pending = Some((at, Self::play_to_screen(&self.config, live.position)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use gaze_core::types::BalloonColor;

    fn target(id: u64, x: f64, y: f64) -> Target {
        Target {
            id: TargetId(id),
            position: Position::new(x, y),
            radius: 50.0,
            color: BalloonColor(0),
            created_at: 0,
            pop_started_at: None,
        }
    }

    fn quiet(behavior: Behavior) -> ViewerConfig {
        ViewerConfig {
            behavior,
            noise_std: 0.0,
            saccade_speed: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn same_seed_same_samples() {
        let cfg = ViewerConfig {
            behavior: Behavior::Wander { dwell_ms: 500 },
            dropout_probability: 0.1,
            ..Default::default()
        };
        let mut a = SimulatedViewer::new(cfg.clone(), 3);
        let mut b = SimulatedViewer::new(cfg, 3);
        for i in 0..200 {
            assert_eq!(a.poll_gaze(i * 33), b.poll_gaze(i * 33));
        }
    }

    #[test]
    fn fixation_maps_play_area_to_screen() {
        let cfg = ViewerConfig {
            screen: PlayArea::new(2560.0, 1440.0),
            ..quiet(Behavior::Fixate {
                at: Position::new(480.0, 270.0),
            })
        };
        let mut v = SimulatedViewer::new(cfg, 1);
        let s = v.poll_gaze(0).unwrap();
        assert_abs_diff_eq!(s.x, 640.0, epsilon = 1e-9);
        assert_abs_diff_eq!(s.y, 360.0, epsilon = 1e-9);
        assert_eq!(s.screen_width, Some(2560.0));
    }

    #[test]
    fn chase_reacts_after_delay() {
        let mut v = SimulatedViewer::new(quiet(Behavior::Chase { reaction_ms: 200 }), 1);
        v.poll_gaze(1_000).unwrap();
        v.observe_targets(&[target(1, 100.0, 100.0)]);

        let before = v.poll_gaze(1_100).unwrap();
        assert_abs_diff_eq!(before.x, 960.0, epsilon = 1e-9);
        let after = v.poll_gaze(1_200).unwrap();
        assert_abs_diff_eq!(after.x, 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(after.y, 100.0, epsilon = 1e-9);

        // Same target again: no new reaction scheduled
        v.observe_targets(&[target(1, 100.0, 100.0)]);
        assert!(v.pending.is_none());
    }

    #[test]
    fn saccade_speed_limits_motion() {
        let cfg = ViewerConfig {
            saccade_speed: 1_000.0,
            ..quiet(Behavior::Fixate {
                at: Position::new(1960.0, 540.0),
            })
        };
        let mut v = SimulatedViewer::new(cfg, 1);
        v.poll_gaze(0).unwrap();
        let s = v.poll_gaze(100).unwrap();
        // 1000 units/s for 0.1 s from the centre (960)
        assert_abs_diff_eq!(s.x, 1060.0, epsilon = 1e-9);
    }

    #[test]
    fn outages_and_dropouts() {
        let cfg = ViewerConfig {
            outages: vec![Outage {
                start_ms: 1_000,
                end_ms: 2_000,
            }],
            dropout_probability: 0.2,
            ..Default::default()
        };
        let mut v = SimulatedViewer::new(cfg, 8);
        for t in (1_000..2_000).step_by(33) {
            assert!(matches!(v.poll_gaze(t), Err(SensorError::Unavailable(_))));
        }
        let failures = (0..3_000)
            .map(|i| v.poll_gaze(2_000 + i * 33))
            .filter(|r| r.is_err())
            .count();
        // ~20 % of 3000
        assert!((450..750).contains(&failures), "{failures} failures");
    }

    #[test]
    fn lost_tracking_and_glitches_are_reported_as_samples() {
        let cfg = ViewerConfig {
            lost_tracking_probability: 1.0,
            ..Default::default()
        };
        let mut v = SimulatedViewer::new(cfg, 2);
        assert_eq!(v.poll_gaze(0).unwrap().confidence, Confidence::LostTracking);

        let cfg = ViewerConfig {
            glitch_probability: 1.0,
            ..Default::default()
        };
        let mut v = SimulatedViewer::new(cfg, 2);
        let s = v.poll_gaze(0).unwrap();
        assert!(s.x < 0.0 && s.y > 1080.0);
    }

    #[test]
    fn noise_has_requested_spread() {
        let cfg = ViewerConfig {
            noise_std: 20.0,
            ..quiet(Behavior::Fixate {
                at: Position::new(960.0, 540.0),
            })
        };
        let mut v = SimulatedViewer::new(cfg, 5);
        let xs: Vec<f64> = (0..4_000).map(|i| v.poll_gaze(i).unwrap().x).collect();
        let mean = xs.iter().sum::<f64>() / xs.len() as f64;
        let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / xs.len() as f64;
        assert_abs_diff_eq!(mean, 960.0, epsilon = 2.0);
        assert_abs_diff_eq!(var.sqrt(), 20.0, epsilon = 1.5);
    }
}
