//! Single-writer game loop: the one owner of all mutable game state.
//!
//! # Triggers
//! 1. **Observation** (~30 Hz): poll the [`GazeSource`], validate and rescale
//!    the sample, feed the per-axis Kalman filters. Failures are counted in
//!    [`TrackingStatus`] and never interrupt the other triggers.
//! 2. **Frame** (~60 Hz): advance the predictor from the last filtered state
//!    and hit-test the configured [`HitPoint`].
//! 3. **Lifecycle** (20 Hz): target expiry and pop animations.
//! 4. **Round timer** (1 Hz): countdowns, round and session completion.
//!
//! Every entry point checks the `active` flag first. After [`GameLoop::stop`]
//! or session completion nothing scores, spawns or ticks.
//!
//! [`GameLoop::run_session`] drives the triggers from a [`Scheduler`] on a
//! virtual clock, so a full session runs in microseconds and is reproducible
//! for a given seed and source.

use crate::{
    collision::CollisionConfig,
    error::GameError,
    kf::{GazeFilter, ScalarKfConfig},
    predictor::{GazePredictor, PredictorConfig},
    round::{RoundConfig, RoundController},
    scheduler::{CadenceConfig, Scheduler, Trigger},
    session::{SessionAggregator, SessionConfig, SessionResult},
    source::GazeSource,
    spawner::SpawnerConfig,
    types::{Millis, Position, Target, TargetId},
};
use gaze_sensor::{Confidence, GazeSample, PlayArea, ScreenGeometry, SensorError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Which gaze point is hit-tested against targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HitPoint {
    /// Latency-compensated cursor from the predictor
    #[default]
    Predicted,
    /// Kalman-filtered gaze, no prediction
    Filtered,
}

/// Everything needed to build a [`GameLoop`]. Missing JSON fields take defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub screen: ScreenGeometry,
    pub filter: ScalarKfConfig,
    pub predictor: PredictorConfig,
    /// Also carries the play area
    pub spawner: SpawnerConfig,
    pub collision: CollisionConfig,
    pub round: RoundConfig,
    pub session: SessionConfig,
    pub cadence: CadenceConfig,
    pub hit_point: HitPoint,
    /// Seeds target placement and colours
    pub seed: u64,
}

impl GameConfig {
    pub fn play_area(&self) -> &PlayArea {
        &self.spawner.play_area
    }

    pub fn validate(&self) -> Result<(), GameError> {
        let fail = |msg: &str| Err(GameError::InvalidConfig(msg.to_string()));
        if !self.play_area().is_valid() {
            return fail("play area must have positive, finite dimensions");
        }
        if !(self.screen.fallback_width > 0.0 && self.screen.fallback_height > 0.0) {
            return fail("fallback screen size must be positive");
        }
        if self.session.total_rounds == 0 {
            return fail("a session needs at least one round");
        }
        if self.round.duration_s == 0 {
            return fail("round duration must be at least one second");
        }
        let c = &self.cadence;
        if c.observation_ms == 0 || c.frame_ms == 0 || c.lifecycle_ms == 0 || c.round_timer_ms == 0
        {
            return fail("cadences must be non-zero");
        }
        if !(self.spawner.target_radius > 0.0 && self.collision.collision_radius > 0.0) {
            return fail("target and collision radii must be positive");
        }
        if self.spawner.max_attempts == 0 {
            return fail("spawner needs at least one placement attempt");
        }
        if !(self.filter.measurement_noise > 0.0 && self.filter.process_noise >= 0.0) {
            return fail("filter noise must be non-negative, measurement noise positive");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tracking status
// ---------------------------------------------------------------------------

/// Health of the gaze source as seen by the observation trigger.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingStatus {
    /// Last poll produced a usable sample
    pub available: bool,
    pub last_confidence: Option<Confidence>,
    pub consecutive_failures: u32,
    /// Samples rejected as invalid (NaN, far off-screen)
    pub dropped_observations: u64,
    pub accepted_observations: u64,
}

// ---------------------------------------------------------------------------
// GameLoop
// ---------------------------------------------------------------------------

pub struct GameLoop {
    pub config: GameConfig,
    filter: GazeFilter,
    predictor: GazePredictor,
    session: SessionAggregator,
    scheduler: Scheduler,
    status: TrackingStatus,
    active: bool,
    last_frame_at: Millis,
    cursor: Option<Position>,
    result: Option<SessionResult>,
}

impl GameLoop {
    pub fn new(config: GameConfig) -> Result<Self, GameError> {
        config.validate()?;
        let round = RoundController::new(
            config.round.clone(),
            config.spawner.clone(),
            config.collision.clone(),
            config.seed,
        );
        Ok(Self {
            filter: GazeFilter::new(config.filter.clone()),
            predictor: GazePredictor::new(config.predictor.clone()),
            session: SessionAggregator::new(config.session.clone(), round),
            scheduler: Scheduler::new(&config.cadence, 0),
            status: TrackingStatus::default(),
            active: false,
            last_frame_at: 0,
            cursor: None,
            result: None,
            config,
        })
    }

    /// Reset the estimators and begin round 1 at `now`.
    pub fn start(&mut self, now: Millis) {
        self.filter.reset();
        self.predictor.reset();
        self.status = TrackingStatus::default();
        self.scheduler = Scheduler::new(&self.config.cadence, now);
        self.last_frame_at = now;
        self.cursor = None;
        self.result = None;
        self.active = true;
        self.session.start(now);
    }

    /// Stop all triggers. Idempotent.
    pub fn stop(&mut self) {
        if self.active {
            info!("game loop stopped");
        }
        self.active = false;
        self.session.stop();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    // -----------------------------------------------------------------------
    // Triggers
    // -----------------------------------------------------------------------

    /// Observation trigger: validate, rescale and filter one poll result.
    /// Returns the new filtered position.
    pub fn ingest(
        &mut self,
        polled: Result<GazeSample, SensorError>,
        now: Millis,
    ) -> Result<Position, GameError> {
        if !self.active {
            return Err(GameError::Inactive);
        }
        let point = polled.and_then(|sample| {
            self.status.last_confidence = Some(sample.confidence);
            self.config
                .screen
                .to_play_area(&sample, &self.config.spawner.play_area)
        });

        match point.map_err(GameError::from) {
            Ok(point) => {
                let filtered = self.filter.filter(point);
                if !self.predictor.is_seeded() {
                    self.predictor.reset_at(filtered);
                }
                if !self.status.available {
                    info!(at = now, "tracking available");
                }
                self.status.available = true;
                self.status.consecutive_failures = 0;
                self.status.accepted_observations += 1;
                Ok(filtered)
            }
            Err(err @ GameError::InvalidObservation { .. }) => {
                self.status.dropped_observations += 1;
                debug!(%err, "observation dropped");
                Err(err)
            }
            Err(err) => {
                if self.status.available || self.status.consecutive_failures == 0 {
                    warn!(%err, at = now, "tracking unavailable");
                }
                self.status.available = false;
                self.status.consecutive_failures += 1;
                Err(err)
            }
        }
    }

    /// Frame trigger: advance the predictor and hit-test. Returns popped ids.
    pub fn on_frame(&mut self, now: Millis, dt_s: f64) -> Vec<TargetId> {
        if !self.active {
            return Vec::new();
        }
        self.last_frame_at = now;
        // Nothing to show until the first accepted observation
        let Some(filtered) = self.filter.position() else {
            return Vec::new();
        };
        let predicted = self.predictor.advance(filtered, self.filter.velocity(), dt_s);
        let point = match self.config.hit_point {
            HitPoint::Predicted => predicted,
            HitPoint::Filtered => filtered,
        };
        self.cursor = Some(point);
        self.session.on_gaze(point, now)
    }

    pub fn on_lifecycle_tick(&mut self, now: Millis) {
        if !self.active {
            return;
        }
        self.session.on_lifecycle_tick(now);
    }

    /// Round-timer trigger. On session completion the loop stops itself and
    /// the result is returned.
    pub fn on_round_timer(&mut self, now: Millis) -> Option<SessionResult> {
        if !self.active {
            return None;
        }
        let result = self.session.on_timer_tick(now)?;
        self.result = Some(result.clone());
        self.stop();
        Some(result)
    }

    /// Run one trigger against `source`.
    pub fn dispatch<S: GazeSource + ?Sized>(
        &mut self,
        trigger: Trigger,
        source: &mut S,
        now: Millis,
    ) -> Option<SessionResult> {
        if !self.active {
            return None;
        }
        match trigger {
            Trigger::Observation => {
                // Failures are already counted and logged
                let _ = self.ingest(source.poll_gaze(now), now);
                None
            }
            Trigger::Frame => {
                let dt_s = now.saturating_sub(self.last_frame_at) as f64 / 1_000.0;
                self.on_frame(now, dt_s);
                source.observe_targets(self.session.targets());
                None
            }
            Trigger::Lifecycle => {
                self.on_lifecycle_tick(now);
                None
            }
            Trigger::RoundTimer => self.on_round_timer(now),
        }
    }

    /// Run all triggers due up to and including `until`. Returns the session
    /// result if the session completed.
    pub fn advance_to<S: GazeSource + ?Sized>(
        &mut self,
        source: &mut S,
        until: Millis,
    ) -> Option<SessionResult> {
        while self.active && self.scheduler.next_deadline() <= until {
            let now = self.scheduler.next_deadline();
            for trigger in self.scheduler.due(now) {
                if let Some(result) = self.dispatch(trigger, source, now) {
                    return Some(result);
                }
            }
        }
        None
    }

    /// Play a whole session on a virtual clock starting at `start`.
    pub fn run_session<S: GazeSource + ?Sized>(
        &mut self,
        source: &mut S,
        start: Millis,
    ) -> SessionResult {
        self.start(start);
        if let Some(result) = self.advance_to(source, Millis::MAX) {
            return result;
        }
        // Only reachable when stopped externally
        SessionResult::from_rounds(self.session.rounds().to_vec())
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn status(&self) -> &TrackingStatus {
        &self.status
    }

    /// Last hit-tested point.
    pub fn cursor(&self) -> Option<Position> {
        self.cursor
    }

    pub fn filtered_position(&self) -> Option<Position> {
        self.filter.position()
    }

    pub fn predicted_position(&self) -> Position {
        self.predictor.position()
    }

    pub fn targets(&self) -> &[Target] {
        self.session.targets()
    }

    pub fn session(&self) -> &SessionAggregator {
        &self.session
    }

    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    pub fn next_deadline(&self) -> Millis {
        self.scheduler.next_deadline()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
