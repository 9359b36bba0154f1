//! Real-time driver: the four triggers on tokio intervals, one task.
//!
//! All intervals are multiplexed by a single `select!` loop that owns the
//! [`GameLoop`], so triggers are serialized without locks. `speed` scales
//! the wall clock (2.0 plays a session in half the time).

use anyhow::Result;
use gaze_core::{
    game_loop::GameLoop,
    scheduler::Trigger,
    session::SessionResult,
    source::GazeSource,
    types::Millis,
};
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::info;

fn periodic(period_ms: Millis, speed: f64, missed: MissedTickBehavior) -> Interval {
    let period = Duration::from_secs_f64(period_ms.max(1) as f64 / 1_000.0 / speed);
    let mut iv = interval_at(Instant::now() + period, period);
    iv.set_missed_tick_behavior(missed);
    iv
}

pub async fn run_realtime<S: GazeSource + ?Sized>(
    game: &mut GameLoop,
    source: &mut S,
    speed: f64,
) -> Result<SessionResult> {
    anyhow::ensure!(speed.is_finite() && speed > 0.0, "speed must be positive");
    let cadence = game.config.cadence.clone();

    let mut observation = periodic(cadence.observation_ms, speed, MissedTickBehavior::Skip);
    let mut frame = periodic(cadence.frame_ms, speed, MissedTickBehavior::Skip);
    let mut lifecycle = periodic(cadence.lifecycle_ms, speed, MissedTickBehavior::Delay);
    // The round timer is authoritative: late ticks are delivered, not dropped
    let mut round_timer = periodic(cadence.round_timer_ms, speed, MissedTickBehavior::Burst);

    let start = Instant::now();
    let clock = || (start.elapsed().as_secs_f64() * 1_000.0 * speed) as Millis;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    game.start(clock());
    info!(speed, "real-time session started");

    while game.is_active() {
        let trigger = tokio::select! {
            biased;
            _ = &mut ctrl_c => {
                info!("interrupted");
                game.stop();
                break;
            }
            _ = observation.tick() => Trigger::Observation,
            _ = frame.tick() => Trigger::Frame,
            _ = lifecycle.tick() => Trigger::Lifecycle,
            _ = round_timer.tick() => Trigger::RoundTimer,
        };
        if let Some(result) = game.dispatch(trigger, source, clock()) {
            return Ok(result);
        }
    }

    Ok(SessionResult::from_rounds(game.session().rounds().to_vec()))
}
