//! Replay: record gaze polls to JSON and play them back deterministically.
//!
//! A [`GazeTrace`] stores every poll result of a session together with the
//! game configuration it was played with. Replaying the trace through a
//! [`ReplaySource`] with that configuration reproduces the session exactly,
//! since the game loop polls on the same virtual schedule.

use gaze_core::{
    game_loop::GameConfig,
    session::SessionResult,
    source::GazeSource,
    types::{Millis, Target},
};
use gaze_sensor::{GazeSample, SensorError};
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::warn;

/// One recorded poll outcome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PollRecord {
    Sample { sample: GazeSample },
    LostTracking,
    Unavailable { message: String },
}

impl PollRecord {
    pub fn from_result(result: &Result<GazeSample, SensorError>) -> Self {
        match result {
            Ok(sample) => Self::Sample {
                sample: sample.clone(),
            },
            Err(SensorError::LostTracking) => Self::LostTracking,
            Err(SensorError::Unavailable(message)) => Self::Unavailable {
                message: message.clone(),
            },
            Err(other) => Self::Unavailable {
                message: other.to_string(),
            },
        }
    }

    pub fn to_result(&self) -> Result<GazeSample, SensorError> {
        match self {
            Self::Sample { sample } => Ok(sample.clone()),
            Self::LostTracking => Err(SensorError::LostTracking),
            Self::Unavailable { message } => Err(SensorError::Unavailable(message.clone())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TracePoll {
    pub at: Millis,
    pub record: PollRecord,
}

/// A full recorded session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GazeTrace {
    pub scenario_name: String,
    pub seed: u64,
    pub game: GameConfig,
    /// All polls in chronological order
    pub polls: Vec<TracePoll>,
    /// Result of the recorded run, for comparison on replay
    pub result: Option<SessionResult>,
}

impl GazeTrace {
    pub fn new(scenario_name: impl Into<String>, seed: u64, game: GameConfig) -> Self {
        Self {
            scenario_name: scenario_name.into(),
            seed,
            game,
            polls: Vec::new(),
            result: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Recording
// ---------------------------------------------------------------------------

/// Wraps a source and records every poll it answers.
pub struct RecordingSource<S> {
    inner: S,
    polls: Vec<TracePoll>,
}

impl<S: GazeSource> RecordingSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            polls: Vec::new(),
        }
    }

    pub fn into_polls(self) -> Vec<TracePoll> {
        self.polls
    }
}

impl<S: GazeSource> GazeSource for RecordingSource<S> {
    fn poll_gaze(&mut self, now: Millis) -> Result<GazeSample, SensorError> {
        let result = self.inner.poll_gaze(now);
        self.polls.push(TracePoll {
            at: now,
            record: PollRecord::from_result(&result),
        });
        result
    }

    fn observe_targets(&mut self, targets: &[Target]) {
        self.inner.observe_targets(targets);
    }
}

// ---------------------------------------------------------------------------
// Playback
// ---------------------------------------------------------------------------

/// Answers polls from a recorded trace, in order.
pub struct ReplaySource {
    polls: Vec<TracePoll>,
    cursor: usize,
    mismatches: u64,
}

impl ReplaySource {
    pub fn new(trace: &GazeTrace) -> Self {
        Self {
            polls: trace.polls.clone(),
            cursor: 0,
            mismatches: 0,
        }
    }

    /// Polls whose time differed from the recorded one.
    pub fn mismatches(&self) -> u64 {
        self.mismatches
    }

    pub fn remaining(&self) -> usize {
        self.polls.len() - self.cursor
    }
}

impl GazeSource for ReplaySource {
    fn poll_gaze(&mut self, now: Millis) -> Result<GazeSample, SensorError> {
        let Some(poll) = self.polls.get(self.cursor) else {
            return Err(SensorError::Unavailable("trace exhausted".into()));
        };
        self.cursor += 1;
        if poll.at != now {
            if self.mismatches == 0 {
                warn!(recorded = poll.at, now, "replay schedule diverged");
            }
            self.mismatches += 1;
        }
        poll.record.to_result()
    }
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Save a trace to a JSON file.
pub fn save_trace(trace: &GazeTrace, path: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, trace)?;
    Ok(())
}

/// Load a trace from a JSON file.
pub fn load_trace(path: &Path) -> anyhow::Result<GazeTrace> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    let trace: GazeTrace = serde_json::from_reader(reader)?;
    Ok(trace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::{Scenario, ScenarioKind};
    use gaze_core::{GameLoop, HitPoint};

    fn record(kind: ScenarioKind, seed: u64) -> GazeTrace {
        let scenario = Scenario::build(kind, seed);
        let game_cfg = GameConfig {
            hit_point: HitPoint::Filtered,
            seed,
            ..Default::default()
        };
        let mut game = GameLoop::new(game_cfg.clone()).unwrap();
        let mut source = RecordingSource::new(scenario.viewer());
        let result = game.run_session(&mut source, 0);

        let mut trace = GazeTrace::new(scenario.name, seed, game_cfg);
        trace.polls = source.into_polls();
        trace.result = Some(result);
        trace
    }

    #[test]
    fn replay_reproduces_the_session() {
        let trace = record(ScenarioKind::Flaky, 12);
        assert!(trace
            .polls
            .iter()
            .any(|p| matches!(p.record, PollRecord::Unavailable { .. })));

        let path = std::env::temp_dir().join(format!("gaze_trace_{}.json", std::process::id()));
        save_trace(&trace, &path).unwrap();
        let loaded = load_trace(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded.polls, trace.polls);

        let mut game = GameLoop::new(loaded.game.clone()).unwrap();
        let mut replay = ReplaySource::new(&loaded);
        let replayed = game.run_session(&mut replay, 0);
        assert_eq!(Some(replayed), trace.result);
        assert_eq!(replay.mismatches(), 0);
        assert_eq!(replay.remaining(), 0);
    }

    #[test]
    fn exhausted_trace_reports_unavailable() {
        let mut replay = ReplaySource::new(&GazeTrace::new("empty", 0, GameConfig::default()));
        assert!(matches!(
            replay.poll_gaze(0),
            Err(SensorError::Unavailable(_))
        ));
    }

    #[test]
    fn poll_records_map_back_to_errors() {
        let lost = PollRecord::from_result(&Err(SensorError::LostTracking));
        assert_eq!(lost.to_result(), Err(SensorError::LostTracking));
        let json = serde_json::to_string(&lost).unwrap();
        assert_eq!(json, r#"{"kind":"lost_tracking"}"#);
    }
}
