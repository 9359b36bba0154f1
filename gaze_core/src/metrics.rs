//! Round statistics: pop counts, accuracy and time-to-pop distribution.

use crate::types::{Millis, TargetStat};
use serde::{Deserialize, Serialize};

/// Popped share of spawned targets, in percent. Zero when nothing spawned or
/// nothing was popped.
pub fn accuracy(popped: usize, spawned: usize) -> f64 {
    if spawned == 0 || popped == 0 {
        return 0.0;
    }
    popped as f64 / spawned as f64 * 100.0
}

/// Summary of one round's target stats.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundStatistics {
    pub targets_spawned: usize,
    pub targets_popped: usize,
    /// Percent, see [`accuracy`]
    pub accuracy: f64,
    /// Mean time-to-pop over popped targets (ms)
    pub mean_time_to_pop_ms: f64,
    /// Population variance of time-to-pop (ms²)
    pub time_to_pop_variance: f64,
    pub min_time_to_pop_ms: Millis,
    pub max_time_to_pop_ms: Millis,
    /// Targets spawned per second of game time
    pub targets_per_second: f64,
}

impl RoundStatistics {
    pub fn from_stats(stats: &[TargetStat], game_time_s: f64) -> Self {
        let times: Vec<Millis> = stats.iter().filter_map(|s| s.time_to_pop_ms).collect();
        let popped = stats.iter().filter(|s| s.is_popped()).count();

        let targets_per_second = if game_time_s > 0.0 {
            stats.len() as f64 / game_time_s
        } else {
            0.0
        };

        let mut out = Self {
            targets_spawned: stats.len(),
            targets_popped: popped,
            accuracy: accuracy(popped, stats.len()),
            targets_per_second,
            ..Default::default()
        };
        if times.is_empty() {
            return out;
        }

        let n = times.len() as f64;
        let mean = times.iter().map(|&t| t as f64).sum::<f64>() / n;
        out.mean_time_to_pop_ms = mean;
        out.time_to_pop_variance = times
            .iter()
            .map(|&t| {
                let d = t as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        out.min_time_to_pop_ms = times.iter().copied().min().unwrap_or(0);
        out.max_time_to_pop_ms = times.iter().copied().max().unwrap_or(0);
        out
    }

    /// Standard deviation of time-to-pop (ms).
    pub fn time_to_pop_std_dev(&self) -> f64 {
        self.time_to_pop_variance.sqrt()
    }
}
