//! Periodic triggers of the game loop on an explicit clock.
//!
//! Four independent cadences drive the game:
//!
//! | Trigger       | Default | Work                                   |
//! |---------------|---------|----------------------------------------|
//! | `Observation` | 33 ms   | poll the gaze source, run the filters  |
//! | `Frame`       | 16 ms   | advance the predictor, hit-test        |
//! | `Lifecycle`   | 50 ms   | expire targets, fallback spawn         |
//! | `RoundTimer`  | 1000 ms | countdowns and round/session timing    |
//!
//! The scheduler holds no clock of its own: callers pass `now` in, either
//! from a virtual clock (simulation, tests) or from wall time. When several
//! triggers fall due together they are returned in the order above, so a
//! frame always sees the observation taken at the same instant and the round
//! timer runs after any hit at that instant.

use crate::types::Millis;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    pub observation_ms: Millis,
    pub frame_ms: Millis,
    pub lifecycle_ms: Millis,
    pub round_timer_ms: Millis,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            observation_ms: 33,
            frame_ms: 16,
            lifecycle_ms: 50,
            round_timer_ms: 1_000,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Trigger {
    Observation,
    Frame,
    Lifecycle,
    RoundTimer,
}

/// Fixed-period timer. Fires at `start + k·period` for k ≥ 1; a late caller
/// catches up one firing per poll, never skipping one.
#[derive(Clone, Copy, Debug)]
pub struct PeriodicTimer {
    pub period: Millis,
    next_due: Millis,
}

impl PeriodicTimer {
    pub fn new(period: Millis, start: Millis) -> Self {
        let period = period.max(1);
        Self {
            period,
            next_due: start + period,
        }
    }

    pub fn next_due(&self) -> Millis {
        self.next_due
    }

    /// Consume one firing if due at `now`.
    pub fn poll(&mut self, now: Millis) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due += self.period;
        true
    }
}

pub struct Scheduler {
    timers: [(Trigger, PeriodicTimer); 4],
}

impl Scheduler {
    pub fn new(cadence: &CadenceConfig, start: Millis) -> Self {
        Self {
            timers: [
                (Trigger::Observation, PeriodicTimer::new(cadence.observation_ms, start)),
                (Trigger::Frame, PeriodicTimer::new(cadence.frame_ms, start)),
                (Trigger::Lifecycle, PeriodicTimer::new(cadence.lifecycle_ms, start)),
                (Trigger::RoundTimer, PeriodicTimer::new(cadence.round_timer_ms, start)),
            ],
        }
    }

    /// Triggers due at `now`, each at most once, in fixed order.
    pub fn due(&mut self, now: Millis) -> Vec<Trigger> {
        self.timers
            .iter_mut()
            .filter_map(|(trigger, timer)| timer.poll(now).then_some(*trigger))
            .collect()
    }

    /// Earliest time at which any trigger is due.
    pub fn next_deadline(&self) -> Millis {
        self.timers
            .iter()
            .map(|(_, t)| t.next_due())
            .min()
            .unwrap_or(Millis::MAX)
    }

    pub fn period(&self, trigger: Trigger) -> Millis {
        self.timers
            .iter()
            .find(|(t, _)| *t == trigger)
            .map(|(_, timer)| timer.period)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn periodic_timer_fires_on_multiples() {
        let mut t = PeriodicTimer::new(50, 1_000);
        assert!(!t.poll(1_049));
        assert!(t.poll(1_050));
        assert!(!t.poll(1_050));
        // Late: catches up one firing per poll
        assert!(t.poll(1_200));
        assert!(t.poll(1_200));
        assert_eq!(t.next_due(), 1_200);
    }

    #[test]
    fn simultaneous_triggers_are_ordered() {
        let cadence = CadenceConfig {
            observation_ms: 10,
            frame_ms: 10,
            lifecycle_ms: 10,
            round_timer_ms: 10,
        };
        let mut s = Scheduler::new(&cadence, 0);
        assert_eq!(
            s.due(10),
            vec![
                Trigger::Observation,
                Trigger::Frame,
                Trigger::Lifecycle,
                Trigger::RoundTimer
            ]
        );
    }

    #[test]
    fn counts_over_one_second() {
        let mut s = Scheduler::new(&CadenceConfig::default(), 0);
        let mut counts = std::collections::HashMap::new();
        let mut now = 0;
        while now <= 1_000 {
            now = s.next_deadline();
            if now > 1_000 {
                break;
            }
            for t in s.due(now) {
                *counts.entry(t).or_insert(0u32) += 1;
            }
        }
        assert_eq!(counts[&Trigger::Observation], 30);
        assert_eq!(counts[&Trigger::Frame], 62);
        assert_eq!(counts[&Trigger::Lifecycle], 20);
        assert_eq!(counts[&Trigger::RoundTimer], 1);
    }

    #[test]
    fn zero_period_is_clamped() {
        let mut t = PeriodicTimer::new(0, 0);
        assert_eq!(t.period, 1);
        assert!(t.poll(1));
    }
}
