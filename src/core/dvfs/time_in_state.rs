use super::table::DvfsTable;
use crate::common::TimeInStateEntry;
use std::time::{Duration, Instant};

/// Cumulative residency per step.
#[derive(Debug, Clone)]
pub struct TimeInState {
    totals: Vec<Duration>,
    epoch: Instant,
}

impl TimeInState {
    pub fn new(steps: usize, now: Instant) -> Self {
        Self {
            totals: vec![Duration::ZERO; steps.max(1)],
            epoch: now,
        }
    }

    /// Charge the time since the last call to `step`.
    pub fn accrue(&mut self, step: usize, now: Instant) {
        let elapsed = now.saturating_duration_since(self.epoch);
        let idx = step % self.totals.len();
        self.totals[idx] += elapsed;
        self.epoch = self.epoch.max(now);
    }

    pub fn reset(&mut self, now: Instant) {
        self.totals.iter_mut().for_each(|t| *t = Duration::ZERO);
        self.epoch = now;
    }

    #[cfg(test)]
    fn totals(&self) -> &[Duration] {
        &self.totals
    }

    #[cfg(test)]
    fn total(&self) -> Duration {
        self.totals.iter().sum()
    }

    /// Rows are cut from the running total, so they always add up to the
    /// whole elapsed milliseconds.
    pub fn entries(&self, table: &DvfsTable) -> Vec<TimeInStateEntry> {
        let mut running = Duration::ZERO;
        table
            .steps()
            .iter()
            .zip(&self.totals)
            .map(|(op, t)| {
                let before = running.as_millis();
                running += *t;
                TimeInStateEntry {
                    clock_mhz: op.clock_mhz,
                    time_ms: (running.as_millis() - before) as u64,
                }
            })
            .collect()
    }
}
