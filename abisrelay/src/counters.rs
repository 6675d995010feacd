//! counters - increment-only statistics shared between a relay and its stats task

use async_std::task::{self, JoinHandle};
use atomic_counter::{AtomicCounter, RelaxedCounter};
use slog::{Logger, info, warn};
use std::sync::Arc;
use std::time::Duration;
use stop_token::StopToken;
use stop_token::prelude::*;

const STATS_INTERVAL: Duration = Duration::from_secs(5);

/// A fixed set of counters addressed by index.  Counters at or beyond `first_warn` count
/// dropped traffic or failures and are reported as warnings.
pub struct Counters {
    names: &'static [&'static str],
    first_warn: usize,
    values: Vec<RelaxedCounter>,
}

impl Counters {
    pub fn new(names: &'static [&'static str], first_warn: usize) -> Arc<Self> {
        Arc::new(Counters {
            names,
            first_warn,
            values: names.iter().map(|_| RelaxedCounter::new(0)).collect(),
        })
    }

    pub fn incr(&self, idx: usize) {
        self.values[idx].inc();
    }

    pub fn snapshot(&self) -> Vec<(&'static str, usize)> {
        self.names
            .iter()
            .zip(self.values.iter())
            .map(|(name, value)| (*name, value.get()))
            .collect()
    }

    fn render(&self, counts: &[usize], range: std::ops::Range<usize>) -> String {
        range
            .map(|idx| format!("{}={}", self.names[idx], counts[idx]))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Log the counters every few seconds, but only when they have moved.
pub fn spawn_stats_task(
    logger: Logger,
    counters: Arc<Counters>,
    stop: StopToken,
) -> JoinHandle<()> {
    task::spawn(async move {
        let mut last = vec![0usize; counters.names.len()];
        let first_warn = counters.first_warn;
        loop {
            if task::sleep(STATS_INTERVAL)
                .timeout_at(stop.clone())
                .await
                .is_err()
            {
                return;
            }
            let now: Vec<usize> = counters.values.iter().map(|c| c.get()).collect();
            if now[..first_warn] != last[..first_warn] {
                info!(&logger, "{}", counters.render(&now, 0..first_warn));
            }
            if now[first_warn..] != last[first_warn..] {
                warn!(
                    &logger,
                    "DROPS {}",
                    counters.render(&now, first_warn..now.len())
                );
            }
            last = now;
        }
    })
}
