//! Bounded polling.
//!
//! Tab activation and frame injection are asynchronous and not observable
//! from CDP, so both are probed on a schedule until a structural signal shows
//! up or the attempt budget runs out. The schedule is an `ExponentialBackoff`
//! with jitter disabled; a multiplier of `1.0` gives a fixed interval.

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Probes attempted, including the first. `0` is treated as `1`.
    pub max_attempts: u32,
    /// Delay after the first failed probe.
    pub interval_ms: u64,
    pub backoff_multiplier: f64,
    /// Ceiling for the grown interval.
    pub max_interval_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(10, 250)
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, interval_ms: u64) -> Self {
        Self {
            max_attempts,
            interval_ms,
            backoff_multiplier: 1.0,
            max_interval_ms: interval_ms,
        }
    }

    fn schedule(&self) -> ExponentialBackoff {
        let initial = Duration::from_millis(self.interval_ms);
        ExponentialBackoffBuilder::new()
            .with_initial_interval(initial)
            .with_randomization_factor(0.0)
            .with_multiplier(self.backoff_multiplier.max(1.0))
            .with_max_interval(Duration::from_millis(self.max_interval_ms).max(initial))
            .with_max_elapsed_time(None)
            .build()
    }

    /// Delays between consecutive probes (`max_attempts - 1` of them).
    pub fn delays(&self) -> Vec<Duration> {
        let mut schedule = self.schedule();
        (1..self.max_attempts.max(1))
            .map(|_| schedule.next_backoff().unwrap_or(schedule.max_interval))
            .collect()
    }

    /// Run `probe` until it yields `Some`, sleeping between attempts.
    /// Returns `None` when the budget is exhausted.
    pub async fn poll<T, F, Fut>(&self, mut probe: F) -> Option<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut schedule = self.schedule();
        for attempt in 1..=attempts {
            if let Some(found) = probe(attempt).await {
                return Some(found);
            }
            if attempt < attempts {
                let delay = schedule.next_backoff().unwrap_or(schedule.max_interval);
                tokio::time::sleep(delay).await;
            }
        }
        None
    }
}
