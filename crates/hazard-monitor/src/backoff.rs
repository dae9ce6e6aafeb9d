//! Exponential retry backoff with jitter for periodic upstream calls.
//!
//! Keeps a failing hazard backend from being hammered on every refresh tick.

use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::Instant;

const JITTER_RATIO: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct RetryBackoff {
    initial: Duration,
    ceiling: Duration,
    delay: Duration,
    retry_at: Instant,
    failures: u32,
}

impl RetryBackoff {
    pub fn new(initial: Duration, ceiling: Duration) -> Self {
        let initial = initial.max(Duration::from_millis(1));
        Self {
            initial,
            ceiling: ceiling.max(initial),
            delay: initial,
            retry_at: Instant::now(),
            failures: 0,
        }
    }

    /// True once the current wait has elapsed.
    pub fn is_ready(&self) -> bool {
        Instant::now() >= self.retry_at
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn on_success(&mut self) {
        self.delay = self.initial;
        self.retry_at = Instant::now();
        self.failures = 0;
    }

    /// Double the wait (up to the ceiling) and return the jittered delay.
    pub fn on_failure(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        self.delay = self.delay.saturating_mul(2).min(self.ceiling);
        let wait = jittered(self.delay);
        self.retry_at = Instant::now() + wait;
        wait
    }
}

/// Add up to 20% random delay, seeded from the clock's sub-second nanos.
fn jittered(delay: Duration) -> Duration {
    let max_extra_ms = (delay.as_millis() as f64 * JITTER_RATIO) as u64;
    if max_extra_ms == 0 {
        return delay;
    }
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_nanos()))
        .unwrap_or(0);
    delay + Duration::from_millis(seed % (max_extra_ms + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_backoff_is_ready() {
        let backoff = RetryBackoff::new(Duration::from_secs(60), Duration::from_secs(600));
        assert!(backoff.is_ready());
        assert_eq!(backoff.failures(), 0);
    }

    #[test]
    fn failure_delays_until_success() {
        let mut backoff = RetryBackoff::new(Duration::from_millis(100), Duration::from_secs(1));
        let wait = backoff.on_failure();
        assert!(wait >= Duration::from_millis(200));
        assert!(wait <= Duration::from_millis(240));
        assert!(!backoff.is_ready());
        assert_eq!(backoff.failures(), 1);

        backoff.on_success();
        assert!(backoff.is_ready());
        assert_eq!(backoff.failures(), 0);
    }

    #[test]
    fn delay_is_capped() {
        let mut backoff = RetryBackoff::new(Duration::from_millis(10), Duration::from_millis(30));
        backoff.on_failure();
        backoff.on_failure();
        let wait = backoff.on_failure();
        assert!(wait >= Duration::from_millis(30));
        assert!(wait <= Duration::from_millis(36));
    }
}
