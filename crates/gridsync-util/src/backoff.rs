//! Exponential backoff with jitter, for the `append` retry loop a
//! store implementation runs on a `seq` conflict.

use std::time::Duration;

use rand::Rng;

/// A capped exponential backoff with full jitter. Each call to
/// [`Backoff::next_delay`] doubles the base delay (up to `max`) and
/// returns a uniformly random duration between zero and that value,
/// which avoids every retrying writer waking up in lockstep.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        Backoff {
            base,
            max,
            attempt: 0,
        }
    }

    /// A backoff tuned for append-conflict retries: 5ms base, 200ms
    /// cap.
    #[must_use]
    pub fn for_append_retry() -> Self {
        Self::new(Duration::from_millis(5), Duration::from_millis(200))
    }

    /// Returns the delay to wait before the next attempt, advancing
    /// the internal attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        let exp = self.base.saturating_mul(1u32.checked_shl(self.attempt).unwrap_or(u32::MAX));
        let capped = exp.min(self.max);
        self.attempt = self.attempt.saturating_add(1);

        let jitter_ms = rand::thread_rng().gen_range(0..=capped.as_millis().max(1) as u64);
        Duration::from_millis(jitter_ms)
    }

    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_are_capped() {
        let mut backoff = Backoff::new(Duration::from_millis(5), Duration::from_millis(50));
        for _ in 0..20 {
            let delay = backoff.next_delay();
            assert!(delay <= Duration::from_millis(50));
        }
    }

    #[test]
    fn attempt_counter_advances() {
        let mut backoff = Backoff::for_append_retry();
        assert_eq!(backoff.attempt(), 0);
        backoff.next_delay();
        assert_eq!(backoff.attempt(), 1);
    }
}
