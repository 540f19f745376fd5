//! Exponential backoff with optional jitter.

use std::time::Duration;

use rand::Rng;

/// Calculate the bounded exponential delay that follows failed attempt `attempt` (1-based).
///
/// The delay is `multiplier * 2^(attempt - 1)` clamped into `[min, max]`.
pub fn calculate_backoff(attempt: u32, multiplier_ms: u64, min_ms: u64, max_ms: u64) -> Duration {
    let exponent = attempt.max(1) - 1;
    let exponential_base = 2u64.saturating_pow(exponent);
    let delay_ms = multiplier_ms.saturating_mul(exponential_base);
    Duration::from_millis(delay_ms.max(min_ms).min(max_ms))
}

/// Backoff schedule used between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    multiplier: Duration,
    min: Duration,
    max: Duration,
    jitter_ratio: f64,
}

impl Backoff {
    pub fn new(multiplier: Duration, min: Duration, max: Duration) -> Self {
        Self {
            multiplier,
            min: min.min(max),
            max,
            jitter_ratio: 0.0,
        }
    }

    /// Add up to `ratio * delay` of random extra delay, still capped at the maximum.
    pub fn with_jitter(mut self, ratio: f64) -> Self {
        self.jitter_ratio = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 };
        self
    }

    /// No delay at all; handy for tests.
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, Duration::ZERO)
    }

    fn base_delay(&self, attempt: u32) -> Duration {
        calculate_backoff(
            attempt,
            self.multiplier.as_millis() as u64,
            self.min.as_millis() as u64,
            self.max.as_millis() as u64,
        )
    }

    fn jitter_range(&self, base: Duration) -> u64 {
        (base.as_millis() as f64 * self.jitter_ratio) as u64
    }

    /// Delay to wait after failed attempt `attempt` (1-based) before the next one.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if self.jitter_ratio <= 0.0 {
            return base;
        }

        let jitter_range = self.jitter_range(base);
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(0..=jitter_range)
        } else {
            0
        };
        (base + Duration::from_millis(jitter)).min(self.max)
    }

    /// Upper bound of [`Backoff::delay`] for `attempt`, jitter included.
    pub fn max_delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        (base + Duration::from_millis(self.jitter_range(base))).min(self.max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(6),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        // multiplier 1s, window [2s, 6s]
        assert_eq!(calculate_backoff(1, 1000, 2000, 6000), Duration::from_secs(2));
        assert_eq!(calculate_backoff(2, 1000, 2000, 6000), Duration::from_secs(2));
        assert_eq!(calculate_backoff(3, 1000, 2000, 6000), Duration::from_secs(4));
        assert_eq!(calculate_backoff(4, 1000, 2000, 6000), Duration::from_secs(6));
        assert_eq!(calculate_backoff(40, 1000, 2000, 6000), Duration::from_secs(6));
    }

    #[test]
    fn test_delays_are_bounded_and_non_decreasing() {
        let backoff = Backoff::default();
        let mut previous = Duration::ZERO;
        for attempt in 1..=20 {
            let delay = backoff.delay(attempt);
            assert!(delay >= backoff.min, "attempt {} below min: {:?}", attempt, delay);
            assert!(delay <= backoff.max, "attempt {} above max: {:?}", attempt, delay);
            assert!(delay >= previous, "attempt {} decreased: {:?} < {:?}", attempt, delay, previous);
            previous = delay;
        }
    }

    #[test]
    fn test_huge_attempt_does_not_overflow() {
        assert_eq!(calculate_backoff(u32::MAX, u64::MAX, 0, 500), Duration::from_millis(500));
    }

    #[test]
    fn test_jitter_stays_within_window() {
        let backoff = Backoff::default().with_jitter(0.5);
        for attempt in 1..=10 {
            let delay = backoff.delay(attempt);
            assert!(delay >= backoff.min);
            assert!(delay <= backoff.max);
        }
    }

    #[test]
    fn test_max_delay_bounds_jittered_delay() {
        let backoff = Backoff::new(
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(10),
        )
        .with_jitter(0.5);
        assert_eq!(backoff.max_delay(1), Duration::from_secs(3));
        assert_eq!(backoff.max_delay(4), Duration::from_secs(10));
        for attempt in 1..=6 {
            assert!(backoff.delay(attempt) <= backoff.max_delay(attempt));
        }
        assert_eq!(Backoff::default().max_delay(3), Duration::from_secs(4));
    }

    #[test]
    fn test_min_above_max_collapses_to_max() {
        let backoff = Backoff::new(
            Duration::from_millis(10),
            Duration::from_millis(900),
            Duration::from_millis(100),
        );
        assert_eq!(backoff.delay(1), Duration::from_millis(100));
    }
}
