use crate::config::RetryConfig;
use rand::Rng;
use std::time::Duration;

/// Capped exponential backoff with full jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    max_attempts: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration, max_attempts: u32) -> Self {
        Backoff {
            base,
            max: max.max(base),
            max_attempts,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            Duration::from_secs(config.base_delay_seconds),
            Duration::from_secs(config.max_delay_seconds),
            config.max_attempts,
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// `min(max, base * 2^attempt)`
    pub fn ceiling(&self, attempt: u32) -> Duration {
        self.base
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max)
    }

    /// Uniform in `[0, ceiling(attempt)]`
    pub fn delay<R: Rng>(&self, attempt: u32, rng: &mut R) -> Duration {
        let ceiling = self.ceiling(attempt);
        if ceiling.is_zero() {
            return ceiling;
        }
        let millis = u64::try_from(ceiling.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rng.random_range(0..=millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn test_ceiling_doubles_then_caps() {
        let backoff = Backoff::new(Duration::from_secs(30), Duration::from_secs(300), 3);
        let ceilings: Vec<u64> = (0..6).map(|a| backoff.ceiling(a).as_secs()).collect();
        assert_eq!(ceilings, vec![30, 60, 120, 240, 300, 300]);
        assert_eq!(backoff.ceiling(u32::MAX), Duration::from_secs(300));
    }

    #[test]
    fn test_delay_stays_within_ceiling() {
        let backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(2), 5);
        let mut rng = SmallRng::seed_from_u64(7);
        for attempt in 0..8 {
            for _ in 0..50 {
                assert!(backoff.delay(attempt, &mut rng) <= backoff.ceiling(attempt));
            }
        }
    }

    #[test]
    fn test_jitter_spreads_delays() {
        let backoff = Backoff::new(Duration::from_secs(10), Duration::from_secs(10), 1);
        let mut rng = SmallRng::seed_from_u64(42);
        let delays: std::collections::HashSet<Duration> =
            (0..20).map(|_| backoff.delay(0, &mut rng)).collect();
        assert!(delays.len() > 1);
    }

    #[test]
    fn test_max_never_below_base() {
        let backoff = Backoff::new(Duration::from_secs(60), Duration::from_secs(5), 1);
        assert_eq!(backoff.ceiling(0), Duration::from_secs(60));
    }

    #[test]
    fn test_from_config() {
        let config = RetryConfig {
            base_delay_seconds: 15,
            max_delay_seconds: 120,
            max_attempts: 4,
        };
        let backoff = Backoff::from_config(&config);
        assert_eq!(backoff.max_attempts(), 4);
        assert_eq!(backoff.ceiling(1), Duration::from_secs(30));
    }
}
