//! Backoff between attempts of a retried transaction

use config::RetryConfig;
use rand::Rng;
use std::time::Duration;

/// Delay before retrying after failed attempt number `attempt` (1-based).
///
/// Exponential from `base_delay_ms`, capped at `max_delay_ms`, then shortened
/// by a random share of up to `jitter` so that conflicting workers spread out.
pub fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(20);
    let ceiling = config
        .base_delay_ms
        .saturating_mul(1u64 << exponent)
        .min(config.max_delay_ms);

    let jitter = config.jitter.clamp(0.0, 1.0);
    if jitter == 0.0 || ceiling == 0 {
        return Duration::from_millis(ceiling);
    }

    let factor = 1.0 - rand::rng().random_range(0.0..=jitter);
    Duration::from_millis((ceiling as f64 * factor).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retry_config(jitter: f64) -> RetryConfig {
        RetryConfig {
            base_delay_ms: 5,
            max_delay_ms: 250,
            jitter,
            ..RetryConfig::default()
        }
    }

    #[test]
    fn test_delay_grows_exponentially_without_jitter() {
        let config = retry_config(0.0);
        let delays: Vec<u64> = (1..=8)
            .map(|attempt| backoff_delay(&config, attempt).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![5, 10, 20, 40, 80, 160, 250, 250]);
    }

    #[test]
    fn test_delay_stays_within_bounds_with_jitter() {
        let config = retry_config(0.5);
        for attempt in 1..=30 {
            let ceiling = (5u64 << (attempt - 1).min(20)).min(250);
            for _ in 0..20 {
                let delay = backoff_delay(&config, attempt).as_millis() as u64;
                assert!(delay <= ceiling, "attempt {attempt}: {delay} > {ceiling}");
                assert!(delay * 2 + 1 >= ceiling, "attempt {attempt}: {delay} too short");
            }
        }
    }

    #[test]
    fn test_large_attempt_numbers_do_not_overflow() {
        let config = retry_config(0.0);
        assert_eq!(backoff_delay(&config, u32::MAX), Duration::from_millis(250));
        assert_eq!(backoff_delay(&config, 0), Duration::from_millis(5));
    }
}
