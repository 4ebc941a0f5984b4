use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::StartStopError;

/// Jittered exponential backoff settings for convergence polling.
///
/// The defaults match the widely used exponential backoff policy: 500ms initial
/// interval growing by 1.5x with ±50% jitter, capped at 60s per wait and 15
/// minutes overall. `max_elapsed_ms = 0` never gives up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub initial_interval_ms: u64,
    pub multiplier: f64,
    pub randomization_factor: f64,
    pub max_interval_ms: u64,
    pub max_elapsed_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: 500,
            multiplier: 1.5,
            randomization_factor: 0.5,
            max_interval_ms: 60_000,
            max_elapsed_ms: 15 * 60 * 1000,
        }
    }
}

impl BackoffConfig {
    /// Un-jittered interval before the given retry attempt (1-based).
    /// interval = initial * multiplier^(attempt - 1), capped at max_interval_ms.
    pub fn interval_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1) as i32;
        let ms = self.initial_interval_ms as f64 * self.multiplier.powi(exp);
        Duration::from_millis(ms.min(self.max_interval_ms as f64) as u64)
    }

    /// Rejects settings that would let the poller query without pausing.
    pub fn validate(&self) -> Result<(), StartStopError> {
        let invalid = |reason: &str| -> Result<(), StartStopError> {
            Err(StartStopError::Config(format!("backoff: {reason}")))
        };
        if self.initial_interval_ms == 0 {
            return invalid("initial_interval_ms must be greater than 0");
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return invalid("multiplier must be a finite value of at least 1.0");
        }
        if !(0.0..=1.0).contains(&self.randomization_factor) {
            return invalid("randomization_factor must be between 0.0 and 1.0");
        }
        if self.max_interval_ms < self.initial_interval_ms {
            return invalid("max_interval_ms must not be below initial_interval_ms");
        }
        Ok(())
    }

    pub fn max_elapsed(&self) -> Option<Duration> {
        (self.max_elapsed_ms > 0).then(|| Duration::from_millis(self.max_elapsed_ms))
    }
}

/// Running backoff state for one convergence wait.
#[derive(Debug)]
pub struct ExponentialBackoff {
    config: BackoffConfig,
    attempt: u32,
    started: Instant,
}

impl ExponentialBackoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            attempt: 0,
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Delay before the next attempt, or `None` once waiting that long would
    /// exceed the elapsed budget.
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.attempt += 1;
        let delay = jitter(
            self.config.interval_for_attempt(self.attempt),
            self.config.randomization_factor,
        );
        match self.config.max_elapsed() {
            Some(budget) if self.elapsed() + delay > budget => None,
            _ => Some(delay),
        }
    }
}

fn jitter(interval: Duration, factor: f64) -> Duration {
    if factor <= 0.0 || interval.is_zero() {
        return interval;
    }
    let factor = factor.min(1.0);
    let scale = rand::thread_rng().gen_range((1.0 - factor)..=(1.0 + factor));
    interval.mul_f64(scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter() -> BackoffConfig {
        BackoffConfig {
            initial_interval_ms: 1000,
            multiplier: 2.0,
            randomization_factor: 0.0,
            max_interval_ms: 5000,
            max_elapsed_ms: 0,
        }
    }

    #[test]
    fn default_values() {
        let config = BackoffConfig::default();
        assert_eq!(config.initial_interval_ms, 500);
        assert_eq!(config.multiplier, 1.5);
        assert_eq!(config.randomization_factor, 0.5);
        assert_eq!(config.max_interval_ms, 60_000);
        assert_eq!(config.max_elapsed(), Some(Duration::from_secs(900)));
    }

    #[test]
    fn interval_grows_exponentially_and_caps() {
        let config = no_jitter();
        assert_eq!(config.interval_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(config.interval_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(config.interval_for_attempt(3), Duration::from_millis(4000));
        assert_eq!(config.interval_for_attempt(4), Duration::from_millis(5000));
        assert_eq!(config.interval_for_attempt(10), Duration::from_millis(5000));
    }

    #[test]
    fn jitter_stays_within_factor() {
        let base = Duration::from_millis(1000);
        for _ in 0..100 {
            let d = jitter(base, 0.5);
            assert!(d >= Duration::from_millis(500) && d <= Duration::from_millis(1500));
        }
        assert_eq!(jitter(base, 0.0), base);
    }

    #[test]
    fn unbounded_budget_never_gives_up() {
        let mut backoff = ExponentialBackoff::new(no_jitter());
        for _ in 0..50 {
            assert!(backoff.next_delay().is_some());
        }
    }

    #[test]
    fn gives_up_when_delay_exceeds_budget() {
        let mut backoff = ExponentialBackoff::new(BackoffConfig {
            initial_interval_ms: 10_000,
            max_elapsed_ms: 1_000,
            ..no_jitter()
        });
        assert_eq!(backoff.next_delay(), None);
    }

    #[test]
    fn defaults_are_valid() {
        assert!(BackoffConfig::default().validate().is_ok());
        assert!(no_jitter().validate().is_ok());
    }

    #[test]
    fn validate_rejects_settings_without_pause() {
        let zero_interval = BackoffConfig {
            initial_interval_ms: 0,
            ..no_jitter()
        };
        let shrinking = BackoffConfig {
            multiplier: 0.0,
            ..no_jitter()
        };
        let wide_jitter = BackoffConfig {
            randomization_factor: 1.5,
            ..no_jitter()
        };
        let low_cap = BackoffConfig {
            max_interval_ms: 10,
            ..no_jitter()
        };
        for config in [zero_interval, shrinking, wide_jitter, low_cap] {
            let err = config.validate().unwrap_err();
            assert!(matches!(err, StartStopError::Config(_)), "{config:?}");
        }
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: BackoffConfig = toml::from_str("max_elapsed_ms = 0").unwrap();
        assert_eq!(config.max_elapsed(), None);
        assert_eq!(config.initial_interval_ms, 500);
    }
}
