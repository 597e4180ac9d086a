//! Bounded retry with jittered exponential backoff.

use std::time::Duration;

use rand::Rng;

/// Retry policy for optimistic-concurrency conflicts.
///
/// # Default Values
///
/// - `max_attempts`: 5
/// - `base_delay`: 10ms
/// - `max_delay`: 200ms
/// - `multiplier`: 2.0
/// - `jitter`: 0.25 (±25% of the computed delay)
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Cap for the exponential backoff
    pub max_delay: Duration,
    /// Growth factor between attempts
    pub multiplier: f64,
    /// Random spread applied to each delay, as a fraction of it
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(200),
            multiplier: 2.0,
            jitter: 0.25,
        }
    }
}

impl RetryPolicy {
    /// A policy that retries without sleeping.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Set the attempt ceiling (clamped to at least one attempt).
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the delay before the first retry.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the backoff cap.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the jitter fraction (clamped to `0.0..=1.0`).
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Delay to wait after the given failed attempt (1-based).
    ///
    /// `base_delay * multiplier^(attempt - 1)`, capped at `max_delay`, then
    /// spread by the jitter fraction.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        clippy::cast_possible_wrap
    )]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let max_us = self.max_delay.as_micros() as f64;
        let exponent = attempt.saturating_sub(1).min(64) as i32;
        let delay = (self.base_delay.as_micros() as f64 * self.multiplier.powi(exponent)).min(max_us);

        if delay <= 0.0 {
            return Duration::ZERO;
        }

        let spread = delay * self.jitter * (rand::thread_rng().gen::<f64>() - 0.5) * 2.0;
        let final_us = (delay + spread).clamp(0.0, max_us);

        Duration::from_micros(final_us as u64)
    }
}
