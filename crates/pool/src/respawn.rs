//! Restart schedule for crashed workers.
//!
//! A worker whose thread exits is marked down. If the pool was started
//! with a [`RespawnConfig`], the handle starts a fresh thread once the
//! current delay has elapsed, growing the delay after every attempt until
//! the new worker reports `Pending`.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RespawnConfig {
    /// Wait before the first restart of a freshly crashed worker.
    pub initial_delay: Duration,
    /// Ceiling for the wait between attempts.
    pub max_delay: Duration,
    /// Growth factor applied after every attempt.
    pub multiplier: f64,
}

impl Default for RespawnConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RespawnConfig {
    pub fn backoff(&self) -> Backoff {
        Backoff {
            delay: self.initial_delay,
            attempts: 0,
            config: self.clone(),
        }
    }
}

/// Running restart state of one worker.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: RespawnConfig,
    delay: Duration,
    attempts: u32,
}

impl Backoff {
    /// How long to wait before the next attempt.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Count an attempt and grow the delay, capped at `max_delay`.
    /// Returns the attempt number, starting at 1.
    pub fn advance(&mut self) -> u32 {
        self.attempts += 1;
        let grown = self.delay.mul_f64(self.config.multiplier);
        self.delay = grown.min(self.config.max_delay);
        self.attempts
    }

    /// Back to the initial delay once a worker came up.
    pub fn reset(&mut self) {
        self.delay = self.config.initial_delay;
        self.attempts = 0;
    }
}
