//! Cool-down for repeated secret key sign-in failures

use std::time::Duration;

/// Consecutive failures allowed before the first cool-down
pub const MAX_FREE_ATTEMPTS: u32 = 9;

/// First cool-down; doubles with every further failure
pub const BASE_COOLDOWN: Duration = Duration::from_secs(1);

pub const MAX_COOLDOWN: Duration = Duration::from_secs(5 * 60);

/// Failure counter with an expiry. Times are epoch millis from an injected clock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimiter {
    failures: u32,
    locked_until: Option<i64>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn is_locked(&self, now_millis: i64) -> bool {
        self.remaining(now_millis).is_some()
    }

    /// Time left in the current cool-down, if any
    pub fn remaining(&self, now_millis: i64) -> Option<Duration> {
        match self.locked_until {
            Some(until) if until > now_millis => {
                Some(Duration::from_millis((until - now_millis) as u64))
            }
            _ => None,
        }
    }

    pub fn record_failure(&mut self, now_millis: i64) {
        self.failures = self.failures.saturating_add(1);
        if self.failures < MAX_FREE_ATTEMPTS {
            return;
        }

        let doublings = (self.failures - MAX_FREE_ATTEMPTS).min(16);
        let cooldown = BASE_COOLDOWN
            .saturating_mul(1u32 << doublings)
            .min(MAX_COOLDOWN);
        self.locked_until = Some(now_millis + cooldown.as_millis() as i64);
        log::warn!(
            "{} failed sign-in attempts, cooling down for {}s",
            self.failures,
            cooldown.as_secs()
        );
    }

    pub fn record_success(&mut self) {
        self.failures = 0;
        self.locked_until = None;
    }
}
