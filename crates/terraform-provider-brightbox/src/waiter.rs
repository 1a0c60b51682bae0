//! Status polling with exponential backoff
//!
//! Polls an object's status until it reaches a target value. Between polls
//! the interval starts at 100ms and doubles up to 10s, but never drops below
//! the configured minimum.

use crate::error::{ProviderError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};

const INITIAL_INTERVAL: Duration = Duration::from_millis(100);
const MAX_INTERVAL: Duration = Duration::from_secs(10);
const NOT_FOUND_CHECKS: u32 = 20;

#[derive(Debug, Clone)]
pub struct WaitConfig {
    pub pending: &'static [&'static str],
    pub target: &'static [&'static str],
    pub timeout: Duration,
    /// Wait before the first poll
    pub delay: Duration,
    /// Lower bound for the interval between polls
    pub min_interval: Duration,
    /// Consecutive "not found" polls tolerated before giving up
    pub not_found_checks: u32,
    /// A vanished object counts as having reached the target
    pub missing_is_target: bool,
}

impl WaitConfig {
    pub fn new(pending: &'static [&'static str], target: &'static [&'static str]) -> Self {
        Self {
            pending,
            target,
            timeout: crate::timeouts::DEFAULT_TIMEOUT,
            delay: Duration::ZERO,
            min_interval: Duration::ZERO,
            not_found_checks: NOT_FOUND_CHECKS,
            missing_is_target: false,
        }
    }

    /// Waiting for a deletion to finish: not found means done
    pub fn deleted(pending: &'static [&'static str]) -> Self {
        Self {
            missing_is_target: true,
            ..Self::new(pending, &["deleted"])
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        Self { delay, ..self }
    }

    pub fn with_min_interval(self, min_interval: Duration) -> Self {
        Self {
            min_interval,
            ..self
        }
    }

    /// Interval before poll number `attempt + 1`
    pub fn interval_for_attempt(&self, attempt: u32) -> Duration {
        let backoff = INITIAL_INTERVAL
            .checked_mul(2u32.saturating_pow(attempt))
            .unwrap_or(MAX_INTERVAL)
            .min(MAX_INTERVAL);
        backoff.max(self.min_interval)
    }

    fn target_name(&self) -> String {
        self.target.join(", ")
    }
}

/// Poll `refresh` until the returned status is one of `config.target`.
///
/// Returns the final status. A refresh error other than "not found" aborts
/// the wait.
pub async fn wait_for_status<F, Fut>(config: &WaitConfig, mut refresh: F) -> Result<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let deadline = Instant::now() + config.timeout;
    let mut last = String::new();
    let mut not_found = 0;

    if !config.delay.is_zero() {
        sleep(config.delay).await;
    }

    for attempt in 0.. {
        match refresh().await {
            Ok(status) => {
                not_found = 0;
                tracing::debug!("Polled status '{}', waiting for '{}'", status, config.target_name());
                if config.target.contains(&status.as_str()) {
                    return Ok(status);
                }
                if !config.pending.contains(&status.as_str()) {
                    return Err(ProviderError::UnexpectedState {
                        state: status,
                        target: config.target_name(),
                    });
                }
                last = status;
            }
            Err(e) if e.is_not_found() => {
                if config.missing_is_target {
                    return Ok(config.target.first().copied().unwrap_or_default().to_string());
                }
                not_found += 1;
                if not_found > config.not_found_checks {
                    return Err(ProviderError::NotFound(config.target_name()));
                }
            }
            Err(e) => return Err(e),
        }

        let now = Instant::now();
        if now >= deadline {
            break;
        }
        sleep(config.interval_for_attempt(attempt).min(deadline - now)).await;
        if Instant::now() >= deadline {
            break;
        }
    }

    Err(ProviderError::Timeout {
        target: config.target_name(),
        last,
        timeout: config.timeout,
    })
}
