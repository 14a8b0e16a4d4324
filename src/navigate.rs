//! Navigation with a narrow retry policy.
//!
//! Only failures that look like transient network trouble are retried. Any
//! other error, or the last error once attempts run out, goes back to the
//! caller unchanged.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::config::TimingSettings;
use crate::observe::Clock;
use crate::page::{PageDriver, PageError, PageResult};

/// Error messages worth another attempt
static TRANSIENT_NAVIGATION_ERROR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)ERR_CONNECTION_RESET|ERR_CONNECTION_CLOSED|ERR_NAME_NOT_RESOLVED|TIMED_OUT|Timeout|timed out",
    )
    .expect("transient navigation pattern is valid")
});

/// How many times to try and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_settings(settings: &TimingSettings) -> Self {
        Self {
            attempts: settings.nav_attempts.max(1),
            backoff: settings.nav_backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&TimingSettings::defaults())
    }
}

/// Whether a navigation failure message matches a transient network pattern
pub fn is_transient(message: &str) -> bool {
    TRANSIENT_NAVIGATION_ERROR.is_match(message)
}

/// Load `url`, retrying transient failures per `policy`
pub fn goto_with_retry(
    page: &mut dyn PageDriver,
    clock: &dyn Clock,
    url: &str,
    policy: RetryPolicy,
) -> PageResult<()> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        let err = match page.goto(url) {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };

        if attempt >= attempts || !is_retryable(&err) {
            return Err(err);
        }

        warn!(url, attempt, attempts, error = %err, "transient navigation failure, retrying");
        clock.sleep(policy.backoff);
        attempt += 1;
    }
}

fn is_retryable(err: &PageError) -> bool {
    match err {
        PageError::Navigation { message, .. } => is_transient(message),
        other => is_transient(&other.to_string()),
    }
}
