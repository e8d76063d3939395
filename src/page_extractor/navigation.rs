//! Bounded navigation retries

use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::browser::{BrowserError, BrowserSession, NavigationResponse};
use crate::observer::ScrapeObserver;
use crate::utils::constants::{DEFAULT_MAX_NAVIGATION_ATTEMPTS, DEFAULT_NAVIGATION_TIMEOUT_MS};

/// How hard to try loading a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationPolicy {
    /// Total attempts including the first one; at least 1
    pub max_attempts: u32,
    /// Ceiling for a single attempt
    pub attempt_timeout: Duration,
}

impl Default for NavigationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_NAVIGATION_ATTEMPTS,
            attempt_timeout: Duration::from_millis(DEFAULT_NAVIGATION_TIMEOUT_MS),
        }
    }
}

/// Every navigation attempt failed
#[derive(Error, Debug)]
#[error("Navigation failed after {attempts} attempt(s)")]
pub struct NavigationError {
    pub attempts: u32,
    /// Failure of the last attempt
    #[source]
    pub source: BrowserError,
}

/// Load `url`, retrying immediately on failure
///
/// Attempts run strictly one after another with no backoff. An attempt that
/// outlives `policy.attempt_timeout` counts as failed. The first success
/// returns right away; the response is `None` when the browser produced no
/// response object (same-document navigation).
///
/// # Errors
/// [`NavigationError`] carrying the last attempt's cause once
/// `policy.max_attempts` attempts have failed.
pub async fn navigate(
    session: &mut dyn BrowserSession,
    url: &Url,
    policy: &NavigationPolicy,
    observer: &dyn ScrapeObserver,
) -> Result<Option<NavigationResponse>, NavigationError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let outcome = match tokio::time::timeout(policy.attempt_timeout, session.goto(url)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(BrowserError::NavigationTimeout(policy.attempt_timeout)),
        };

        match outcome {
            Ok(response) => return Ok(response),
            Err(source) => {
                observer.navigation_attempt_failed(attempt, max_attempts, &source);
                if attempt >= max_attempts {
                    return Err(NavigationError {
                        attempts: attempt,
                        source,
                    });
                }
                attempt += 1;
            }
        }
    }
}
