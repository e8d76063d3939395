//! Deadline enforcement and timeout validation for browser operations

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

/// Maximum timeout accepted for any configured budget (5 minutes)
/// Covers slow-loading sites, heavy SPAs, and network delays
pub const MAX_NAVIGATION_TIMEOUT_MS: u64 = 300_000; // 5 minutes

/// Outcome of a deadline race that did not produce the operation's output
#[derive(Error, Debug)]
pub enum DeadlineError {
    /// The budget elapsed before the operation settled
    #[error("deadline of {}ms elapsed", .budget.as_millis())]
    Elapsed { budget: Duration },

    /// The operation's task panicked or was torn down by the runtime
    #[error("operation task failed: {0}")]
    Join(#[from] JoinError),
}

/// Race an operation against a wall-clock budget
///
/// The operation runs as its own task so that losing the race never drags the
/// caller along: when the budget elapses the guard returns
/// [`DeadlineError::Elapsed`] immediately, fires `cancel`, and detaches the
/// task. The operation is expected to observe `cancel` and run its own
/// teardown in the background. It is never aborted from here.
///
/// If the operation settles first, its output is forwarded unchanged and the
/// timer is dropped.
///
/// # Arguments
/// * `operation` - Future to run (typically the full extraction pipeline)
/// * `budget` - Wall-clock ceiling for the whole operation
/// * `cancel` - Token handed to the operation; cancelled on timeout
///
/// # Example
/// ```rust,ignore
/// let cancel = CancellationToken::new();
/// let token = cancel.clone();
/// let metadata = race_with_deadline(
///     async move { extractor.extract(&target, token).await },
///     Duration::from_secs(20),
///     &cancel,
/// )
/// .await?;
/// ```
pub async fn race_with_deadline<F>(
    operation: F,
    budget: Duration,
    cancel: &CancellationToken,
) -> Result<F::Output, DeadlineError>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let mut task = tokio::spawn(operation);

    match tokio::time::timeout(budget, &mut task).await {
        Ok(joined) => joined.map_err(DeadlineError::from),
        Err(_) => {
            cancel.cancel();
            // Dropping the JoinHandle detaches the task; it keeps running
            // until it notices the cancellation and releases its resources.
            drop(task);
            Err(DeadlineError::Elapsed { budget })
        }
    }
}

/// Run `operation` unless `cancel` fires first
///
/// Returns `None` when cancelled. The in-flight operation is dropped at that
/// point, so only pass futures that are safe to drop mid-flight.
pub async fn until_cancelled<F>(cancel: &CancellationToken, operation: F) -> Option<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = operation => Some(output),
    }
}

/// Validate a configured budget in milliseconds
///
/// # Returns
/// * `Ok(Duration)` - Validated Duration object
/// * `Err(String)` - Budget is zero or exceeds MAX_NAVIGATION_TIMEOUT_MS
pub fn validate_budget_ms(name: &str, ms: u64) -> Result<Duration, String> {
    if ms == 0 {
        return Err(format!("{name} must be greater than zero"));
    }

    if ms > MAX_NAVIGATION_TIMEOUT_MS {
        return Err(format!(
            "{name} cannot exceed {}ms ({} minutes). Received: {}ms ({:.1} minutes)",
            MAX_NAVIGATION_TIMEOUT_MS,
            MAX_NAVIGATION_TIMEOUT_MS / 60_000,
            ms,
            ms as f64 / 60_000.0
        ));
    }

    Ok(Duration::from_millis(ms))
}
