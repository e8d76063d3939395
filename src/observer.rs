//! Observability hooks for the extraction pipeline
//!
//! Components receive an `Arc<dyn ScrapeObserver>` instead of logging
//! through globals, so tests can assert on what the pipeline reported.
//! [`TracingObserver`] is the production implementation.

use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::browser::BrowserError;
use crate::page_extractor::PageMetadata;
use crate::utils::ScrapeError;

/// Receives notable pipeline events. Every hook defaults to a no-op.
pub trait ScrapeObserver: Send + Sync {
    fn session_launched(&self, _target: &Url) {}

    /// A navigation attempt failed; `attempt` is 1-based
    fn navigation_attempt_failed(&self, _attempt: u32, _max_attempts: u32, _error: &BrowserError) {}

    /// Network never went quiet within the soft timeout; extraction continues
    fn network_idle_skipped(&self, _waited: Duration, _error: Option<&BrowserError>) {}

    /// Session teardown failed. Never changes the request outcome.
    fn teardown_failed(&self, _error: &BrowserError) {}

    fn scrape_finished(
        &self,
        _target: &Url,
        _outcome: Result<&PageMetadata, &ScrapeError>,
        _elapsed: Duration,
    ) {
    }
}

/// Forwards pipeline events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ScrapeObserver for TracingObserver {
    fn session_launched(&self, target: &Url) {
        debug!(%target, "Browser session launched");
    }

    fn navigation_attempt_failed(&self, attempt: u32, max_attempts: u32, error: &BrowserError) {
        warn!(attempt, max_attempts, %error, "Navigation attempt failed");
    }

    fn network_idle_skipped(&self, waited: Duration, error: Option<&BrowserError>) {
        match error {
            Some(error) => warn!(%error, "Network idle wait failed, extracting current DOM"),
            None => debug!(
                waited_ms = waited.as_millis() as u64,
                "Network never went idle, extracting current DOM"
            ),
        }
    }

    fn teardown_failed(&self, error: &BrowserError) {
        warn!(%error, "Browser session teardown failed");
    }

    fn scrape_finished(
        &self,
        target: &Url,
        outcome: Result<&PageMetadata, &ScrapeError>,
        elapsed: Duration,
    ) {
        let elapsed_ms = elapsed.as_millis() as u64;
        match outcome {
            Ok(metadata) => info!(%target, status = metadata.status, elapsed_ms, "Scrape completed"),
            Err(error) => warn!(
                %target,
                category = ?error.category(),
                %error,
                elapsed_ms,
                "Scrape failed"
            ),
        }
    }
}
