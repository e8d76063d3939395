//! Request handling: validation, deadline, outcome mapping

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info_span};
use url::Url;
use uuid::Uuid;

use crate::observer::ScrapeObserver;
use crate::page_extractor::{PageExtractor, PageMetadata};
use crate::utils::constants::DEFAULT_REQUEST_BUDGET_MS;
use crate::utils::{DeadlineError, ScrapeError, race_with_deadline};

/// A validated absolute `http`/`https` URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeTarget(Url);

impl ScrapeTarget {
    /// Validate raw user input
    ///
    /// # Errors
    /// `InvalidUrl` when the input is missing, blank, unparsable, not
    /// `http`/`https`, or has no host.
    pub fn parse(raw: Option<&str>) -> Result<Self, ScrapeError> {
        let raw = raw
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .ok_or_else(|| ScrapeError::InvalidUrl("missing url".to_string()))?;

        let url = Url::parse(raw).map_err(|e| ScrapeError::InvalidUrl(format!("{raw}: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ScrapeError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }

        if url.host_str().is_none_or(str::is_empty) {
            return Err(ScrapeError::InvalidUrl(format!("{raw}: missing host")));
        }

        Ok(Self(url))
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for ScrapeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Validates input and runs the extractor under the request deadline
///
/// Cheap to clone; every clone shares the same extractor.
#[derive(Clone)]
pub struct ScrapeHandler {
    extractor: Arc<PageExtractor>,
    budget: Duration,
    observer: Arc<dyn ScrapeObserver>,
}

impl ScrapeHandler {
    pub fn new(
        extractor: Arc<PageExtractor>,
        budget: Duration,
        observer: Arc<dyn ScrapeObserver>,
    ) -> Self {
        Self {
            extractor,
            budget,
            observer,
        }
    }

    /// Handler with the default 20 second budget
    pub fn with_default_budget(
        extractor: Arc<PageExtractor>,
        observer: Arc<dyn ScrapeObserver>,
    ) -> Self {
        Self::new(
            extractor,
            Duration::from_millis(DEFAULT_REQUEST_BUDGET_MS),
            observer,
        )
    }

    #[must_use]
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Scrape `raw_url`
    ///
    /// Invalid input is rejected before any browser work. Otherwise the whole
    /// extraction races the request budget; on timeout this returns at once
    /// while the extraction tears its session down in the background. Dropping
    /// the returned future before it settles cancels the extraction as well.
    ///
    /// # Errors
    /// * `InvalidUrl` - missing or invalid input
    /// * `Timeout` - the budget elapsed first
    /// * `NavigationFailed` / `ExtractionFailed` - the pipeline failed
    pub async fn handle(&self, raw_url: Option<&str>) -> Result<PageMetadata, ScrapeError> {
        let target = ScrapeTarget::parse(raw_url)?;
        let url = target.url().clone();

        let request_id = Uuid::new_v4();
        let span = info_span!("scrape", %request_id, url = %url);

        let cancel = CancellationToken::new();
        // A dropped request (client gone) stops the detached pipeline too
        let _cancel_on_drop = cancel.clone().drop_guard();
        let extractor = self.extractor.clone();
        let operation = {
            let token = cancel.clone();
            let url = url.clone();
            async move { extractor.extract(&url, token).await }.instrument(span)
        };

        let started = Instant::now();
        let outcome = match race_with_deadline(operation, self.budget, &cancel).await {
            Ok(result) => result,
            Err(DeadlineError::Elapsed { budget }) => Err(ScrapeError::Timeout(budget)),
            Err(DeadlineError::Join(e)) => Err(ScrapeError::extraction("extraction task", e)),
        };

        self.observer
            .scrape_finished(&url, outcome.as_ref(), started.elapsed());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ErrorCategory;

    fn rejects(raw: Option<&str>) {
        let err = ScrapeTarget::parse(raw).expect_err("input should be rejected");
        assert_eq!(err.category(), ErrorCategory::InvalidUrl, "input: {raw:?}");
    }

    #[test]
    fn accepts_http_and_https() {
        let target = ScrapeTarget::parse(Some("https://example.com/path?q=1")).unwrap();
        assert_eq!(target.url().as_str(), "https://example.com/path?q=1");

        let target = ScrapeTarget::parse(Some("  http://example.com  ")).unwrap();
        assert_eq!(target.url().host_str(), Some("example.com"));
    }

    #[test]
    fn rejects_missing_and_blank_input() {
        rejects(None);
        rejects(Some(""));
        rejects(Some("   "));
    }

    #[test]
    fn rejects_unparsable_input() {
        rejects(Some("not a url"));
        rejects(Some("example.com"));
        rejects(Some("http://"));
    }

    #[test]
    fn rejects_other_schemes() {
        rejects(Some("ftp://example.com/file"));
        rejects(Some("file:///etc/passwd"));
        rejects(Some("javascript:alert(1)"));
        rejects(Some("data:text/html,<h1>hi</h1>"));
    }
}
