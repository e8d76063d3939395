use std::time::Duration;
use thiserror::Error;

use crate::page_extractor::NavigationError;

/// Caller-visible failure class of a scrape request
///
/// Stable across releases: the HTTP layer maps each category to a fixed
/// status code and message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InvalidUrl,
    Timeout,
    Failure,
}

/// Errors that can end a scrape request
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Scrape exceeded its {}ms budget", .0.as_millis())]
    Timeout(Duration),

    #[error(transparent)]
    NavigationFailed(#[from] NavigationError),

    #[error("Extraction failed during {stage}: {reason}")]
    ExtractionFailed { stage: &'static str, reason: String },

    /// The pipeline stopped because its deadline fired. Clients never see
    /// this; the deadline guard has already answered with `Timeout`.
    #[error("Scrape cancelled")]
    Cancelled,
}

impl ScrapeError {
    pub(crate) fn extraction(stage: &'static str, reason: impl ToString) -> Self {
        ScrapeError::ExtractionFailed {
            stage,
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            ScrapeError::InvalidUrl(_) => ErrorCategory::InvalidUrl,
            ScrapeError::Timeout(_) => ErrorCategory::Timeout,
            ScrapeError::NavigationFailed(_)
            | ScrapeError::ExtractionFailed { .. }
            | ScrapeError::Cancelled => ErrorCategory::Failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::BrowserError;

    #[test]
    fn categories_follow_variants() {
        assert_eq!(
            ScrapeError::InvalidUrl("ftp://x".into()).category(),
            ErrorCategory::InvalidUrl
        );
        assert_eq!(
            ScrapeError::Timeout(Duration::from_secs(20)).category(),
            ErrorCategory::Timeout
        );
        assert_eq!(
            ScrapeError::from(NavigationError {
                attempts: 2,
                source: BrowserError::NavigationFailed("net::ERR_NAME_NOT_RESOLVED".into()),
            })
            .category(),
            ErrorCategory::Failure
        );
        assert_eq!(
            ScrapeError::extraction("launch", "no chrome").category(),
            ErrorCategory::Failure
        );
    }

    #[test]
    fn navigation_failure_keeps_its_cause() {
        let err = ScrapeError::from(NavigationError {
            attempts: 2,
            source: BrowserError::NavigationTimeout(Duration::from_secs(15)),
        });
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("Navigation timed out after 15000ms"));
    }
}
