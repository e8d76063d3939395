//! Session lifecycle for one extraction

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use super::extractors::extract_metadata;
use super::navigation::{NavigationPolicy, navigate};
use super::schema::PageMetadata;
use crate::browser::{BrowserEngine, BrowserError, BrowserSession, SessionOptions};
use crate::observer::ScrapeObserver;
use crate::utils::constants::{
    DEFAULT_NAVIGATION_STATUS, DEFAULT_NETWORK_IDLE_TIMEOUT_MS, DEFAULT_TEARDOWN_TIMEOUT_MS,
};
use crate::utils::{ScrapeError, until_cancelled};

/// Tunables of the extraction pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionSettings {
    pub session: SessionOptions,
    pub navigation: NavigationPolicy,
    /// Soft ceiling for the network quiescence wait
    pub network_idle_timeout: Duration,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            session: SessionOptions::default(),
            navigation: NavigationPolicy::default(),
            network_idle_timeout: Duration::from_millis(DEFAULT_NETWORK_IDLE_TIMEOUT_MS),
        }
    }
}

/// Drives one browser session per call from launch to teardown
///
/// Holds no per-request state, so one instance serves any number of
/// concurrent extractions.
pub struct PageExtractor {
    engine: Arc<dyn BrowserEngine>,
    settings: ExtractionSettings,
    observer: Arc<dyn ScrapeObserver>,
}

impl PageExtractor {
    pub fn new(
        engine: Arc<dyn BrowserEngine>,
        settings: ExtractionSettings,
        observer: Arc<dyn ScrapeObserver>,
    ) -> Self {
        Self {
            engine,
            settings,
            observer,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ExtractionSettings {
        &self.settings
    }

    /// Extract metadata from `url` in a fresh, isolated browser session
    ///
    /// The session is released before this returns on every path: success,
    /// navigation exhaustion, query failure and cancellation. Teardown is
    /// bounded; its errors and timeouts go to the observer and never replace
    /// the primary outcome.
    ///
    /// Launch is not interrupted by `cancel`, since dropping a half-started
    /// Chrome would leak it. Once the session exists, every later step stops
    /// early when `cancel` fires and the session is torn down.
    ///
    /// # Errors
    /// * `ExtractionFailed` - session could not be created or queried
    /// * `NavigationFailed` - every navigation attempt failed
    /// * `Cancelled` - `cancel` fired before the pipeline finished
    pub async fn extract(
        &self,
        url: &Url,
        cancel: CancellationToken,
    ) -> Result<PageMetadata, ScrapeError> {
        let started = Instant::now();

        let mut session = self
            .engine
            .launch(&self.settings.session)
            .await
            .map_err(|e| ScrapeError::extraction("session launch", e))?;
        self.observer.session_launched(url);

        let outcome = if cancel.is_cancelled() {
            Err(ScrapeError::Cancelled)
        } else {
            self.run(session.as_mut(), url, &cancel).await
        };

        self.release(session.as_mut()).await;

        debug!(
            %url,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = outcome.is_ok(),
            "Extraction pipeline finished"
        );
        outcome
    }

    async fn release(&self, session: &mut dyn BrowserSession) {
        let limit = Duration::from_millis(DEFAULT_TEARDOWN_TIMEOUT_MS);
        let error = match tokio::time::timeout(limit, session.close()).await {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e,
            Err(_) => BrowserError::TeardownFailed(format!(
                "session close did not finish within {}ms",
                limit.as_millis()
            )),
        };
        self.observer.teardown_failed(&error);
    }

    async fn run(
        &self,
        session: &mut dyn BrowserSession,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<PageMetadata, ScrapeError> {
        let observer = self.observer.as_ref();

        let response = until_cancelled(
            cancel,
            navigate(session, url, &self.settings.navigation, observer),
        )
        .await
        .ok_or(ScrapeError::Cancelled)??;

        let idle_timeout = self.settings.network_idle_timeout;
        match until_cancelled(cancel, session.wait_for_network_idle(idle_timeout)).await {
            None => return Err(ScrapeError::Cancelled),
            Some(Ok(true)) => {}
            Some(Ok(false)) => observer.network_idle_skipped(idle_timeout, None),
            Some(Err(e)) => observer.network_idle_skipped(idle_timeout, Some(&e)),
        }

        let raw = until_cancelled(cancel, extract_metadata(session))
            .await
            .ok_or(ScrapeError::Cancelled)?
            .map_err(|e| ScrapeError::extraction("metadata query", e))?;

        let status = response.map_or(DEFAULT_NAVIGATION_STATUS, |r| r.status);
        Ok(raw.into_metadata(status))
    }
}
