//! Browser capability boundary
//!
//! The extraction pipeline only ever talks to a browser through the
//! [`BrowserEngine`] and [`BrowserSession`] traits. The production
//! implementation in [`chromium`] drives a real Chrome instance via
//! chromiumoxide; tests plug in scripted engines.

pub mod chromium;
mod wrapper;

pub use crate::browser_setup::{download_managed_browser, find_browser_executable};
pub use chromium::{ChromiumEngine, ChromiumSession};
pub use wrapper::BrowserWrapper;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::utils::constants::{CHROME_USER_AGENT, DEFAULT_VIEWPORT_HEIGHT, DEFAULT_VIEWPORT_WIDTH};

/// Settings applied to the isolated browsing context of a new session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            user_agent: CHROME_USER_AGENT.to_string(),
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
        }
    }
}

/// Response descriptor of a committed navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationResponse {
    pub status: u16,
}

/// Launches request-scoped browser sessions
///
/// Every call must produce a brand new engine instance with its own isolated
/// browsing context and page. Sessions are never pooled or shared.
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    async fn launch(&self, options: &SessionOptions) -> BrowserResult<Box<dyn BrowserSession>>;
}

/// One engine instance → isolated context → page
///
/// Implementations must tolerate `close` being called after any other method
/// failed, and repeated `close` calls must be no-ops.
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate the page and wait until the DOM content has been parsed
    ///
    /// Returns `None` when the browser produced no response object, e.g. a
    /// fragment-only navigation inside the same document. Callers bound the
    /// duration of this call with their own timeout.
    async fn goto(&mut self, url: &Url) -> BrowserResult<Option<NavigationResponse>>;

    /// Wait for network quiescence after the last navigation
    ///
    /// Returns `Ok(false)` when `timeout` elapsed first. Running out of time
    /// is not an error.
    async fn wait_for_network_idle(&mut self, timeout: Duration) -> BrowserResult<bool>;

    /// Evaluate a read-only script against the loaded document
    async fn evaluate(&mut self, script: &str) -> BrowserResult<serde_json::Value>;

    /// Release page, context and engine instance in that order
    async fn close(&mut self) -> BrowserResult<()>;
}

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Failed to find browser executable: {0}")]
    NotFound(String),

    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to create browsing context: {0}")]
    ContextCreationFailed(String),

    #[error("Failed to create page: {0}")]
    PageCreationFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Navigation timed out after {}ms", .0.as_millis())]
    NavigationTimeout(Duration),

    #[error("Script evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Failed to tear down browser session: {0}")]
    TeardownFailed(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for BrowserError {
    fn from(err: std::io::Error) -> Self {
        BrowserError::IoError(err.to_string())
    }
}

pub type BrowserResult<T> = Result<T, BrowserError>;
