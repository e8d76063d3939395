//! Owned Chrome process plus its CDP event handler task

use chromiumoxide::browser::Browser;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{BrowserError, BrowserResult};

/// Wrapper for Browser and its event handler task
///
/// Owns the per-session profile directory as well. Handler MUST be aborted to
/// prevent it running indefinitely after the browser is closed, which
/// `Drop` takes care of.
pub struct BrowserWrapper {
    browser: Browser,
    handler: JoinHandle<()>,
    user_data_dir: Option<PathBuf>,
}

impl BrowserWrapper {
    pub(crate) fn new(browser: Browser, handler: JoinHandle<()>, user_data_dir: PathBuf) -> Self {
        Self {
            browser,
            handler,
            user_data_dir: Some(user_data_dir),
        }
    }

    pub(crate) fn browser(&self) -> &Browser {
        &self.browser
    }

    pub(crate) fn browser_mut(&mut self) -> &mut Browser {
        &mut self.browser
    }

    /// Close Chrome, wait for the process to exit, then remove the profile
    ///
    /// All three steps always run. The first failure is returned.
    ///
    /// `browser.close()` alone leaves a zombie process behind; the `wait()`
    /// is what reaps it and releases file handles on the profile directory.
    pub async fn shutdown(&mut self) -> BrowserResult<()> {
        let mut first_error = None;

        if let Err(e) = self.browser.close().await {
            first_error.get_or_insert(BrowserError::TeardownFailed(format!(
                "close browser: {e}"
            )));
        }

        if let Err(e) = self.browser.wait().await {
            first_error.get_or_insert(BrowserError::TeardownFailed(format!(
                "wait for browser exit: {e}"
            )));
        }

        if let Err(e) = self.cleanup_temp_dir() {
            first_error.get_or_insert(e);
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Remove the profile directory (blocking operation)
    ///
    /// MUST be called AFTER `browser.wait()` completes. Windows fails to
    /// remove files Chrome still holds open.
    fn cleanup_temp_dir(&mut self) -> BrowserResult<()> {
        let Some(path) = self.user_data_dir.take() else {
            return Ok(());
        };

        debug!("Cleaning up profile directory: {}", path.display());
        std::fs::remove_dir_all(&path).map_err(|e| {
            BrowserError::TeardownFailed(format!(
                "remove profile directory {}: {e}",
                path.display()
            ))
        })
    }
}

impl Drop for BrowserWrapper {
    fn drop(&mut self) {
        self.handler.abort();

        if let Some(path) = self.user_data_dir.as_ref() {
            warn!(
                "BrowserWrapper dropped without shutdown(). \
                 Profile directory will be orphaned: {}",
                path.display()
            );
        }
    }
}
