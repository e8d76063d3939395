//! chromiumoxide-backed implementation of the browser capability
//!
//! Each [`ChromiumEngine::launch`] starts a dedicated Chrome process with a
//! throwaway profile, opens an isolated browser context inside it and creates
//! a single page in that context.

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::network::{EventResponseReceived, LoaderId, ResourceType};
use chromiumoxide::cdp::browser_protocol::page::{
    EventLifecycleEvent, NavigateParams, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::cdp::browser_protocol::target::{CreateBrowserContextParams, CreateTargetParams};
use chromiumoxide::listeners::EventStream;
use futures::{FutureExt, StreamExt};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use super::{
    BrowserEngine, BrowserError, BrowserResult, BrowserSession, BrowserWrapper, NavigationResponse,
    SessionOptions,
};
use crate::BrowserConfig;
use crate::browser_setup::{LaunchOptions, launch_browser, resolve_browser_executable};

/// Lifecycle event Chrome emits once no network requests started for 500ms
const NETWORK_IDLE_EVENT: &str = "networkIdle";

const DOM_CONTENT_LOADED_EVENT: &str = "DOMContentLoaded";

/// Launches one Chrome process per session
///
/// The executable is resolved once (local install, then managed download)
/// and reused for every later launch.
pub struct ChromiumEngine {
    config: BrowserConfig,
    executable: OnceCell<PathBuf>,
}

impl ChromiumEngine {
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            executable: OnceCell::new(),
        }
    }

    async fn executable(&self) -> BrowserResult<PathBuf> {
        self.executable
            .get_or_try_init(|| async {
                match &self.config.executable {
                    Some(path) => Ok(path.clone()),
                    None => resolve_browser_executable().await,
                }
            })
            .await
            .cloned()
            .map_err(|e| BrowserError::NotFound(format!("{e:#}")))
    }
}

#[async_trait]
impl BrowserEngine for ChromiumEngine {
    async fn launch(&self, options: &SessionOptions) -> BrowserResult<Box<dyn BrowserSession>> {
        let executable = self.executable().await?;

        // Unique profile per session so concurrent requests never share
        // cookies, storage or the Chrome profile lock
        let user_data_dir =
            std::env::temp_dir().join(format!("kodegen_pagemeta_{}", Uuid::new_v4()));

        let launch_options = LaunchOptions {
            executable,
            user_data_dir: user_data_dir.clone(),
            headless: self.config.headless,
            disable_security: self.config.disable_security,
            window_width: options.viewport_width,
            window_height: options.viewport_height,
        };

        let (browser, handler) = launch_browser(&launch_options)
            .await
            .map_err(|e| BrowserError::LaunchFailed(format!("{e:#}")))?;

        let mut session = ChromiumSession::new(BrowserWrapper::new(browser, handler, user_data_dir));

        if let Err(e) = session.open_page(options).await {
            if let Err(teardown) = session.close().await {
                warn!(error = %teardown, "Failed to tear down partially launched session");
            }
            return Err(e);
        }

        Ok(Box::new(session))
    }
}

/// State retained from the last committed navigation
struct CommittedNavigation {
    /// `None` for same-document navigations
    loader_id: Option<LoaderId>,
    lifecycle: EventStream<EventLifecycleEvent>,
}

pub struct ChromiumSession {
    wrapper: Option<BrowserWrapper>,
    context_id: Option<BrowserContextId>,
    page: Option<Page>,
    navigation: Option<CommittedNavigation>,
}

impl ChromiumSession {
    fn new(wrapper: BrowserWrapper) -> Self {
        Self {
            wrapper: Some(wrapper),
            context_id: None,
            page: None,
            navigation: None,
        }
    }

    /// Create the isolated context and its single page
    async fn open_page(&mut self, options: &SessionOptions) -> BrowserResult<()> {
        let wrapper = self.wrapper.as_mut().ok_or_else(|| {
            BrowserError::ContextCreationFailed("browser already closed".to_string())
        })?;

        let context_id = wrapper
            .browser_mut()
            .create_browser_context(CreateBrowserContextParams::default())
            .await
            .map_err(|e| BrowserError::ContextCreationFailed(e.to_string()))?;
        self.context_id = Some(context_id.clone());

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id)
            .build()
            .map_err(BrowserError::PageCreationFailed)?;

        let page = wrapper
            .browser()
            .new_page(target)
            .await
            .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))?;
        // Track the page before configuring it so close() always releases it
        self.page = Some(page.clone());

        page.execute(SetUserAgentOverrideParams::new(options.user_agent.clone()))
            .await
            .map_err(|e| BrowserError::PageCreationFailed(format!("set user agent: {e}")))?;

        let viewport = SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(options.viewport_width))
            .height(i64::from(options.viewport_height))
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(BrowserError::PageCreationFailed)?;
        page.execute(viewport)
            .await
            .map_err(|e| BrowserError::PageCreationFailed(format!("set viewport: {e}")))?;

        page.execute(SetLifecycleEventsEnabledParams::new(true))
            .await
            .map_err(|e| BrowserError::PageCreationFailed(format!("enable lifecycle events: {e}")))?;

        debug!(
            user_agent = %options.user_agent,
            width = options.viewport_width,
            height = options.viewport_height,
            "Opened isolated page"
        );
        Ok(())
    }

    fn page(&self) -> BrowserResult<Page> {
        self.page
            .clone()
            .ok_or_else(|| BrowserError::NavigationFailed("session has no open page".to_string()))
    }
}

fn navigation_error(url: &Url, e: impl std::fmt::Display) -> BrowserError {
    BrowserError::NavigationFailed(format!("{url}: {e}"))
}

fn is_lifecycle_event(event: &EventLifecycleEvent, name: &str, loader_id: &LoaderId) -> bool {
    event.name == name && &event.loader_id == loader_id
}

fn document_status(event: &EventResponseReceived, loader_id: &LoaderId) -> Option<u16> {
    if event.r#type == ResourceType::Document && &event.loader_id == loader_id {
        u16::try_from(event.response.status).ok()
    } else {
        None
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn goto(&mut self, url: &Url) -> BrowserResult<Option<NavigationResponse>> {
        let page = self.page()?;
        self.navigation = None;

        // Subscribe before navigating so no event can slip past us
        let mut responses = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| navigation_error(url, e))?;
        let mut lifecycle = page
            .event_listener::<EventLifecycleEvent>()
            .await
            .map_err(|e| navigation_error(url, e))?;

        let navigated = page
            .execute(NavigateParams::new(url.as_str()))
            .await
            .map_err(|e| navigation_error(url, e))?
            .result;

        if let Some(error_text) = navigated.error_text.filter(|text| !text.is_empty()) {
            return Err(navigation_error(url, error_text));
        }

        let Some(loader_id) = navigated.loader_id else {
            debug!(%url, "Same-document navigation, no response object");
            self.navigation = Some(CommittedNavigation {
                loader_id: None,
                lifecycle,
            });
            return Ok(None);
        };

        let mut status = None;
        loop {
            tokio::select! {
                Some(event) = responses.next() => {
                    if let Some(code) = document_status(&event, &loader_id) {
                        status = Some(code);
                    }
                }
                event = lifecycle.next() => {
                    // Events of an earlier, abandoned load carry its own loader id
                    let Some(event) = event else {
                        return Err(navigation_error(url, "page closed before DOMContentLoaded"));
                    };
                    if is_lifecycle_event(&event, DOM_CONTENT_LOADED_EVENT, &loader_id) {
                        break;
                    }
                }
            }
        }

        // The document response precedes DOMContentLoaded but may still sit
        // in its own channel
        while let Some(Some(event)) = responses.next().now_or_never() {
            if let Some(code) = document_status(&event, &loader_id) {
                status = Some(code);
            }
        }

        self.navigation = Some(CommittedNavigation {
            loader_id: Some(loader_id),
            lifecycle,
        });

        Ok(status.map(|status| NavigationResponse { status }))
    }

    async fn wait_for_network_idle(&mut self, timeout: Duration) -> BrowserResult<bool> {
        let Some(navigation) = self.navigation.as_mut() else {
            return Ok(true);
        };
        let Some(loader_id) = navigation.loader_id.clone() else {
            // Same-document navigations never emit a fresh networkIdle
            return Ok(true);
        };

        let lifecycle = &mut navigation.lifecycle;
        let idle = async {
            while let Some(event) = lifecycle.next().await {
                if is_lifecycle_event(&event, NETWORK_IDLE_EVENT, &loader_id) {
                    return true;
                }
            }
            false
        };

        match tokio::time::timeout(timeout, idle).await {
            Ok(true) => Ok(true),
            Ok(false) => Err(BrowserError::NavigationFailed(
                "page closed while waiting for network idle".to_string(),
            )),
            Err(_) => Ok(false),
        }
    }

    async fn evaluate(&mut self, script: &str) -> BrowserResult<serde_json::Value> {
        let page = self
            .page
            .as_ref()
            .ok_or_else(|| BrowserError::EvaluationFailed("session has no open page".to_string()))?;

        page.evaluate(script)
            .await
            .map_err(|e| BrowserError::EvaluationFailed(e.to_string()))?
            .into_value::<serde_json::Value>()
            .map_err(|e| BrowserError::EvaluationFailed(format!("decode result: {e}")))
    }

    async fn close(&mut self) -> BrowserResult<()> {
        let mut first_error = None;
        self.navigation = None;

        if let Some(page) = self.page.take()
            && let Err(e) = page.close().await
        {
            first_error.get_or_insert(BrowserError::TeardownFailed(format!("close page: {e}")));
        }

        if let (Some(context_id), Some(wrapper)) = (self.context_id.take(), self.wrapper.as_ref())
            && let Err(e) = wrapper.browser().dispose_browser_context(context_id).await
        {
            first_error.get_or_insert(BrowserError::TeardownFailed(format!(
                "dispose browser context: {e}"
            )));
        }

        if let Some(mut wrapper) = self.wrapper.take()
            && let Err(e) = wrapper.shutdown().await
        {
            first_error.get_or_insert(e);
        }

        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chromiumoxide::cdp::browser_protocol::network::MonotonicTime;
    use chromiumoxide::cdp::browser_protocol::page::FrameId;

    fn lifecycle(name: &str, loader: &str) -> EventLifecycleEvent {
        EventLifecycleEvent {
            frame_id: FrameId::new("main-frame"),
            loader_id: LoaderId::new(loader),
            name: name.to_string(),
            timestamp: MonotonicTime::new(0.0),
        }
    }

    #[test]
    fn lifecycle_events_match_only_their_own_load() {
        let current = LoaderId::new("load-2");

        assert!(is_lifecycle_event(
            &lifecycle("DOMContentLoaded", "load-2"),
            DOM_CONTENT_LOADED_EVENT,
            &current
        ));
        // A late event from the abandoned first attempt
        assert!(!is_lifecycle_event(
            &lifecycle("DOMContentLoaded", "load-1"),
            DOM_CONTENT_LOADED_EVENT,
            &current
        ));
        assert!(!is_lifecycle_event(
            &lifecycle("load", "load-2"),
            DOM_CONTENT_LOADED_EVENT,
            &current
        ));
        assert!(is_lifecycle_event(
            &lifecycle("networkIdle", "load-2"),
            NETWORK_IDLE_EVENT,
            &current
        ));
    }
}
