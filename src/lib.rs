//! Headless-browser page metadata extraction
//!
//! Loads a single page in an isolated Chrome session via chromiumoxide and
//! returns its title, meta description, first heading and HTTP status over
//! one HTTP endpoint.

pub mod browser;
pub mod browser_setup;
pub mod handler;
pub mod observer;
pub mod page_extractor;
pub mod server;
mod utils;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::utils::constants::{
    CHROME_USER_AGENT, DEFAULT_MAX_NAVIGATION_ATTEMPTS, DEFAULT_NAVIGATION_TIMEOUT_MS,
    DEFAULT_NETWORK_IDLE_TIMEOUT_MS, DEFAULT_REQUEST_BUDGET_MS, DEFAULT_VIEWPORT_HEIGHT,
    DEFAULT_VIEWPORT_WIDTH,
};

/// Environment variable pointing at an alternative config file
pub const CONFIG_PATH_ENV: &str = "PAGEMETA_CONFIG";

/// Environment variable overriding `server.bind`
pub const BIND_ADDR_ENV: &str = "PAGEMETA_BIND";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub scrape: ScrapeConfig,

    #[serde(default)]
    pub browser: BrowserConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the HTTP server binds to
    #[serde(default = "default_bind")]
    pub bind: String,
}

/// Time budgets and retry policy of the extraction pipeline
///
/// Budgets nest: network idle wait < per-attempt navigation timeout <
/// overall request budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    #[serde(default = "default_request_budget_ms")]
    pub request_budget_ms: u64,

    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    #[serde(default = "default_network_idle_timeout_ms")]
    pub network_idle_timeout_ms: u64,

    #[serde(default = "default_max_navigation_attempts")]
    pub max_navigation_attempts: u32,
}

/// Browser security and launch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Disable web security features (Same-Origin Policy, etc.)
    /// WARNING: Only enable for trusted content
    #[serde(default = "default_disable_security")]
    pub disable_security: bool,

    /// Explicit Chrome executable; discovered automatically when unset
    #[serde(default)]
    pub executable: Option<PathBuf>,

    /// User agent of every browsing context
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Viewport dimensions
    #[serde(default)]
    pub window: WindowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_width")]
    pub width: u32,

    #[serde(default = "default_window_height")]
    pub height: u32,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_request_budget_ms() -> u64 {
    DEFAULT_REQUEST_BUDGET_MS
}

fn default_navigation_timeout_ms() -> u64 {
    DEFAULT_NAVIGATION_TIMEOUT_MS
}

fn default_network_idle_timeout_ms() -> u64 {
    DEFAULT_NETWORK_IDLE_TIMEOUT_MS
}

fn default_max_navigation_attempts() -> u32 {
    DEFAULT_MAX_NAVIGATION_ATTEMPTS
}

fn default_headless() -> bool {
    true
}

fn default_disable_security() -> bool {
    false // SECURE BY DEFAULT
}

fn default_user_agent() -> String {
    CHROME_USER_AGENT.to_string()
}

fn default_window_width() -> u32 {
    DEFAULT_VIEWPORT_WIDTH
}

fn default_window_height() -> u32 {
    DEFAULT_VIEWPORT_HEIGHT
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            request_budget_ms: default_request_budget_ms(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            network_idle_timeout_ms: default_network_idle_timeout_ms(),
            max_navigation_attempts: default_max_navigation_attempts(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            disable_security: default_disable_security(),
            executable: None,
            user_agent: default_user_agent(),
            window: WindowConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_window_width(),
            height: default_window_height(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl ScrapeConfig {
    pub fn request_budget(&self) -> Duration {
        Duration::from_millis(self.request_budget_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn network_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.network_idle_timeout_ms)
    }
}

impl Config {
    /// Check that budgets are positive, bounded and properly nested
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scrape = &self.scrape;
        let budget = utils::validate_budget_ms("scrape.request_budget_ms", scrape.request_budget_ms)
            .map_err(ConfigError::Invalid)?;
        let navigation =
            utils::validate_budget_ms("scrape.navigation_timeout_ms", scrape.navigation_timeout_ms)
                .map_err(ConfigError::Invalid)?;
        let idle = utils::validate_budget_ms(
            "scrape.network_idle_timeout_ms",
            scrape.network_idle_timeout_ms,
        )
        .map_err(ConfigError::Invalid)?;

        if navigation >= budget {
            return Err(ConfigError::Invalid(format!(
                "scrape.navigation_timeout_ms ({}) must be shorter than scrape.request_budget_ms ({})",
                scrape.navigation_timeout_ms, scrape.request_budget_ms
            )));
        }

        if idle >= navigation {
            return Err(ConfigError::Invalid(format!(
                "scrape.network_idle_timeout_ms ({}) must be shorter than scrape.navigation_timeout_ms ({})",
                scrape.network_idle_timeout_ms, scrape.navigation_timeout_ms
            )));
        }

        if scrape.max_navigation_attempts == 0 {
            return Err(ConfigError::Invalid(
                "scrape.max_navigation_attempts must be at least 1".to_string(),
            ));
        }

        if self.browser.window.width == 0 || self.browser.window.height == 0 {
            return Err(ConfigError::Invalid(
                "browser.window dimensions must be non-zero".to_string(),
            ));
        }

        if self.browser.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "browser.user_agent must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Pipeline settings derived from this config
    pub fn extraction_settings(&self) -> page_extractor::ExtractionSettings {
        page_extractor::ExtractionSettings {
            session: browser::SessionOptions {
                user_agent: self.browser.user_agent.clone(),
                viewport_width: self.browser.window.width,
                viewport_height: self.browser.window.height,
            },
            navigation: page_extractor::NavigationPolicy {
                max_attempts: self.scrape.max_navigation_attempts,
                attempt_timeout: self.scrape.navigation_timeout(),
            },
            network_idle_timeout: self.scrape.network_idle_timeout(),
        }
    }
}

/// Load config from a YAML file, falling back to defaults if it is missing
///
/// Applies the `PAGEMETA_BIND` override and validates the result.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let mut config = if path.exists() {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&contents)?
    } else {
        Config::default()
    };

    if let Ok(bind) = std::env::var(BIND_ADDR_ENV)
        && !bind.trim().is_empty()
    {
        config.server.bind = bind;
    }

    config.validate()?;
    Ok(config)
}

/// Load config from `$PAGEMETA_CONFIG`, or `config.yaml` in the working directory
pub fn load_yaml_config() -> Result<Config, ConfigError> {
    let path = std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    load_config_from(&path)
}

/// Wire the production Chrome engine, extractor and handler from config
pub fn build_handler(config: &Config) -> ScrapeHandler {
    let observer: Arc<dyn ScrapeObserver> = Arc::new(TracingObserver);
    let engine: Arc<dyn BrowserEngine> = Arc::new(ChromiumEngine::new(config.browser.clone()));
    let extractor = Arc::new(PageExtractor::new(
        engine,
        config.extraction_settings(),
        observer.clone(),
    ));
    ScrapeHandler::new(extractor, config.scrape.request_budget(), observer)
}

/// Start the HTTP server programmatically
///
/// Returns a ServerHandle for graceful shutdown control.
/// This function is non-blocking - the server runs in background tasks.
pub async fn start_server(config: &Config) -> anyhow::Result<ServerHandle> {
    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.server.bind, e))?;

    start_server_with_listener(listener, build_handler(config)).await
}

/// Start the HTTP server on a pre-bound listener
pub async fn start_server_with_listener(
    listener: tokio::net::TcpListener,
    handler: ScrapeHandler,
) -> anyhow::Result<ServerHandle> {
    server::serve(listener, server::router(handler)).await
}

pub use browser::{
    BrowserEngine, BrowserError, BrowserResult, BrowserSession, ChromiumEngine, NavigationResponse,
    SessionOptions,
};
pub use handler::{ScrapeHandler, ScrapeTarget};
pub use observer::{ScrapeObserver, TracingObserver};
pub use page_extractor::{
    ExtractionSettings, NavigationError, NavigationPolicy, PageExtractor, PageMetadata,
};
pub use server::ServerHandle;
pub use utils::{DeadlineError, ErrorCategory, ScrapeError, race_with_deadline};
