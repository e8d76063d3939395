//! Shared configuration constants for page metadata extraction
//!
//! Default budgets live here so the config layer, the extractor and the
//! tests agree on one set of numbers.

/// Desktop Chrome user agent applied to every isolated browsing context
///
/// Updated: 2025-01-29 to Chrome 132 (current stable)
///
/// Reference: https://chromiumdash.appspot.com/schedule
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

/// Overall wall-clock budget for one scrape request
pub const DEFAULT_REQUEST_BUDGET_MS: u64 = 20_000;

/// Per-attempt navigation timeout, strictly below the request budget
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 15_000;

/// Soft wait for network quiescence, strictly below the navigation timeout
pub const DEFAULT_NETWORK_IDLE_TIMEOUT_MS: u64 = 5_000;

/// Navigation attempts per request (first try plus one retry)
pub const DEFAULT_MAX_NAVIGATION_ATTEMPTS: u32 = 2;

/// Viewport applied to every isolated browsing context
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1280;
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 720;

/// Status reported when the browser returns no navigation response
/// (same-document navigations)
pub const DEFAULT_NAVIGATION_STATUS: u16 = 200;

/// Ceiling for releasing a session; a hung Chrome shutdown is abandoned
pub const DEFAULT_TEARDOWN_TIMEOUT_MS: u64 = 5_000;
