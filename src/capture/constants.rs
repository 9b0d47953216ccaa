//! Centralized defaults for capture sessions and persisted artifacts.
//!
//! # Runtime Configuration
//!
//! Defaults can be overridden at runtime via environment variables:
//!
//! | Environment Variable | Default | Description |
//! |---------------------|---------|-------------|
//! | `WEBSHOT_SCROLL_SETTLE_MS` | 100 | Pause after each scroll before capturing |
//! | `WEBSHOT_WAIT_POLL_INTERVAL_MS` | 50 | Poll interval of script pre-capture waits |
//! | `WEBSHOT_SCREENSHOT_DIR` | `screenshots` | Default folder for captures, baselines and diffs |
//! | `WEBSHOT_WEBDRIVER_URL` | `http://localhost:4444` | WebDriver endpoint used by the binary |
//!
//! # Settle Delay
//!
//! Browsers apply scroll requests asynchronously. Lazy-loaded images, sticky
//! headers and smooth scrolling all need a moment after the scroll position
//! changes before the viewport shows the final layout. 100ms covers typical
//! pages; raise it for pages with scroll-triggered animation.

/// Pause after each scroll before the viewport is captured.
pub const DEFAULT_SCROLL_SETTLE_MS: u64 = 100;

/// Pause between polls of a script pre-capture wait.
pub const DEFAULT_WAIT_POLL_INTERVAL_MS: u64 = 50;

/// Folder used for captures, baselines and diff images when none is given.
pub const DEFAULT_SCREENSHOT_DIR: &str = "screenshots";

/// WebDriver endpoint the binary connects to by default.
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:4444";

/// Longest file name derived from a page URL.
///
/// 159 characters keeps the full path of a baseline inside common
/// path-component limits once a folder and extension are added.
pub const MAX_FILE_NAME_LEN: usize = 159;

/// Suffix appended to the file name of a diff image.
pub const DIFF_SUFFIX: &str = "-DIFF_IMAGE";

/// Extension of every persisted image.
pub const IMAGE_EXTENSION: &str = "png";

// =============================================================================
// Environment Variable Overrides
// =============================================================================

/// Helper to get a number from environment variable or fall back to default.
fn get_u64_from_env(env_var: &str, default: u64) -> u64 {
    std::env::var(env_var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Helper to get a non-empty string from environment variable or fall back
/// to default.
fn get_string_from_env(env_var: &str, default: &str) -> String {
    std::env::var(env_var)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Get the scroll settle delay, checking environment variable override.
///
/// Override with: `WEBSHOT_SCROLL_SETTLE_MS`
///
/// # Example
///
/// ```bash
/// # Give scroll-triggered animations more time
/// export WEBSHOT_SCROLL_SETTLE_MS=400
/// ```
pub fn scroll_settle_ms() -> u64 {
    get_u64_from_env("WEBSHOT_SCROLL_SETTLE_MS", DEFAULT_SCROLL_SETTLE_MS)
}

/// Get the script wait poll interval, checking environment variable override.
///
/// Override with: `WEBSHOT_WAIT_POLL_INTERVAL_MS`
pub fn wait_poll_interval_ms() -> u64 {
    get_u64_from_env("WEBSHOT_WAIT_POLL_INTERVAL_MS", DEFAULT_WAIT_POLL_INTERVAL_MS)
}

/// Get the default screenshot folder, checking environment variable override.
///
/// Override with: `WEBSHOT_SCREENSHOT_DIR`
pub fn screenshot_dir() -> String {
    get_string_from_env("WEBSHOT_SCREENSHOT_DIR", DEFAULT_SCREENSHOT_DIR)
}

/// Get the WebDriver endpoint, checking environment variable override.
///
/// Override with: `WEBSHOT_WEBDRIVER_URL`
///
/// # Example
///
/// ```bash
/// # Use a Selenium grid instead of a local chromedriver
/// export WEBSHOT_WEBDRIVER_URL=http://selenium:4444/wd/hub
/// ```
pub fn webdriver_url() -> String {
    get_string_from_env("WEBSHOT_WEBDRIVER_URL", DEFAULT_WEBDRIVER_URL)
}
