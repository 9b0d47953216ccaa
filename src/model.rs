//! Data models and type definitions for webshot
//!
//! This module defines the configuration and selector types shared by the
//! capture engine and the MCP tools:
//! - Capture mode selectors for pages and for elements/frames
//! - [`CaptureConfig`], the one structured configuration for a capture call
//! - Pre-capture wait conditions
//! - Health check response structures
//!
//! All types serialize with serde and describe themselves with schemars so
//! they can be used directly as MCP tool parameters.

use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::capture::constants;

/// What part of the page a page capture covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// The visible viewport only
    #[default]
    Viewport,
    /// Scroll top to bottom; viewport-wide, content-tall output
    VerticalScroll,
    /// Scroll left to right; content-wide, viewport-tall output
    HorizontalScroll,
    /// Scroll both axes; content-wide and content-tall output
    FullScroll,
    /// Whole document in a single driver call, stitching as a fallback
    FullPage,
}

impl CaptureMode {
    /// Returns the mode as a snake_case string
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureMode::Viewport => "viewport",
            CaptureMode::VerticalScroll => "vertical_scroll",
            CaptureMode::HorizontalScroll => "horizontal_scroll",
            CaptureMode::FullScroll => "full_scroll",
            CaptureMode::FullPage => "full_page",
        }
    }
}

impl std::fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What part of an element or frame a capture covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ElementCaptureMode {
    /// The part of the subject visible in the viewport
    #[default]
    Viewport,
    /// Scroll the subject's content top to bottom
    VerticalScroll,
    /// Scroll the subject's content left to right
    HorizontalScroll,
    /// Scroll the subject's content along both axes
    FullScroll,
}

impl ElementCaptureMode {
    /// Returns the mode as a snake_case string
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementCaptureMode::Viewport => "viewport",
            ElementCaptureMode::VerticalScroll => "vertical_scroll",
            ElementCaptureMode::HorizontalScroll => "horizontal_scroll",
            ElementCaptureMode::FullScroll => "full_scroll",
        }
    }
}

impl std::fmt::Display for ElementCaptureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which frame's pixels win where two consecutive frames overlap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// The later frame overwrites the overlap
    #[default]
    KeepLater,
    /// Only the part of the later frame not already covered is kept
    KeepEarlier,
}

/// Where an element lands in the viewport when scrolled into view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ElementAlignment {
    /// Top edge of the element at the top of the viewport
    #[default]
    Start,
    /// Element vertically centered in the viewport
    Center,
}

impl ElementAlignment {
    /// Value for the `block` option of `Element.scrollIntoView`
    pub fn as_block(&self) -> &'static str {
        match self {
            ElementAlignment::Start => "start",
            ElementAlignment::Center => "center",
        }
    }
}

/// Condition awaited before every capture
///
/// A script wait polls `expression` until it is truthy. If `timeout_ms`
/// elapses first the capture goes ahead anyway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PreCaptureWait {
    /// Capture immediately
    #[default]
    None,
    /// Sleep for a fixed time
    Delay {
        /// Delay in milliseconds
        millis: u64,
    },
    /// Poll a JavaScript expression until it evaluates truthy
    Script {
        /// Expression evaluated with `return (<expression>)`
        expression:       String,
        /// Give up waiting after this many milliseconds
        timeout_ms:       u64,
        /// Pause between polls in milliseconds
        #[serde(default = "default_poll_interval_ms")]
        poll_interval_ms: u64,
    },
}

fn default_poll_interval_ms() -> u64 {
    constants::DEFAULT_WAIT_POLL_INTERVAL_MS
}

impl PreCaptureWait {
    /// Fixed delay wait
    pub fn delay(duration: Duration) -> Self {
        PreCaptureWait::Delay {
            millis: duration.as_millis() as u64,
        }
    }

    /// Script wait with the default poll interval
    pub fn script(expression: impl Into<String>, timeout: Duration) -> Self {
        PreCaptureWait::Script {
            expression:       expression.into(),
            timeout_ms:       timeout.as_millis() as u64,
            poll_interval_ms: constants::wait_poll_interval_ms(),
        }
    }
}

/// Configuration for one capture call
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use webshot::model::{CaptureConfig, CaptureMode, PreCaptureWait};
///
/// let config = CaptureConfig::builder()
///     .mode(CaptureMode::FullScroll)
///     .scroll_settle(Duration::from_millis(250))
///     .pre_capture_wait(PreCaptureWait::script("document.readyState === 'complete'", Duration::from_secs(2)))
///     .build();
///
/// assert_eq!(config.mode, CaptureMode::FullScroll);
/// assert_eq!(config.scroll_settle(), Duration::from_millis(250));
/// assert!(config.use_device_pixel_ratio);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CaptureConfig {
    /// Page capture mode
    pub mode:                   CaptureMode,
    /// Pause after each scroll before capturing, in milliseconds
    pub scroll_settle_ms:       u64,
    /// Scale geometry by the measured device pixel ratio (otherwise 1.0)
    pub use_device_pixel_ratio: bool,
    /// Condition awaited before each capture
    pub pre_capture_wait:       PreCaptureWait,
    /// Which frame wins where frames overlap
    pub overlap:                OverlapPolicy,
    /// Where elements are placed when scrolled into view
    pub element_alignment:      ElementAlignment,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            mode:                   CaptureMode::Viewport,
            scroll_settle_ms:       constants::scroll_settle_ms(),
            use_device_pixel_ratio: true,
            pre_capture_wait:       PreCaptureWait::None,
            overlap:                OverlapPolicy::KeepLater,
            element_alignment:      ElementAlignment::Start,
        }
    }
}

impl CaptureConfig {
    /// Starts a builder from the defaults
    pub fn builder() -> CaptureConfigBuilder {
        CaptureConfigBuilder::default()
    }

    /// Settle delay as a `Duration`
    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }
}

/// Builder for [`CaptureConfig`]
#[derive(Debug, Clone, Default)]
pub struct CaptureConfigBuilder {
    config: CaptureConfig,
}

impl CaptureConfigBuilder {
    /// Sets the page capture mode
    pub fn mode(mut self, mode: CaptureMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Sets the pause after each scroll
    pub fn scroll_settle(mut self, settle: Duration) -> Self {
        self.config.scroll_settle_ms = settle.as_millis() as u64;
        self
    }

    /// Enables or disables device pixel ratio scaling
    pub fn use_device_pixel_ratio(mut self, enabled: bool) -> Self {
        self.config.use_device_pixel_ratio = enabled;
        self
    }

    /// Sets the pre-capture wait condition
    pub fn pre_capture_wait(mut self, wait: PreCaptureWait) -> Self {
        self.config.pre_capture_wait = wait;
        self
    }

    /// Sets the overlap policy
    pub fn overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.config.overlap = overlap;
        self
    }

    /// Sets the element alignment
    pub fn element_alignment(mut self, alignment: ElementAlignment) -> Self {
        self.config.element_alignment = alignment;
        self
    }

    /// Finishes the configuration
    pub fn build(self) -> CaptureConfig {
        self.config
    }
}

/// Response structure for the health_check MCP tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HealthCheckResponse {
    /// Name of the browser driver in use
    pub driver:      String,
    /// URL of the page currently loaded, if the driver could report it
    pub current_url: Option<String>,
    /// Whether the driver answered
    pub ok:          bool,
}

impl HealthCheckResponse {
    /// Creates a successful health check response
    pub fn healthy(driver: impl Into<String>, current_url: String) -> Self {
        Self {
            driver:      driver.into(),
            current_url: Some(current_url),
            ok:          true,
        }
    }

    /// Creates a health check response indicating an error state
    pub fn error(driver: impl Into<String>) -> Self {
        Self {
            driver:      driver.into(),
            current_url: None,
            ok:          false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_mode_serialization() {
        assert_eq!(serde_json::to_string(&CaptureMode::Viewport).unwrap(), r#""viewport""#);
        assert_eq!(
            serde_json::to_string(&CaptureMode::VerticalScroll).unwrap(),
            r#""vertical_scroll""#
        );
        assert_eq!(serde_json::to_string(&CaptureMode::FullPage).unwrap(), r#""full_page""#);
    }

    #[test]
    fn test_capture_mode_deserialization() {
        assert_eq!(
            serde_json::from_str::<CaptureMode>(r#""horizontal_scroll""#).unwrap(),
            CaptureMode::HorizontalScroll
        );
        assert_eq!(
            serde_json::from_str::<ElementCaptureMode>(r#""full_scroll""#).unwrap(),
            ElementCaptureMode::FullScroll
        );
        assert!(serde_json::from_str::<ElementCaptureMode>(r#""full_page""#).is_err());
    }

    #[test]
    fn test_capture_mode_display() {
        assert_eq!(CaptureMode::FullScroll.to_string(), "full_scroll");
        assert_eq!(ElementCaptureMode::Viewport.to_string(), "viewport");
    }

    #[test]
    fn test_config_defaults() {
        let config = CaptureConfig::default();
        assert_eq!(config.mode, CaptureMode::Viewport);
        assert_eq!(config.scroll_settle(), Duration::from_millis(100));
        assert!(config.use_device_pixel_ratio);
        assert_eq!(config.pre_capture_wait, PreCaptureWait::None);
        assert_eq!(config.overlap, OverlapPolicy::KeepLater);
        assert_eq!(config.element_alignment, ElementAlignment::Start);
    }

    #[test]
    fn test_config_builder() {
        let config = CaptureConfig::builder()
            .mode(CaptureMode::VerticalScroll)
            .scroll_settle(Duration::ZERO)
            .use_device_pixel_ratio(false)
            .overlap(OverlapPolicy::KeepEarlier)
            .element_alignment(ElementAlignment::Center)
            .pre_capture_wait(PreCaptureWait::delay(Duration::from_millis(20)))
            .build();

        assert_eq!(config.mode, CaptureMode::VerticalScroll);
        assert_eq!(config.scroll_settle_ms, 0);
        assert!(!config.use_device_pixel_ratio);
        assert_eq!(config.overlap, OverlapPolicy::KeepEarlier);
        assert_eq!(config.element_alignment, ElementAlignment::Center);
        assert_eq!(config.pre_capture_wait, PreCaptureWait::Delay { millis: 20 });
    }

    #[test]
    fn test_config_deserialize_partial() {
        let config: CaptureConfig =
            serde_json::from_str(r#"{"mode":"full_scroll","scroll_settle_ms":0}"#).unwrap();
        assert_eq!(config.mode, CaptureMode::FullScroll);
        assert_eq!(config.scroll_settle_ms, 0);
        assert!(config.use_device_pixel_ratio);
    }

    #[test]
    fn test_pre_capture_wait_tagged_json() {
        let wait: PreCaptureWait = serde_json::from_str(
            r#"{"kind":"script","expression":"window.ready","timeout_ms":500}"#,
        )
        .unwrap();
        assert_eq!(
            wait,
            PreCaptureWait::Script {
                expression:       "window.ready".to_string(),
                timeout_ms:       500,
                poll_interval_ms: constants::DEFAULT_WAIT_POLL_INTERVAL_MS,
            }
        );

        let json = serde_json::to_value(PreCaptureWait::None).unwrap();
        assert_eq!(json["kind"], "none");
    }

    #[test]
    fn test_element_alignment_block() {
        assert_eq!(ElementAlignment::Start.as_block(), "start");
        assert_eq!(ElementAlignment::Center.as_block(), "center");
    }

    #[test]
    fn test_health_check_response() {
        let response = HealthCheckResponse::healthy("mock", "https://example.com/".to_string());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["driver"], "mock");
        assert_eq!(json["ok"], true);

        let response = HealthCheckResponse::error("webdriver");
        assert!(!response.ok);
        assert!(response.current_url.is_none());
    }

    #[test]
    fn test_json_schema_generation() {
        let _mode_schema = schemars::schema_for!(CaptureMode);
        let _config_schema = schemars::schema_for!(CaptureConfig);
        let _wait_schema = schemars::schema_for!(PreCaptureWait);
        let _health_schema = schemars::schema_for!(HealthCheckResponse);
    }
}
