//! MCP service implementation with tool routing
//!
//! This module provides the webshot MCP server: page, element and frame
//! captures, baseline recording and visual comparison, all driven through
//! one [`BrowserDriver`]. A browser can only scroll one way at a time, so
//! every tool that touches the page holds the server's session lock for
//! its whole duration.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use rmcp::{
    ServerHandler,
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ErrorData as McpError, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    capture::{BrowserDriver, CaptureSession, MockDriver, constants},
    diff,
    error::CaptureError,
    mcp_content::{CaptureMetadata, build_capture_result, build_regression_result},
    model::{
        CaptureConfig, CaptureMode, ElementAlignment, ElementCaptureMode, HealthCheckResponse,
        OverlapPolicy, PreCaptureWait,
    },
    regression::BaselineStore,
    snapshot::Snapshot,
    util::naming,
};

/// Capture options shared by every capturing tool
///
/// Unset fields keep the [`CaptureConfig`] defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionOptions {
    /// Pause after each scroll before capturing, in milliseconds (default: 100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_settle_ms: Option<u64>,

    /// Scale geometry by the browser's device pixel ratio (default: true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_device_pixel_ratio: Option<bool>,

    /// Condition awaited before each capture (default: none)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_capture_wait: Option<PreCaptureWait>,

    /// Which frame wins where frames overlap (default: keep_later)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlap: Option<OverlapPolicy>,

    /// Where elements land when scrolled into view (default: start)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_alignment: Option<ElementAlignment>,
}

impl SessionOptions {
    /// Builds the capture configuration for `mode`
    pub fn to_config(&self, mode: CaptureMode) -> CaptureConfig {
        let mut config = CaptureConfig::builder().mode(mode).build();
        if let Some(settle) = self.scroll_settle_ms {
            config.scroll_settle_ms = settle;
        }
        if let Some(enabled) = self.use_device_pixel_ratio {
            config.use_device_pixel_ratio = enabled;
        }
        if let Some(wait) = &self.pre_capture_wait {
            config.pre_capture_wait = wait.clone();
        }
        if let Some(overlap) = self.overlap {
            config.overlap = overlap;
        }
        if let Some(alignment) = self.element_alignment {
            config.element_alignment = alignment;
        }
        config
    }
}

/// Parameters for the navigate tool
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NavigateParams {
    /// URL to load
    pub url: String,
}

/// Parameters for the capture_page tool
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CapturePageParams {
    /// Load this URL before capturing (default: capture the current page)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Capture mode (default: viewport)
    #[serde(default)]
    pub mode: CaptureMode,

    /// Capture options
    #[serde(default, flatten)]
    pub options: SessionOptions,

    /// File to write the PNG to (default: a timestamped file in the
    /// screenshot folder)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,

    /// File name inside the screenshot folder, ignored when `outputPath` is
    /// set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Parameters for the capture_element and capture_frame tools
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CaptureSubjectParams {
    /// CSS selector of the element or frame
    pub selector: String,

    /// Load this URL before capturing (default: capture the current page)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Capture mode (default: viewport)
    #[serde(default)]
    pub mode: ElementCaptureMode,

    /// Capture options
    #[serde(default, flatten)]
    pub options: SessionOptions,

    /// File to write the PNG to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,

    /// File name inside the screenshot folder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Parameters for the record_baseline tool
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordBaselineParams {
    /// Load this URL before capturing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Capture mode (default: viewport)
    #[serde(default)]
    pub mode: CaptureMode,

    /// Capture options
    #[serde(default, flatten)]
    pub options: SessionOptions,

    /// Baseline name (default: derived from the page URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Folder holding baselines (default: the screenshot folder)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_dir: Option<String>,
}

/// Parameters for the compare_page tool
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComparePageParams {
    /// Load this URL before capturing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Capture mode; must match the mode the baseline was recorded with
    /// (default: viewport)
    #[serde(default)]
    pub mode: CaptureMode,

    /// Capture options
    #[serde(default, flatten)]
    pub options: SessionOptions,

    /// Allowed difference between 0.0 and 1.0 (default: 0.0, exact match)
    #[serde(default)]
    pub tolerance: f64,

    /// Baseline name (default: derived from the page URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_name: Option<String>,

    /// Diff image name (default: baseline name with a -DIFF_IMAGE suffix)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_name: Option<String>,

    /// Folder holding baselines (default: the screenshot folder)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_dir: Option<String>,

    /// Folder receiving diff images (default: the baseline folder)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_dir: Option<String>,
}

/// Converts a CaptureError to an MCP ErrorData
///
/// Caller mistakes (unknown selectors, inapplicable modes, bad parameters)
/// become `invalid_params`; everything else is an `internal_error`. The
/// remediation hint travels in the error data.
fn convert_capture_error_to_mcp(error: CaptureError) -> McpError {
    let message = error.to_string();
    let data = Some(serde_json::json!({ "hint": error.remediation_hint() }));

    match &error {
        CaptureError::ElementNotFound { .. } => McpError::invalid_params(message, data),
        CaptureError::FrameNotFound { .. } => McpError::invalid_params(message, data),
        CaptureError::UnsupportedCapture { .. } => McpError::invalid_params(message, data),
        CaptureError::OutOfBounds { .. } => McpError::invalid_params(message, data),
        CaptureError::InvalidParameter { .. } => McpError::invalid_params(message, data),
        CaptureError::DriverUnavailable { .. } => McpError::internal_error(message, data),
        CaptureError::ScriptFailed { .. } => McpError::internal_error(message, data),
        CaptureError::StitchSequence { .. } => McpError::internal_error(message, data),
        CaptureError::EncodingFailed { .. } => McpError::internal_error(message, data),
        CaptureError::IoError(_) => McpError::internal_error(message, data),
        CaptureError::ImageError(_) => McpError::internal_error(message, data),
    }
}

/// Webshot MCP server
///
/// # Tools
///
/// - `health_check`: Whether the browser driver answers
/// - `navigate`: Load a URL
/// - `capture_page`: Viewport, scrolled or full-page capture of the page
/// - `capture_element`: Capture of one element
/// - `capture_frame`: Capture of one frame's document
/// - `record_baseline`: Capture the page and store it as a baseline
/// - `compare_page`: Capture the page and compare it with its baseline
#[derive(Clone)]
pub struct WebshotMcpServer {
    tool_router:  ToolRouter<Self>,
    driver:       Arc<dyn BrowserDriver>,
    session_lock: Arc<Mutex<()>>,
    output_dir:   PathBuf,
}

#[tool_router]
impl WebshotMcpServer {
    /// Creates a server driving `driver`, saving into the configured
    /// screenshot folder
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use webshot::{capture::MockDriver, mcp::WebshotMcpServer};
    ///
    /// let server = WebshotMcpServer::new(Arc::new(MockDriver::new()));
    /// ```
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            driver,
            session_lock: Arc::new(Mutex::new(())),
            output_dir: PathBuf::from(constants::screenshot_dir()),
        }
    }

    /// Creates a server with a [`MockDriver`] for testing
    pub fn new_with_mock() -> Self {
        Self::new(Arc::new(MockDriver::new()))
    }

    /// Saves captures and baselines into `dir` instead
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Folder captures and baselines are saved into by default
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Health check tool - reports whether the browser driver answers
    ///
    /// # Returns
    ///
    /// A `CallToolResult` containing a JSON object with:
    /// - `driver`: Name of the browser driver
    /// - `current_url`: URL currently loaded, null if the driver failed
    /// - `ok`: Whether the driver answered
    ///
    /// # Examples
    ///
    /// Response:
    /// ```json
    /// {
    ///   "content": [{
    ///     "type": "text",
    ///     "text": "{\"driver\":\"webdriver\",\"current_url\":\"https://example.com/\",\"ok\":true}"
    ///   }]
    /// }
    /// ```
    #[tool(description = "Check server health and whether the browser driver answers")]
    pub async fn health_check(&self) -> Result<CallToolResult, McpError> {
        let response = match self.driver.current_url().await {
            Ok(url) => HealthCheckResponse::healthy(self.driver.name(), url),
            Err(error) => {
                warn!(driver = self.driver.name(), %error, "health check failed");
                HealthCheckResponse::error(self.driver.name())
            }
        };

        let json_str = serde_json::to_string(&response).map_err(|e| {
            McpError::internal_error(
                format!("Failed to serialize health check response: {}", e),
                None,
            )
        })?;

        Ok(CallToolResult::success(vec![Content::text(json_str)]))
    }

    /// Loads a URL in the browser
    #[tool(description = "Load a URL in the browser")]
    pub async fn navigate(
        &self,
        Parameters(params): Parameters<NavigateParams>,
    ) -> Result<CallToolResult, McpError> {
        let _session = self.session_lock.lock().await;
        let current = self.open(Some(&params.url)).await?;

        let json = serde_json::json!({ "url": current });
        Ok(CallToolResult::success(vec![Content::text(json.to_string())]))
    }

    /// Captures the page
    ///
    /// Returns the PNG inline, a reference to the saved file and capture
    /// metadata.
    ///
    /// # Examples
    ///
    /// Request:
    /// ```json
    /// {
    ///   "method": "tools/call",
    ///   "params": {
    ///     "name": "capture_page",
    ///     "arguments": {
    ///       "url": "https://example.com",
    ///       "mode": "vertical_scroll",
    ///       "scrollSettleMs": 250,
    ///       "preCaptureWait": {"kind": "delay", "millis": 500}
    ///     }
    ///   }
    /// }
    /// ```
    #[tool(
        description = "Capture the page: viewport, vertical_scroll, horizontal_scroll, full_scroll or full_page"
    )]
    pub async fn capture_page(
        &self,
        Parameters(params): Parameters<CapturePageParams>,
    ) -> Result<CallToolResult, McpError> {
        let _session = self.session_lock.lock().await;
        let url = self.open(params.url.as_deref()).await?;

        let snapshot = self.shoot(params.mode, &params.options).await?;

        self.save_capture(
            snapshot,
            "page".to_string(),
            params.mode.as_str(),
            url,
            params.output_path,
            params.name,
        )
    }

    /// Captures one element
    #[tool(
        description = "Capture one element by CSS selector: viewport, vertical_scroll, horizontal_scroll or full_scroll"
    )]
    pub async fn capture_element(
        &self,
        Parameters(params): Parameters<CaptureSubjectParams>,
    ) -> Result<CallToolResult, McpError> {
        let _session = self.session_lock.lock().await;
        let url = self.open(params.url.as_deref()).await?;

        let snapshot = self
            .session(CaptureMode::Viewport, &params.options)
            .await?
            .shoot_element(&params.selector, params.mode)
            .await
            .map_err(convert_capture_error_to_mcp)?;

        self.save_capture(
            snapshot,
            format!("element {}", params.selector),
            params.mode.as_str(),
            url,
            params.output_path,
            params.name,
        )
    }

    /// Captures the document of one frame
    #[tool(
        description = "Capture the document of one iframe by CSS selector: viewport, vertical_scroll, horizontal_scroll or full_scroll"
    )]
    pub async fn capture_frame(
        &self,
        Parameters(params): Parameters<CaptureSubjectParams>,
    ) -> Result<CallToolResult, McpError> {
        let _session = self.session_lock.lock().await;
        let url = self.open(params.url.as_deref()).await?;

        let snapshot = self
            .session(CaptureMode::Viewport, &params.options)
            .await?
            .shoot_frame(&params.selector, params.mode)
            .await
            .map_err(convert_capture_error_to_mcp)?;

        self.save_capture(
            snapshot,
            format!("frame {}", params.selector),
            params.mode.as_str(),
            url,
            params.output_path,
            params.name,
        )
    }

    /// Captures the page and stores it as a baseline
    #[tool(description = "Capture the page and store it as the baseline for later comparisons")]
    pub async fn record_baseline(
        &self,
        Parameters(params): Parameters<RecordBaselineParams>,
    ) -> Result<CallToolResult, McpError> {
        let _session = self.session_lock.lock().await;
        let url = self.open(params.url.as_deref()).await?;
        let name = baseline_name(params.name.as_deref(), url.as_deref())?;

        let snapshot = self.shoot(params.mode, &params.options).await?;
        let store = self.store(params.baseline_dir.as_deref(), None);

        let path = store
            .record(&snapshot, &name)
            .map_err(convert_capture_error_to_mcp)?;

        let json = serde_json::json!({
            "baseline_path": path.to_string_lossy(),
            "dimensions": [snapshot.image().width(), snapshot.image().height()],
            "mode": params.mode.as_str(),
            "url": url,
        });
        Ok(CallToolResult::success(vec![Content::text(json.to_string())]))
    }

    /// Captures the page and compares it with its baseline
    ///
    /// A missing baseline is reported as a failed comparison, not as an
    /// error. On a mismatch the diff image is saved and returned inline.
    #[tool(
        description = "Capture the page and compare it with its recorded baseline under a tolerance; returns the diff image on mismatch"
    )]
    pub async fn compare_page(
        &self,
        Parameters(params): Parameters<ComparePageParams>,
    ) -> Result<CallToolResult, McpError> {
        diff::validate_tolerance(params.tolerance).map_err(convert_capture_error_to_mcp)?;

        let _session = self.session_lock.lock().await;
        let url = self.open(params.url.as_deref()).await?;
        let name = baseline_name(params.baseline_name.as_deref(), url.as_deref())?;
        let diff_name = params
            .diff_name
            .clone()
            .unwrap_or_else(|| naming::diff_name_for(&name));

        let snapshot = self.shoot(params.mode, &params.options).await?;
        let store = self.store(params.baseline_dir.as_deref(), params.diff_dir.as_deref());

        let outcome = store
            .compare(&snapshot, &name, &diff_name, params.tolerance)
            .map_err(convert_capture_error_to_mcp)?;

        info!(
            baseline = %outcome.baseline_path.display(),
            matches = outcome.matches,
            "compared page with baseline"
        );

        let diff_png = match &outcome.diff_path {
            Some(path) => Some(
                std::fs::read(path)
                    .map_err(|e| convert_capture_error_to_mcp(CaptureError::from(e)))?,
            ),
            None => None,
        };

        Ok(build_regression_result(&outcome, diff_png.as_deref()))
    }
}

impl WebshotMcpServer {
    /// Navigates if `url` is given and reports the current URL
    async fn open(&self, url: Option<&str>) -> Result<Option<String>, McpError> {
        if let Some(url) = url {
            self.driver
                .navigate(url)
                .await
                .map_err(convert_capture_error_to_mcp)?;
            info!(url, "navigated");
        }

        match self.driver.current_url().await {
            Ok(current) => Ok(Some(current)),
            Err(error) => {
                warn!(%error, "could not read the current URL");
                Ok(None)
            }
        }
    }

    async fn session(
        &self,
        mode: CaptureMode,
        options: &SessionOptions,
    ) -> Result<CaptureSession<'_>, McpError> {
        CaptureSession::new(self.driver.as_ref(), options.to_config(mode))
            .await
            .map_err(convert_capture_error_to_mcp)
    }

    async fn shoot(&self, mode: CaptureMode, options: &SessionOptions) -> Result<Snapshot, McpError> {
        self.session(mode, options)
            .await?
            .shoot_page(mode)
            .await
            .map_err(convert_capture_error_to_mcp)
    }

    fn store(&self, baseline_dir: Option<&str>, diff_dir: Option<&str>) -> BaselineStore {
        let baseline_dir = baseline_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| self.output_dir.clone());
        let diff_dir = diff_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| baseline_dir.clone());
        BaselineStore::new(baseline_dir, diff_dir)
    }

    fn save_capture(
        &self,
        snapshot: Snapshot,
        subject: String,
        mode: &str,
        url: Option<String>,
        output_path: Option<String>,
        name: Option<String>,
    ) -> Result<CallToolResult, McpError> {
        let snapshot = match name {
            Some(name) => snapshot.with_name(name),
            None => snapshot,
        };
        let path = match output_path {
            Some(path) => PathBuf::from(naming::with_image_extension(&path)),
            None => snapshot.path_in(&self.output_dir),
        };

        let png = snapshot
            .save_png(&path)
            .map_err(convert_capture_error_to_mcp)?;

        let (width, height) = snapshot.image().dimensions();
        let metadata = CaptureMetadata {
            subject,
            mode: mode.to_string(),
            url,
            dimensions: [width, height],
            device_pixel_ratio: snapshot.ratio().get(),
        };

        Ok(build_capture_result(&png, &path, &metadata))
    }
}

/// Explicit baseline name, or the one derived from the page URL
fn baseline_name(name: Option<&str>, url: Option<&str>) -> Result<String, McpError> {
    match (name, url) {
        (Some(name), _) => Ok(name.to_string()),
        (None, Some(url)) => Ok(naming::baseline_file_name(url)),
        (None, None) => Err(McpError::invalid_params(
            "A baseline name is required when the page URL cannot be read",
            None,
        )),
    }
}

impl Default for WebshotMcpServer {
    fn default() -> Self {
        Self::new_with_mock()
    }
}

#[tool_handler]
impl ServerHandler for WebshotMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Captures web pages, elements and frames larger than the viewport by scrolling \
                 and stitching, and compares captures with recorded baselines."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::{
        capture::MockRegion,
        geometry::{Rect, Size},
    };

    fn quick() -> SessionOptions {
        SessionOptions {
            scroll_settle_ms: Some(0),
            ..Default::default()
        }
    }

    fn server_with(driver: MockDriver, dir: &TempDir) -> WebshotMcpServer {
        WebshotMcpServer::new(Arc::new(driver)).with_output_dir(dir.path())
    }

    fn tall_page() -> MockDriver {
        MockDriver::new()
            .with_viewport(Size::new(400, 300))
            .with_content(Size::new(400, 1000))
    }

    fn metadata_text(result: &CallToolResult) -> String {
        result.content[2].as_text().unwrap().text.clone()
    }

    #[test]
    fn test_server_default() {
        let server = WebshotMcpServer::default();
        assert_eq!(server.output_dir(), Path::new(&constants::screenshot_dir()));
    }

    #[test]
    fn test_session_options_to_config() {
        let options = SessionOptions {
            scroll_settle_ms: Some(5),
            use_device_pixel_ratio: Some(false),
            overlap: Some(OverlapPolicy::KeepEarlier),
            ..Default::default()
        };
        let config = options.to_config(CaptureMode::FullScroll);

        assert_eq!(config.mode, CaptureMode::FullScroll);
        assert_eq!(config.scroll_settle_ms, 5);
        assert!(!config.use_device_pixel_ratio);
        assert_eq!(config.overlap, OverlapPolicy::KeepEarlier);
        assert_eq!(config.element_alignment, ElementAlignment::Start);
    }

    #[test]
    fn test_params_deserialize_flattened_options() {
        let params: CapturePageParams = serde_json::from_str(
            r#"{"mode":"vertical_scroll","scrollSettleMs":0,"preCaptureWait":{"kind":"delay","millis":5}}"#,
        )
        .unwrap();

        assert_eq!(params.mode, CaptureMode::VerticalScroll);
        assert_eq!(params.options.scroll_settle_ms, Some(0));
        assert_eq!(
            params.options.pre_capture_wait,
            Some(PreCaptureWait::Delay { millis: 5 })
        );
    }

    #[tokio::test]
    async fn test_health_check_reports_url() {
        let dir = TempDir::new().unwrap();
        let server = server_with(MockDriver::new().with_url("https://example.com/a"), &dir);

        let result = server.health_check().await.unwrap();
        let response: HealthCheckResponse =
            serde_json::from_str(&result.content[0].as_text().unwrap().text).unwrap();

        assert!(response.ok);
        assert_eq!(response.driver, "mock");
        assert_eq!(response.current_url.as_deref(), Some("https://example.com/a"));
    }

    #[tokio::test]
    async fn test_health_check_driver_down_is_not_a_tool_error() {
        let dir = TempDir::new().unwrap();
        let driver = MockDriver::new().with_error(CaptureError::DriverUnavailable {
            reason: "session closed".to_string(),
        });
        let server = server_with(driver, &dir);

        let result = server.health_check().await.unwrap();
        let response: HealthCheckResponse =
            serde_json::from_str(&result.content[0].as_text().unwrap().text).unwrap();
        assert!(!response.ok);
        assert!(response.current_url.is_none());
    }

    #[tokio::test]
    async fn test_capture_page_vertical_scroll() {
        let dir = TempDir::new().unwrap();
        let server = server_with(tall_page(), &dir);

        let result = server
            .capture_page(Parameters(CapturePageParams {
                mode: CaptureMode::VerticalScroll,
                options: quick(),
                name: Some("tall".to_string()),
                ..Default::default()
            }))
            .await
            .unwrap();

        assert_eq!(result.content.len(), 3);
        assert!(result.content[0].as_image().is_some());

        let metadata = metadata_text(&result);
        assert!(metadata.contains("vertical_scroll"));
        assert!(metadata.contains("1000"));

        let saved = dir.path().join("tall.png");
        assert!(saved.exists());
        let image = crate::capture::RawImage::open(&saved).unwrap();
        assert_eq!(image.dimensions(), (400, 1000));
    }

    #[tokio::test]
    async fn test_capture_page_navigates_first() {
        let dir = TempDir::new().unwrap();
        let server = server_with(MockDriver::new(), &dir);

        let result = server
            .capture_page(Parameters(CapturePageParams {
                url: Some("https://example.com/pricing".to_string()),
                options: quick(),
                ..Default::default()
            }))
            .await
            .unwrap();

        assert!(metadata_text(&result).contains("https://example.com/pricing"));
    }

    #[tokio::test]
    async fn test_capture_page_explicit_output_path() {
        let dir = TempDir::new().unwrap();
        let server = server_with(MockDriver::new(), &dir);
        let target = dir.path().join("nested/out");

        server
            .capture_page(Parameters(CapturePageParams {
                options: quick(),
                output_path: Some(target.to_string_lossy().into_owned()),
                ..Default::default()
            }))
            .await
            .unwrap();

        assert!(dir.path().join("nested/out.png").exists());
    }

    #[tokio::test]
    async fn test_capture_element_not_found_is_invalid_params() {
        let dir = TempDir::new().unwrap();
        let server = server_with(MockDriver::new(), &dir);

        let error = server
            .capture_element(Parameters(CaptureSubjectParams {
                selector: "#missing".to_string(),
                options: quick(),
                ..Default::default()
            }))
            .await
            .unwrap_err();

        assert_eq!(error.code, rmcp::model::ErrorCode::INVALID_PARAMS);
        assert!(error.message.contains("#missing"));
    }

    #[tokio::test]
    async fn test_capture_element_viewport() {
        let dir = TempDir::new().unwrap();
        let driver = MockDriver::new().with_region(MockRegion::element(
            "#hero",
            Rect::new(10, 20, 200, 100),
            Size::new(200, 100),
        ));
        let server = server_with(driver, &dir);

        let result = server
            .capture_element(Parameters(CaptureSubjectParams {
                selector: "#hero".to_string(),
                options: quick(),
                ..Default::default()
            }))
            .await
            .unwrap();

        let metadata = metadata_text(&result);
        assert!(metadata.contains("element #hero"));
        assert!(metadata.contains("200"));
        assert!(metadata.contains("100"));
    }

    #[tokio::test]
    async fn test_capture_frame_full_scroll() {
        let dir = TempDir::new().unwrap();
        let driver = MockDriver::new().with_region(MockRegion::frame(
            "iframe#docs",
            Rect::new(0, 0, 300, 200),
            Size::new(300, 500),
        ));
        let server = server_with(driver, &dir);

        let result = server
            .capture_frame(Parameters(CaptureSubjectParams {
                selector: "iframe#docs".to_string(),
                mode: ElementCaptureMode::VerticalScroll,
                options: quick(),
                ..Default::default()
            }))
            .await
            .unwrap();

        assert!(metadata_text(&result).contains("frame iframe#docs"));
    }

    #[tokio::test]
    async fn test_record_then_compare_matches() {
        let dir = TempDir::new().unwrap();
        let server = server_with(tall_page().with_url("https://example.com/home"), &dir);

        let recorded = server
            .record_baseline(Parameters(RecordBaselineParams {
                mode: CaptureMode::VerticalScroll,
                options: quick(),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert!(
            recorded.content[0]
                .as_text()
                .unwrap()
                .text
                .contains("example.com-home.png")
        );

        let compared = server
            .compare_page(Parameters(ComparePageParams {
                mode: CaptureMode::VerticalScroll,
                options: quick(),
                ..Default::default()
            }))
            .await
            .unwrap();

        assert_eq!(compared.content.len(), 1);
        let text = &compared.content[0].as_text().unwrap().text;
        assert!(text.contains("\"matches\": true"));
    }

    #[tokio::test]
    async fn test_compare_mode_mismatch_returns_diff() {
        let dir = TempDir::new().unwrap();
        let server = server_with(tall_page(), &dir);

        server
            .record_baseline(Parameters(RecordBaselineParams {
                name: Some("home".to_string()),
                options: quick(),
                ..Default::default()
            }))
            .await
            .unwrap();

        // Same page captured taller than the baseline
        let compared = server
            .compare_page(Parameters(ComparePageParams {
                mode: CaptureMode::VerticalScroll,
                options: quick(),
                baseline_name: Some("home".to_string()),
                ..Default::default()
            }))
            .await
            .unwrap();

        assert_eq!(compared.content.len(), 3);
        let text = &compared.content[0].as_text().unwrap().text;
        assert!(text.contains("dimension_mismatch"));
        assert!(dir.path().join("home-DIFF_IMAGE.png").exists());
    }

    #[tokio::test]
    async fn test_compare_without_baseline() {
        let dir = TempDir::new().unwrap();
        let server = server_with(MockDriver::new(), &dir);

        let compared = server
            .compare_page(Parameters(ComparePageParams {
                options: quick(),
                baseline_name: Some("never-recorded".to_string()),
                ..Default::default()
            }))
            .await
            .unwrap();

        let text = &compared.content[0].as_text().unwrap().text;
        assert!(text.contains("\"baseline_found\": false"));
        assert!(text.contains("\"matches\": false"));
    }

    #[tokio::test]
    async fn test_compare_rejects_bad_tolerance_before_capturing() {
        let dir = TempDir::new().unwrap();
        let driver = Arc::new(MockDriver::new());
        let server = WebshotMcpServer::new(driver.clone()).with_output_dir(dir.path());

        let error = server
            .compare_page(Parameters(ComparePageParams {
                tolerance: 1.5,
                ..Default::default()
            }))
            .await
            .unwrap_err();

        assert_eq!(error.code, rmcp::model::ErrorCode::INVALID_PARAMS);
        assert_eq!(driver.capture_count(), 0);
    }

    #[tokio::test]
    async fn test_captures_are_serialized() {
        let dir = TempDir::new().unwrap();
        let driver = tall_page().with_delay(Duration::from_millis(2));
        let server = server_with(driver, &dir);

        let params = || {
            Parameters(CapturePageParams {
                mode: CaptureMode::VerticalScroll,
                options: quick(),
                ..Default::default()
            })
        };

        let (a, b) = tokio::join!(server.capture_page(params()), server.capture_page(params()));
        assert!(metadata_text(&a.unwrap()).contains("1000"));
        assert!(metadata_text(&b.unwrap()).contains("1000"));
    }

    mod error_mapping_tests {
        use rmcp::model::ErrorCode;

        use super::*;

        fn code(error: CaptureError) -> ErrorCode {
            convert_capture_error_to_mcp(error).code
        }

        #[test]
        fn test_caller_errors_map_to_invalid_params() {
            assert_eq!(
                code(CaptureError::FrameNotFound {
                    selector: "iframe".to_string(),
                }),
                ErrorCode::INVALID_PARAMS
            );
            assert_eq!(
                code(CaptureError::unsupported("frame #x", "taller than the viewport")),
                ErrorCode::INVALID_PARAMS
            );
            assert_eq!(
                code(CaptureError::invalid_parameter("tolerance", "out of range")),
                ErrorCode::INVALID_PARAMS
            );
        }

        #[test]
        fn test_driver_errors_map_to_internal_error() {
            assert_eq!(
                code(CaptureError::DriverUnavailable {
                    reason: "gone".to_string(),
                }),
                ErrorCode::INTERNAL_ERROR
            );
            assert_eq!(
                code(CaptureError::ScriptFailed {
                    reason: "TypeError".to_string(),
                }),
                ErrorCode::INTERNAL_ERROR
            );
            assert_eq!(
                code(CaptureError::ImageError("bad png".to_string())),
                ErrorCode::INTERNAL_ERROR
            );
        }

        #[test]
        fn test_error_carries_hint() {
            let error = convert_capture_error_to_mcp(CaptureError::ElementNotFound {
                selector: "#gone".to_string(),
            });
            assert!(error.message.contains("#gone"));
            let data = error.data.unwrap();
            assert!(data["hint"].as_str().unwrap().contains("selector"));
        }
    }
}
