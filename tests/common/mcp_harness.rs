//! MCP Server Test Harness
//!
//! Provides reusable test fixtures for exercising the webshot MCP server
//! against a mock browser.
//!
//! # Usage
//!
//! ```rust
//! use common::mcp_harness::{ContentValidator, McpTestContext};
//!
//! #[tokio::test]
//! async fn test_capture() {
//!     let ctx = McpTestContext::new_with_mock();
//!     let result = ctx.capture_page(CaptureMode::Viewport).await.unwrap();
//!     let parts = ContentValidator::validate_capture_result(&result).unwrap();
//!     assert!(ContentValidator::is_valid_png(&parts.image_bytes));
//! }
//! ```

use std::{path::Path, sync::Arc};

use base64::{Engine, engine::general_purpose::STANDARD};
use rmcp::{
    handler::server::wrapper::Parameters,
    model::{CallToolResult, ErrorData},
};
use tempfile::TempDir;
use webshot::{
    capture::MockDriver,
    mcp::{CapturePageParams, ComparePageParams, RecordBaselineParams, SessionOptions, WebshotMcpServer},
    model::CaptureMode,
};

/// Test fixture for MCP server integration tests
///
/// Wraps a `WebshotMcpServer` whose output folder is a temporary directory
/// removed when the context is dropped.
pub struct McpTestContext {
    /// The MCP server instance
    pub server: WebshotMcpServer,
    /// Driver used by the server, for inspection
    pub driver: Arc<MockDriver>,
    /// Output folder of the server
    dir:        TempDir,
}

impl McpTestContext {
    /// Create test context with a default MockDriver
    pub fn new_with_mock() -> Self {
        Self::new_with_configured_mock(MockDriver::new())
    }

    /// Create test context with a configured MockDriver
    ///
    /// Use this when you need a particular page layout, injected errors or
    /// delays.
    pub fn new_with_configured_mock(mock: MockDriver) -> Self {
        let dir = TempDir::new().expect("temp dir should be created");
        let driver = Arc::new(mock);
        let server = WebshotMcpServer::new(driver.clone()).with_output_dir(dir.path());
        Self {
            server,
            driver,
            dir,
        }
    }

    /// Output folder of the server
    pub fn output_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Number of files in the output folder
    pub fn output_file_count(&self) -> usize {
        std::fs::read_dir(self.dir.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    // --- Tool invocation helpers ---

    /// Call health_check tool
    pub async fn health_check(&self) -> Result<CallToolResult, ErrorData> {
        self.server.health_check().await
    }

    /// Call capture_page tool with full parameters
    pub async fn capture_page_with(
        &self,
        params: CapturePageParams,
    ) -> Result<CallToolResult, ErrorData> {
        self.server.capture_page(Parameters(params)).await
    }

    /// Convenience: capture the current page without settle delays
    pub async fn capture_page(&self, mode: CaptureMode) -> Result<CallToolResult, ErrorData> {
        self.capture_page_with(CapturePageParams {
            mode,
            options: no_settle(),
            ..Default::default()
        })
        .await
    }

    /// Convenience: record the current page as baseline `name`
    pub async fn record_baseline(
        &self,
        name: &str,
        mode: CaptureMode,
    ) -> Result<CallToolResult, ErrorData> {
        self.server
            .record_baseline(Parameters(RecordBaselineParams {
                mode,
                options: no_settle(),
                name: Some(name.to_string()),
                ..Default::default()
            }))
            .await
    }

    /// Convenience: compare the current page with baseline `name`
    pub async fn compare_page(
        &self,
        name: &str,
        mode: CaptureMode,
        tolerance: f64,
    ) -> Result<CallToolResult, ErrorData> {
        self.server
            .compare_page(Parameters(ComparePageParams {
                mode,
                options: no_settle(),
                tolerance,
                baseline_name: Some(name.to_string()),
                ..Default::default()
            }))
            .await
    }
}

/// Capture options without settle delays
pub fn no_settle() -> SessionOptions {
    SessionOptions {
        scroll_settle_ms: Some(0),
        ..Default::default()
    }
}

// ============================================================================
// Content Validators
// ============================================================================

/// Parsed components of a capture result
#[derive(Debug)]
pub struct CaptureResultParts {
    /// Decoded PNG bytes
    pub image_bytes: Vec<u8>,
    /// file:// URI extracted from the file reference
    pub file_uri:    String,
    /// Parsed metadata JSON
    pub metadata:    serde_json::Value,
}

/// Validation utilities for MCP tool responses
pub struct ContentValidator;

impl ContentValidator {
    /// Decode the base64 image at `index`
    pub fn validate_base64_image(
        result: &CallToolResult,
        index: usize,
        expected_mime: &str,
    ) -> Result<Vec<u8>, String> {
        let image = result
            .content
            .get(index)
            .ok_or("Missing image content")?
            .as_image()
            .ok_or("Content is not an image")?;

        if image.mime_type != expected_mime {
            return Err(format!(
                "Expected MIME type '{}', got '{}'",
                expected_mime, image.mime_type
            ));
        }

        STANDARD
            .decode(&image.data)
            .map_err(|e| format!("Invalid base64: {}", e))
    }

    /// Extract the file:// URI of the file reference at `index`
    pub fn validate_file_uri(result: &CallToolResult, index: usize) -> Result<String, String> {
        let text = result
            .content
            .get(index)
            .ok_or("Missing file reference content")?
            .as_text()
            .ok_or("File reference is not text")?;

        let uri_start = text
            .text
            .find("file://")
            .ok_or("File reference missing file:// URI")?;

        let rest = &text.text[uri_start..];
        let uri_end = rest
            .find(')')
            .or_else(|| rest.find('\n'))
            .unwrap_or(rest.len());

        Ok(rest[..uri_end].to_string())
    }

    /// Parse the JSON code block of the text content at `index`
    pub fn validate_json_block(
        result: &CallToolResult,
        index: usize,
    ) -> Result<serde_json::Value, String> {
        let text = result
            .content
            .get(index)
            .ok_or("Missing JSON content")?
            .as_text()
            .ok_or("JSON content is not text")?;

        let json_str = if let Some(start) = text.text.find("```json") {
            let start = start + 7;
            let end = text.text[start..]
                .find("```")
                .map(|i| start + i)
                .ok_or("Unclosed JSON code block")?;
            text.text[start..end].trim()
        } else {
            text.text.trim()
        };

        serde_json::from_str(json_str).map_err(|e| format!("Invalid JSON: {}", e))
    }

    /// Validate the 3-part capture result: image, file reference, metadata
    pub fn validate_capture_result(result: &CallToolResult) -> Result<CaptureResultParts, String> {
        if result.content.len() != 3 {
            return Err(format!("Expected 3 content items, got {}", result.content.len()));
        }

        if result.is_error.unwrap_or(false) {
            return Err("Result is marked as error".to_string());
        }

        Ok(CaptureResultParts {
            image_bytes: Self::validate_base64_image(result, 0, "image/png")?,
            file_uri:    Self::validate_file_uri(result, 1)?,
            metadata:    Self::validate_json_block(result, 2)?,
        })
    }

    /// Verify PNG magic bytes
    pub fn is_valid_png(bytes: &[u8]) -> bool {
        bytes.len() >= 8 && bytes.starts_with(&[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a])
    }

    /// Turn a file:// URI back into a path
    pub fn uri_to_path(uri: &str) -> Option<&str> {
        uri.strip_prefix("file://")
    }
}

// ============================================================================
// Health Check Parser
// ============================================================================

/// Parsed health check response
#[derive(Debug, serde::Deserialize)]
pub struct HealthCheckParsed {
    pub driver:      String,
    pub current_url: Option<String>,
    pub ok:          bool,
}

/// Parse health_check tool response
pub fn parse_health_check(result: &CallToolResult) -> Result<HealthCheckParsed, String> {
    let text = result
        .content
        .first()
        .and_then(|c| c.as_text())
        .ok_or("Missing health check text content")?;

    serde_json::from_str(&text.text).map_err(|e| format!("Invalid health check JSON: {}", e))
}
