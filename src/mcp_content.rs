//! MCP content builders for capture and comparison results
//!
//! Capture tools answer with three content blocks: the PNG inline (for
//! immediate preview), a reference to the saved file (for persistent
//! access), and JSON metadata describing the capture. Comparison tools
//! answer with the regression outcome and, on a mismatch, the diff image.
//!
//! # Examples
//!
//! ```
//! use std::path::PathBuf;
//!
//! use webshot::mcp_content::{CaptureMetadata, build_capture_result};
//!
//! let png = vec![137, 80, 78, 71, 13, 10, 26, 10];
//! let path = PathBuf::from("/tmp/screenshots/home.png");
//! let metadata = CaptureMetadata {
//!     subject:            "page".to_string(),
//!     mode:               "vertical_scroll".to_string(),
//!     url:                Some("https://example.com/".to_string()),
//!     dimensions:         [800, 2400],
//!     device_pixel_ratio: 1.0,
//! };
//!
//! let result = build_capture_result(&png, &path, &metadata);
//! assert!(!result.is_error.unwrap_or(false));
//! assert_eq!(result.content.len(), 3);
//! ```

use std::path::Path;

use base64::{Engine, engine::general_purpose::STANDARD};
use rmcp::model::{CallToolResult, Content};
use serde::Serialize;

use crate::{regression::RegressionOutcome, util::encode::PNG_MIME_TYPE};

/// Description of one capture, reported next to the image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureMetadata {
    /// What was captured: `page`, `element <selector>` or `frame <selector>`
    pub subject:            String,
    /// Capture mode used
    pub mode:               String,
    /// URL of the captured page, if known
    pub url:                Option<String>,
    /// Bitmap size in raw pixels
    pub dimensions:         [u32; 2],
    /// Device pixel ratio the capture was taken at
    pub device_pixel_ratio: f64,
}

/// Builds MCP image content from encoded image bytes
///
/// # Examples
///
/// ```
/// use webshot::mcp_content::build_image_content;
///
/// let png_data = vec![137, 80, 78, 71, 13, 10, 26, 10, 0, 0, 0, 13];
/// let content = build_image_content(&png_data, "image/png");
/// assert!(content.as_image().is_some());
/// ```
pub fn build_image_content(data: &[u8], mime_type: &str) -> Content {
    Content::image(STANDARD.encode(data), mime_type)
}

/// Builds a text reference to a saved image
///
/// The text carries a `file://` URI, the file name, an ISO 8601 timestamp,
/// the MIME type and the file size.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
///
/// use webshot::mcp_content::build_resource_link;
///
/// let path = PathBuf::from("/tmp/screenshot-12345.png");
/// let content = build_resource_link(&path, "image/png", 12345);
/// assert!(content.as_text().is_some());
/// ```
pub fn build_resource_link(path: &Path, mime_type: &str, size: u64) -> Content {
    let path_str = path.to_string_lossy();

    #[cfg(target_os = "windows")]
    let uri = format!("file:///{}", path_str.replace('\\', "/"));

    #[cfg(not(target_os = "windows"))]
    let uri = format!("file://{}", path_str);

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("screenshot.png");

    let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

    let content_text = format!(
        "## Image File Reference\n\n**File:** [{}]({})\n**Timestamp:** {}\n**Size:** {} \
         bytes\n**MIME Type:** {}\n\n_The image has been saved to the path above._",
        filename, uri, timestamp, size, mime_type
    );

    Content::text(content_text)
}

fn json_block(title: &str, value: &serde_json::Value) -> Content {
    let text = serde_json::to_string_pretty(value)
        .unwrap_or_else(|_| r#"{"error": "Failed to serialize metadata"}"#.to_string());
    Content::text(format!("## {title}\n\n```json\n{text}\n```"))
}

/// Builds the result of a capture tool
///
/// Contains, in order:
/// 1. The PNG inline, base64-encoded
/// 2. A reference to the saved file
/// 3. Capture metadata as JSON
pub fn build_capture_result(
    png: &[u8],
    file_path: &Path,
    metadata: &CaptureMetadata,
) -> CallToolResult {
    let size = png.len() as u64;

    let image_content = build_image_content(png, PNG_MIME_TYPE);
    let resource_link = build_resource_link(file_path, PNG_MIME_TYPE, size);

    let mut json = serde_json::to_value(metadata).unwrap_or_default();
    if let Some(object) = json.as_object_mut() {
        object.insert("size_bytes".into(), size.into());
        object.insert(
            "file_path".into(),
            file_path.to_string_lossy().into_owned().into(),
        );
    }

    CallToolResult::success(vec![
        image_content,
        resource_link,
        json_block("Capture Metadata", &json),
    ])
}

/// Builds the result of a comparison tool
///
/// The outcome JSON always comes first. When a diff image was written, its
/// PNG and a reference to its file follow.
pub fn build_regression_result(
    outcome: &RegressionOutcome,
    diff_png: Option<&[u8]>,
) -> CallToolResult {
    let json = serde_json::to_value(outcome).unwrap_or_default();
    let mut content = vec![json_block("Comparison Result", &json)];

    if let (Some(png), Some(path)) = (diff_png, outcome.diff_path.as_deref()) {
        content.push(build_image_content(png, PNG_MIME_TYPE));
        content.push(build_resource_link(path, PNG_MIME_TYPE, png.len() as u64));
    }

    CallToolResult::success(content)
}
