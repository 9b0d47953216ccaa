//! Error types for capture, stitching and comparison operations
//!
//! This module defines the single error type used throughout the crate.
//! Each variant carries the context needed to explain what went wrong, and
//! [`CaptureError::remediation_hint`] suggests a next step.

use crate::geometry::RawRegion;

/// Result type alias for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Error type for screenshot capture, stitching and diff operations
///
/// Adapter failures (`DriverUnavailable`, `ElementNotFound`) propagate
/// unchanged; nothing in this crate retries them.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The remote browser session is unreachable or has been closed
    #[error("Browser driver unavailable: {reason}")]
    DriverUnavailable {
        /// Reason reported by the driver
        reason: String,
    },

    /// Selector resolved to no element
    #[error("Element not found: {selector}")]
    ElementNotFound {
        /// Selector that matched nothing
        selector: String,
    },

    /// Selector resolved to no frame
    #[error("Frame not found: {selector}")]
    FrameNotFound {
        /// Selector that matched nothing
        selector: String,
    },

    /// The requested capture mode cannot be applied to the subject
    #[error("Unsupported capture of {subject}: {reason}")]
    UnsupportedCapture {
        /// What was being captured (e.g. "frame #main")
        subject: String,
        /// Why the mode is not applicable
        reason:  String,
    },

    /// A crop region falls outside the held bitmap
    #[error("Region {region} is outside the {width}x{height} bitmap")]
    OutOfBounds {
        /// Requested region in raw pixels
        region: RawRegion,
        /// Bitmap width
        width:  u32,
        /// Bitmap height
        height: u32,
    },

    /// Image encoding failed
    #[error("Failed to encode image as {format}: {reason}")]
    EncodingFailed {
        /// Image format that failed
        format: String,
        /// Reason for encoding failure
        reason: String,
    },

    /// Invalid parameter provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: String,
        /// Reason why it's invalid
        reason:    String,
    },

    /// A script evaluated in the browser failed or returned an unexpected
    /// value
    #[error("Script evaluation failed: {reason}")]
    ScriptFailed {
        /// Error message or description of the unexpected value
        reason: String,
    },

    /// Frames were fed to the stitcher out of sequence
    #[error("Stitching sequence violated: {reason}")]
    StitchSequence {
        /// Description of the violation
        reason: String,
    },

    /// I/O error occurred
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Image decoding or processing error
    #[error("Image processing error: {0}")]
    ImageError(String),
}

impl CaptureError {
    /// Returns an actionable remediation hint for this error
    ///
    /// # Examples
    ///
    /// ```
    /// use webshot::error::CaptureError;
    ///
    /// let error = CaptureError::ElementNotFound {
    ///     selector: "#missing".to_string(),
    /// };
    ///
    /// let hint = error.remediation_hint();
    /// assert!(hint.contains("selector"));
    /// ```
    pub fn remediation_hint(&self) -> &str {
        match self {
            CaptureError::DriverUnavailable { .. } => {
                "The browser session could not be reached. Check that the WebDriver server \
                 (chromedriver, geckodriver or Selenium) is running at WEBSHOT_WEBDRIVER_URL and \
                 that the session has not been closed."
            }
            CaptureError::ElementNotFound { .. } => {
                "No element matched the CSS selector. Check the selector, and make sure the page \
                 has finished loading (use a pre-capture wait for dynamic content)."
            }
            CaptureError::FrameNotFound { .. } => {
                "No frame matched the CSS selector. Frames are usually addressed by id, e.g. \
                 '#content-frame'."
            }
            CaptureError::UnsupportedCapture { .. } => {
                "Scrolling capture of an element or frame requires the whole subject to be \
                 visible in the viewport. Use the viewport capture mode, or enlarge the browser \
                 window."
            }
            CaptureError::OutOfBounds { .. } => {
                "The crop rectangle extends past the captured bitmap. Crop coordinates are logical \
                 pixels and are scaled by the device pixel ratio."
            }
            CaptureError::EncodingFailed { .. } => {
                "PNG encoding failed. Check that the bitmap dimensions are non-zero."
            }
            CaptureError::InvalidParameter { parameter, .. } => match parameter.as_str() {
                "tolerance" => "Tolerance must be between 0.0 and 1.0.",
                "device_pixel_ratio" => "Device pixel ratio must be a positive, finite number.",
                _ => "Check the parameter value against the API documentation.",
            },
            CaptureError::ScriptFailed { .. } => {
                "A script run in the page failed. The page may have navigated away or replaced \
                 the document during capture."
            }
            CaptureError::StitchSequence { .. } => {
                "Frames were pushed to the stitcher out of order or after it finished. Feed \
                 exactly one frame per planned scroll step."
            }
            CaptureError::IoError(_) => {
                "An I/O error occurred. Check file permissions, disk space, and system resources."
            }
            CaptureError::ImageError(_) => {
                "Image processing failed. Ensure the image data is valid and the requested \
                 operations are supported."
            }
        }
    }

    /// Creates an `UnsupportedCapture` error
    pub fn unsupported(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        CaptureError::UnsupportedCapture {
            subject: subject.into(),
            reason:  reason.into(),
        }
    }

    /// Creates an `InvalidParameter` error
    pub fn invalid_parameter(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        CaptureError::InvalidParameter {
            parameter: parameter.into(),
            reason:    reason.into(),
        }
    }
}
