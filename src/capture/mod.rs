//! Browser driver abstraction and the scroll-capture-stitch engine
//!
//! This module provides the core abstractions for capturing web content
//! larger than the browser viewport. It includes:
//!
//! - `BrowserDriver`: Trait for the remote-browser adapter (script
//!   evaluation, viewport screenshots, frame switching)
//! - `RawImage`: RGBA bitmap returned by drivers
//! - `scroll` / `stitch`: Scroll planning and frame merging
//! - `CaptureSession`: Page, element and frame capture on top of a driver
//! - `MockDriver`: Deterministic in-process driver for tests
//! - `WebDriverBackend`: fantoccini-backed driver (feature `webdriver`)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    error::{CaptureError, CaptureResult},
    geometry::{Rect, ScrollOffset, Size},
    model::ElementAlignment,
};

pub mod constants;
pub mod mock;
pub mod pixel_ratio;
pub mod raw_image;
pub mod scripts;
pub mod scroll;
pub mod session;
pub mod stitch;

#[cfg(feature = "webdriver")]
pub mod webdriver_backend;

pub use mock::{MockDriver, MockRegion};
pub use pixel_ratio::DevicePixelRatio;
pub use raw_image::RawImage;
pub use session::CaptureSession;
pub use stitch::{CaptureFrame, Stitcher};
#[cfg(feature = "webdriver")]
pub use webdriver_backend::WebDriverBackend;

/// What a scroll or measurement applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScrollTarget {
    /// The current document (inside a frame: the frame's document)
    Page,
    /// A scrollable element addressed by CSS selector
    Element(String),
}

impl ScrollTarget {
    /// Targets the element matching `selector`
    pub fn element(selector: impl Into<String>) -> Self {
        Self::Element(selector.into())
    }

    fn not_found(&self) -> CaptureError {
        match self {
            ScrollTarget::Page => CaptureError::ScriptFailed {
                reason: "document is not available".to_string(),
            },
            ScrollTarget::Element(selector) => CaptureError::ElementNotFound {
                selector: selector.clone(),
            },
        }
    }
}

/// Optional features a driver supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DriverCapabilities {
    /// Can return the whole document in one native screenshot
    pub full_content_capture: bool,
}

/// Adapter to a remote-controlled browser
///
/// `BrowserDriver` is the only seam between the capture engine and a real
/// browser. Implementors provide script evaluation, viewport screenshots,
/// navigation and frame switching; scrolling and measuring default to
/// JavaScript from [`scripts`], so a minimal driver only implements the
/// required methods.
///
/// All implementations must be thread-safe (`Send + Sync`). A driver
/// instance is still bound to one browser session: concurrent captures on
/// the same driver must be serialized by the caller.
///
/// # Errors
///
/// Adapter failures surface as
/// [`CaptureError::DriverUnavailable`](crate::error::CaptureError::DriverUnavailable)
/// or [`CaptureError::ElementNotFound`](crate::error::CaptureError::ElementNotFound)
/// and are never retried by the engine.
///
/// # Examples
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use serde_json::Value;
/// use webshot::{
///     capture::{BrowserDriver, RawImage},
///     error::CaptureResult,
/// };
///
/// struct MyDriver;
///
/// #[async_trait]
/// impl BrowserDriver for MyDriver {
///     fn name(&self) -> &str { "my-driver" }
///     async fn evaluate_script(&self, script: &str, args: Vec<Value>) -> CaptureResult<Value> { todo!() }
///     async fn capture_viewport(&self) -> CaptureResult<RawImage> { todo!() }
///     async fn navigate(&self, url: &str) -> CaptureResult<()> { todo!() }
///     async fn current_url(&self) -> CaptureResult<String> { todo!() }
///     async fn enter_frame(&self, selector: &str) -> CaptureResult<()> { todo!() }
///     async fn exit_frame(&self) -> CaptureResult<()> { todo!() }
/// }
/// ```
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Short name used in logs and health reports
    fn name(&self) -> &str;

    /// Optional features of this driver
    fn capabilities(&self) -> DriverCapabilities {
        DriverCapabilities::default()
    }

    /// Evaluates `script` as the body of a function called with `args`
    ///
    /// # Errors
    ///
    /// - [`CaptureError::ScriptFailed`] - The script threw
    /// - [`CaptureError::DriverUnavailable`] - The session is gone
    async fn evaluate_script(&self, script: &str, args: Vec<Value>) -> CaptureResult<Value>;

    /// Captures the visible viewport in raw device pixels
    ///
    /// The bitmap may include browser chrome such as scrollbars.
    async fn capture_viewport(&self) -> CaptureResult<RawImage>;

    /// Captures the whole document in one native screenshot
    ///
    /// Only drivers reporting
    /// [`DriverCapabilities::full_content_capture`] implement this.
    async fn capture_full_content(&self) -> CaptureResult<RawImage> {
        Err(CaptureError::unsupported(
            "full page",
            format!("driver '{}' has no native full-page screenshot", self.name()),
        ))
    }

    /// Loads `url` in the current window
    async fn navigate(&self, url: &str) -> CaptureResult<()>;

    /// URL of the current top-level document
    async fn current_url(&self) -> CaptureResult<String>;

    /// Switches the browsing context into the frame matching `selector`
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::FrameNotFound`] if no frame matches.
    async fn enter_frame(&self, selector: &str) -> CaptureResult<()>;

    /// Switches the browsing context back to the parent document
    async fn exit_frame(&self) -> CaptureResult<()>;

    /// Scrolls the target to `offset`
    async fn scroll_to(&self, target: &ScrollTarget, offset: ScrollOffset) -> CaptureResult<()> {
        let args = vec![scripts::target_arg(target), json!(offset.x), json!(offset.y)];
        let scrolled = self.evaluate_script(scripts::SCROLL_TO, args).await?;
        if scripts::truthy(&scrolled) {
            Ok(())
        } else {
            Err(target.not_found())
        }
    }

    /// Current scroll position of the target
    async fn current_scroll(&self, target: &ScrollTarget) -> CaptureResult<ScrollOffset> {
        let value = self
            .evaluate_script(scripts::CURRENT_SCROLL, vec![scripts::target_arg(target)])
            .await?;
        let [x, y] = scripts::numbers::<2>(&value, "scroll position")?
            .ok_or_else(|| target.not_found())?;
        Ok(ScrollOffset::from_reported(x, y))
    }

    /// Rectangle, in viewport coordinates, through which the target's
    /// content is visible
    ///
    /// For the page this is the document client area at the origin; for an
    /// element it is its client box (inside borders, excluding scrollbars).
    async fn measure_viewport(&self, target: &ScrollTarget) -> CaptureResult<Rect> {
        let value = self
            .evaluate_script(scripts::MEASURE_VIEWPORT, vec![scripts::target_arg(target)])
            .await?;
        let reported = scripts::numbers::<4>(&value, "viewport measurement")?
            .ok_or_else(|| target.not_found())?;
        Ok(Rect::from_reported(reported))
    }

    /// Full scrollable extent of the target's content
    async fn measure_content_extent(&self, target: &ScrollTarget) -> CaptureResult<Size> {
        let value = self
            .evaluate_script(scripts::MEASURE_CONTENT, vec![scripts::target_arg(target)])
            .await?;
        let [width, height] = scripts::numbers::<2>(&value, "content measurement")?
            .ok_or_else(|| target.not_found())?;
        let rect = Rect::from_reported([0.0, 0.0, width, height]);
        Ok(rect.size())
    }

    /// Ratio of device pixels to logical pixels
    async fn measure_device_pixel_ratio(&self) -> CaptureResult<f64> {
        let value = self
            .evaluate_script(scripts::DEVICE_PIXEL_RATIO, Vec::new())
            .await?;
        scripts::number(&value, "device pixel ratio")
    }

    /// Border box of the element matching `selector`, in page coordinates
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::ElementNotFound`] if nothing matches.
    async fn locate(&self, selector: &str) -> CaptureResult<Rect> {
        let value = self
            .evaluate_script(scripts::LOCATE, vec![json!(selector)])
            .await?;
        let reported = scripts::numbers::<4>(&value, "element location")?.ok_or_else(|| {
            CaptureError::ElementNotFound {
                selector: selector.to_string(),
            }
        })?;
        Ok(Rect::from_reported(reported))
    }

    /// Scrolls the page so the element matching `selector` is visible,
    /// aligned per `alignment`
    async fn scroll_into_view(
        &self,
        selector: &str,
        alignment: ElementAlignment,
    ) -> CaptureResult<()> {
        let args = vec![json!(selector), json!(alignment.as_block())];
        let scrolled = self
            .evaluate_script(scripts::SCROLL_INTO_VIEW, args)
            .await?;
        if scripts::truthy(&scrolled) {
            Ok(())
        } else {
            Err(CaptureError::ElementNotFound {
                selector: selector.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Driver whose scripts return canned values, exercising the default
    /// JavaScript-backed methods
    struct ScriptedDriver {
        response: Value,
        calls:    Mutex<Vec<(String, Vec<Value>)>>,
    }

    impl ScriptedDriver {
        fn returning(response: Value) -> Self {
            Self {
                response,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn last_args(&self) -> Vec<Value> {
            self.calls.lock().unwrap().last().unwrap().1.clone()
        }
    }

    #[async_trait]
    impl BrowserDriver for ScriptedDriver {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn evaluate_script(&self, script: &str, args: Vec<Value>) -> CaptureResult<Value> {
            self.calls.lock().unwrap().push((script.to_string(), args));
            Ok(self.response.clone())
        }

        async fn capture_viewport(&self) -> CaptureResult<RawImage> {
            Ok(RawImage::blank(1, 1))
        }

        async fn navigate(&self, _url: &str) -> CaptureResult<()> {
            Ok(())
        }

        async fn current_url(&self) -> CaptureResult<String> {
            Ok("about:blank".to_string())
        }

        async fn enter_frame(&self, _selector: &str) -> CaptureResult<()> {
            Ok(())
        }

        async fn exit_frame(&self) -> CaptureResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_default_locate_parses_rect() {
        let driver = ScriptedDriver::returning(json!([10.2, 1200.0, 300.0, 150.6]));
        let rect = driver.locate("#card").await.unwrap();
        assert_eq!(rect, Rect::new(10, 1200, 300, 151));
        assert_eq!(driver.last_args(), vec![json!("#card")]);
    }

    #[tokio::test]
    async fn test_default_locate_null_is_element_not_found() {
        let driver = ScriptedDriver::returning(Value::Null);
        let result = driver.locate("#missing").await;
        match result {
            Err(CaptureError::ElementNotFound { selector }) => assert_eq!(selector, "#missing"),
            other => panic!("expected ElementNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_default_scroll_to_passes_target_and_offset() {
        let driver = ScriptedDriver::returning(json!(true));
        driver
            .scroll_to(&ScrollTarget::element("#list"), ScrollOffset::new(0, 400))
            .await
            .unwrap();
        assert_eq!(driver.last_args(), vec![json!("#list"), json!(0), json!(400)]);
    }

    #[tokio::test]
    async fn test_default_scroll_to_missing_element() {
        let driver = ScriptedDriver::returning(json!(false));
        let result = driver
            .scroll_to(&ScrollTarget::element("#gone"), ScrollOffset::ORIGIN)
            .await;
        assert!(matches!(result, Err(CaptureError::ElementNotFound { .. })));
    }

    #[tokio::test]
    async fn test_default_measurements() {
        let driver = ScriptedDriver::returning(json!([1280.0, 5000.4]));
        let size = driver.measure_content_extent(&ScrollTarget::Page).await.unwrap();
        assert_eq!(size, Size::new(1280, 5000));
        assert_eq!(driver.last_args(), vec![Value::Null]);

        let driver = ScriptedDriver::returning(json!([-0.4, 120.7]));
        let scroll = driver.current_scroll(&ScrollTarget::Page).await.unwrap();
        assert_eq!(scroll, ScrollOffset::new(0, 121));

        let driver = ScriptedDriver::returning(json!(2));
        assert_eq!(driver.measure_device_pixel_ratio().await.unwrap(), 2.0);
    }

    #[tokio::test]
    async fn test_default_scroll_into_view_passes_alignment() {
        let driver = ScriptedDriver::returning(json!(true));
        driver
            .scroll_into_view("#card", ElementAlignment::Center)
            .await
            .unwrap();
        assert_eq!(driver.last_args(), vec![json!("#card"), json!("center")]);
    }

    #[tokio::test]
    async fn test_default_full_content_is_unsupported() {
        let driver = ScriptedDriver::returning(Value::Null);
        assert!(!driver.capabilities().full_content_capture);
        let result = driver.capture_full_content().await;
        assert!(matches!(result, Err(CaptureError::UnsupportedCapture { .. })));
    }
}
