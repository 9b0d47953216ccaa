//! Mock browser driver for testing
//!
//! This module provides a `MockDriver` implementation of the
//! [`BrowserDriver`] trait. It simulates a page of configurable size behind
//! a viewport, optional scrollable elements and frames, and a device pixel
//! ratio, without requiring a real browser.
//!
//! # Features
//!
//! - **Deterministic Content:** Every raw page pixel encodes its own
//!   coordinates (see [`MockDriver::content_pixel`]), so a stitched capture
//!   can be compared against [`MockDriver::expected_content`]
//! - **Browser Chrome:** Viewport screenshots carry a scrollbar strip on the
//!   right that captures must crop away
//! - **Elements and Frames:** Scrollable regions with their own content
//! - **Scroll Log:** Every `scroll_to` call is recorded
//! - **Configurable Delay:** Simulate slow drivers
//! - **Error Injection:** Every operation fails with a chosen error
//!
//! # Examples
//!
//! ```
//! use webshot::{
//!     capture::{BrowserDriver, MockDriver},
//!     geometry::Size,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let driver = MockDriver::new()
//!         .with_viewport(Size::new(400, 300))
//!         .with_content(Size::new(400, 1000))
//!         .with_device_pixel_ratio(2.0);
//!
//!     let shot = driver.capture_viewport().await.unwrap();
//!     // 400 logical pixels plus a 16px scrollbar, doubled
//!     assert_eq!(shot.dimensions(), (832, 600));
//! }
//! ```

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use image::Rgba;
use serde_json::Value;
use tokio::time::sleep;

use super::{
    BrowserDriver, DriverCapabilities, ScrollTarget, pixel_ratio::DevicePixelRatio,
    raw_image::RawImage,
};
use crate::{
    error::{CaptureError, CaptureResult},
    geometry::{RawRegion, Rect, ScrollOffset, Size},
    model::ElementAlignment,
};

/// Color of the simulated scrollbar strip
pub const CHROME_PIXEL: Rgba<u8> = Rgba([200, 200, 200, 255]);

/// Default logical width of the simulated scrollbar
pub const DEFAULT_SCROLLBAR_WIDTH: u32 = 16;

/// A scrollable element or frame on the mock page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockRegion {
    /// CSS selector that resolves to this region
    pub selector: String,
    /// Client box in page coordinates
    pub rect:     Rect,
    /// Scrollable content size
    pub content:  Size,
    /// Whether the region is a frame (enterable) rather than an element
    pub frame:    bool,
}

impl MockRegion {
    /// A scrollable element
    pub fn element(selector: impl Into<String>, rect: Rect, content: Size) -> Self {
        Self {
            selector: selector.into(),
            rect,
            content,
            frame: false,
        }
    }

    /// A frame with its own document
    pub fn frame(selector: impl Into<String>, rect: Rect, content: Size) -> Self {
        Self {
            frame: true,
            ..Self::element(selector, rect, content)
        }
    }

    fn max_scroll(&self) -> ScrollOffset {
        ScrollOffset::new(
            self.content.width.saturating_sub(self.rect.width),
            self.content.height.saturating_sub(self.rect.height),
        )
    }
}

#[derive(Debug)]
struct MockState {
    url:           String,
    page_scroll:   ScrollOffset,
    region_scroll: HashMap<String, ScrollOffset>,
    frame:         Option<usize>,
    scroll_log:    Vec<(ScrollTarget, ScrollOffset)>,
    captures:      usize,
    polls:         usize,
}

/// Mock browser driver for testing and development
///
/// Scrolling, measurements, element lookup and frame switching are answered
/// natively from the configured page model. `evaluate_script` only serves
/// pre-capture wait conditions: it reports ready once
/// [`with_ready_after_polls`](MockDriver::with_ready_after_polls) polls have
/// happened.
///
/// # Thread Safety
///
/// `MockDriver` is thread-safe and can be shared across tasks using `Arc`.
#[derive(Debug)]
pub struct MockDriver {
    /// Optional delay to simulate async operation timing
    delay:                Option<Duration>,
    /// Optional error to inject for testing error handling
    error_injection:      Option<CaptureError>,
    viewport:             Size,
    content:              Size,
    device_pixel_ratio:   f64,
    scrollbar_width:      u32,
    regions:              Vec<MockRegion>,
    full_content_capture: bool,
    ready_after_polls:    Option<usize>,
    state:                Mutex<MockState>,
}

impl MockDriver {
    /// Creates a mock with an 800x600 viewport showing an 800x600 page at
    /// device pixel ratio 1
    pub fn new() -> Self {
        Self {
            delay:                None,
            error_injection:      None,
            viewport:             Size::new(800, 600),
            content:              Size::new(800, 600),
            device_pixel_ratio:   1.0,
            scrollbar_width:      DEFAULT_SCROLLBAR_WIDTH,
            regions:              Vec::new(),
            full_content_capture: false,
            ready_after_polls:    Some(0),
            state:                Mutex::new(MockState {
                url:           "https://example.com/".to_string(),
                page_scroll:   ScrollOffset::ORIGIN,
                region_scroll: HashMap::new(),
                frame:         None,
                scroll_log:    Vec::new(),
                captures:      0,
                polls:         0,
            }),
        }
    }

    /// Sets the logical viewport size
    pub fn with_viewport(mut self, viewport: Size) -> Self {
        self.viewport = viewport;
        self
    }

    /// Sets the logical page content size
    pub fn with_content(mut self, content: Size) -> Self {
        self.content = content;
        self
    }

    /// Sets the reported device pixel ratio
    pub fn with_device_pixel_ratio(mut self, ratio: f64) -> Self {
        self.device_pixel_ratio = ratio;
        self
    }

    /// Sets the logical width of the scrollbar strip (0 for none)
    pub fn with_scrollbar_width(mut self, width: u32) -> Self {
        self.scrollbar_width = width;
        self
    }

    /// Adds a scrollable element or frame
    pub fn with_region(mut self, region: MockRegion) -> Self {
        self.regions.push(region);
        self
    }

    /// Enables the native full-page screenshot
    pub fn with_full_content_capture(mut self, enabled: bool) -> Self {
        self.full_content_capture = enabled;
        self
    }

    /// Number of polls after which wait conditions report ready; `None`
    /// never reports ready
    pub fn with_ready_after_polls(mut self, polls: Option<usize>) -> Self {
        self.ready_after_polls = polls;
        self
    }

    /// Sets the URL of the loaded page
    pub fn with_url(self, url: impl Into<String>) -> Self {
        self.lock().url = url.into();
        self
    }

    /// Sets a configurable delay for all async operations
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use webshot::capture::MockDriver;
    ///
    /// let driver = MockDriver::new().with_delay(Duration::from_millis(100));
    /// ```
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Injects an error that will be returned by all operations
    ///
    /// # Examples
    ///
    /// ```
    /// use webshot::{capture::MockDriver, error::CaptureError};
    ///
    /// let driver = MockDriver::new().with_error(CaptureError::DriverUnavailable {
    ///     reason: "session closed".to_string(),
    /// });
    /// ```
    pub fn with_error(mut self, error: CaptureError) -> Self {
        self.error_injection = Some(error);
        self
    }

    /// Pixel shown at raw content coordinate (`x`, `y`) of a layer
    ///
    /// Layer 0 is the page; region `i` (in insertion order) is layer
    /// `i + 1`. Red and green carry the low coordinate bytes, blue the high
    /// bytes, and alpha the layer, so no two pixels of a realistic capture
    /// collide.
    pub fn content_pixel(layer: u8, x: u32, y: u32) -> Rgba<u8> {
        Rgba([
            (x % 256) as u8,
            (y % 256) as u8,
            (((x / 256) % 16) * 16 + (y / 256) % 16) as u8,
            255 - layer,
        ])
    }

    /// Bitmap of a layer's content from its raw origin
    pub fn expected_content(layer: u8, width: u32, height: u32) -> RawImage {
        RawImage::from_fn(width, height, |x, y| Self::content_pixel(layer, x, y))
    }

    /// Layer number of the region matching `selector`
    pub fn region_layer(&self, selector: &str) -> Option<u8> {
        self.regions
            .iter()
            .position(|r| r.selector == selector)
            .map(|i| (i + 1) as u8)
    }

    /// Every `scroll_to` call so far, in order
    pub fn scroll_log(&self) -> Vec<(ScrollTarget, ScrollOffset)> {
        self.lock().scroll_log.clone()
    }

    /// Current page scroll position
    pub fn page_scroll(&self) -> ScrollOffset {
        self.lock().page_scroll
    }

    /// Number of viewport and full-content screenshots taken
    pub fn capture_count(&self) -> usize {
        self.lock().captures
    }

    /// Number of script evaluations (wait polls) so far
    pub fn poll_count(&self) -> usize {
        self.lock().polls
    }

    /// Whether the browsing context is inside a frame
    pub fn in_frame(&self) -> bool {
        self.lock().frame.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ratio(&self) -> DevicePixelRatio {
        DevicePixelRatio::new(self.device_pixel_ratio).unwrap_or(DevicePixelRatio::ONE)
    }

    fn page_max_scroll(&self) -> ScrollOffset {
        ScrollOffset::new(
            self.content.width.saturating_sub(self.viewport.width),
            self.content.height.saturating_sub(self.viewport.height),
        )
    }

    fn find_region(&self, selector: &str) -> Option<(usize, &MockRegion)> {
        self.regions
            .iter()
            .enumerate()
            .find(|(_, r)| r.selector == selector)
    }

    fn element_not_found(selector: &str) -> CaptureError {
        CaptureError::ElementNotFound {
            selector: selector.to_string(),
        }
    }

    /// Region targeted by an element selector; elements inside frames are
    /// not modelled
    fn element_region(&self, state: &MockState, selector: &str) -> CaptureResult<&MockRegion> {
        if state.frame.is_some() {
            return Err(Self::element_not_found(selector));
        }
        self.find_region(selector)
            .map(|(_, region)| region)
            .ok_or_else(|| Self::element_not_found(selector))
    }

    /// Applies configured delay if set
    async fn apply_delay(&self) {
        if let Some(duration) = self.delay {
            sleep(duration).await;
        }
    }

    /// Checks if an error should be injected
    fn check_error_injection(&self) -> CaptureResult<()> {
        if let Some(ref error) = self.error_injection {
            // Clone the error for return
            return Err(match error {
                CaptureError::DriverUnavailable { reason } => CaptureError::DriverUnavailable {
                    reason: reason.clone(),
                },
                CaptureError::ElementNotFound { selector } => CaptureError::ElementNotFound {
                    selector: selector.clone(),
                },
                CaptureError::FrameNotFound { selector } => CaptureError::FrameNotFound {
                    selector: selector.clone(),
                },
                CaptureError::UnsupportedCapture { subject, reason } => {
                    CaptureError::UnsupportedCapture {
                        subject: subject.clone(),
                        reason:  reason.clone(),
                    }
                }
                CaptureError::OutOfBounds {
                    region,
                    width,
                    height,
                } => CaptureError::OutOfBounds {
                    region: *region,
                    width:  *width,
                    height: *height,
                },
                CaptureError::EncodingFailed { format, reason } => CaptureError::EncodingFailed {
                    format: format.clone(),
                    reason: reason.clone(),
                },
                CaptureError::InvalidParameter { parameter, reason } => {
                    CaptureError::InvalidParameter {
                        parameter: parameter.clone(),
                        reason:    reason.clone(),
                    }
                }
                CaptureError::ScriptFailed { reason } => CaptureError::ScriptFailed {
                    reason: reason.clone(),
                },
                CaptureError::StitchSequence { reason } => CaptureError::StitchSequence {
                    reason: reason.clone(),
                },
                CaptureError::IoError(e) => {
                    CaptureError::IoError(std::io::Error::new(e.kind(), e.to_string()))
                }
                CaptureError::ImageError(msg) => CaptureError::ImageError(msg.clone()),
            });
        }
        Ok(())
    }

    async fn enter(&self) -> CaptureResult<()> {
        self.apply_delay().await;
        self.check_error_injection()
    }

    /// Renders `size` raw pixels of the page starting at raw page
    /// coordinate `origin`, followed by `chrome` raw columns of scrollbar
    fn render(&self, state: &MockState, origin: (u32, u32), size: (u32, u32), chrome: u32) -> RawImage {
        let ratio = self.ratio();

        // (layer, raw rect on the page, raw scroll inside the region)
        let layers: Vec<(u8, RawRegion, (u32, u32))> = self
            .regions
            .iter()
            .enumerate()
            .filter_map(|(i, region)| {
                let raw = ratio.rect_to_raw(&region.rect).ok()?;
                let scroll = state
                    .region_scroll
                    .get(&region.selector)
                    .copied()
                    .unwrap_or_default();
                let raw_content = (
                    ratio.to_raw(region.content.width.max(region.rect.width)),
                    ratio.to_raw(region.content.height.max(region.rect.height)),
                );
                let raw_scroll = (
                    ratio.to_raw(scroll.x).min(raw_content.0.saturating_sub(raw.width)),
                    ratio.to_raw(scroll.y).min(raw_content.1.saturating_sub(raw.height)),
                );
                Some(((i + 1) as u8, raw, raw_scroll))
            })
            .collect();

        let (width, height) = size;
        RawImage::from_fn(width + chrome, height, |x, y| {
            if x >= width {
                return CHROME_PIXEL;
            }
            let px = x + origin.0;
            let py = y + origin.1;

            layers
                .iter()
                .rev()
                .find(|(_, raw, _)| {
                    px >= raw.x && py >= raw.y && px < raw.x + raw.width && py < raw.y + raw.height
                })
                .map_or_else(
                    || Self::content_pixel(0, px, py),
                    |(layer, raw, scroll)| {
                        Self::content_pixel(*layer, px - raw.x + scroll.0, py - raw.y + scroll.1)
                    },
                )
        })
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    fn name(&self) -> &str {
        "mock"
    }

    fn capabilities(&self) -> DriverCapabilities {
        DriverCapabilities {
            full_content_capture: self.full_content_capture,
        }
    }

    async fn evaluate_script(&self, _script: &str, _args: Vec<Value>) -> CaptureResult<Value> {
        self.enter().await?;
        let mut state = self.lock();
        state.polls += 1;
        let ready = self.ready_after_polls.is_some_and(|n| state.polls >= n);
        Ok(Value::Bool(ready))
    }

    async fn capture_viewport(&self) -> CaptureResult<RawImage> {
        self.enter().await?;
        let ratio = self.ratio();
        let mut state = self.lock();
        state.captures += 1;

        let raw_width = ratio.to_raw(self.viewport.width);
        let raw_height = ratio.to_raw(self.viewport.height);
        let raw_content_w = ratio.to_raw(self.content.width.max(self.viewport.width));
        let raw_content_h = ratio.to_raw(self.content.height.max(self.viewport.height));
        let origin = (
            ratio
                .to_raw(state.page_scroll.x)
                .min(raw_content_w.saturating_sub(raw_width)),
            ratio
                .to_raw(state.page_scroll.y)
                .min(raw_content_h.saturating_sub(raw_height)),
        );

        Ok(self.render(
            &state,
            origin,
            (raw_width, raw_height),
            ratio.to_raw(self.scrollbar_width),
        ))
    }

    async fn capture_full_content(&self) -> CaptureResult<RawImage> {
        self.enter().await?;
        if !self.full_content_capture {
            return Err(CaptureError::unsupported(
                "full page",
                "mock driver configured without native full-page screenshots",
            ));
        }

        let ratio = self.ratio();
        let mut state = self.lock();
        state.captures += 1;
        let size = (
            ratio.to_raw(self.content.width.max(self.viewport.width)),
            ratio.to_raw(self.content.height.max(self.viewport.height)),
        );
        Ok(self.render(&state, (0, 0), size, 0))
    }

    async fn navigate(&self, url: &str) -> CaptureResult<()> {
        self.enter().await?;
        let mut state = self.lock();
        state.url = url.to_string();
        state.page_scroll = ScrollOffset::ORIGIN;
        state.region_scroll.clear();
        state.frame = None;
        Ok(())
    }

    async fn current_url(&self) -> CaptureResult<String> {
        self.enter().await?;
        Ok(self.lock().url.clone())
    }

    async fn enter_frame(&self, selector: &str) -> CaptureResult<()> {
        self.enter().await?;
        let mut state = self.lock();
        let index = match self.find_region(selector) {
            Some((index, region)) if region.frame && state.frame.is_none() => index,
            _ => {
                return Err(CaptureError::FrameNotFound {
                    selector: selector.to_string(),
                });
            }
        };
        state.frame = Some(index);
        Ok(())
    }

    async fn exit_frame(&self) -> CaptureResult<()> {
        self.enter().await?;
        self.lock().frame = None;
        Ok(())
    }

    async fn scroll_to(&self, target: &ScrollTarget, offset: ScrollOffset) -> CaptureResult<()> {
        self.enter().await?;
        let mut state = self.lock();

        let (key, max) = match (target, state.frame) {
            (ScrollTarget::Page, None) => (None, self.page_max_scroll()),
            (ScrollTarget::Page, Some(index)) => {
                let frame = &self.regions[index];
                (Some(frame.selector.clone()), frame.max_scroll())
            }
            (ScrollTarget::Element(selector), _) => {
                let region = self.element_region(&state, selector)?;
                (Some(region.selector.clone()), region.max_scroll())
            }
        };

        let clamped = ScrollOffset::new(offset.x.min(max.x), offset.y.min(max.y));
        match key {
            None => state.page_scroll = clamped,
            Some(selector) => {
                state.region_scroll.insert(selector, clamped);
            }
        }
        state.scroll_log.push((target.clone(), offset));
        Ok(())
    }

    async fn current_scroll(&self, target: &ScrollTarget) -> CaptureResult<ScrollOffset> {
        self.enter().await?;
        let state = self.lock();
        let selector = match (target, state.frame) {
            (ScrollTarget::Page, None) => return Ok(state.page_scroll),
            (ScrollTarget::Page, Some(index)) => self.regions[index].selector.as_str(),
            (ScrollTarget::Element(selector), _) => {
                self.element_region(&state, selector)?.selector.as_str()
            }
        };
        Ok(state
            .region_scroll
            .get(selector)
            .copied()
            .unwrap_or_default())
    }

    async fn measure_viewport(&self, target: &ScrollTarget) -> CaptureResult<Rect> {
        self.enter().await?;
        let state = self.lock();
        match (target, state.frame) {
            (ScrollTarget::Page, None) => Ok(Rect::from_size(self.viewport)),
            (ScrollTarget::Page, Some(index)) => {
                Ok(Rect::from_size(self.regions[index].rect.size()))
            }
            (ScrollTarget::Element(selector), _) => {
                let region = self.element_region(&state, selector)?;
                Ok(region.rect.offset_by(state.page_scroll))
            }
        }
    }

    async fn measure_content_extent(&self, target: &ScrollTarget) -> CaptureResult<Size> {
        self.enter().await?;
        let state = self.lock();
        let (content, client) = match (target, state.frame) {
            (ScrollTarget::Page, None) => (self.content, self.viewport),
            (ScrollTarget::Page, Some(index)) => {
                let frame = &self.regions[index];
                (frame.content, frame.rect.size())
            }
            (ScrollTarget::Element(selector), _) => {
                let region = self.element_region(&state, selector)?;
                (region.content, region.rect.size())
            }
        };
        Ok(Size::new(
            content.width.max(client.width),
            content.height.max(client.height),
        ))
    }

    async fn measure_device_pixel_ratio(&self) -> CaptureResult<f64> {
        self.enter().await?;
        Ok(self.device_pixel_ratio)
    }

    async fn locate(&self, selector: &str) -> CaptureResult<Rect> {
        self.enter().await?;
        let state = self.lock();
        Ok(self.element_region(&state, selector)?.rect)
    }

    async fn scroll_into_view(
        &self,
        selector: &str,
        alignment: ElementAlignment,
    ) -> CaptureResult<()> {
        self.enter().await?;
        let max = self.page_max_scroll();
        let mut state = self.lock();
        let rect = self.element_region(&state, selector)?.rect;
        let current = state.page_scroll;

        let y = match alignment {
            ElementAlignment::Start => rect.y,
            ElementAlignment::Center => {
                rect.y + i64::from(rect.height / 2) - i64::from(self.viewport.height / 2)
            }
        };

        let visible_x = rect.x >= i64::from(current.x)
            && rect.right() <= i64::from(current.x) + i64::from(self.viewport.width);
        let x = if visible_x { i64::from(current.x) } else { rect.x };

        state.page_scroll = ScrollOffset::new(
            x.clamp(0, i64::from(max.x)) as u32,
            y.clamp(0, i64::from(max.y)) as u32,
        );
        Ok(())
    }
}
