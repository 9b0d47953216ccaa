//! Page, element and frame capture on top of a [`BrowserDriver`]
//!
//! A [`CaptureSession`] drives one capture at a time: it measures what to
//! scroll, plans the steps, scrolls and captures each step, waits for the
//! page to settle before every capture, and merges the frames with a
//! [`Stitcher`]. The device pixel ratio is measured once per session.
//!
//! # Examples
//!
//! ```
//! use webshot::{
//!     capture::{CaptureSession, MockDriver},
//!     geometry::Size,
//!     model::{CaptureConfig, CaptureMode},
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let driver = MockDriver::new()
//!         .with_viewport(Size::new(400, 300))
//!         .with_content(Size::new(400, 1000));
//!     let config = CaptureConfig::builder().scroll_settle(std::time::Duration::ZERO).build();
//!
//!     let session = CaptureSession::new(&driver, config).await.unwrap();
//!     let snapshot = session.shoot_page(CaptureMode::VerticalScroll).await.unwrap();
//!     assert_eq!(snapshot.image().dimensions(), (400, 1000));
//! }
//! ```

use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use super::{
    BrowserDriver, ScrollTarget,
    pixel_ratio::DevicePixelRatio,
    raw_image::RawImage,
    scripts,
    scroll::{ScrollAxes, ScrollPlan},
    stitch::{CaptureFrame, Stitcher},
};
use crate::{
    error::{CaptureError, CaptureResult},
    geometry::{Rect, ScrollOffset, Size},
    model::{CaptureConfig, CaptureMode, ElementCaptureMode, PreCaptureWait},
    snapshot::Snapshot,
};

/// One browser, one configuration, one device pixel ratio
pub struct CaptureSession<'a> {
    driver: &'a dyn BrowserDriver,
    config: CaptureConfig,
    ratio:  DevicePixelRatio,
}

impl<'a> CaptureSession<'a> {
    /// Opens a session, measuring the device pixel ratio unless the config
    /// disables it
    ///
    /// # Errors
    ///
    /// - [`CaptureError::DriverUnavailable`] - The driver did not answer
    /// - [`CaptureError::InvalidParameter`] - The browser reported a
    ///   non-positive device pixel ratio
    pub async fn new(driver: &'a dyn BrowserDriver, config: CaptureConfig) -> CaptureResult<Self> {
        let ratio = if config.use_device_pixel_ratio {
            DevicePixelRatio::new(driver.measure_device_pixel_ratio().await?)?
        } else {
            DevicePixelRatio::ONE
        };

        debug!(driver = driver.name(), ratio = %ratio, "opened capture session");

        Ok(Self {
            driver,
            config,
            ratio,
        })
    }

    /// Device pixel ratio used for every capture of this session
    pub fn ratio(&self) -> DevicePixelRatio {
        self.ratio
    }

    /// Configuration of this session
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Captures the page with the configured mode
    pub async fn shoot(&self) -> CaptureResult<Snapshot> {
        self.shoot_page(self.config.mode).await
    }

    /// Captures the current page
    ///
    /// Vertical output is viewport-wide and content-tall, horizontal output
    /// content-wide and viewport-tall, full output covers the whole content.
    /// [`CaptureMode::FullPage`] uses the driver's native full-page
    /// screenshot when available and stitches otherwise.
    pub async fn shoot_page(&self, mode: CaptureMode) -> CaptureResult<Snapshot> {
        let image = match mode {
            CaptureMode::FullPage if self.driver.capabilities().full_content_capture => {
                self.await_ready().await?;
                self.driver.capture_full_content().await?
            }
            CaptureMode::FullPage => {
                debug!(
                    driver = self.driver.name(),
                    "no native full-page screenshot, stitching instead"
                );
                self.scroll_page(ScrollAxes::Both).await?
            }
            CaptureMode::Viewport => self.scroll_page(ScrollAxes::None).await?,
            CaptureMode::VerticalScroll => self.scroll_page(ScrollAxes::Vertical).await?,
            CaptureMode::HorizontalScroll => self.scroll_page(ScrollAxes::Horizontal).await?,
            CaptureMode::FullScroll => self.scroll_page(ScrollAxes::Both).await?,
        };

        info!(
            mode = %mode,
            width = image.width(),
            height = image.height(),
            "captured page"
        );
        Ok(Snapshot::new(image, self.ratio))
    }

    /// Captures one element
    ///
    /// The element is scrolled into view first. In viewport mode the visible
    /// part of the element is cropped from a viewport capture; scroll modes
    /// scroll the element's own content and keep its client box.
    ///
    /// # Errors
    ///
    /// - [`CaptureError::ElementNotFound`] - Nothing matches `selector`
    /// - [`CaptureError::UnsupportedCapture`] - A scroll mode was requested
    ///   for an element larger than the viewport, or the element is not
    ///   visible after scrolling
    pub async fn shoot_element(
        &self,
        selector: &str,
        mode: ElementCaptureMode,
    ) -> CaptureResult<Snapshot> {
        let subject = format!("element {selector}");
        let page = self.driver.measure_viewport(&ScrollTarget::Page).await?;
        let rect = self.driver.locate(selector).await?;
        check_fits(&subject, mode, rect, page.size())?;

        self.driver
            .scroll_into_view(selector, self.config.element_alignment)
            .await?;
        self.settle().await;

        let snapshot = match element_axes(mode) {
            ScrollAxes::None => self.visible_part(&subject, rect, page).await?,
            axes => {
                let target = ScrollTarget::element(selector);
                let client = self.driver.measure_viewport(&target).await?;
                let content = self.driver.measure_content_extent(&target).await?;
                let image = self.scroll_capture(&target, axes, client, content).await?;
                Snapshot::new(image, self.ratio)
            }
        };

        info!(
            selector,
            mode = %mode,
            width = snapshot.image().width(),
            height = snapshot.image().height(),
            "captured element"
        );
        Ok(snapshot)
    }

    /// Captures the document of one frame
    ///
    /// Works like [`shoot_element`](Self::shoot_element), except that scroll
    /// modes switch into the frame and scroll its document. The browsing
    /// context is switched back even when the capture fails.
    ///
    /// # Errors
    ///
    /// - [`CaptureError::FrameNotFound`] - Nothing matches `selector`
    /// - [`CaptureError::UnsupportedCapture`] - A scroll mode was requested
    ///   for a frame larger than the viewport
    pub async fn shoot_frame(
        &self,
        selector: &str,
        mode: ElementCaptureMode,
    ) -> CaptureResult<Snapshot> {
        let subject = format!("frame {selector}");
        let page = self.driver.measure_viewport(&ScrollTarget::Page).await?;
        let rect = self
            .driver
            .locate(selector)
            .await
            .map_err(|error| match error {
                CaptureError::ElementNotFound { selector } => CaptureError::FrameNotFound { selector },
                other => other,
            })?;
        check_fits(&subject, mode, rect, page.size())?;

        self.driver
            .scroll_into_view(selector, self.config.element_alignment)
            .await?;
        self.settle().await;

        let snapshot = match element_axes(mode) {
            ScrollAxes::None => self.visible_part(&subject, rect, page).await?,
            axes => {
                let client = self
                    .driver
                    .measure_viewport(&ScrollTarget::element(selector))
                    .await?;

                self.driver.enter_frame(selector).await?;
                let captured = self.scroll_frame_document(axes, client).await;
                let exited = self.driver.exit_frame().await;

                let image = captured?;
                exited?;
                Snapshot::new(image, self.ratio)
            }
        };

        info!(
            selector,
            mode = %mode,
            width = snapshot.image().width(),
            height = snapshot.image().height(),
            "captured frame"
        );
        Ok(snapshot)
    }

    async fn scroll_page(&self, axes: ScrollAxes) -> CaptureResult<RawImage> {
        let target = ScrollTarget::Page;
        let viewport = self.driver.measure_viewport(&target).await?;
        let content = match axes {
            ScrollAxes::None => viewport.size(),
            _ => self.driver.measure_content_extent(&target).await?,
        };
        self.scroll_capture(&target, axes, viewport, content).await
    }

    /// Scrolls the current frame's document; `client` is the frame's client
    /// box in the top-level viewport
    async fn scroll_frame_document(&self, axes: ScrollAxes, client: Rect) -> CaptureResult<RawImage> {
        let target = ScrollTarget::Page;
        let inner = self.driver.measure_viewport(&target).await?;
        let content = self.driver.measure_content_extent(&target).await?;
        let clip = Rect::new(
            client.x,
            client.y,
            inner.width.min(client.width),
            inner.height.min(client.height),
        );
        self.scroll_capture(&target, axes, clip, content).await
    }

    /// Crops the part of `rect` (page coordinates) visible in the viewport
    /// from a single viewport capture
    async fn visible_part(&self, subject: &str, rect: Rect, page: Rect) -> CaptureResult<Snapshot> {
        let scroll = self.driver.current_scroll(&ScrollTarget::Page).await?;
        let visible = rect
            .offset_by(scroll)
            .intersection(&page)
            .ok_or_else(|| CaptureError::unsupported(subject, "not visible in the viewport"))?;

        self.await_ready().await?;
        let image = self.driver.capture_viewport().await?;
        Snapshot::new(image, self.ratio).crop(&visible)
    }

    /// Captures `content` of `target` through `clip` (viewport coordinates)
    /// along `axes` and stitches the frames
    ///
    /// A single-step plan is captured in place without scrolling. Otherwise
    /// the target's scroll position is restored afterwards.
    async fn scroll_capture(
        &self,
        target: &ScrollTarget,
        axes: ScrollAxes,
        clip: Rect,
        content: Size,
    ) -> CaptureResult<RawImage> {
        let plan = ScrollPlan::new(clip.size(), content, axes);
        let mut stitcher = Stitcher::new(plan.clone(), self.ratio, self.config.overlap);

        if plan.is_single_step() {
            self.await_ready().await?;
            let image = self.driver.capture_viewport().await?;
            stitcher.push(CaptureFrame::new(image, ScrollOffset::ORIGIN, clip))?;
            return stitcher.finalize();
        }

        debug!(
            steps = plan.len(),
            rows = plan.vertical.len(),
            columns = plan.horizontal.len(),
            "scroll capture planned"
        );

        let initial = self.driver.current_scroll(target).await?;
        let captured = self.capture_steps(target, &plan, clip, &mut stitcher).await;
        let restored = self.driver.scroll_to(target, initial).await;

        captured?;
        restored?;
        stitcher.finalize()
    }

    async fn capture_steps(
        &self,
        target: &ScrollTarget,
        plan: &ScrollPlan,
        clip: Rect,
        stitcher: &mut Stitcher,
    ) -> CaptureResult<()> {
        for offset in plan.steps() {
            self.driver.scroll_to(target, offset).await?;
            self.settle().await;
            self.await_ready().await?;

            let image = self.driver.capture_viewport().await?;
            stitcher.push(CaptureFrame::new(image, offset, clip))?;
        }
        Ok(())
    }

    async fn settle(&self) {
        let settle = self.config.scroll_settle();
        if !settle.is_zero() {
            sleep(settle).await;
        }
    }

    /// Blocks until the configured pre-capture condition holds
    ///
    /// A script condition that is still false at its timeout is logged and
    /// the capture proceeds. Script errors count as "not ready yet"; driver
    /// errors abort.
    async fn await_ready(&self) -> CaptureResult<()> {
        match &self.config.pre_capture_wait {
            PreCaptureWait::None => Ok(()),
            PreCaptureWait::Delay { millis } => {
                sleep(Duration::from_millis(*millis)).await;
                Ok(())
            }
            PreCaptureWait::Script {
                expression,
                timeout_ms,
                poll_interval_ms,
            } => {
                let script = scripts::wait_condition(expression);
                let deadline = Instant::now() + Duration::from_millis(*timeout_ms);
                let poll = Duration::from_millis((*poll_interval_ms).max(1));

                loop {
                    match self.driver.evaluate_script(&script, Vec::new()).await {
                        Ok(value) if scripts::truthy(&value) => return Ok(()),
                        Ok(_) => {}
                        Err(CaptureError::ScriptFailed { reason }) => {
                            debug!(%reason, "wait condition threw");
                        }
                        Err(error) => return Err(error),
                    }

                    if Instant::now() >= deadline {
                        warn!(
                            expression = %expression,
                            timeout_ms = *timeout_ms,
                            "wait condition not met before timeout, capturing anyway"
                        );
                        return Ok(());
                    }
                    sleep(poll).await;
                }
            }
        }
    }
}

fn element_axes(mode: ElementCaptureMode) -> ScrollAxes {
    match mode {
        ElementCaptureMode::Viewport => ScrollAxes::None,
        ElementCaptureMode::VerticalScroll => ScrollAxes::Vertical,
        ElementCaptureMode::HorizontalScroll => ScrollAxes::Horizontal,
        ElementCaptureMode::FullScroll => ScrollAxes::Both,
    }
}

/// Scroll modes need the whole element on screen at once
fn check_fits(subject: &str, mode: ElementCaptureMode, rect: Rect, viewport: Size) -> CaptureResult<()> {
    if mode == ElementCaptureMode::Viewport || rect.fits_within(viewport) {
        return Ok(());
    }
    Err(CaptureError::unsupported(
        subject,
        format!(
            "{} mode needs it to fit in the viewport, but it is {}x{} and the viewport is {}x{}",
            mode, rect.width, rect.height, viewport.width, viewport.height
        ),
    ))
}
