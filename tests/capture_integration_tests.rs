//! Capture Integration Tests
//!
//! Drives whole capture sessions against `MockDriver` pages and checks the
//! stitched bitmaps pixel for pixel. The mock paints every content pixel
//! with its own coordinates, so a misplaced frame shows up as a mismatch
//! with `MockDriver::expected_content`.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test --test capture_integration_tests
//! ```

mod common;

use common::pages::{fast_config, large_page, page_with_widgets, tall_page, wide_page};
use webshot::{
    capture::{BrowserDriver, CaptureSession, MockDriver, MockRegion, ScrollTarget},
    error::CaptureError,
    geometry::{Rect, ScrollOffset, Size},
    model::{CaptureMode, ElementCaptureMode, OverlapPolicy},
};

// ============================================================================
// Page captures
// ============================================================================

/// Vertical scroll at ratio 1: viewport-wide, content-tall
#[tokio::test]
async fn test_vertical_scroll_at_ratio_one() {
    let driver = tall_page();
    let session = CaptureSession::new(&driver, fast_config(CaptureMode::VerticalScroll))
        .await
        .unwrap();

    let snapshot = session.shoot().await.unwrap();

    assert_eq!(snapshot.image(), &MockDriver::expected_content(0, 400, 1000));
    // 0, 300, 600, then flush with the bottom at 700
    assert_eq!(driver.capture_count(), 4);
}

/// At ratio 2 every logical pixel becomes a 2x2 block
#[tokio::test]
async fn test_vertical_scroll_at_ratio_two() {
    let driver = tall_page().with_device_pixel_ratio(2.0);
    let session = CaptureSession::new(&driver, fast_config(CaptureMode::VerticalScroll))
        .await
        .unwrap();

    let snapshot = session.shoot().await.unwrap();

    assert_eq!(session.ratio().get(), 2.0);
    assert_eq!(snapshot.image(), &MockDriver::expected_content(0, 800, 2000));
}

/// Fractional ratios land every frame on the right raw row
#[tokio::test]
async fn test_vertical_scroll_at_fractional_ratio() {
    let driver = tall_page().with_device_pixel_ratio(1.5);
    let session = CaptureSession::new(&driver, fast_config(CaptureMode::VerticalScroll))
        .await
        .unwrap();

    let snapshot = session.shoot().await.unwrap();

    assert_eq!(snapshot.image(), &MockDriver::expected_content(0, 600, 1500));
}

/// Horizontal scroll: content-wide, viewport-tall
#[tokio::test]
async fn test_horizontal_scroll() {
    let driver = wide_page();
    let session = CaptureSession::new(&driver, fast_config(CaptureMode::HorizontalScroll))
        .await
        .unwrap();

    let snapshot = session.shoot().await.unwrap();

    assert_eq!(snapshot.image(), &MockDriver::expected_content(0, 700, 200));
    assert!(driver.scroll_log().iter().all(|(_, offset)| offset.y == 0));
}

/// Full scroll covers both axes, row by row
#[tokio::test]
async fn test_full_scroll_covers_both_axes() {
    let driver = large_page().with_device_pixel_ratio(2.0);
    let session = CaptureSession::new(&driver, fast_config(CaptureMode::FullScroll))
        .await
        .unwrap();

    let snapshot = session.shoot().await.unwrap();

    assert_eq!(snapshot.image(), &MockDriver::expected_content(0, 1400, 1000));
    // 3 columns (0, 300, 400) x 3 rows (0, 200, 300)
    assert_eq!(driver.capture_count(), 9);
}

/// Horizontal capture of a page that also scrolls vertically covers the top
/// strip, then returns to where the page was
#[tokio::test]
async fn test_horizontal_scroll_of_tall_page() {
    let driver = large_page();
    driver
        .scroll_to(&ScrollTarget::Page, ScrollOffset::new(0, 120))
        .await
        .unwrap();
    let session = CaptureSession::new(&driver, fast_config(CaptureMode::HorizontalScroll))
        .await
        .unwrap();

    let snapshot = session.shoot().await.unwrap();

    assert_eq!(snapshot.image(), &MockDriver::expected_content(0, 700, 200));
    assert_eq!(driver.page_scroll(), ScrollOffset::new(0, 120));
}

/// A capture that starts mid-page puts the page back where it was
#[tokio::test]
async fn test_scroll_position_is_restored() {
    let driver = tall_page();
    driver
        .scroll_to(&ScrollTarget::Page, ScrollOffset::new(0, 450))
        .await
        .unwrap();
    let session = CaptureSession::new(&driver, fast_config(CaptureMode::VerticalScroll))
        .await
        .unwrap();

    let snapshot = session.shoot().await.unwrap();

    assert_eq!(snapshot.image(), &MockDriver::expected_content(0, 400, 1000));
    assert_eq!(driver.page_scroll(), ScrollOffset::new(0, 450));
    let (_, last) = driver.scroll_log().last().cloned().unwrap();
    assert_eq!(last, ScrollOffset::new(0, 450));
}

/// Both overlap policies produce the same bitmap for static content
#[tokio::test]
async fn test_overlap_policies_agree_on_static_content() {
    let mut images = Vec::new();
    for policy in [OverlapPolicy::KeepLater, OverlapPolicy::KeepEarlier] {
        let driver = tall_page().with_device_pixel_ratio(1.5);
        let mut config = fast_config(CaptureMode::VerticalScroll);
        config.overlap = policy;
        let session = CaptureSession::new(&driver, config).await.unwrap();
        images.push(session.shoot().await.unwrap().into_image());
    }
    assert_eq!(images[0], images[1]);
}

/// Native full-page capture and stitching give the same bitmap
#[tokio::test]
async fn test_full_page_native_matches_stitched() {
    let native = large_page().with_full_content_capture(true);
    let stitched = large_page();

    let a = CaptureSession::new(&native, fast_config(CaptureMode::FullPage))
        .await
        .unwrap()
        .shoot()
        .await
        .unwrap();
    let b = CaptureSession::new(&stitched, fast_config(CaptureMode::FullPage))
        .await
        .unwrap()
        .shoot()
        .await
        .unwrap();

    assert_eq!(a.image(), b.image());
    assert_eq!(native.capture_count(), 1);
    assert!(stitched.capture_count() > 1);
}

/// Snapshots crop in logical coordinates
#[tokio::test]
async fn test_snapshot_crop_after_stitching() {
    let driver = tall_page().with_device_pixel_ratio(2.0);
    let session = CaptureSession::new(&driver, fast_config(CaptureMode::VerticalScroll))
        .await
        .unwrap();
    let snapshot = session.shoot().await.unwrap();

    let cropped = snapshot.crop(&Rect::new(0, 500, 100, 50)).unwrap();
    assert_eq!(cropped.image().dimensions(), (200, 100));
    assert_eq!(cropped.image().pixel(0, 0), MockDriver::content_pixel(0, 0, 1000));

    let result = snapshot.crop(&Rect::new(0, 980, 100, 50));
    assert!(matches!(result, Err(CaptureError::OutOfBounds { .. })));
}

// ============================================================================
// Element and frame captures
// ============================================================================

/// Scrolling an element stitches its own content at a fractional ratio
#[tokio::test]
async fn test_element_vertical_scroll_at_fractional_ratio() {
    let driver = page_with_widgets().with_device_pixel_ratio(1.5);
    let session = CaptureSession::new(&driver, fast_config(CaptureMode::Viewport))
        .await
        .unwrap();

    let snapshot = session
        .shoot_element("#list", ElementCaptureMode::VerticalScroll)
        .await
        .unwrap();

    let layer = driver.region_layer("#list").unwrap();
    assert_eq!(snapshot.image(), &MockDriver::expected_content(layer, 60, 135));
}

/// The visible part of an element is cropped from one viewport capture
#[tokio::test]
async fn test_element_viewport_mode() {
    let driver = page_with_widgets();
    let session = CaptureSession::new(&driver, fast_config(CaptureMode::Viewport))
        .await
        .unwrap();

    let snapshot = session
        .shoot_element("#list", ElementCaptureMode::Viewport)
        .await
        .unwrap();

    let layer = driver.region_layer("#list").unwrap();
    assert_eq!(snapshot.image(), &MockDriver::expected_content(layer, 40, 30));
    assert_eq!(driver.capture_count(), 1);
}

/// Missing elements surface as ElementNotFound
#[tokio::test]
async fn test_missing_element() {
    let driver = page_with_widgets();
    let session = CaptureSession::new(&driver, fast_config(CaptureMode::Viewport))
        .await
        .unwrap();

    let result = session
        .shoot_element("#nope", ElementCaptureMode::Viewport)
        .await;
    match result {
        Err(CaptureError::ElementNotFound { selector }) => assert_eq!(selector, "#nope"),
        other => panic!("expected ElementNotFound, got {other:?}"),
    }
}

/// A frame's document is stitched along both axes and the browsing context
/// returns to the top-level page
#[tokio::test]
async fn test_frame_full_scroll() {
    let driver = page_with_widgets().with_device_pixel_ratio(1.5);
    let session = CaptureSession::new(&driver, fast_config(CaptureMode::Viewport))
        .await
        .unwrap();

    let snapshot = session
        .shoot_frame("iframe#docs", ElementCaptureMode::FullScroll)
        .await
        .unwrap();

    let layer = driver.region_layer("iframe#docs").unwrap();
    assert_eq!(snapshot.image(), &MockDriver::expected_content(layer, 240, 270));
    assert!(!driver.in_frame());
}

/// Frames larger than the viewport cannot be scrolled
#[tokio::test]
async fn test_frame_larger_than_viewport() {
    let driver = page_with_widgets().with_region(MockRegion::frame(
        "iframe#huge",
        Rect::new(0, 0, 200, 300),
        Size::new(200, 900),
    ));
    let session = CaptureSession::new(&driver, fast_config(CaptureMode::Viewport))
        .await
        .unwrap();

    let result = session
        .shoot_frame("iframe#huge", ElementCaptureMode::VerticalScroll)
        .await;
    assert!(matches!(result, Err(CaptureError::UnsupportedCapture { .. })));
    assert!(!driver.in_frame());
}
