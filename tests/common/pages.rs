//! Mock pages shared by the capture and regression tests

use std::time::Duration;

use webshot::{
    capture::{MockDriver, MockRegion},
    geometry::{Rect, Size},
    model::{CaptureConfig, CaptureMode},
};

/// Configuration without settle delays
pub fn fast_config(mode: CaptureMode) -> CaptureConfig {
    CaptureConfig::builder()
        .mode(mode)
        .scroll_settle(Duration::ZERO)
        .build()
}

/// 400x300 viewport over a 400x1000 document
pub fn tall_page() -> MockDriver {
    MockDriver::new()
        .with_viewport(Size::new(400, 300))
        .with_content(Size::new(400, 1000))
}

/// 300x200 viewport over a 700x200 document
pub fn wide_page() -> MockDriver {
    MockDriver::new()
        .with_viewport(Size::new(300, 200))
        .with_content(Size::new(700, 200))
}

/// 300x200 viewport over a 700x500 document
pub fn large_page() -> MockDriver {
    MockDriver::new()
        .with_viewport(Size::new(300, 200))
        .with_content(Size::new(700, 500))
}

/// Tall page with a scrollable list and an embedded document
pub fn page_with_widgets() -> MockDriver {
    MockDriver::new()
        .with_viewport(Size::new(200, 120))
        .with_content(Size::new(200, 400))
        .with_region(MockRegion::element(
            "#list",
            Rect::new(20, 50, 40, 30),
            Size::new(40, 90),
        ))
        .with_region(MockRegion::frame(
            "iframe#docs",
            Rect::new(100, 200, 80, 60),
            Size::new(160, 180),
        ))
}
