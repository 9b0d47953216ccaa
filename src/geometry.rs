//! Geometry value types for page, element and frame regions
//!
//! Everything in this module is measured in logical (CSS) pixels except
//! [`RawRegion`], which addresses pixels of a captured bitmap. Conversion
//! between the two lives in [`crate::capture::pixel_ratio`].
//!
//! # Examples
//!
//! ```
//! use webshot::geometry::{Rect, ScrollOffset};
//!
//! let viewport = Rect::new(0, 0, 800, 600);
//! let element = Rect::new(100, 900, 200, 50);
//!
//! // After scrolling down 700px the element sits at y = 200 in the viewport
//! let scrolled = element.offset_by(ScrollOffset::new(0, 700));
//! assert_eq!(scrolled, Rect::new(100, 200, 200, 50));
//! assert!(viewport.contains(&scrolled));
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in logical pixels
///
/// The origin may be negative (an element scrolled partly above the
/// viewport); width and height never are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
pub struct Rect {
    /// Left edge
    pub x:      i64,
    /// Top edge
    pub y:      i64,
    /// Width
    pub width:  u32,
    /// Height
    pub height: u32,
}

impl Rect {
    /// Creates a new rectangle
    pub fn new(x: i64, y: i64, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a rectangle from `[x, y, width, height]` values reported by the
    /// browser, rounding to whole logical pixels
    pub fn from_reported([x, y, width, height]: [f64; 4]) -> Self {
        Self::new(
            round_signed(x),
            round_signed(y),
            clamp_logical(width),
            clamp_logical(height),
        )
    }

    /// Creates a rectangle anchored at the origin
    pub fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    /// Exclusive right edge
    pub fn right(&self) -> i64 {
        self.x + i64::from(self.width)
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> i64 {
        self.y + i64::from(self.height)
    }

    /// Returns the width and height of the rectangle
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Returns `true` if the rectangle covers no pixels
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns the overlapping area of two rectangles, or `None` if they do
    /// not overlap
    ///
    /// # Examples
    ///
    /// ```
    /// use webshot::geometry::Rect;
    ///
    /// let a = Rect::new(0, 0, 100, 100);
    /// let b = Rect::new(50, -20, 100, 100);
    /// assert_eq!(a.intersection(&b), Some(Rect::new(50, 0, 50, 80)));
    /// assert_eq!(a.intersection(&Rect::new(100, 0, 10, 10)), None);
    /// ```
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right <= left || bottom <= top {
            return None;
        }

        Some(Rect::new(left, top, (right - left) as u32, (bottom - top) as u32))
    }

    /// Returns `true` if `other` lies entirely inside this rectangle
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Returns `true` if a rectangle of this size fits inside `outer`
    /// without moving it
    pub fn fits_within(&self, outer: Size) -> bool {
        self.width <= outer.width && self.height <= outer.height
    }

    /// Moves the rectangle by the given deltas
    pub fn translate(&self, dx: i64, dy: i64) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Converts a page-space rectangle to viewport space for the given
    /// scroll position
    pub fn offset_by(&self, scroll: ScrollOffset) -> Rect {
        self.translate(-i64::from(scroll.x), -i64::from(scroll.y))
    }
}

/// Scroll position in logical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
pub struct ScrollOffset {
    /// Horizontal scroll position
    pub x: u32,
    /// Vertical scroll position
    pub y: u32,
}

impl ScrollOffset {
    /// Scroll origin (top-left)
    pub const ORIGIN: ScrollOffset = ScrollOffset { x: 0, y: 0 };

    /// Creates a new offset
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Builds an offset from values reported by the browser
    ///
    /// Browsers occasionally report negative or fractional scroll positions
    /// (elastic overscroll, zoom). Negative values clamp to zero and
    /// fractions round to the nearest pixel.
    pub fn from_reported(x: f64, y: f64) -> Self {
        Self::new(clamp_logical(x), clamp_logical(y))
    }
}

/// Width and height in logical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
pub struct Size {
    /// Width
    pub width:  u32,
    /// Height
    pub height: u32,
}

impl Size {
    /// Creates a new size
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Region of a captured bitmap in raw pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
pub struct RawRegion {
    /// Left edge
    pub x:      u32,
    /// Top edge
    pub y:      u32,
    /// Width
    pub width:  u32,
    /// Height
    pub height: u32,
}

impl RawRegion {
    /// Creates a new raw region
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns `true` if the region lies fully inside a `width` x `height`
    /// bitmap
    pub fn fits_in(&self, width: u32, height: u32) -> bool {
        u64::from(self.x) + u64::from(self.width) <= u64::from(width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(height)
    }

    /// Shrinks the region so it lies inside a `width` x `height` bitmap
    pub fn clamp_to(&self, width: u32, height: u32) -> RawRegion {
        let x = self.x.min(width);
        let y = self.y.min(height);
        RawRegion::new(
            x,
            y,
            self.width.min(width - x),
            self.height.min(height - y),
        )
    }
}

impl std::fmt::Display for RawRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} at ({}, {})", self.width, self.height, self.x, self.y)
    }
}

/// Rounds a browser-reported coordinate to a non-negative logical pixel
pub(crate) fn clamp_logical(value: f64) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    (value + 0.5).floor().min(f64::from(u32::MAX)) as u32
}

fn round_signed(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    (value + 0.5).floor() as i64
}
