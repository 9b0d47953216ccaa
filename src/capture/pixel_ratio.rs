//! Logical-to-raw pixel conversion
//!
//! All conversions in a capture session go through one [`DevicePixelRatio`]
//! value measured at session start. Rounding is round-half-up everywhere, so
//! two frames that meet at the same logical coordinate also meet at the same
//! raw row.

use serde::{Deserialize, Serialize};

use crate::{
    error::{CaptureError, CaptureResult},
    geometry::{RawRegion, Rect},
};

/// Scale factor between logical and raw pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DevicePixelRatio(f64);

impl DevicePixelRatio {
    /// Ratio of a standard-density display
    pub const ONE: DevicePixelRatio = DevicePixelRatio(1.0);

    /// Creates a ratio, rejecting zero, negative and non-finite values
    ///
    /// # Examples
    ///
    /// ```
    /// use webshot::capture::DevicePixelRatio;
    ///
    /// assert!(DevicePixelRatio::new(2.0).is_ok());
    /// assert!(DevicePixelRatio::new(0.0).is_err());
    /// assert!(DevicePixelRatio::new(f64::NAN).is_err());
    /// ```
    pub fn new(ratio: f64) -> CaptureResult<Self> {
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(CaptureError::invalid_parameter(
                "device_pixel_ratio",
                format!("{ratio} is not a positive finite number"),
            ));
        }
        Ok(Self(ratio))
    }

    /// Returns the ratio value
    pub fn get(&self) -> f64 {
        self.0
    }

    /// Converts a logical length or coordinate to raw pixels
    ///
    /// # Examples
    ///
    /// ```
    /// use webshot::capture::DevicePixelRatio;
    ///
    /// let ratio = DevicePixelRatio::new(1.5).unwrap();
    /// assert_eq!(ratio.to_raw(3), 5); // 4.5 rounds up
    /// assert_eq!(ratio.to_raw(400), 600);
    /// ```
    pub fn to_raw(&self, logical: u32) -> u32 {
        let raw = (f64::from(logical) * self.0 + 0.5).floor();
        raw.clamp(0.0, f64::from(u32::MAX)) as u32
    }

    /// Converts a signed logical coordinate to raw pixels
    pub fn to_raw_signed(&self, logical: i64) -> i64 {
        (logical as f64 * self.0 + 0.5).floor() as i64
    }

    /// Converts a logical rectangle to a raw bitmap region
    ///
    /// Edges are converted independently and the width is the difference of
    /// the converted edges, so adjacent rectangles stay adjacent after
    /// scaling. Fails with `OutOfBounds` if the rectangle starts left of or
    /// above the bitmap origin.
    pub fn rect_to_raw(&self, rect: &Rect) -> CaptureResult<RawRegion> {
        let left = self.to_raw_signed(rect.x);
        let top = self.to_raw_signed(rect.y);
        let right = self.to_raw_signed(rect.right());
        let bottom = self.to_raw_signed(rect.bottom());

        if left < 0 || top < 0 || right > i64::from(u32::MAX) || bottom > i64::from(u32::MAX) {
            return Err(CaptureError::OutOfBounds {
                region: RawRegion::new(
                    left.max(0) as u32,
                    top.max(0) as u32,
                    (right - left).max(0) as u32,
                    (bottom - top).max(0) as u32,
                ),
                width:  0,
                height: 0,
            });
        }

        Ok(RawRegion::new(
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        ))
    }
}

impl Default for DevicePixelRatio {
    fn default() -> Self {
        Self::ONE
    }
}

impl std::fmt::Display for DevicePixelRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Converts logical scroll offsets along one axis to raw placement positions
///
/// Intermediate positions are `to_raw(offset)`, held back where rounding
/// would open a gap after the previous frame. The last position sits flush
/// with the canvas end, matching where the browser clamps its final scroll,
/// unless that would leave rows between it and the previous frame; it then
/// abuts the previous frame and the caller trims the canvas to
/// `last + frame_extent`.
///
/// # Arguments
///
/// * `offsets` - Logical offsets from the scroll plan, starting at 0
/// * `ratio` - Session device pixel ratio
/// * `frame_extent` - Raw length of one captured frame along this axis
/// * `canvas_extent` - Raw length of the output canvas along this axis
///
/// # Examples
///
/// ```
/// use webshot::capture::{DevicePixelRatio, pixel_ratio::raw_positions};
///
/// let ratio = DevicePixelRatio::new(2.0).unwrap();
/// assert_eq!(raw_positions(&[0, 400, 600], ratio, 800, 2000), vec![0, 800, 1200]);
/// ```
pub fn raw_positions(
    offsets: &[u32],
    ratio: DevicePixelRatio,
    frame_extent: u32,
    canvas_extent: u32,
) -> Vec<u32> {
    let last_start = canvas_extent.saturating_sub(frame_extent);
    let last_index = offsets.len().saturating_sub(1);
    let mut positions: Vec<u32> = Vec::with_capacity(offsets.len());

    for (index, &offset) in offsets.iter().enumerate() {
        let position = match positions.last() {
            None => 0,
            Some(&previous) if index == last_index => last_start
                .min(previous.saturating_add(frame_extent))
                .max(previous),
            Some(&previous) => ratio
                .to_raw(offset)
                .min(previous.saturating_add(frame_extent))
                .min(last_start)
                .max(previous),
        };
        positions.push(position);
    }

    positions
}
