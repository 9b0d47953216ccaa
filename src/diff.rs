//! Image comparison with a visual diff artifact
//!
//! [`compare`] checks two bitmaps pixel by pixel under a tolerance and
//! produces a [`DiffResult`] holding the verdict, the number of differing
//! pixels and a diff image: a copy of the actual image with every differing
//! pixel painted in [`MARKER_PIXEL`].
//!
//! # Tolerance
//!
//! `tolerance` is a fraction in `[0.0, 1.0]` used twice:
//!
//! - per pixel: a pixel differs when the sum of its absolute RGBA channel
//!   differences, divided by the largest possible sum (4 x 255), exceeds
//!   `tolerance`
//! - per image: the images match when the share of differing pixels is at
//!   most `tolerance`
//!
//! A tolerance of 0.0 therefore demands byte-for-byte equality.
//!
//! # Examples
//!
//! ```
//! use image::Rgba;
//! use webshot::{capture::RawImage, diff::compare};
//!
//! let expected = RawImage::from_test_pattern(10, 10);
//! let mut actual = expected.clone();
//! actual.put_pixel(3, 4, Rgba([255, 255, 255, 255]));
//!
//! let exact = compare(&expected, &actual, 0.0).unwrap();
//! assert!(!exact.matches);
//! assert_eq!(exact.differing_pixels, 1);
//!
//! // 1 of 100 pixels differs, within a 5% allowance
//! let lenient = compare(&expected, &actual, 0.05).unwrap();
//! assert!(lenient.matches);
//! ```

use image::Rgba;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    capture::RawImage,
    error::{CaptureError, CaptureResult},
};

/// Color painted over differing pixels in the diff image
pub const MARKER_PIXEL: Rgba<u8> = Rgba([255, 0, 0, 255]);

const MAX_PIXEL_DELTA: f64 = 4.0 * 255.0;

/// Why a comparison came out the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DiffVerdict {
    /// Pixels agree within the tolerance
    Match,
    /// Too many pixels differ
    ContentMismatch,
    /// The images have different sizes; no pixel was compared
    DimensionMismatch,
}

/// Outcome of one comparison
#[derive(Debug, Clone, PartialEq)]
pub struct DiffResult {
    /// Whether the images are considered equal
    pub matches:          bool,
    /// Reason for the verdict
    pub verdict:          DiffVerdict,
    /// Number of pixels over the per-pixel threshold
    pub differing_pixels: u64,
    /// Number of pixels compared (pixels of the actual image on a dimension
    /// mismatch)
    pub total_pixels:     u64,
    /// Copy of the actual image with differing pixels marked
    pub diff_image:       RawImage,
}

/// Serializable part of a [`DiffResult`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DiffSummary {
    /// Whether the images are considered equal
    pub matches:          bool,
    /// Reason for the verdict
    pub verdict:          DiffVerdict,
    /// Number of pixels over the per-pixel threshold
    pub differing_pixels: u64,
    /// Number of pixels compared
    pub total_pixels:     u64,
    /// `differing_pixels / total_pixels`
    pub difference_ratio: f64,
}

impl DiffResult {
    /// Share of differing pixels, 0.0 for empty images
    pub fn difference_ratio(&self) -> f64 {
        if self.total_pixels == 0 {
            0.0
        } else {
            self.differing_pixels as f64 / self.total_pixels as f64
        }
    }

    /// Verdict and counts without the diff image
    pub fn summary(&self) -> DiffSummary {
        DiffSummary {
            matches:          self.matches,
            verdict:          self.verdict,
            differing_pixels: self.differing_pixels,
            total_pixels:     self.total_pixels,
            difference_ratio: self.difference_ratio(),
        }
    }
}

/// Checks that `tolerance` is a fraction in `[0.0, 1.0]`
pub fn validate_tolerance(tolerance: f64) -> CaptureResult<()> {
    if (0.0..=1.0).contains(&tolerance) {
        Ok(())
    } else {
        Err(CaptureError::invalid_parameter(
            "tolerance",
            format!("{tolerance} is not between 0.0 and 1.0"),
        ))
    }
}

/// Compares `actual` against `expected`
///
/// Neither input is modified. The diff image is always produced, even on a
/// match.
///
/// # Errors
///
/// Returns [`CaptureError::InvalidParameter`] if `tolerance` is outside
/// `[0.0, 1.0]` or not a number.
pub fn compare(expected: &RawImage, actual: &RawImage, tolerance: f64) -> CaptureResult<DiffResult> {
    validate_tolerance(tolerance)?;

    let mut diff_image = actual.clone();
    let (width, height) = actual.dimensions();
    let total_pixels = u64::from(width) * u64::from(height);

    if expected.dimensions() != actual.dimensions() {
        debug!(
            expected_width = expected.width(),
            expected_height = expected.height(),
            actual_width = width,
            actual_height = height,
            "dimension mismatch"
        );
        return Ok(DiffResult {
            matches: false,
            verdict: DiffVerdict::DimensionMismatch,
            differing_pixels: 0,
            total_pixels,
            diff_image,
        });
    }

    let mut differing_pixels = 0u64;
    let width = width as usize;

    for (index, (a, b)) in expected
        .as_bytes()
        .chunks_exact(4)
        .zip(actual.as_bytes().chunks_exact(4))
        .enumerate()
    {
        if a == b {
            continue;
        }

        let delta: u32 = a
            .iter()
            .zip(b)
            .map(|(&x, &y)| u32::from(x.abs_diff(y)))
            .sum();

        if f64::from(delta) / MAX_PIXEL_DELTA > tolerance {
            differing_pixels += 1;
            diff_image.put_pixel((index % width) as u32, (index / width) as u32, MARKER_PIXEL);
        }
    }

    let matches = total_pixels == 0 || differing_pixels as f64 / total_pixels as f64 <= tolerance;
    let verdict = if matches {
        DiffVerdict::Match
    } else {
        DiffVerdict::ContentMismatch
    };

    debug!(differing_pixels, total_pixels, tolerance, matches, "compared images");

    Ok(DiffResult {
        matches,
        verdict,
        differing_pixels,
        total_pixels,
        diff_image,
    })
}
