//! RGBA bitmap returned by capture drivers
//!
//! This module provides `RawImage`, a thin wrapper around `image::RgbaImage`
//! with the operations the stitcher, snapshot and diff engine need: cropping
//! with bounds checks, clipped blits, and PNG decoding of driver output.
//!
//! # Examples
//!
//! ```
//! use webshot::{capture::RawImage, geometry::RawRegion};
//!
//! let img = RawImage::from_test_pattern(1920, 1080);
//!
//! let cropped = img.crop(RawRegion::new(100, 100, 800, 400)).unwrap();
//! assert_eq!(cropped.dimensions(), (800, 400));
//! ```

use image::{Rgba, RgbaImage};

use crate::{
    error::{CaptureError, CaptureResult},
    geometry::RawRegion,
};

/// Grid of RGBA8 pixel samples with no coordinate metadata
///
/// All transformation methods return new `RawImage` instances, leaving the
/// original unchanged. [`RawImage::copy_from`] is the one in-place
/// operation, used to fill a stitching canvas.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawImage {
    inner: RgbaImage,
}

impl RawImage {
    /// Wraps an existing RGBA buffer
    pub fn new(image: RgbaImage) -> Self {
        Self { inner: image }
    }

    /// Creates a fully transparent bitmap
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(RgbaImage::new(width, height))
    }

    /// Creates a bitmap by evaluating `f` for every pixel
    pub fn from_fn<F>(width: u32, height: u32, f: F) -> Self
    where
        F: FnMut(u32, u32) -> Rgba<u8>,
    {
        Self::new(RgbaImage::from_fn(width, height, f))
    }

    /// Decodes PNG bytes as returned by a browser screenshot command
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::ImageError`] if the bytes are not a decodable
    /// image.
    pub fn from_png_bytes(bytes: &[u8]) -> CaptureResult<Self> {
        let decoded = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
            .map_err(|e| CaptureError::ImageError(format!("Failed to decode PNG: {e}")))?;
        Ok(Self::new(decoded.to_rgba8()))
    }

    /// Reads a PNG file from disk
    pub fn open(path: &std::path::Path) -> CaptureResult<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_png_bytes(&bytes)
    }

    /// Creates a test pattern image with the specified dimensions
    ///
    /// A vertical gradient from blue (top) to cyan (bottom).
    pub fn from_test_pattern(width: u32, height: u32) -> Self {
        let start_color = Rgba([0u8, 0u8, 255u8, 255u8]);
        let end_color = Rgba([0u8, 255u8, 255u8, 255u8]);

        Self::from_fn(width, height, |_x, y| {
            let ratio = y as f32 / height.max(1) as f32;
            Rgba([
                (start_color[0] as f32 * (1.0 - ratio) + end_color[0] as f32 * ratio) as u8,
                (start_color[1] as f32 * (1.0 - ratio) + end_color[1] as f32 * ratio) as u8,
                (start_color[2] as f32 * (1.0 - ratio) + end_color[2] as f32 * ratio) as u8,
                255,
            ])
        })
    }

    /// Returns the dimensions of the image as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.inner.dimensions()
    }

    /// Returns the image width in pixels
    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    /// Returns the image height in pixels
    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    /// Returns the pixel at (x, y)
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.inner.get_pixel(x, y)
    }

    /// Overwrites the pixel at (x, y)
    pub fn put_pixel(&mut self, x: u32, y: u32, pixel: Rgba<u8>) {
        self.inner.put_pixel(x, y, pixel);
    }

    /// Crops the image to the given region
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::OutOfBounds`] if the region extends past the
    /// image.
    ///
    /// # Examples
    ///
    /// ```
    /// use webshot::{capture::RawImage, geometry::RawRegion};
    ///
    /// let img = RawImage::from_test_pattern(200, 200);
    /// assert!(img.crop(RawRegion::new(150, 150, 100, 100)).is_err());
    /// ```
    pub fn crop(&self, region: RawRegion) -> CaptureResult<Self> {
        let (width, height) = self.dimensions();

        if !region.fits_in(width, height) {
            return Err(CaptureError::OutOfBounds {
                region,
                width,
                height,
            });
        }

        let view = image::imageops::crop_imm(
            &self.inner,
            region.x,
            region.y,
            region.width,
            region.height,
        );
        Ok(Self::new(view.to_image()))
    }

    /// Copies `region` of `source` into this image with its top-left corner
    /// at (`x`, `y`)
    ///
    /// Rows and columns that would land outside this image are skipped.
    /// Returns the number of pixels written.
    pub fn copy_from(&mut self, source: &RawImage, region: RawRegion, x: u32, y: u32) -> u64 {
        let region = region.clamp_to(source.width(), source.height());
        let copy_width = region.width.min(self.width().saturating_sub(x));
        let copy_height = region.height.min(self.height().saturating_sub(y));

        if copy_width == 0 || copy_height == 0 {
            return 0;
        }

        let row_bytes = copy_width as usize * 4;
        let src_stride = source.width() as usize * 4;
        let dst_stride = self.width() as usize * 4;
        let src = source.inner.as_raw();
        let dst: &mut [u8] = &mut self.inner;

        for row in 0..copy_height as usize {
            let src_start = (region.y as usize + row) * src_stride + region.x as usize * 4;
            let dst_start = (y as usize + row) * dst_stride + x as usize * 4;
            dst[dst_start..dst_start + row_bytes]
                .copy_from_slice(&src[src_start..src_start + row_bytes]);
        }

        u64::from(copy_width) * u64::from(copy_height)
    }

    /// Returns the raw RGBA bytes, row-major
    pub fn as_bytes(&self) -> &[u8] {
        self.inner.as_raw()
    }

    /// Returns a reference to the inner RGBA buffer
    pub fn inner(&self) -> &RgbaImage {
        &self.inner
    }

    /// Consumes self and returns the inner RGBA buffer
    pub fn into_inner(self) -> RgbaImage {
        self.inner
    }
}
