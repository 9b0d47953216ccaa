//! PNG encoding of captured bitmaps
//!
//! Snapshots, baselines and diff images are always persisted as lossless PNG
//! so that a stored baseline decodes back to exactly the captured pixels.
//!
//! # Examples
//!
//! ```
//! use webshot::{capture::RawImage, util::encode::encode_png};
//!
//! let img = RawImage::from_test_pattern(1920, 1080);
//! let png_bytes = encode_png(&img).unwrap();
//! assert!(!png_bytes.is_empty());
//! ```

use std::io::Cursor;

use image::{
    ImageEncoder,
    codecs::png::{CompressionType, FilterType, PngEncoder},
};

use crate::{
    capture::RawImage,
    error::{CaptureError, CaptureResult},
};

/// MIME type of every persisted image
pub const PNG_MIME_TYPE: &str = "image/png";

/// Encodes an image as PNG with default compression
///
/// # Examples
///
/// ```
/// use webshot::{capture::RawImage, util::encode::encode_png};
///
/// let img = RawImage::from_test_pattern(100, 100);
/// let png_bytes = encode_png(&img).unwrap();
/// assert_eq!(&png_bytes[..4], &[137, 80, 78, 71]);
/// ```
pub fn encode_png(image: &RawImage) -> CaptureResult<Vec<u8>> {
    encode_png_with_compression(image, CompressionType::Default)
}

/// Encodes an image as PNG with specified compression level
///
/// Higher compression levels produce smaller files but take longer to
/// encode. The pixels are identical either way.
///
/// # Errors
///
/// Returns [`CaptureError::EncodingFailed`] for empty images or encoder
/// failures.
pub fn encode_png_with_compression(
    image: &RawImage,
    compression: CompressionType,
) -> CaptureResult<Vec<u8>> {
    let (width, height) = image.dimensions();

    if width == 0 || height == 0 {
        return Err(CaptureError::EncodingFailed {
            format: "png".to_string(),
            reason: format!("cannot encode an empty {width}x{height} image"),
        });
    }

    let mut output = Vec::new();

    // Use adaptive filter for automatic per-scanline optimization
    let encoder =
        PngEncoder::new_with_quality(Cursor::new(&mut output), compression, FilterType::Adaptive);

    encoder
        .write_image(image.as_bytes(), width, height, image::ExtendedColorType::Rgba8)
        .map_err(|e| CaptureError::EncodingFailed {
            format: "png".to_string(),
            reason: e.to_string(),
        })?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::RawImage;

    #[test]
    fn test_encode_png_signature() {
        let img = RawImage::from_test_pattern(100, 100);
        let bytes = encode_png(&img).unwrap();
        assert_eq!(&bytes[..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
    }

    #[test]
    fn test_encode_png_is_lossless() {
        let img = RawImage::from_test_pattern(64, 48);
        let fast = encode_png_with_compression(&img, CompressionType::Fast).unwrap();
        let best = encode_png_with_compression(&img, CompressionType::Best).unwrap();

        assert_eq!(RawImage::from_png_bytes(&fast).unwrap(), img);
        assert_eq!(RawImage::from_png_bytes(&best).unwrap(), img);
    }

    #[test]
    fn test_encode_empty_image_fails() {
        let img = RawImage::blank(0, 10);
        let result = encode_png(&img);
        assert!(matches!(result, Err(CaptureError::EncodingFailed { .. })));
    }
}
