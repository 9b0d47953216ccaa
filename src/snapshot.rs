//! Finished captures
//!
//! A [`Snapshot`] owns the final bitmap of one capture together with the
//! device pixel ratio it was taken at, so logical rectangles can still be
//! cropped out of it. Snapshots are persisted as PNG and can be compared
//! against a reference image.
//!
//! # Examples
//!
//! ```
//! use webshot::{
//!     capture::{DevicePixelRatio, RawImage},
//!     geometry::Rect,
//!     snapshot::Snapshot,
//! };
//!
//! let ratio = DevicePixelRatio::new(2.0).unwrap();
//! let snapshot = Snapshot::new(RawImage::from_test_pattern(200, 200), ratio);
//!
//! let cropped = snapshot.crop(&Rect::new(10, 10, 50, 50)).unwrap();
//! assert_eq!(cropped.image().dimensions(), (100, 100));
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::info;

use crate::{
    capture::{DevicePixelRatio, RawImage},
    diff::{self, DiffResult},
    error::CaptureResult,
    geometry::Rect,
    util::{encode::encode_png, naming},
};

/// Final bitmap of one capture
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    image: RawImage,
    ratio: DevicePixelRatio,
    name:  Option<String>,
}

impl Snapshot {
    /// Wraps a captured bitmap
    pub fn new(image: RawImage, ratio: DevicePixelRatio) -> Self {
        Self {
            image,
            ratio,
            name: None,
        }
    }

    /// Sets the file name used by [`save_in`](Self::save_in)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The captured bitmap
    pub fn image(&self) -> &RawImage {
        &self.image
    }

    /// Consumes the snapshot and returns its bitmap
    pub fn into_image(self) -> RawImage {
        self.image
    }

    /// Device pixel ratio the bitmap was captured at
    pub fn ratio(&self) -> DevicePixelRatio {
        self.ratio
    }

    /// Name set with [`with_name`](Self::with_name)
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns a new snapshot holding only the raw pixels of the logical
    /// rectangle `rect`
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::OutOfBounds`](crate::error::CaptureError::OutOfBounds)
    /// if the scaled rectangle extends past the bitmap.
    pub fn crop(&self, rect: &Rect) -> CaptureResult<Snapshot> {
        let region = self.ratio.rect_to_raw(rect)?;
        Ok(Snapshot {
            image: self.image.crop(region)?,
            ratio: self.ratio,
            name:  self.name.clone(),
        })
    }

    /// Encodes the bitmap as PNG
    pub fn to_png(&self) -> CaptureResult<Vec<u8>> {
        encode_png(&self.image)
    }

    /// Writes the bitmap to `path` as PNG, creating missing parent folders
    ///
    /// Returns the number of bytes written.
    pub fn save(&self, path: &Path) -> CaptureResult<u64> {
        self.save_png(path).map(|bytes| bytes.len() as u64)
    }

    /// Like [`save`](Self::save), but returns the encoded PNG
    pub fn save_png(&self, path: &Path) -> CaptureResult<Vec<u8>> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let bytes = self.to_png()?;
        fs::write(path, &bytes)?;

        info!(
            path = %path.display(),
            width = self.image.width(),
            height = self.image.height(),
            size_bytes = bytes.len(),
            "saved snapshot"
        );
        Ok(bytes)
    }

    /// Path inside `folder` this snapshot is saved to by
    /// [`save_in`](Self::save_in): its sanitized name, or a timestamped
    /// default
    pub fn path_in(&self, folder: &Path) -> PathBuf {
        let file_name = match &self.name {
            Some(name) => naming::image_file_name(name),
            None => default_file_name(),
        };
        folder.join(file_name)
    }

    /// Writes the bitmap into `folder` and returns the full path
    pub fn save_in(&self, folder: &Path) -> CaptureResult<PathBuf> {
        let path = self.path_in(folder);
        self.save(&path)?;
        Ok(path)
    }

    /// Compares this snapshot (the actual image) against `expected`
    ///
    /// See [`diff::compare`] for the tolerance semantics.
    pub fn compare(&self, expected: &RawImage, tolerance: f64) -> CaptureResult<DiffResult> {
        diff::compare(expected, &self.image, tolerance)
    }
}

/// `screenshot-<UTC timestamp>.png`, unique to the millisecond
fn default_file_name() -> String {
    let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
    naming::with_image_extension(&format!("screenshot-{timestamp}"))
}
