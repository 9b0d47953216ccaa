//! Visual regression against stored baselines
//!
//! A [`BaselineStore`] records accepted captures as baseline PNGs and later
//! compares fresh captures against them. When a comparison fails the
//! annotated diff image is written next to the other diffs; passing
//! comparisons write nothing.
//!
//! File names default to a sanitized form of the page URL (see
//! [`crate::util::naming`]).
//!
//! # Examples
//!
//! ```
//! use webshot::{
//!     capture::{DevicePixelRatio, RawImage},
//!     regression::BaselineStore,
//!     snapshot::Snapshot,
//! };
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = BaselineStore::in_folder(dir.path());
//! let snapshot = Snapshot::new(RawImage::from_test_pattern(64, 64), DevicePixelRatio::ONE);
//!
//! store.record(&snapshot, "home").unwrap();
//! let outcome = store.compare(&snapshot, "home", "home-diff", 0.0).unwrap();
//! assert!(outcome.matches);
//! assert!(outcome.diff_path.is_none());
//! ```

use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    capture::{RawImage, constants},
    diff::{self, DiffSummary},
    error::{CaptureError, CaptureResult},
    snapshot::Snapshot,
    util::naming,
};

/// Result of comparing a capture with its baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RegressionOutcome {
    /// Whether the capture matches the baseline
    pub matches:        bool,
    /// Whether a baseline existed
    pub baseline_found: bool,
    /// Baseline file that was (or would have been) read
    pub baseline_path:  PathBuf,
    /// Comparison details, absent when no baseline existed
    pub diff:           Option<DiffSummary>,
    /// Diff image written on mismatch
    pub diff_path:      Option<PathBuf>,
}

/// Folders holding baselines and diff images
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineStore {
    baseline_dir: PathBuf,
    diff_dir:     PathBuf,
}

impl BaselineStore {
    /// Creates a store with separate baseline and diff folders
    pub fn new(baseline_dir: impl Into<PathBuf>, diff_dir: impl Into<PathBuf>) -> Self {
        Self {
            baseline_dir: baseline_dir.into(),
            diff_dir:     diff_dir.into(),
        }
    }

    /// Creates a store keeping baselines and diffs in one folder
    pub fn in_folder(folder: impl Into<PathBuf>) -> Self {
        let folder = folder.into();
        Self::new(folder.clone(), folder)
    }

    /// Folder holding baselines
    pub fn baseline_dir(&self) -> &Path {
        &self.baseline_dir
    }

    /// Folder holding diff images
    pub fn diff_dir(&self) -> &Path {
        &self.diff_dir
    }

    /// Path of the baseline called `name`
    pub fn baseline_path(&self, name: &str) -> PathBuf {
        self.baseline_dir.join(naming::image_file_name(name))
    }

    /// Path of the diff image called `name`
    pub fn diff_path(&self, name: &str) -> PathBuf {
        self.diff_dir.join(naming::image_file_name(name))
    }

    /// Stores `snapshot` as the baseline called `name`, replacing any
    /// previous one
    pub fn record(&self, snapshot: &Snapshot, name: &str) -> CaptureResult<PathBuf> {
        let path = self.baseline_path(name);
        snapshot.save(&path)?;
        info!(path = %path.display(), "recorded baseline");
        Ok(path)
    }

    /// Stores `snapshot` as the baseline of the page at `url`
    pub fn record_for_url(&self, snapshot: &Snapshot, url: &str) -> CaptureResult<PathBuf> {
        self.record(snapshot, &naming::baseline_file_name(url))
    }

    /// Compares `snapshot` with the baseline called `baseline_name`
    ///
    /// A missing baseline is not an error: the outcome reports
    /// `matches = false` and `baseline_found = false`. On a mismatch the
    /// diff image is written as `diff_name`.
    ///
    /// # Errors
    ///
    /// - [`CaptureError::InvalidParameter`](crate::error::CaptureError::InvalidParameter)
    ///   - `tolerance` is outside `[0.0, 1.0]`, or `diff_name` resolves to
    ///   the baseline file
    /// - [`CaptureError::ImageError`](crate::error::CaptureError::ImageError)
    ///   - The baseline exists but is not a PNG
    /// - [`CaptureError::IoError`](crate::error::CaptureError::IoError) -
    ///   Reading the baseline or writing the diff failed
    pub fn compare(
        &self,
        snapshot: &Snapshot,
        baseline_name: &str,
        diff_name: &str,
        tolerance: f64,
    ) -> CaptureResult<RegressionOutcome> {
        diff::validate_tolerance(tolerance)?;

        let baseline_path = self.baseline_path(baseline_name);
        let diff_path = self.diff_path(diff_name);
        if diff_path == baseline_path {
            return Err(CaptureError::invalid_parameter(
                "diff_name",
                format!("'{diff_name}' would overwrite the baseline {}", baseline_path.display()),
            ));
        }

        if !baseline_path.exists() {
            warn!(path = %baseline_path.display(), "no baseline recorded, comparison fails");
            return Ok(RegressionOutcome {
                matches: false,
                baseline_found: false,
                baseline_path,
                diff: None,
                diff_path: None,
            });
        }

        let expected = RawImage::open(&baseline_path)?;
        let result = snapshot.compare(&expected, tolerance)?;

        let diff_path = if result.matches {
            None
        } else {
            let path = diff_path;
            Snapshot::new(result.diff_image.clone(), snapshot.ratio()).save(&path)?;
            warn!(
                baseline = %baseline_path.display(),
                diff = %path.display(),
                differing_pixels = result.differing_pixels,
                "capture differs from baseline"
            );
            Some(path)
        };

        Ok(RegressionOutcome {
            matches: result.matches,
            baseline_found: true,
            baseline_path,
            diff: Some(result.summary()),
            diff_path,
        })
    }

    /// Compares `snapshot` with the baseline of the page at `url`, using
    /// the default baseline and diff names
    pub fn compare_for_url(
        &self,
        snapshot: &Snapshot,
        url: &str,
        tolerance: f64,
    ) -> CaptureResult<RegressionOutcome> {
        self.compare(
            snapshot,
            &naming::baseline_file_name(url),
            &naming::diff_file_name(url),
            tolerance,
        )
    }
}

impl Default for BaselineStore {
    /// Baselines and diffs in the configured screenshot folder
    fn default() -> Self {
        Self::in_folder(constants::screenshot_dir())
    }
}
