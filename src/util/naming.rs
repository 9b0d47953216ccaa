//! File names for captures, baselines and diff images
//!
//! Baselines are keyed by the URL of the captured page. The URL is turned
//! into a file name by dropping a leading `http://` or `https://`, replacing
//! characters that are not allowed in file names, and truncating.
//!
//! # Examples
//!
//! ```
//! use webshot::util::naming::{baseline_file_name, diff_file_name, url_to_file_name};
//!
//! assert_eq!(url_to_file_name("https://example.com/a?b=c"), "example.com-a-b=c");
//! assert_eq!(baseline_file_name("https://example.com/"), "example.com-.png");
//! assert_eq!(diff_file_name("https://example.com/"), "example.com--DIFF_IMAGE.png");
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::capture::constants::{DIFF_SUFFIX, IMAGE_EXTENSION, MAX_FILE_NAME_LEN};

static SCHEME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://").expect("static pattern"));

static FORBIDDEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[?|*:<>"/\\]"#).expect("static pattern"));

/// Turns a URL into a file-name stem
///
/// A leading `http://` or `https://` is removed, each of
/// `? | * : < > " / \` becomes `-`, and the result is cut to
/// [`MAX_FILE_NAME_LEN`] characters.
pub fn url_to_file_name(url: &str) -> String {
    let without_scheme = SCHEME.replace(url, "");
    let sanitized = FORBIDDEN.replace_all(&without_scheme, "-");
    truncate(&sanitized, MAX_FILE_NAME_LEN)
}

/// Returns the first `max_chars` characters of `name`
pub fn truncate(name: &str, max_chars: usize) -> String {
    name.chars().take(max_chars).collect()
}

/// Makes a caller-supplied name safe to use as a file name
///
/// Applies the same character replacement as [`url_to_file_name`] without
/// touching a scheme prefix.
pub fn sanitize(name: &str) -> String {
    truncate(&FORBIDDEN.replace_all(name, "-"), MAX_FILE_NAME_LEN)
}

/// Default baseline file name for a page URL
pub fn baseline_file_name(url: &str) -> String {
    format!("{}.{}", url_to_file_name(url), IMAGE_EXTENSION)
}

/// Default diff file name for a page URL
///
/// See [`diff_name_for`].
pub fn diff_file_name(url: &str) -> String {
    diff_name_for(&url_to_file_name(url))
}

/// Diff file name belonging to the baseline called `baseline_name`
///
/// The baseline stem is cut to [`MAX_FILE_DIFF_STEM_LEN`] characters before
/// [`DIFF_SUFFIX`] is appended, so the suffix always survives and the diff
/// never shares a file name with its baseline.
///
/// # Examples
///
/// ```
/// use webshot::util::naming::diff_name_for;
///
/// assert_eq!(diff_name_for("home.png"), "home-DIFF_IMAGE.png");
/// assert_eq!(diff_name_for("checkout"), "checkout-DIFF_IMAGE.png");
/// ```
pub fn diff_name_for(baseline_name: &str) -> String {
    let stem = sanitize(strip_image_extension(baseline_name));
    format!(
        "{}{}.{}",
        truncate(&stem, MAX_FILE_DIFF_STEM_LEN),
        DIFF_SUFFIX,
        IMAGE_EXTENSION
    )
}

/// File name for a caller-supplied image name
///
/// The stem is sanitized and cut to [`MAX_FILE_NAME_LEN`] characters before
/// the image extension is added, so truncation never eats the extension.
pub fn image_file_name(name: &str) -> String {
    format!("{}.{}", sanitize(strip_image_extension(name)), IMAGE_EXTENSION)
}

/// Removes a trailing image extension, in any letter case
fn strip_image_extension(name: &str) -> &str {
    let extension = IMAGE_EXTENSION.len() + 1;
    match name.len().checked_sub(extension) {
        Some(cut)
            if name.is_char_boundary(cut)
                && name[cut..].eq_ignore_ascii_case(&format!(".{IMAGE_EXTENSION}")) =>
        {
            &name[..cut]
        }
        _ => name,
    }
}

/// Longest baseline stem kept in a diff file name
pub const MAX_FILE_DIFF_STEM_LEN: usize = MAX_FILE_NAME_LEN - DIFF_SUFFIX.len() - 1;

/// Appends the image extension unless `name` already ends with it
pub fn with_image_extension(name: &str) -> String {
    let extension = format!(".{IMAGE_EXTENSION}");
    if name.to_ascii_lowercase().ends_with(&extension) {
        name.to_string()
    } else {
        format!("{name}{extension}")
    }
}
