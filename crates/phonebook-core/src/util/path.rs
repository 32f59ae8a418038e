//! Group title path helpers.
//!
//! ## Summary
//! A group title may itself describe several levels (`"Sales > Nordic"`). These helpers
//! split titles into path segments and join segments into the canonical `full_path`
//! that identifies a merged group.

use crate::constants::{MAX_TITLE_LEN, PATH_SEPARATOR};

/// Splits a single group title on `>` into trimmed, non-empty segments.
pub fn title_segments(title: &str) -> impl Iterator<Item = &str> {
    title.split('>').map(str::trim).filter(|s| !s.is_empty())
}

/// ## Summary
/// Splits a user supplied group path such as `"Sub1 > Sub2"` or `"Sub1/Sub2"`.
///
/// Both `/` and `>` separate levels; surrounding whitespace and empty levels are dropped.
#[must_use]
pub fn split_group_path(path: &str) -> Vec<&str> {
    path.split(['/', '>'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Joins path segments into a canonical `full_path`.
#[must_use]
pub fn join_path<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(PATH_SEPARATOR)
}

/// Truncates a title to the stored maximum, respecting char boundaries.
#[must_use]
pub fn truncate_title(title: &str) -> String {
    title.chars().take(MAX_TITLE_LEN).collect()
}
