//! JSON payload to entity conversion.
//!
//! Every function here is pure: the same payload and [`Hosts`] always produce
//! the same result. Single-entity conversions (`convert_work`,
//! `convert_author`, `convert_edition`) are all-or-nothing, while list
//! projections (`convert_work_reviews`, `convert_work_previews`) skip
//! malformed items and report them in [`ListOutcome::skipped`].

mod author;
mod award;
mod edition;
mod fields;
mod review;
mod tree;
mod work;

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use unicode_normalization::UnicodeNormalization as _;
use unicode_normalization::char::is_combining_mark;

pub use author::convert_author;
pub use award::group_awards;
pub use edition::{convert_edition, convert_edition_blocks};
pub use fields::resolve_url;
pub use review::{convert_review, convert_work_preview, convert_work_previews, convert_work_reviews};
pub use tree::{MAX_TREE_DEPTH, build_author_bibliography, convert_genre_tree, flatten_child_tree};
pub use work::convert_work;

pub use crate::config::Hosts;

pub const REVIEW_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const BIO_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorKind {
    Missing,
    Malformed,
    TooDeep,
}

impl fmt::Display for FieldErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("missing required field"),
            Self::Malformed => f.write_str("malformed field"),
            Self::TooDeep => f.write_str("nesting exceeds depth limit at field"),
        }
    }
}

/// A required field of `entity` was absent, had the wrong shape, or nested
/// deeper than [`MAX_TREE_DEPTH`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("convert {entity}: {kind} `{field}`")]
pub struct ConversionError {
    pub entity: &'static str,
    pub field: String,
    pub kind: FieldErrorKind,
}

impl ConversionError {
    pub fn missing(entity: &'static str, field: impl Into<String>) -> Self {
        Self {
            entity,
            field: field.into(),
            kind: FieldErrorKind::Missing,
        }
    }

    pub fn malformed(entity: &'static str, field: impl Into<String>) -> Self {
        Self {
            entity,
            field: field.into(),
            kind: FieldErrorKind::Malformed,
        }
    }

    pub fn too_deep(entity: &'static str, field: impl Into<String>) -> Self {
        Self {
            entity,
            field: field.into(),
            kind: FieldErrorKind::TooDeep,
        }
    }
}

/// Result of a best-effort list conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ListOutcome<T> {
    pub items: Vec<T>,
    pub skipped: Vec<ConversionError>,
}

impl<T> ListOutcome<T> {
    /// True when the source list had entries but none of them converted.
    pub fn is_all_skipped(&self) -> bool {
        self.items.is_empty() && !self.skipped.is_empty()
    }
}

impl<T> Default for ListOutcome<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

pub fn parse_datetime(raw: &str, format: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(raw, format).ok()
}

pub fn parse_date(raw: &str, format: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, format).ok()
}

/// Case-insensitive comparison for display names.
///
/// Letters are compared by their lowercase base form: diacritics are dropped
/// after canonical decomposition, so `É` files with `e` and `ё` with `е`.
/// Exact lowercase text breaks ties, putting `e` before `é` and `е` before `ё`.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
}

fn collation_key(value: &str) -> String {
    value
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}
