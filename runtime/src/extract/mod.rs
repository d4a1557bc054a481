//! Two-pass catalog extraction: listing rows, then per-record detail pages.

pub mod detail;
pub mod listing;

pub use detail::{enrich, DetailField, DetailLayout};
pub use listing::{extract_listing, Admission, Column, ListingLayout, NameStyle, Partition};

/// How a value is read from a located element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Read {
    /// Rendered text.
    Text,
    /// An attribute such as `href`.
    Attribute(&'static str),
}
