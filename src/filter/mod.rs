//! Keyword filtering over feed items.
//!
//! A [`FilterRequest`] names include/exclude keywords, how they combine, and
//! which item fields are searched. [`filter_items`] applies it as an
//! order-preserving selection; [`extract`] resolves the plain text of one
//! field for both the filter and the feed writers.
//!
//! ```
//! use feedsift::feed::FeedItem;
//! use feedsift::filter::{filter_items, FilterRequest, MatchMode};
//!
//! let items = vec![
//!     FeedItem { title: Some("Rust 1.80".into()), ..Default::default() },
//!     FeedItem { title: Some("Go 1.23".into()), ..Default::default() },
//! ];
//! let request = FilterRequest {
//!     include: vec!["rust".into()],
//!     match_mode: MatchMode::Any,
//!     ..FilterRequest::default()
//! };
//! assert_eq!(filter_items(items, &request).len(), 1);
//! ```

mod engine;
mod extract;

pub use engine::{filter_feed, filter_items, matches};
pub use extract::extract;

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Invalid filter parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterParamError {
    #[error("Unknown field '{0}' (expected title, description or content)")]
    UnknownField(String),
    #[error("Unknown match mode '{0}' (expected any or all)")]
    UnknownMatchMode(String),
}

// ============================================================================
// Search Fields
// ============================================================================

/// A searchable item field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchField {
    Title,
    Description,
    Content,
}

impl SearchField {
    /// Default field set, in search order.
    pub const ALL: [SearchField; 3] = [
        SearchField::Title,
        SearchField::Description,
        SearchField::Content,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SearchField::Title => "title",
            SearchField::Description => "description",
            SearchField::Content => "content",
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchField {
    type Err = FilterParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(SearchField::Title),
            "description" => Ok(SearchField::Description),
            "content" => Ok(SearchField::Content),
            _ => Err(FilterParamError::UnknownField(s.trim().to_owned())),
        }
    }
}

// ============================================================================
// Match Mode
// ============================================================================

/// How a keyword set combines: at least one keyword, or every keyword.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
    #[default]
    Any,
    All,
}

impl FromStr for MatchMode {
    type Err = FilterParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" => Ok(MatchMode::Any),
            "all" => Ok(MatchMode::All),
            _ => Err(FilterParamError::UnknownMatchMode(s.trim().to_owned())),
        }
    }
}

// ============================================================================
// Filter Request
// ============================================================================

/// One request's filtering instructions.
///
/// `match_mode` governs the include set. The exclude set uses
/// `exclude_mode`, which defaults to `Any`: a single matching exclude keyword
/// removes the item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRequest {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub match_mode: MatchMode,
    pub exclude_mode: MatchMode,
    /// Fields to search, in order. Empty means [`SearchField::ALL`].
    pub fields: Vec<SearchField>,
    pub case_sensitive: bool,
}

impl Default for FilterRequest {
    /// The identity filter over all fields, case-insensitive.
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            match_mode: MatchMode::Any,
            exclude_mode: MatchMode::Any,
            fields: SearchField::ALL.to_vec(),
            case_sensitive: false,
        }
    }
}

impl FilterRequest {
    /// True when no keyword constrains the result.
    pub fn is_identity(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Fields in search order, falling back to the default set.
    pub fn search_fields(&self) -> &[SearchField] {
        if self.fields.is_empty() {
            &SearchField::ALL
        } else {
            &self.fields
        }
    }
}

/// Splits a comma-separated keyword list, trimming each token and dropping
/// empty ones.
pub fn split_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Parses a comma-separated field list.
///
/// Names are trimmed and case-folded; duplicates collapse keeping the first
/// occurrence; an empty list yields [`SearchField::ALL`].
///
/// # Errors
///
/// [`FilterParamError::UnknownField`] for any name outside
/// `title`, `description`, `content`.
pub fn parse_fields(raw: &str) -> Result<Vec<SearchField>, FilterParamError> {
    let mut fields = Vec::with_capacity(3);
    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let field: SearchField = token.parse()?;
        if !fields.contains(&field) {
            fields.push(field);
        }
    }
    if fields.is_empty() {
        fields.extend(SearchField::ALL);
    }
    Ok(fields)
}
