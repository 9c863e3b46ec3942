//! Utility functions for common operations.
//!
//! This module provides reusable utilities for:
//!
//! - **URL validation**: Security-focused validation to prevent SSRF attacks
//! - **Text processing**: Removing characters that XML 1.0 forbids
//!
//! # Examples
//!
//! ```
//! use feedsift::util::{strip_invalid_xml_chars, validate_url};
//!
//! // Validate a feed URL
//! let url = validate_url("https://example.com/feed.xml", false).unwrap();
//!
//! // Make feed text safe to embed in a regenerated document
//! let clean = strip_invalid_xml_chars("title\u{0}");
//! assert_eq!(clean, "title");
//! ```

mod text;
mod url_validator;

pub use text::strip_invalid_xml_chars;
pub use url_validator::{validate_url, UrlValidationError};
