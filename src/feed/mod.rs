//! Feed retrieval, parsing and regeneration.
//!
//! This module turns fetched bytes into a format-independent [`Feed`] and
//! back into a document:
//!
//! - **Parsing**: sniff RSS 2.0, Atom, RDF (RSS 1.0) or JSON Feed from the
//!   body and build a [`Feed`]
//! - **Generation**: write a [`Feed`] as RSS, Atom or JSON Feed, keeping
//!   channel metadata and escaping item text
//! - **Fetching**: HTTP retrieval with timeout, size limit and retry
//!
//! # Architecture
//!
//! - [`parser`] - format sniffing and the parse entry point
//! - `codec` - one `FeedCodec` per [`FeedFormat`], selected in one place
//! - `rss`, `atom`, `json` - the per-format codecs
//! - [`generator`] - the generate entry point and helpers shared by writers
//! - [`fetcher`] - the [`FeedSource`] trait and its reqwest implementation
//!
//! # Example
//!
//! ```
//! use feedsift::feed::{generate, parse, FeedFormat};
//!
//! let rss = br#"<rss version="2.0"><channel><title>T</title>
//!     <item><title>Hello</title></item></channel></rss>"#;
//! let feed = parse(rss, Some("application/rss+xml")).unwrap();
//! assert_eq!(feed.format, FeedFormat::Rss);
//!
//! let atom = generate(&feed, FeedFormat::Atom).unwrap();
//! assert!(atom.contains("<title type=\"html\">Hello</title>"));
//! ```

mod atom;
mod codec;
pub mod fetcher;
pub mod generator;
mod json;
mod model;
pub mod parser;
mod rss;
mod xml;

pub use fetcher::{FeedSource, FetchError, FetchOptions, FetchedFeed, HttpFetcher};
pub use generator::{generate, media_type, GenerationError};
pub use model::{ChannelImage, ChannelMetadata, Feed, FeedFormat, FeedItem, FieldValue};
pub use parser::{parse, ParseError};
