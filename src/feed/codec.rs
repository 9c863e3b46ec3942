use super::atom::AtomCodec;
use super::generator::GenerationError;
use super::json::JsonFeedCodec;
use super::model::{Feed, FeedFormat};
use super::parser::{Document, ParseError};
use super::rss::{RdfCodec, RssCodec};

/// One syndication format: how to read it into a [`Feed`] and how to write a
/// [`Feed`] back out.
///
/// Implementations are stateless unit structs; [`codec_for`] is the only
/// place that maps a [`FeedFormat`] to its implementation.
pub(crate) trait FeedCodec: Sync {
    /// Registered media type of documents this codec writes.
    fn media_type(&self) -> &'static str;

    /// Builds a [`Feed`] from a document already sniffed as this format.
    fn decode(&self, document: Document) -> Result<Feed, ParseError>;

    /// Serializes `feed` (channel metadata and items) in this format.
    fn encode(&self, feed: &Feed) -> Result<String, GenerationError>;
}

pub(crate) fn codec_for(format: FeedFormat) -> &'static dyn FeedCodec {
    match format {
        FeedFormat::Rss => &RssCodec,
        FeedFormat::Atom => &AtomCodec,
        FeedFormat::Json => &JsonFeedCodec,
        FeedFormat::Rdf => &RdfCodec,
    }
}

/// Shared guard for XML codecs handed a JSON document, and vice versa.
pub(crate) fn wrong_document(expected: FeedFormat) -> ParseError {
    ParseError::MalformedDocument(format!("document is not a {} document", expected))
}
