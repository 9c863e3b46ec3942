use chrono::{DateTime, FixedOffset};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::codec::codec_for;
use super::model::{Feed, FeedFormat, FeedItem};
use crate::filter::{extract, SearchField};

/// Errors produced while serializing a [`Feed`].
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The generator has no writer for the requested format.
    #[error("Cannot generate {0} documents")]
    UnsupportedTarget(FeedFormat),
    /// The XML writer failed.
    #[error("XML generation failed: {0}")]
    Xml(String),
    /// JSON serialization failed.
    #[error("JSON generation failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serializes `feed` into `target`'s syntax.
///
/// Channel metadata is reproduced when present and omitted when absent;
/// item text is escaped or CDATA-wrapped so that item content can never
/// alter document structure.
///
/// # Errors
///
/// [`GenerationError::UnsupportedTarget`] when `target` has no writer
/// (currently RDF).
pub fn generate(feed: &Feed, target: FeedFormat) -> Result<String, GenerationError> {
    let output = codec_for(target).encode(feed)?;
    tracing::debug!(
        source = %feed.format,
        target = %target,
        items = feed.items.len(),
        bytes = output.len(),
        "Generated feed document"
    );
    Ok(output)
}

/// Media type (with charset) for documents generated in `format`.
pub fn media_type(format: FeedFormat) -> &'static str {
    codec_for(format).media_type()
}

// ============================================================================
// Shared helpers for the format writers
// ============================================================================

/// Plain-text view of an item, resolved through the Field Extractor.
pub(crate) struct ItemView {
    pub title: String,
    pub link: String,
    pub description: String,
    pub content: String,
    pub pub_date: Option<String>,
    pub guid: Option<String>,
}

impl ItemView {
    pub fn of(item: &FeedItem) -> Self {
        Self {
            title: extract(item, SearchField::Title),
            link: item.link.clone().unwrap_or_default(),
            description: extract(item, SearchField::Description),
            content: extract(item, SearchField::Content),
            pub_date: item
                .pub_date
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_owned),
            guid: item
                .guid
                .as_deref()
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::to_owned),
        }
    }

    /// Stable identifier: the source guid, else a digest of link, title and date.
    ///
    /// Atom and JSON Feed require an id on every entry, so items from sources
    /// without one get a deterministic `urn:sha256:` id instead.
    pub fn id(&self) -> String {
        if let Some(guid) = &self.guid {
            return guid.clone();
        }
        let input = format!(
            "{}|{}|{}",
            self.link,
            self.title,
            self.pub_date.as_deref().unwrap_or("")
        );
        digest_urn(&input)
    }
}

pub(crate) fn digest_urn(input: &str) -> String {
    let hash = Sha256::digest(input.as_bytes());
    format!("urn:sha256:{:x}", hash)
}

/// Parses the date formats feeds use in practice (RFC 2822 for RSS, RFC 3339
/// for Atom and JSON Feed).
pub(crate) fn parse_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
}

/// Converts to RFC 2822 when parseable, else passes the original through.
pub(crate) fn to_rfc2822(raw: &str) -> String {
    parse_date(raw)
        .map(|d| d.to_rfc2822())
        .unwrap_or_else(|| raw.trim().to_owned())
}

/// Converts to RFC 3339 when parseable, else passes the original through.
pub(crate) fn to_rfc3339(raw: &str) -> String {
    parse_date(raw)
        .map(|d| d.to_rfc3339())
        .unwrap_or_else(|| raw.trim().to_owned())
}
