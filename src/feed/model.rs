use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Feed Format
// ============================================================================

/// Syndication format of a feed document.
///
/// Detected once per fetch by content sniffing and never changed afterwards.
/// `Rdf` is RSS 1.0 (`<rdf:RDF>` root); `Json` is JSON Feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedFormat {
    Rss,
    Atom,
    Json,
    Rdf,
}

impl FeedFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedFormat::Rss => "rss",
            FeedFormat::Atom => "atom",
            FeedFormat::Json => "json",
            FeedFormat::Rdf => "rdf",
        }
    }
}

impl fmt::Display for FeedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Field Values
// ============================================================================

/// A textual item field as it appeared in the source document.
///
/// Feeds carry text either as a plain string or as a small object
/// (`{"text": ..}`, `{"value": ..}`, `{"encoded": ..}`). Both shapes are kept
/// until extraction; use [`crate::filter::extract`] to get plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Plain(String),
    Structured {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        encoded: Option<String>,
    },
}

impl FieldValue {
    pub fn plain(s: impl Into<String>) -> Self {
        FieldValue::Plain(s.into())
    }

    /// Structured value carrying only `text`.
    pub fn text(s: impl Into<String>) -> Self {
        FieldValue::Structured {
            text: Some(s.into()),
            value: None,
            encoded: None,
        }
    }

    /// Structured value carrying only `encoded` (RSS `content:encoded` style).
    pub fn encoded(s: impl Into<String>) -> Self {
        FieldValue::Structured {
            text: None,
            value: None,
            encoded: Some(s.into()),
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Plain(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Plain(s.to_owned())
    }
}

// ============================================================================
// Items and Channel
// ============================================================================

/// One entry of a feed in the format-independent representation.
///
/// The `description` and `content` families keep one slot per source alias
/// (`summary`, `subtitle`, `content:encoded`, `content_html`, `content_text`)
/// so that nothing is lost while parsing; the Field Extractor resolves them
/// in priority order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedItem {
    pub guid: Option<String>,
    pub title: Option<FieldValue>,
    pub link: Option<String>,
    pub description: Option<FieldValue>,
    pub summary: Option<FieldValue>,
    pub subtitle: Option<FieldValue>,
    pub content: Option<FieldValue>,
    pub content_encoded: Option<FieldValue>,
    pub content_html: Option<FieldValue>,
    pub content_text: Option<FieldValue>,
    pub pub_date: Option<String>,
}

/// Channel logo/image. Only emitted when `url` is present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelImage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Feed-level metadata reproduced verbatim on regeneration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ChannelImage>,
}

/// A parsed feed: detected format, channel metadata and items in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub format: FeedFormat,
    pub channel: ChannelMetadata,
    pub items: Vec<FeedItem>,
}

impl Feed {
    pub fn new(format: FeedFormat) -> Self {
        Self {
            format,
            channel: ChannelMetadata::default(),
            items: Vec::new(),
        }
    }

    /// Replaces the item sequence, leaving format and channel metadata untouched.
    pub fn with_items(self, items: Vec<FeedItem>) -> Self {
        Self { items, ..self }
    }
}

/// Treats empty or whitespace-only strings as absent.
pub(crate) fn non_empty(s: impl Into<String>) -> Option<String> {
    let s = s.into();
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_deserializes_plain_string() {
        let v: FieldValue = serde_json::from_str(r#""hello""#).unwrap();
        assert_eq!(v, FieldValue::plain("hello"));
    }

    #[test]
    fn test_field_value_deserializes_structured_object() {
        let v: FieldValue = serde_json::from_str(r#"{"encoded": "<p>x</p>"}"#).unwrap();
        assert_eq!(v, FieldValue::encoded("<p>x</p>"));

        let v: FieldValue = serde_json::from_str(r#"{"value": "v", "text": "t"}"#).unwrap();
        assert_eq!(
            v,
            FieldValue::Structured {
                text: Some("t".into()),
                value: Some("v".into()),
                encoded: None,
            }
        );
    }

    #[test]
    fn test_with_items_keeps_channel() {
        let mut feed = Feed::new(FeedFormat::Rss);
        feed.channel.title = Some("Channel".into());
        let feed = feed.with_items(vec![FeedItem::default()]);
        assert_eq!(feed.channel.title.as_deref(), Some("Channel"));
        assert_eq!(feed.items.len(), 1);
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty("  "), None);
        assert_eq!(non_empty("x"), Some("x".to_string()));
    }

    #[test]
    fn test_format_display() {
        assert_eq!(FeedFormat::Rdf.to_string(), "rdf");
        assert_eq!(FeedFormat::Json.as_str(), "json");
    }
}
