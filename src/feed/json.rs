use serde::{Deserialize, Serialize};

use super::codec::{wrong_document, FeedCodec};
use super::generator::{to_rfc3339, GenerationError, ItemView};
use super::model::{non_empty, ChannelImage, ChannelMetadata, Feed, FeedFormat, FeedItem, FieldValue};
use super::parser::{Document, ParseError};

const JSON_FEED_VERSION: &str = "https://jsonfeed.org/version/1.1";

/// JSON Feed 1.0/1.1.
pub(crate) struct JsonFeedCodec;

// ============================================================================
// Wire Types
// ============================================================================

/// Incoming document. Text fields accept either a string or a
/// `{text|value|encoded}` object; non-standard `description`/`content`
/// keys seen in the wild are accepted alongside the standard names.
#[derive(Debug, Deserialize)]
struct JsonFeedIn {
    title: Option<String>,
    home_page_url: Option<String>,
    description: Option<String>,
    language: Option<String>,
    icon: Option<String>,
    favicon: Option<String>,
    copyright: Option<String>,
    #[serde(default)]
    items: Vec<JsonItemIn>,
}

#[derive(Debug, Deserialize)]
struct JsonItemIn {
    id: Option<serde_json::Value>,
    url: Option<String>,
    title: Option<FieldValue>,
    summary: Option<FieldValue>,
    description: Option<FieldValue>,
    content: Option<FieldValue>,
    content_html: Option<FieldValue>,
    content_text: Option<FieldValue>,
    date_published: Option<String>,
    date_modified: Option<String>,
}

#[derive(Debug, Serialize)]
struct JsonFeedOut<'a> {
    version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    home_page_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon: Option<&'a str>,
    /// Not part of JSON Feed; readers ignore unknown keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    copyright: Option<&'a str>,
    items: Vec<JsonItemOut>,
}

#[derive(Debug, Serialize)]
struct JsonItemOut {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_published: Option<String>,
}

// ============================================================================
// Codec
// ============================================================================

impl FeedCodec for JsonFeedCodec {
    fn media_type(&self) -> &'static str {
        "application/feed+json; charset=utf-8"
    }

    fn decode(&self, document: Document) -> Result<Feed, ParseError> {
        let Document::Json(value) = document else {
            return Err(wrong_document(FeedFormat::Json));
        };
        let doc: JsonFeedIn = serde_json::from_value(value)
            .map_err(|e| ParseError::MalformedDocument(format!("invalid JSON Feed: {}", e)))?;

        let image_url = doc.icon.or(doc.favicon).and_then(non_empty);
        let channel = ChannelMetadata {
            title: doc.title.and_then(non_empty),
            link: doc.home_page_url.and_then(non_empty),
            description: doc.description.and_then(non_empty),
            language: doc.language.and_then(non_empty),
            copyright: doc.copyright.and_then(non_empty),
            image: image_url.map(|url| ChannelImage {
                url: Some(url),
                title: None,
                link: None,
            }),
        };

        let items = doc.items.into_iter().map(read_item).collect();
        Ok(Feed {
            format: FeedFormat::Json,
            channel,
            items,
        })
    }

    fn encode(&self, feed: &Feed) -> Result<String, GenerationError> {
        let channel = &feed.channel;
        let out = JsonFeedOut {
            version: JSON_FEED_VERSION,
            title: channel.title.as_deref(),
            home_page_url: channel.link.as_deref(),
            description: channel.description.as_deref(),
            language: channel.language.as_deref(),
            icon: channel.image.as_ref().and_then(|i| i.url.as_deref()),
            copyright: channel.copyright.as_deref(),
            items: feed.items.iter().map(write_item).collect(),
        };
        Ok(serde_json::to_string_pretty(&out)?)
    }
}

fn read_item(item: JsonItemIn) -> FeedItem {
    // JSON Feed allows numeric ids
    let guid = item.id.and_then(|id| match id {
        serde_json::Value::String(s) => non_empty(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    });
    FeedItem {
        guid,
        title: item.title,
        link: item.url.and_then(non_empty),
        description: item.description,
        summary: item.summary,
        content: item.content,
        content_html: item.content_html,
        content_text: item.content_text,
        pub_date: item
            .date_published
            .or(item.date_modified)
            .and_then(non_empty),
        ..Default::default()
    }
}

fn write_item(item: &FeedItem) -> JsonItemOut {
    let view = ItemView::of(item);
    JsonItemOut {
        id: view.id(),
        url: non_empty(view.link),
        title: non_empty(view.title),
        summary: non_empty(view.description),
        content_html: non_empty(view.content),
        date_published: view.pub_date.as_deref().map(to_rfc3339),
    }
}
