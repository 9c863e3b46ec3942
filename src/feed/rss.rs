//! RSS 2.0 and RDF Site Summary (RSS 1.0).
//!
//! Both share item vocabulary (`title`, `link`, `description`,
//! `content:encoded`) and differ in layout: RSS nests items inside
//! `<channel>`, RDF makes them siblings of `<channel>` under `<rdf:RDF>`.

use super::codec::{wrong_document, FeedCodec};
use super::generator::{to_rfc2822, GenerationError, ItemView};
use super::model::{non_empty, ChannelImage, ChannelMetadata, Feed, FeedFormat, FeedItem, FieldValue};
use super::parser::{Document, ParseError};
use super::xml::{XmlElement, XmlOut, CONTENT_NS, DC_NS};

const RSS1_NS: &str = "http://purl.org/rss/1.0/";

pub(crate) struct RssCodec;

pub(crate) struct RdfCodec;

impl FeedCodec for RssCodec {
    fn media_type(&self) -> &'static str {
        "application/rss+xml; charset=utf-8"
    }

    fn decode(&self, document: Document) -> Result<Feed, ParseError> {
        let Document::Xml(root) = document else {
            return Err(wrong_document(FeedFormat::Rss));
        };
        let mut feed = Feed::new(FeedFormat::Rss);
        // A <rss> without <channel> is an empty feed rather than an error
        let Some(channel) = root.child("channel") else {
            return Ok(feed);
        };
        feed.channel = read_channel(channel, channel.child("image"));
        feed.items = channel.children_named("item").map(read_item).collect();
        Ok(feed)
    }

    fn encode(&self, feed: &Feed) -> Result<String, GenerationError> {
        write_rss(feed)
    }
}

impl FeedCodec for RdfCodec {
    fn media_type(&self) -> &'static str {
        "application/rdf+xml; charset=utf-8"
    }

    fn decode(&self, document: Document) -> Result<Feed, ParseError> {
        let Document::Xml(root) = document else {
            return Err(wrong_document(FeedFormat::Rdf));
        };
        let mut feed = Feed::new(FeedFormat::Rdf);
        if let Some(channel) = rdf_children(&root, "channel").next() {
            let image = rdf_children(&root, "image")
                .next()
                .or_else(|| channel.child("image"));
            feed.channel = read_channel(channel, image);
        }
        feed.items = rdf_children(&root, "item").map(read_item).collect();
        Ok(feed)
    }

    fn encode(&self, _feed: &Feed) -> Result<String, GenerationError> {
        Err(GenerationError::UnsupportedTarget(FeedFormat::Rdf))
    }
}

// ============================================================================
// Reading
// ============================================================================

/// Children of `<rdf:RDF>` in the RSS 1.0 namespace, or in none when the
/// document leaves out its default namespace.
fn rdf_children<'a>(root: &'a XmlElement, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
    root.children
        .iter()
        .filter(move |c| c.name == name && matches!(c.namespace.as_deref(), None | Some(RSS1_NS)))
}

fn read_channel(channel: &XmlElement, image: Option<&XmlElement>) -> ChannelMetadata {
    ChannelMetadata {
        title: channel.child_text("title"),
        link: channel.child_text("link"),
        description: channel.child_text("description"),
        language: channel.child_text("language"),
        // Dublin Core <dc:rights> is the RDF spelling of <copyright>
        copyright: channel
            .child_text("copyright")
            .or_else(|| channel.child_text_in(DC_NS, "rights")),
        image: image.and_then(read_image),
    }
}

fn read_image(image: &XmlElement) -> Option<ChannelImage> {
    // RDF channels reference the image as <image rdf:resource="..."/>
    let url = image
        .child_text("url")
        .or_else(|| image.attr("resource").and_then(non_empty))?;
    Some(ChannelImage {
        url: Some(url),
        title: image.child_text("title"),
        link: image.child_text("link"),
    })
}

fn read_item(item: &XmlElement) -> FeedItem {
    FeedItem {
        guid: item
            .child_text("guid")
            .or_else(|| item.attr("about").and_then(non_empty)),
        title: item.child_text("title").map(FieldValue::Plain),
        link: item.child_text("link"),
        description: item.child_text("description").map(FieldValue::Plain),
        content_encoded: item
            .child_text_in(CONTENT_NS, "encoded")
            .map(FieldValue::Plain),
        pub_date: item
            .child_text("pubDate")
            .or_else(|| item.child_text_in(DC_NS, "date")),
        ..Default::default()
    }
}

// ============================================================================
// Writing
// ============================================================================

fn write_rss(feed: &Feed) -> Result<String, GenerationError> {
    let mut out = XmlOut::new()?;
    out.start("rss", &[("version", "2.0"), ("xmlns:content", CONTENT_NS)])?;
    out.start("channel", &[])?;

    let channel = &feed.channel;
    if let Some(title) = &channel.title {
        out.opt_cdata("title", title)?;
    }
    out.opt_text("link", channel.link.as_deref())?;
    if let Some(description) = &channel.description {
        out.opt_cdata("description", description)?;
    }
    out.opt_text("language", channel.language.as_deref())?;
    out.opt_text("copyright", channel.copyright.as_deref())?;
    if let Some(image) = &channel.image {
        if let Some(url) = image.url.as_deref().filter(|u| !u.trim().is_empty()) {
            out.start("image", &[])?;
            out.text_element("url", &[], url)?;
            out.text_element(
                "title",
                &[],
                image
                    .title
                    .as_deref()
                    .or(channel.title.as_deref())
                    .unwrap_or_default(),
            )?;
            out.text_element(
                "link",
                &[],
                image
                    .link
                    .as_deref()
                    .or(channel.link.as_deref())
                    .unwrap_or_default(),
            )?;
            out.end("image")?;
        }
    }

    for item in &feed.items {
        let view = ItemView::of(item);
        out.start("item", &[])?;
        out.opt_cdata("title", &view.title)?;
        out.opt_text("link", Some(view.link.as_str()))?;
        out.opt_cdata("description", &view.description)?;
        out.opt_cdata("content:encoded", &view.content)?;
        if let Some(date) = &view.pub_date {
            out.text_element("pubDate", &[], &to_rfc2822(date))?;
        }
        if let Some(guid) = &view.guid {
            if *guid == view.link {
                out.text_element("guid", &[], guid)?;
            } else {
                out.text_element("guid", &[("isPermaLink", "false")], guid)?;
            }
        }
        out.end("item")?;
    }

    out.end("channel")?;
    out.end("rss")?;
    out.finish()
}
