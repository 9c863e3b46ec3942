use super::codec::{wrong_document, FeedCodec};
use super::generator::{digest_urn, parse_date, to_rfc3339, GenerationError, ItemView};
use super::model::{non_empty, ChannelImage, ChannelMetadata, Feed, FeedFormat, FeedItem, FieldValue};
use super::parser::{Document, ParseError};
use super::xml::{XmlElement, XmlOut};

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const EPOCH: &str = "1970-01-01T00:00:00+00:00";

/// Atom 1.0 (RFC 4287).
pub(crate) struct AtomCodec;

impl FeedCodec for AtomCodec {
    fn media_type(&self) -> &'static str {
        "application/atom+xml; charset=utf-8"
    }

    fn decode(&self, document: Document) -> Result<Feed, ParseError> {
        let Document::Xml(root) = document else {
            return Err(wrong_document(FeedFormat::Atom));
        };
        let mut feed = Feed::new(FeedFormat::Atom);
        let image_url = root.child_text("logo").or_else(|| root.child_text("icon"));
        feed.channel = ChannelMetadata {
            title: root.child_text("title"),
            link: alternate_link(&root),
            description: root.child_text("subtitle"),
            language: root.attr("lang").and_then(non_empty),
            copyright: root.child_text("rights"),
            image: image_url.map(|url| ChannelImage {
                url: Some(url),
                title: None,
                link: None,
            }),
        };
        feed.items = root.children_named("entry").map(read_entry).collect();
        Ok(feed)
    }

    fn encode(&self, feed: &Feed) -> Result<String, GenerationError> {
        write_atom(feed)
    }
}

// ============================================================================
// Reading
// ============================================================================

/// `href` of the first `<link>` with `rel="alternate"` or no `rel`.
fn alternate_link(element: &XmlElement) -> Option<String> {
    element
        .children_named("link")
        .find(|l| matches!(l.attr("rel"), None | Some("alternate")))
        .and_then(|l| l.attr("href"))
        .and_then(non_empty)
}

/// Atom text constructs carry a `type` attribute (`text`, `html`, `xhtml`);
/// typed constructs are kept as structured values.
fn text_construct(element: Option<&XmlElement>) -> Option<FieldValue> {
    let element = element?;
    let text = element.trimmed_text()?;
    Some(if element.attr("type").is_some() {
        FieldValue::text(text)
    } else {
        FieldValue::Plain(text)
    })
}

fn read_entry(entry: &XmlElement) -> FeedItem {
    FeedItem {
        guid: entry.child_text("id"),
        title: text_construct(entry.child("title")),
        link: alternate_link(entry),
        summary: text_construct(entry.child("summary")),
        content: text_construct(entry.child("content")),
        pub_date: entry
            .child_text("published")
            .or_else(|| entry.child_text("updated")),
        ..Default::default()
    }
}

// ============================================================================
// Writing
// ============================================================================

fn write_atom(feed: &Feed) -> Result<String, GenerationError> {
    let channel = &feed.channel;
    let views: Vec<ItemView> = feed.items.iter().map(ItemView::of).collect();

    let mut out = XmlOut::new()?;
    match channel.language.as_deref().filter(|l| !l.trim().is_empty()) {
        Some(lang) => out.start("feed", &[("xmlns", ATOM_NS), ("xml:lang", lang)])?,
        None => out.start("feed", &[("xmlns", ATOM_NS)])?,
    }

    let feed_id = channel
        .link
        .clone()
        .and_then(non_empty)
        .unwrap_or_else(|| digest_urn(channel.title.as_deref().unwrap_or_default()));
    out.text_element("id", &[], &feed_id)?;
    out.opt_text("title", channel.title.as_deref())?;
    out.opt_text("subtitle", channel.description.as_deref())?;
    if let Some(link) = channel.link.as_deref().filter(|l| !l.trim().is_empty()) {
        out.empty("link", &[("rel", "alternate"), ("href", link)])?;
    }
    out.opt_text("rights", channel.copyright.as_deref())?;
    if let Some(image) = &channel.image {
        out.opt_text("logo", image.url.as_deref())?;
    }
    out.text_element("updated", &[], &feed_updated(&views))?;

    for view in &views {
        out.start("entry", &[])?;
        out.text_element("id", &[], &view.id())?;
        if !view.title.trim().is_empty() {
            out.text_element("title", &[("type", "html")], &view.title)?;
        }
        if !view.link.trim().is_empty() {
            out.empty("link", &[("rel", "alternate"), ("href", view.link.as_str())])?;
        }
        let updated = view
            .pub_date
            .as_deref()
            .map(to_rfc3339)
            .unwrap_or_else(|| EPOCH.to_owned());
        if view.pub_date.is_some() {
            out.text_element("published", &[], &updated)?;
        }
        out.text_element("updated", &[], &updated)?;
        if !view.description.trim().is_empty() {
            out.text_element("summary", &[("type", "html")], &view.description)?;
        }
        if !view.content.trim().is_empty() {
            out.text_element("content", &[("type", "html")], &view.content)?;
        }
        out.end("entry")?;
    }

    out.end("feed")?;
    out.finish()
}

/// Newest parseable item date, or the epoch for feeds without dates.
fn feed_updated(views: &[ItemView]) -> String {
    views
        .iter()
        .filter_map(|v| v.pub_date.as_deref().and_then(parse_date))
        .max()
        .map(|d| d.to_rfc3339())
        .unwrap_or_else(|| EPOCH.to_owned())
}
