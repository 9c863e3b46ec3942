//! Minimal XML tree built from `quick-xml` events, plus a writer wrapper used
//! by the XML generators.
//!
//! Feed documents are small (the fetcher caps them at a few MB), so the
//! parsers read the whole document into an [`XmlElement`] tree and then walk
//! it. Elements keep their local name and their resolved namespace URI, so
//! `<atom:link>` and `<itunes:image>` inside an RSS channel are never mistaken
//! for the channel's own `<link>` and `<image>`.

use std::io::Cursor;

use quick_xml::encoding::Decoder;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::ResolveResult;
use quick_xml::{NsReader, Reader, Writer};

use super::generator::GenerationError;
use super::parser::ParseError;
use crate::util::strip_invalid_xml_chars;

/// SEC-003: Maximum element nesting accepted from a remote document.
const MAX_XML_DEPTH: usize = 64;

pub(crate) const CONTENT_NS: &str = "http://purl.org/rss/1.0/modules/content/";
pub(crate) const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
pub(crate) const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

// ============================================================================
// Reading
// ============================================================================

#[derive(Debug, Clone, Default)]
pub(crate) struct XmlElement {
    /// Local name (prefix stripped).
    pub name: String,
    /// Resolved namespace URI, `None` for unqualified names outside any
    /// default namespace.
    pub namespace: Option<String>,
    /// Attributes as `(qualified key, unescaped value)`.
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    /// Direct character data (text and CDATA), concatenated.
    pub text: String,
}

/// Feeds routinely use `content:` and `dc:` without declaring them.
fn conventional_namespace(prefix: &str) -> Option<&'static str> {
    match prefix {
        "content" => Some(CONTENT_NS),
        "dc" => Some(DC_NS),
        "rdf" => Some(RDF_NS),
        _ => None,
    }
}

fn resolved_namespace(resolved: ResolveResult<'_>) -> Option<String> {
    match resolved {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        ResolveResult::Unbound => None,
        // An undeclared prefix stays foreign: it stands in as its own namespace
        ResolveResult::Unknown(prefix) => {
            let prefix = String::from_utf8_lossy(&prefix).into_owned();
            Some(
                conventional_namespace(&prefix)
                    .map(str::to_owned)
                    .unwrap_or(prefix),
            )
        }
    }
}

impl XmlElement {
    fn from_start(
        e: &BytesStart<'_>,
        namespace: Option<String>,
        decoder: Decoder,
    ) -> Result<Self, ParseError> {
        let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
        let mut attrs = Vec::new();
        for attr_result in e.attributes() {
            let attr = match attr_result {
                Ok(attr) => attr,
                Err(err) => {
                    tracing::debug!(element = %name, error = %err, "Skipping malformed attribute");
                    continue;
                }
            };
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .decode_and_unescape_value(decoder)
                .map_err(|e| ParseError::MalformedDocument(e.to_string()))?
                .into_owned();
            attrs.push((key, value));
        }
        Ok(Self {
            name,
            namespace,
            attrs,
            children: Vec::new(),
            text: String::new(),
        })
    }

    /// First direct child with the given local name, in this element's own
    /// namespace.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children_named(name).next()
    }

    /// Direct children with the given local name, in this element's own
    /// namespace. Extension elements (`atom:link`, `itunes:image`,
    /// `media:title`) are skipped.
    pub fn children_named<'a, 'b>(
        &'a self,
        name: &'b str,
    ) -> impl Iterator<Item = &'a XmlElement> + use<'a, 'b> {
        self.children_in(self.namespace.as_deref(), name)
    }

    /// First direct child with the given local name in namespace `ns`.
    pub fn child_in(&self, ns: Option<&str>, name: &str) -> Option<&XmlElement> {
        self.children_in(ns, name).next()
    }

    pub fn children_in<'a, 'n, 'b>(
        &'a self,
        ns: Option<&'n str>,
        name: &'b str,
    ) -> impl Iterator<Item = &'a XmlElement> + use<'a, 'n, 'b> {
        self.children
            .iter()
            .filter(move |c| c.name == name && c.namespace.as_deref() == ns)
    }

    /// Attribute value by qualified key (`xml:lang`) or by local part (`lang`).
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key || k.rsplit(':').next() == Some(key))
            .map(|(_, v)| v.as_str())
    }

    /// Trimmed text of this element, `None` when blank.
    ///
    /// Falls back to the concatenated text of descendants when the element
    /// only holds markup (Atom `type="xhtml"` constructs).
    pub fn trimmed_text(&self) -> Option<String> {
        let direct = self.text.trim();
        if !direct.is_empty() {
            return Some(direct.to_owned());
        }
        let mut deep = String::new();
        self.collect_text(&mut deep);
        let deep = deep.trim();
        (!deep.is_empty()).then(|| deep.to_owned())
    }

    fn collect_text(&self, out: &mut String) {
        out.push_str(&self.text);
        for child in &self.children {
            child.collect_text(out);
        }
    }

    /// Trimmed text of the first own-namespace child with the given name.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name).and_then(XmlElement::trimmed_text)
    }

    /// Trimmed text of the first child with the given name in namespace `ns`.
    pub fn child_text_in(&self, ns: &str, name: &str) -> Option<String> {
        self.child_in(Some(ns), name).and_then(XmlElement::trimmed_text)
    }
}

/// Local name of the document's root element, read without building the tree.
///
/// Returns `Ok(None)` when the input ends before any element starts. Markup
/// after the root start tag is never looked at, so an HTML page that is not
/// well-formed XML still reports `html` here.
pub(crate) fn root_name(bytes: &[u8]) -> Result<Option<String>, ParseError> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| ParseError::MalformedDocument(e.to_string()))?;
        match event {
            Event::Start(e) | Event::Empty(e) => {
                return Ok(Some(
                    String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                ))
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

/// Parses a complete XML document and returns its root element.
///
/// SEC-002: `quick-xml` (0.37) never expands `<!ENTITY>` declarations, so the
/// DOCTYPE is skipped and only the five predefined entities are resolved.
/// Text with an unknown entity (`&nbsp;` is common in the wild) is kept raw
/// rather than failing the whole feed.
pub(crate) fn parse_document(bytes: &[u8]) -> Result<XmlElement, ParseError> {
    let mut reader = NsReader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let (resolved, event) = reader
            .read_resolved_event_into(&mut buf)
            .map_err(|e| ParseError::MalformedDocument(e.to_string()))?;
        let namespace = resolved_namespace(resolved);
        match event {
            Event::Start(e) => {
                if root.is_some() {
                    return Err(ParseError::MalformedDocument(
                        "content after the root element".into(),
                    ));
                }
                if stack.len() >= MAX_XML_DEPTH {
                    return Err(ParseError::MalformedDocument(format!(
                        "nesting depth exceeds maximum of {} levels",
                        MAX_XML_DEPTH
                    )));
                }
                stack.push(XmlElement::from_start(&e, namespace, reader.decoder())?);
            }
            Event::Empty(e) => {
                let element = XmlElement::from_start(&e, namespace, reader.decoder())?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None if root.is_none() => root = Some(element),
                    None => {
                        return Err(ParseError::MalformedDocument(
                            "content after the root element".into(),
                        ))
                    }
                }
            }
            Event::End(_) => {
                let element = stack.pop().ok_or_else(|| {
                    ParseError::MalformedDocument("unexpected closing tag".into())
                })?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::Text(e) => {
                if let Some(current) = stack.last_mut() {
                    match e.unescape() {
                        Ok(text) => current.text.push_str(&text),
                        Err(err) => {
                            tracing::debug!(error = %err, "Keeping text with unresolved entity verbatim");
                            current.text.push_str(&String::from_utf8_lossy(&e));
                        }
                    }
                }
            }
            Event::CData(e) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(ParseError::MalformedDocument(format!(
            "unexpected end of document inside <{}>",
            stack.last().map(|e| e.name.as_str()).unwrap_or_default()
        )));
    }

    root.ok_or_else(|| ParseError::MalformedDocument("document has no root element".into()))
}

// ============================================================================
// Writing
// ============================================================================

/// Indenting XML writer. Every text value passes through
/// [`strip_invalid_xml_chars`] so feed content can never produce a document
/// that XML parsers reject.
pub(crate) struct XmlOut {
    writer: Writer<Cursor<Vec<u8>>>,
}

fn xml_err(e: impl std::fmt::Display) -> GenerationError {
    GenerationError::Xml(e.to_string())
}

impl XmlOut {
    pub fn new() -> Result<Self, GenerationError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_err)?;
        Ok(Self { writer })
    }

    pub fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), GenerationError> {
        let mut start = BytesStart::new(name);
        for &(key, value) in attrs {
            start.push_attribute((key, strip_invalid_xml_chars(value).as_ref()));
        }
        self.writer.write_event(Event::Start(start)).map_err(xml_err)
    }

    pub fn end(&mut self, name: &str) -> Result<(), GenerationError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_err)
    }

    pub fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), GenerationError> {
        let mut start = BytesStart::new(name);
        for &(key, value) in attrs {
            start.push_attribute((key, strip_invalid_xml_chars(value).as_ref()));
        }
        self.writer.write_event(Event::Empty(start)).map_err(xml_err)
    }

    /// `<name attrs>escaped text</name>`; all five XML specials are escaped.
    pub fn text_element(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
        text: &str,
    ) -> Result<(), GenerationError> {
        self.start(name, attrs)?;
        let clean = strip_invalid_xml_chars(text);
        self.writer
            .write_event(Event::Text(BytesText::new(&clean)))
            .map_err(xml_err)?;
        self.end(name)
    }

    /// `<name><![CDATA[text]]></name>`.
    ///
    /// A literal `]]>` inside the text would terminate the section early, so
    /// the text is split there across consecutive CDATA sections.
    pub fn cdata_element(&mut self, name: &str, text: &str) -> Result<(), GenerationError> {
        self.start(name, &[])?;
        let clean = strip_invalid_xml_chars(text);
        let parts: Vec<&str> = clean.split("]]>").collect();
        let last = parts.len() - 1;
        for (i, part) in parts.iter().enumerate() {
            let mut chunk = String::with_capacity(part.len() + 3);
            if i > 0 {
                chunk.push('>');
            }
            chunk.push_str(part);
            if i < last {
                chunk.push_str("]]");
            }
            self.writer
                .write_event(Event::CData(BytesCData::new(chunk)))
                .map_err(xml_err)?;
        }
        self.end(name)
    }

    /// Writes a text element only when `value` is present and non-blank.
    pub fn opt_text(&mut self, name: &str, value: Option<&str>) -> Result<(), GenerationError> {
        match value {
            Some(v) if !v.trim().is_empty() => self.text_element(name, &[], v),
            _ => Ok(()),
        }
    }

    /// Writes a CDATA element only when `value` is non-blank.
    pub fn opt_cdata(&mut self, name: &str, value: &str) -> Result<(), GenerationError> {
        if value.trim().is_empty() {
            Ok(())
        } else {
            self.cdata_element(name, value)
        }
    }

    pub fn finish(self) -> Result<String, GenerationError> {
        let bytes = self.writer.into_inner().into_inner();
        String::from_utf8(bytes).map_err(xml_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_document() {
        let xml = br#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>T &amp; U</title>
<item><content:encoded><![CDATA[<p>hi</p>]]></content:encoded></item></channel></rss>"#;
        let root = parse_document(xml).unwrap();
        assert_eq!(root.name, "rss");
        assert_eq!(root.attr("version"), Some("2.0"));
        let channel = root.child("channel").unwrap();
        assert_eq!(channel.child_text("title").as_deref(), Some("T & U"));
        let item = channel.child("item").unwrap();
        assert_eq!(item.child_text("encoded"), None);
        assert_eq!(
            item.child_text_in(CONTENT_NS, "encoded").as_deref(),
            Some("<p>hi</p>")
        );
    }

    #[test]
    fn test_extension_elements_do_not_shadow_own_children() {
        let xml = br#"<rss xmlns:atom="http://www.w3.org/2005/Atom"
     xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd"><channel>
<atom:link href="https://blog.example/feed" rel="self"/>
<itunes:image href="https://blog.example/cover.jpg"/>
<link>https://blog.example</link>
<image><url>https://blog.example/logo.png</url></image>
</channel></rss>"#;
        let root = parse_document(xml).unwrap();
        let channel = root.child("channel").unwrap();
        assert_eq!(channel.child_text("link").as_deref(), Some("https://blog.example"));
        assert_eq!(
            channel.child("image").and_then(|i| i.child_text("url")).as_deref(),
            Some("https://blog.example/logo.png")
        );
        let atom_link = channel
            .child_in(Some("http://www.w3.org/2005/Atom"), "link")
            .unwrap();
        assert_eq!(atom_link.attr("rel"), Some("self"));
    }

    #[test]
    fn test_default_namespace_is_inherited() {
        let root = parse_document(
            br#"<feed xmlns="http://www.w3.org/2005/Atom"><entry><title>T</title></entry></feed>"#,
        )
        .unwrap();
        assert_eq!(root.namespace.as_deref(), Some("http://www.w3.org/2005/Atom"));
        let entry = root.child("entry").unwrap();
        assert_eq!(entry.child_text("title").as_deref(), Some("T"));
    }

    #[test]
    fn test_undeclared_prefix_stays_foreign() {
        let root = parse_document(b"<channel><media:title>M</media:title><title>T</title></channel>")
            .unwrap();
        assert_eq!(root.child_text("title").as_deref(), Some("T"));
        assert_eq!(root.child_text_in("media", "title").as_deref(), Some("M"));
    }

    #[test]
    fn test_root_name_ignores_broken_markup_after_root() {
        let html = b"<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"></head><body>a<br>b</body></html>";
        assert!(parse_document(html).is_err());
        assert_eq!(root_name(html).unwrap().as_deref(), Some("html"));
        assert_eq!(
            root_name(br#"<?xml version="1.0"?><rdf:RDF/>"#).unwrap().as_deref(),
            Some("RDF")
        );
        assert_eq!(root_name(b"<!-- nothing here -->").unwrap(), None);
    }

    #[test]
    fn test_unclosed_document_is_malformed() {
        let err = parse_document(b"<rss><channel>").unwrap_err();
        assert!(matches!(err, ParseError::MalformedDocument(_)));
    }

    #[test]
    fn test_garbage_markup_is_malformed() {
        let err = parse_document(b"<not valid xml").unwrap_err();
        assert!(matches!(err, ParseError::MalformedDocument(_)));
    }

    #[test]
    fn test_excessive_depth_rejected() {
        let mut xml = String::new();
        for _ in 0..(MAX_XML_DEPTH + 1) {
            xml.push_str("<a>");
        }
        for _ in 0..(MAX_XML_DEPTH + 1) {
            xml.push_str("</a>");
        }
        let err = parse_document(xml.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("nesting depth"));
    }

    #[test]
    fn test_unknown_entity_kept_verbatim() {
        let root = parse_document(b"<t>a&nbsp;b</t>").unwrap();
        assert_eq!(root.trimmed_text().as_deref(), Some("a&nbsp;b"));
    }

    #[test]
    fn test_xhtml_text_falls_back_to_descendants() {
        let root =
            parse_document(b"<content type=\"xhtml\"><div><p>Deep</p> text</div></content>")
                .unwrap();
        assert_eq!(root.trimmed_text().as_deref(), Some("Deep text"));
    }

    #[test]
    fn test_attr_matches_local_part() {
        let root = parse_document(br#"<feed xml:lang="en"/>"#).unwrap();
        assert_eq!(root.attr("lang"), Some("en"));
        assert_eq!(root.attr("xml:lang"), Some("en"));
    }

    #[test]
    fn test_cdata_split_on_terminator() {
        let mut out = XmlOut::new().unwrap();
        out.cdata_element("d", "a]]>b").unwrap();
        let xml = out.finish().unwrap();
        assert!(xml.contains("<![CDATA[a]]]]><![CDATA[>b]]>"));

        let root = parse_document(xml.as_bytes()).unwrap();
        assert_eq!(root.trimmed_text().as_deref(), Some("a]]>b"));
    }

    #[test]
    fn test_text_element_escapes_specials() {
        let mut out = XmlOut::new().unwrap();
        out.text_element("t", &[], r#"<a href="x">&'"#).unwrap();
        let xml = out.finish().unwrap();
        assert!(xml.contains("&lt;a href=&quot;x&quot;&gt;&amp;&apos;"));
    }

    #[test]
    fn test_control_chars_stripped_on_write() {
        let mut out = XmlOut::new().unwrap();
        out.text_element("t", &[], "bad\u{0}\u{1b}char").unwrap();
        let xml = out.finish().unwrap();
        assert!(xml.contains("<t>badchar</t>"));
    }

    #[test]
    fn test_opt_text_skips_blank() {
        let mut out = XmlOut::new().unwrap();
        out.opt_text("language", None).unwrap();
        out.opt_text("copyright", Some("  ")).unwrap();
        let xml = out.finish().unwrap();
        assert!(!xml.contains("language"));
        assert!(!xml.contains("copyright"));
    }
}
