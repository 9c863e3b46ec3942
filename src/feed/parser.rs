use thiserror::Error;

use super::codec::codec_for;
use super::model::{Feed, FeedFormat};
use super::xml::{parse_document, root_name, XmlElement};

/// Errors produced while turning fetched bytes into a [`Feed`].
///
/// The two variants are kept apart so callers can tell "this is not a feed"
/// from "this is a feed, but broken".
#[derive(Debug, Error)]
pub enum ParseError {
    /// The bytes are well-formed but no known feed root/structure was found.
    #[error("Unrecognized feed format: {0}")]
    UnrecognizedFormat(String),
    /// The document is syntactically invalid XML or JSON.
    #[error("Malformed feed document: {0}")]
    MalformedDocument(String),
}

/// A source document after sniffing, ready for its format's codec.
pub(crate) enum Document {
    Xml(XmlElement),
    Json(serde_json::Value),
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parses raw feed bytes into a [`Feed`], detecting the format from content.
///
/// `declared_content_type` is the upstream `Content-Type`, used only as a
/// logging hint; servers mislabel feeds often enough that the body decides.
///
/// # Errors
///
/// - [`ParseError::UnrecognizedFormat`] for input with no feed markers
///   (plain text, HTML, an XML root other than `rss`/`feed`/`RDF`, JSON that
///   is not a JSON Feed)
/// - [`ParseError::MalformedDocument`] for broken XML or JSON
pub fn parse(bytes: &[u8], declared_content_type: Option<&str>) -> Result<Feed, ParseError> {
    let (format, document) = sniff(bytes)?;

    if let Some(declared) = declared_content_type {
        if !declared_type_agrees(declared, format) {
            tracing::debug!(
                declared = %declared,
                detected = %format,
                "Declared content type disagrees with feed body"
            );
        }
    }

    let feed = codec_for(format).decode(document)?;
    tracing::debug!(format = %format, items = feed.items.len(), "Parsed feed");
    Ok(feed)
}

/// Detects the feed format and returns the parsed source document.
fn sniff(bytes: &[u8]) -> Result<(FeedFormat, Document), ParseError> {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let first = body.iter().copied().find(|b| !b.is_ascii_whitespace());

    match first {
        Some(b'{') => sniff_json(body),
        Some(b'<') => sniff_xml(body),
        Some(_) => Err(ParseError::UnrecognizedFormat(
            "content is neither XML nor JSON".into(),
        )),
        None => Err(ParseError::UnrecognizedFormat("empty document".into())),
    }
}

/// The root is identified before the tree is built, so markup that is not a
/// feed (typically HTML, rarely well-formed) is reported as unrecognized
/// rather than malformed.
fn sniff_xml(body: &[u8]) -> Result<(FeedFormat, Document), ParseError> {
    let Some(name) = root_name(body)? else {
        return Err(ParseError::UnrecognizedFormat(
            "XML document has no root element".into(),
        ));
    };
    let format = match name.as_str() {
        "rss" => FeedFormat::Rss,
        "feed" => FeedFormat::Atom,
        "RDF" => FeedFormat::Rdf,
        other => {
            return Err(ParseError::UnrecognizedFormat(format!(
                "unknown XML root element <{}>",
                other
            )))
        }
    };
    Ok((format, Document::Xml(parse_document(body)?)))
}

fn sniff_json(body: &[u8]) -> Result<(FeedFormat, Document), ParseError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| ParseError::MalformedDocument(format!("invalid JSON: {}", e)))?;

    let is_json_feed = value
        .get("version")
        .and_then(|v| v.as_str())
        .is_some_and(|v| v.starts_with("https://jsonfeed.org/version/"))
        || value.get("items").is_some_and(|items| items.is_array());

    if !is_json_feed {
        return Err(ParseError::UnrecognizedFormat(
            "JSON document is not a JSON Feed".into(),
        ));
    }
    Ok((FeedFormat::Json, Document::Json(value)))
}

fn declared_type_agrees(declared: &str, format: FeedFormat) -> bool {
    let declared = declared.to_ascii_lowercase();
    match format {
        FeedFormat::Json => declared.contains("json"),
        FeedFormat::Atom => declared.contains("atom") || declared.contains("xml"),
        FeedFormat::Rss | FeedFormat::Rdf => {
            declared.contains("rss") || declared.contains("rdf") || declared.contains("xml")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_rss() {
        let feed = parse(
            br#"<?xml version="1.0"?><rss version="2.0"><channel></channel></rss>"#,
            None,
        )
        .unwrap();
        assert_eq!(feed.format, FeedFormat::Rss);
        assert!(feed.items.is_empty());
    }

    #[test]
    fn test_detects_atom_despite_wrong_content_type() {
        let feed = parse(
            br#"<feed xmlns="http://www.w3.org/2005/Atom"><title>A</title></feed>"#,
            Some("text/html"),
        )
        .unwrap();
        assert_eq!(feed.format, FeedFormat::Atom);
    }

    #[test]
    fn test_detects_rdf() {
        let xml = br#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns="http://purl.org/rss/1.0/"><channel rdf:about="x"><title>R</title></channel></rdf:RDF>"#;
        let feed = parse(xml, None).unwrap();
        assert_eq!(feed.format, FeedFormat::Rdf);
    }

    #[test]
    fn test_detects_json_feed() {
        let json = br#"{"version": "https://jsonfeed.org/version/1.1", "title": "J", "items": []}"#;
        let feed = parse(json, Some("application/json")).unwrap();
        assert_eq!(feed.format, FeedFormat::Json);
    }

    #[test]
    fn test_bom_and_whitespace_skipped() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"\n\n  <rss><channel/></rss>");
        assert_eq!(parse(&bytes, None).unwrap().format, FeedFormat::Rss);
    }

    #[test]
    fn test_plain_text_unrecognized() {
        let err = parse(b"just some words, no feed here", Some("application/rss+xml")).unwrap_err();
        assert!(matches!(err, ParseError::UnrecognizedFormat(_)));
    }

    #[test]
    fn test_empty_body_unrecognized() {
        assert!(matches!(
            parse(b"   ", None),
            Err(ParseError::UnrecognizedFormat(_))
        ));
    }

    #[test]
    fn test_html_root_unrecognized() {
        let err = parse(b"<html><body>hi</body></html>", None).unwrap_err();
        assert!(matches!(err, ParseError::UnrecognizedFormat(_)));
    }

    #[test]
    fn test_real_world_html_unrecognized() {
        let html = br#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <link rel="stylesheet" href="/site.css">
  <title>Not a feed</title>
</head>
<body>
  <p>Line one<br>Line two</p>
  <img src="/a.png">
</body>
</html>"#;
        let err = parse(html, Some("text/html; charset=utf-8")).unwrap_err();
        assert!(matches!(err, ParseError::UnrecognizedFormat(_)), "{:?}", err);
    }

    #[test]
    fn test_comment_only_xml_unrecognized() {
        let err = parse(b"<!-- moved -->", None).unwrap_err();
        assert!(matches!(err, ParseError::UnrecognizedFormat(_)));
    }

    #[test]
    fn test_json_without_feed_markers_unrecognized() {
        let err = parse(br#"{"hello": "world"}"#, None).unwrap_err();
        assert!(matches!(err, ParseError::UnrecognizedFormat(_)));
    }

    #[test]
    fn test_broken_xml_malformed() {
        let err = parse(b"<rss><channel><item></channel></rss>", None).unwrap_err();
        assert!(matches!(err, ParseError::MalformedDocument(_)));
    }

    #[test]
    fn test_broken_json_malformed() {
        let err = parse(br#"{"items": [ "#, None).unwrap_err();
        assert!(matches!(err, ParseError::MalformedDocument(_)));
    }

    #[test]
    fn test_declared_type_agreement() {
        assert!(declared_type_agrees("application/rss+xml; charset=utf-8", FeedFormat::Rss));
        assert!(declared_type_agrees("application/feed+json", FeedFormat::Json));
        assert!(!declared_type_agrees("text/html", FeedFormat::Atom));
    }
}
