//! End-to-end tests for the parse → filter → generate pipeline.
//!
//! Generated documents are checked twice: re-parsed with our own parser to
//! confirm nothing was lost, and parsed with `feed-rs` to confirm that an
//! independent reader accepts them.

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use feedsift::feed::{generate, parse, ChannelImage, Feed, FeedFormat, FeedItem, ParseError};
use feedsift::filter::{extract, filter_feed, split_keywords, FilterRequest, MatchMode, SearchField};

const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
<channel>
  <title>Tech &amp; Stuff</title>
  <link>https://example.com/</link>
  <description>Posts about languages</description>
  <language>en-us</language>
  <copyright>2024 Example</copyright>
  <image>
    <url>https://example.com/logo.png</url>
    <title>Tech &amp; Stuff</title>
    <link>https://example.com/</link>
  </image>
  <item>
    <title>TypeScript 5.0 Released</title>
    <link>https://example.com/ts5</link>
    <description>New decorators</description>
    <pubDate>Mon, 01 Jan 2024 10:00:00 GMT</pubDate>
    <guid>https://example.com/ts5</guid>
  </item>
  <item>
    <title>Rust in 2024</title>
    <link>https://example.com/rust2024</link>
    <description><![CDATA[<p>Async closures & more</p>]]></description>
    <content:encoded><![CDATA[<p>The full <b>Rust</b> story</p>]]></content:encoded>
    <pubDate>Tue, 02 Jan 2024 10:00:00 GMT</pubDate>
    <guid isPermaLink="false">rust-2024</guid>
  </item>
  <item>
    <title>TypeScript and Rust together</title>
    <link>https://example.com/both</link>
    <description>Bindings with wasm</description>
  </item>
</channel>
</rss>"#;

fn titles(feed: &Feed) -> Vec<String> {
    feed.items
        .iter()
        .map(|i| extract(i, SearchField::Title))
        .collect()
}

fn include(keywords: &str, match_mode: MatchMode) -> FilterRequest {
    FilterRequest {
        include: split_keywords(keywords),
        match_mode,
        ..FilterRequest::default()
    }
}

fn feed_rs_titles(document: &str) -> Vec<String> {
    let parsed = feed_rs::parser::parse(document.as_bytes()).unwrap();
    parsed
        .entries
        .into_iter()
        .map(|e| e.title.map(|t| t.content).unwrap_or_default())
        .collect()
}

// ============================================================================
// Pipeline
// ============================================================================

#[test]
fn test_match_all_keeps_only_combined_item() {
    let feed = parse(RSS.as_bytes(), Some("application/rss+xml")).unwrap();
    let filtered = filter_feed(feed, &include("typescript,rust", MatchMode::All));
    assert_eq!(titles(&filtered), vec!["TypeScript and Rust together"]);
}

#[test]
fn test_filtered_rss_keeps_channel_metadata() {
    let feed = parse(RSS.as_bytes(), None).unwrap();
    let channel = feed.channel.clone();
    let filtered = filter_feed(feed, &include("rust", MatchMode::Any));

    let xml = generate(&filtered, FeedFormat::Rss).unwrap();
    let reparsed = parse(xml.as_bytes(), None).unwrap();

    assert_eq!(reparsed.channel, channel);
    assert_eq!(
        reparsed.channel.image,
        Some(ChannelImage {
            url: Some("https://example.com/logo.png".into()),
            title: Some("Tech & Stuff".into()),
            link: Some("https://example.com/".into()),
        })
    );
    assert_eq!(titles(&reparsed), vec!["Rust in 2024", "TypeScript and Rust together"]);
    assert_eq!(
        extract(&reparsed.items[0], SearchField::Content),
        "<p>The full <b>Rust</b> story</p>"
    );
}

#[test]
fn test_rss_to_atom_to_json() {
    let feed = parse(RSS.as_bytes(), None).unwrap();

    let atom = generate(&feed, FeedFormat::Atom).unwrap();
    let from_atom = parse(atom.as_bytes(), None).unwrap();
    assert_eq!(from_atom.format, FeedFormat::Atom);
    assert_eq!(titles(&from_atom), titles(&feed));

    let json = generate(&from_atom, FeedFormat::Json).unwrap();
    let from_json = parse(json.as_bytes(), None).unwrap();
    assert_eq!(from_json.format, FeedFormat::Json);
    assert_eq!(titles(&from_json), titles(&feed));
    assert_eq!(
        from_json.items[1].guid.as_deref(),
        Some("rust-2024"),
        "guids survive format conversion"
    );
}

#[test]
fn test_unrecognized_input() {
    let broken_html = "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"></head><body>one<br>two</body></html>";
    for input in [
        "just words",
        "<html><body>hi</body></html>",
        broken_html,
        "[1, 2, 3]",
        "",
    ] {
        let err = parse(input.as_bytes(), Some("application/rss+xml")).unwrap_err();
        assert!(
            matches!(err, ParseError::UnrecognizedFormat(_)),
            "{:?} gave {:?}",
            input,
            err
        );
    }
}

// ============================================================================
// Independent validation
// ============================================================================

#[test]
fn test_generated_documents_are_readable_by_feed_rs() {
    let feed = parse(RSS.as_bytes(), None).unwrap();
    let expected = titles(&feed);

    for target in [FeedFormat::Rss, FeedFormat::Atom, FeedFormat::Json] {
        let document = generate(&feed, target).unwrap();
        assert_eq!(feed_rs_titles(&document), expected, "target {}", target);
    }
}

#[test]
fn test_feed_rs_sees_channel_title_and_links() {
    let feed = parse(RSS.as_bytes(), None).unwrap();
    let atom = generate(&feed, FeedFormat::Atom).unwrap();
    let parsed = feed_rs::parser::parse(atom.as_bytes()).unwrap();

    assert_eq!(parsed.title.map(|t| t.content).as_deref(), Some("Tech & Stuff"));
    let links: Vec<String> = parsed
        .entries
        .iter()
        .filter_map(|e| e.links.first().map(|l| l.href.clone()))
        .collect();
    assert_eq!(
        links,
        vec![
            "https://example.com/ts5",
            "https://example.com/rust2024",
            "https://example.com/both"
        ]
    );
}

#[test]
fn test_hostile_text_cannot_break_generated_documents() {
    let mut feed = Feed::new(FeedFormat::Rss);
    feed.channel.title = Some("]]></title><evil/>".into());
    feed.items.push(FeedItem {
        title: Some("</item></channel></rss>".into()),
        link: Some("https://example.com/?a=1&b=\"2\"".into()),
        description: Some("<![CDATA[nested]]> & \u{0}null".into()),
        ..Default::default()
    });

    for target in [FeedFormat::Rss, FeedFormat::Atom, FeedFormat::Json] {
        let document = generate(&feed, target).unwrap();
        let reparsed = parse(document.as_bytes(), None).unwrap();
        assert_eq!(reparsed.items.len(), 1, "target {}", target);
        assert_eq!(
            extract(&reparsed.items[0], SearchField::Title),
            "</item></channel></rss>"
        );
        assert_eq!(
            reparsed.items[0].link.as_deref(),
            Some("https://example.com/?a=1&b=\"2\"")
        );
        assert_eq!(feed_rs_titles(&document).len(), 1);
    }
}

// ============================================================================
// Properties
// ============================================================================

fn arb_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9<>&'\"]{1,16}( [a-zA-Z0-9<>&'\"]{1,16}){0,3}"
}

fn arb_item() -> impl Strategy<Value = FeedItem> {
    (
        arb_text(),
        "https://example\\.com/[a-z0-9]{1,10}(\\?a=1&b=[0-9])?",
        arb_text(),
        proptest::option::of(arb_text()),
    )
        .prop_map(|(title, link, description, content)| FeedItem {
            title: Some(title.into()),
            link: Some(link),
            description: Some(description.into()),
            content: content.map(Into::into),
            ..Default::default()
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_generate_then_parse_recovers_items(
        items in prop::collection::vec(arb_item(), 0..6),
        target in prop_oneof![Just(FeedFormat::Rss), Just(FeedFormat::Atom), Just(FeedFormat::Json)],
    ) {
        let mut feed = Feed::new(FeedFormat::Rss);
        feed.channel.title = Some("Channel".into());
        feed.items = items;

        let document = generate(&feed, target).unwrap();
        let reparsed = parse(document.as_bytes(), None).unwrap();

        prop_assert_eq!(reparsed.format, target);
        prop_assert_eq!(reparsed.items.len(), feed.items.len());
        for (a, b) in reparsed.items.iter().zip(&feed.items) {
            for field in SearchField::ALL {
                prop_assert_eq!(extract(a, field), extract(b, field));
            }
            prop_assert_eq!(&a.link, &b.link);
        }
    }
}
