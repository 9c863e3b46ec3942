use super::SearchField;
use crate::feed::{FeedItem, FieldValue};

/// Plain text of `field` on `item`, or an empty string.
///
/// Alias slots are tried in priority order and the first non-empty value
/// wins:
///
/// - `title`: title
/// - `description`: description, summary, subtitle
/// - `content`: content, content:encoded, content_html, content_text
///
/// Structured values resolve to `text`, then `value`, then (content only)
/// `encoded`.
pub fn extract(item: &FeedItem, field: SearchField) -> String {
    let slots: [Option<&FieldValue>; 4] = match field {
        SearchField::Title => [item.title.as_ref(), None, None, None],
        SearchField::Description => [
            item.description.as_ref(),
            item.summary.as_ref(),
            item.subtitle.as_ref(),
            None,
        ],
        SearchField::Content => [
            item.content.as_ref(),
            item.content_encoded.as_ref(),
            item.content_html.as_ref(),
            item.content_text.as_ref(),
        ],
    };
    let allow_encoded = field == SearchField::Content;

    slots
        .into_iter()
        .flatten()
        .map(|value| resolve(value, allow_encoded))
        .find(|text| !text.is_empty())
        .map(str::to_owned)
        .unwrap_or_default()
}

fn resolve(value: &FieldValue, allow_encoded: bool) -> &str {
    match value {
        FieldValue::Plain(s) => s,
        FieldValue::Structured {
            text,
            value,
            encoded,
        } => text
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| value.as_deref().filter(|s| !s.is_empty()))
            .or_else(|| {
                encoded
                    .as_deref()
                    .filter(|s| allow_encoded && !s.is_empty())
            })
            .unwrap_or(""),
    }
}
