use std::borrow::Cow;

use super::{extract, FilterRequest, MatchMode};
use crate::feed::{Feed, FeedItem};

/// Keywords folded once per request so each item only folds its own text.
struct Matcher<'a> {
    request: &'a FilterRequest,
    include: Vec<Cow<'a, str>>,
    exclude: Vec<Cow<'a, str>>,
}

impl<'a> Matcher<'a> {
    fn new(request: &'a FilterRequest) -> Self {
        let fold_all = |keywords: &'a [String]| -> Vec<Cow<'a, str>> {
            keywords
                .iter()
                .map(|k| fold(k, request.case_sensitive))
                .collect()
        };
        Self {
            request,
            include: fold_all(request.include.as_slice()),
            exclude: fold_all(request.exclude.as_slice()),
        }
    }

    fn searchable_text(&self, item: &FeedItem) -> String {
        let text = self
            .request
            .search_fields()
            .iter()
            .map(|&field| extract(item, field))
            .collect::<Vec<_>>()
            .join(" ");
        fold(&text, self.request.case_sensitive).into_owned()
    }

    fn keeps(&self, item: &FeedItem) -> bool {
        if self.include.is_empty() && self.exclude.is_empty() {
            return true;
        }
        let text = self.searchable_text(item);

        // Exclude wins over include
        if !self.exclude.is_empty() && contains(&text, &self.exclude, self.request.exclude_mode) {
            return false;
        }
        self.include.is_empty() || contains(&text, &self.include, self.request.match_mode)
    }
}

fn fold(s: &str, case_sensitive: bool) -> Cow<'_, str> {
    if case_sensitive {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(s.to_lowercase())
    }
}

fn contains(text: &str, keywords: &[Cow<'_, str>], mode: MatchMode) -> bool {
    match mode {
        MatchMode::Any => keywords.iter().any(|k| text.contains(k.as_ref())),
        MatchMode::All => keywords.iter().all(|k| text.contains(k.as_ref())),
    }
}

/// Whether `item` survives `request`.
pub fn matches(item: &FeedItem, request: &FilterRequest) -> bool {
    Matcher::new(request).keeps(item)
}

/// Keeps the items that survive `request`, in their original order.
///
/// Matching is plain substring containment over the requested fields joined
/// with single spaces. Without `case_sensitive`, text and keywords are both
/// lowercased first.
pub fn filter_items(items: Vec<FeedItem>, request: &FilterRequest) -> Vec<FeedItem> {
    let matcher = Matcher::new(request);
    items.into_iter().filter(|item| matcher.keeps(item)).collect()
}

/// Filters a feed's items, leaving its format and channel metadata as-is.
pub fn filter_feed(feed: Feed, request: &FilterRequest) -> Feed {
    let total = feed.items.len();
    let Feed {
        format,
        channel,
        items,
    } = feed;
    let items = filter_items(items, request);
    tracing::debug!(
        format = %format,
        total,
        matched = items.len(),
        "Filtered feed items"
    );
    Feed {
        format,
        channel,
        items,
    }
}
