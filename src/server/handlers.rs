use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use super::error::ApiError;
use super::query::FeedQuery;
use super::AppState;
use crate::feed::generator::ItemView;
use crate::feed::{generate, media_type, parse, ChannelMetadata, Feed, FeedFormat};
use crate::filter::filter_feed;

/// `GET /`: a short description of the API.
pub async fn index() -> impl IntoResponse {
    Json(json!({
        "message": "feedsift: fetch a feed and filter its items by keyword",
        "endpoints": [
            {
                "method": "GET",
                "path": "/feed",
                "description": "Fetch, filter and return a feed",
                "params": {
                    "url": "Feed URL (required)",
                    "include": "Comma-separated keywords an item must contain",
                    "exclude": "Comma-separated keywords that remove an item",
                    "match": "any | all, how include keywords combine (default any)",
                    "exclude_match": "any | all, how exclude keywords combine (default any)",
                    "fields": "Comma-separated subset of title,description,content (default all)",
                    "case_sensitive": "true | false (default false)",
                    "format": "json | jsonfeed | rss | atom | source"
                }
            }
        ]
    }))
}

/// `GET /feed`: fetch, parse, filter, then answer with a summary or a document.
pub async fn get_feed(
    State(state): State<AppState>,
    query: Result<Query<FeedQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::Validation(e.body_text()))?;
    let request = query.validate(&state.config)?;

    tracing::info!(
        url = %request.url,
        output = %request.output,
        include = request.filter.include.len(),
        exclude = request.filter.exclude.len(),
        "Fetching feed"
    );

    let fetched = state.source.fetch(&request.url).await?;
    let feed = parse(&fetched.bytes, fetched.content_type.as_deref())?;
    let total = feed.items.len();
    let feed = filter_feed(feed, &request.filter);

    tracing::info!(
        url = %request.url,
        format = %feed.format,
        total,
        matched = feed.items.len(),
        "Filtered feed"
    );

    match request.output.target(feed.format) {
        None => Ok(Json(SummaryResponse::new(&feed, total)).into_response()),
        Some(target) => {
            let body = generate(&feed, target)?;
            Ok(([(header::CONTENT_TYPE, media_type(target))], body).into_response())
        }
    }
}

// ============================================================================
// Summary view
// ============================================================================

#[derive(Debug, Serialize)]
struct SummaryResponse<'a> {
    feed: SummaryFeed<'a>,
    total: usize,
    matched: usize,
}

#[derive(Debug, Serialize)]
struct SummaryFeed<'a> {
    format: FeedFormat,
    #[serde(flatten)]
    channel: &'a ChannelMetadata,
    items: Vec<SummaryItem>,
}

#[derive(Debug, Serialize)]
struct SummaryItem {
    title: String,
    link: String,
    description: String,
    content: String,
    #[serde(rename = "pubDate")]
    pub_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    guid: Option<String>,
}

impl<'a> SummaryResponse<'a> {
    fn new(feed: &'a Feed, total: usize) -> Self {
        let items: Vec<SummaryItem> = feed
            .items
            .iter()
            .map(|item| {
                let view = ItemView::of(item);
                SummaryItem {
                    title: view.title,
                    link: view.link,
                    description: view.description,
                    content: view.content,
                    pub_date: view.pub_date.unwrap_or_default(),
                    guid: view.guid,
                }
            })
            .collect();
        Self {
            total,
            matched: items.len(),
            feed: SummaryFeed {
                format: feed.format,
                channel: &feed.channel,
                items,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{ChannelImage, FeedItem, FieldValue};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_summary_shape() {
        let mut feed = Feed::new(FeedFormat::Rss);
        feed.channel.title = Some("Channel".into());
        feed.channel.image = Some(ChannelImage {
            url: Some("https://example.com/logo.png".into()),
            ..Default::default()
        });
        feed.items.push(FeedItem {
            title: Some("Hello".into()),
            link: Some("https://example.com/1".into()),
            summary: Some(FieldValue::text("Summary")),
            content_encoded: Some(FieldValue::plain("<p>Body</p>")),
            pub_date: Some("Mon, 01 Jan 2024 10:00:00 GMT".into()),
            ..Default::default()
        });

        let value = serde_json::to_value(SummaryResponse::new(&feed, 3)).unwrap();
        assert_eq!(
            value,
            json!({
                "feed": {
                    "format": "rss",
                    "title": "Channel",
                    "image": { "url": "https://example.com/logo.png" },
                    "items": [{
                        "title": "Hello",
                        "link": "https://example.com/1",
                        "description": "Summary",
                        "content": "<p>Body</p>",
                        "pubDate": "Mon, 01 Jan 2024 10:00:00 GMT"
                    }]
                },
                "total": 3,
                "matched": 1
            })
        );
    }

    #[tokio::test]
    async fn test_index_lists_feed_endpoint() {
        let response = index().await.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
