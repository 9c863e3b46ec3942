//! HTTP surface: routes, query validation and error responses.
//!
//! - `GET /` describes the API
//! - `GET /feed?url=...` fetches, filters and returns a feed
//!
//! Handlers reach the network only through the [`FeedSource`] held in
//! [`AppState`], so tests can mount the router against a mock upstream.

mod error;
mod handlers;
mod query;

pub use error::ApiError;
pub use query::{FeedQuery, FeedRequest, OutputFormat};

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::config::Config;
use crate::feed::FeedSource;

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub source: Arc<dyn FeedSource>,
}

impl AppState {
    pub fn new(config: Config, source: impl FeedSource + 'static) -> Self {
        Self {
            config: Arc::new(config),
            source: Arc::new(source),
        }
    }
}

/// Builds the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/feed", get(handlers::get_feed))
        .with_state(state)
}
