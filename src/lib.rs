//! feedsift fetches a syndication feed, keeps the items that match a set of
//! include/exclude keywords, and serves the result as a JSON summary or as a
//! regenerated RSS, Atom or JSON Feed document.
//!
//! The pipeline is `fetch → parse → filter → generate`:
//!
//! - [`feed`]: the uniform feed model, format codecs and the HTTP fetcher
//! - [`filter`]: field extraction and the keyword filter
//! - [`server`]: the axum router that wires the pipeline to `GET /feed`
//! - [`config`]: TOML and environment configuration

pub mod config;
pub mod feed;
pub mod filter;
pub mod server;
pub mod util;
