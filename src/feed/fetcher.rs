use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::Config;
use crate::util::validate_url;

/// Hops followed before a redirect chain is abandoned.
const MAX_REDIRECTS: usize = 10;

/// Errors that can occur while retrieving a feed.
///
/// Parsing is not part of fetching; these only cover getting the bytes.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("Upstream returned HTTP status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// Server returned 429 Too Many Requests after max retries
    #[error("Rate limited after {0} retries")]
    RateLimited(u32),
    /// Response body exceeded the configured size limit
    #[error("Response larger than {0} bytes")]
    ResponseTooLarge(usize),
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    /// A redirect pointed somewhere the initial URL would not be allowed to
    #[error("Redirect refused: {0}")]
    RedirectRefused(String),
}

impl FetchError {
    fn from_send(e: reqwest::Error) -> Self {
        if e.is_redirect() {
            let reason = std::error::Error::source(&e)
                .map(ToString::to_string)
                .unwrap_or_else(|| e.to_string());
            return FetchError::RedirectRefused(reason);
        }
        FetchError::Network(e)
    }
}

/// Raw feed body plus the upstream's declared content type.
#[derive(Debug, Clone)]
pub struct FetchedFeed {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Where feed bytes come from.
///
/// The request handler depends only on this trait, so tests and alternative
/// transports can stand in for [`HttpFetcher`].
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedFeed, FetchError>;
}

/// Limits applied to every fetch.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Budget for one attempt (connect, headers and body)
    pub timeout: Duration,
    /// Maximum accepted body size
    pub max_bytes: usize,
    /// Retries after the first attempt for 429/5xx/truncated responses
    pub max_retries: u32,
    /// First backoff delay; doubles on each retry
    pub retry_base_delay: Duration,
    pub user_agent: String,
    /// Let redirects lead to localhost and private ranges
    pub allow_private_hosts: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for FetchOptions {
    fn from(config: &Config) -> Self {
        Self {
            timeout: Duration::from_secs(config.fetch_timeout_secs),
            max_bytes: config.max_feed_bytes,
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
            user_agent: config.user_agent.clone(),
            allow_private_hosts: config.allow_private_hosts,
        }
    }
}

/// [`FeedSource`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    options: FetchOptions,
}

/// Outcome of one attempt that the retry loop may act on.
enum Attempt {
    Done(FetchedFeed),
    Retry { reason: &'static str, error: FetchError },
}

impl HttpFetcher {
    pub fn new(options: FetchOptions) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(options.user_agent.clone())
            .redirect(redirect_policy(options.allow_private_hosts))
            .build()?;
        Ok(Self { client, options })
    }

    /// Uses a caller-configured client (proxies, custom TLS roots, ...).
    ///
    /// Redirects follow that client's own policy; only [`HttpFetcher::new`]
    /// installs the private-host check on each hop.
    pub fn with_client(client: reqwest::Client, options: FetchOptions) -> Self {
        Self { client, options }
    }

    async fn attempt(&self, url: &Url) -> Result<Attempt, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .header(
                reqwest::header::ACCEPT,
                "application/rss+xml, application/atom+xml, application/feed+json, application/xml;q=0.9, */*;q=0.8",
            )
            .send()
            .await
            .map_err(FetchError::from_send)?;

        let status = response.status();

        // EDGE-004: Rate limiting and server errors are worth another try
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Ok(Attempt::Retry {
                reason: "rate limited",
                error: FetchError::RateLimited(self.options.max_retries),
            });
        }
        if status.is_server_error() {
            return Ok(Attempt::Retry {
                reason: "server error",
                error: FetchError::HttpStatus(status.as_u16()),
            });
        }

        // EDGE-002: Validate HTTP status before processing (4xx errors fail immediately)
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        match read_limited_bytes(response, self.options.max_bytes).await {
            Ok(bytes) => Ok(Attempt::Done(FetchedFeed {
                bytes,
                content_type,
            })),
            Err(e @ FetchError::IncompleteResponse { .. }) => Ok(Attempt::Retry {
                reason: "incomplete body",
                error: e,
            }),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl FeedSource for HttpFetcher {
    /// Fetches `url` with bounded exponential backoff.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Network`] - Connection or TLS errors
    /// - [`FetchError::Timeout`] - An attempt exceeded the configured timeout
    /// - [`FetchError::HttpStatus`] - Non-2xx response (5xx only after retries)
    /// - [`FetchError::RateLimited`] - 429 response after max retries
    /// - [`FetchError::ResponseTooLarge`] - Body exceeded the size limit
    /// - [`FetchError::IncompleteResponse`] - Truncated body after max retries
    async fn fetch(&self, url: &Url) -> Result<FetchedFeed, FetchError> {
        let mut retry_count = 0;

        loop {
            let outcome = tokio::time::timeout(self.options.timeout, self.attempt(url))
                .await
                .map_err(|_| FetchError::Timeout(self.options.timeout))??;

            match outcome {
                Attempt::Done(fetched) => {
                    tracing::debug!(
                        url = %url,
                        bytes = fetched.bytes.len(),
                        content_type = fetched.content_type.as_deref().unwrap_or(""),
                        "Fetched feed"
                    );
                    return Ok(fetched);
                }
                Attempt::Retry { reason, error } => {
                    if retry_count >= self.options.max_retries {
                        return Err(error);
                    }
                    let delay = backoff_delay(self.options.retry_base_delay, retry_count);
                    tracing::warn!(
                        url = %url,
                        reason = reason,
                        retry = retry_count,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying feed fetch after delay"
                    );
                    tokio::time::sleep(delay).await;
                    retry_count += 1;
                }
            }
        }
    }
}

/// SEC-001: Every redirect hop passes the same URL check as the request
/// itself, so a public feed cannot bounce the fetch onto an internal host.
fn redirect_policy(allow_private: bool) -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error(format!("more than {} redirects", MAX_REDIRECTS));
        }
        match validate_url(attempt.url().as_str(), allow_private) {
            Ok(_) => attempt.follow(),
            Err(e) => {
                tracing::warn!(target_url = %attempt.url(), error = %e, "Refusing redirect");
                attempt.error(e)
            }
        }
    })
}

/// `base * 2^retry`, saturating instead of overflowing for large retry counts.
fn backoff_delay(base: Duration, retry: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(retry))
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Capture Content-Length for completeness check
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    // EDGE-005: A network interruption mid-body leaves fewer bytes than announced
    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
