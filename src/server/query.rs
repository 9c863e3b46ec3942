use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use url::Url;

use super::error::ApiError;
use crate::config::Config;
use crate::feed::FeedFormat;
use crate::filter::{parse_fields, split_keywords, FilterRequest, MatchMode, SearchField};
use crate::util::validate_url;

// ============================================================================
// Output Format
// ============================================================================

/// What `GET /feed` responds with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum OutputFormat {
    /// JSON summary object with the filtered items
    #[serde(rename = "json")]
    Summary,
    /// A document in the detected source format
    #[serde(rename = "source")]
    Source,
    #[serde(rename = "rss")]
    Rss,
    #[serde(rename = "atom")]
    Atom,
    #[serde(rename = "jsonfeed")]
    JsonFeed,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Summary => "json",
            OutputFormat::Source => "source",
            OutputFormat::Rss => "rss",
            OutputFormat::Atom => "atom",
            OutputFormat::JsonFeed => "jsonfeed",
        }
    }

    /// Document format to generate, or `None` for the summary view.
    pub fn target(self, source: FeedFormat) -> Option<FeedFormat> {
        match self {
            OutputFormat::Summary => None,
            OutputFormat::Source => Some(source),
            OutputFormat::Rss => Some(FeedFormat::Rss),
            OutputFormat::Atom => Some(FeedFormat::Atom),
            OutputFormat::JsonFeed => Some(FeedFormat::Json),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Summary),
            "source" => Ok(OutputFormat::Source),
            "rss" => Ok(OutputFormat::Rss),
            "atom" => Ok(OutputFormat::Atom),
            "jsonfeed" => Ok(OutputFormat::JsonFeed),
            other => Err(ApiError::Validation(format!(
                "Unknown format '{}' (expected json, jsonfeed, rss, atom or source)",
                other
            ))),
        }
    }
}

// ============================================================================
// Query Parameters
// ============================================================================

/// Raw `GET /feed` query string. Every value is validated by
/// [`FeedQuery::validate`] rather than by the extractor, so bad values get
/// the service's own error body.
#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub url: Option<String>,
    pub include: Option<String>,
    pub exclude: Option<String>,
    #[serde(rename = "match")]
    pub match_mode: Option<String>,
    pub exclude_match: Option<String>,
    pub fields: Option<String>,
    pub case_sensitive: Option<String>,
    pub format: Option<String>,
}

/// A fully validated `GET /feed` request.
#[derive(Debug)]
pub struct FeedRequest {
    pub url: Url,
    pub filter: FilterRequest,
    pub output: OutputFormat,
}

impl FeedQuery {
    pub fn validate(self, config: &Config) -> Result<FeedRequest, ApiError> {
        let raw_url = self
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ApiError::Validation("Missing required parameter: url".into()))?;
        let url = validate_url(raw_url, config.allow_private_hosts)?;

        let match_mode = parse_or_default::<MatchMode>(self.match_mode.as_deref())?;
        let exclude_mode = parse_or_default::<MatchMode>(self.exclude_match.as_deref())?;
        let fields = match self.fields.as_deref() {
            Some(raw) => parse_fields(raw)?,
            None => SearchField::ALL.to_vec(),
        };
        let case_sensitive = parse_bool("case_sensitive", self.case_sensitive.as_deref())?;
        let output = match self.format.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => raw.parse()?,
            _ => config.default_format,
        };

        Ok(FeedRequest {
            url,
            filter: FilterRequest {
                include: self.include.as_deref().map(split_keywords).unwrap_or_default(),
                exclude: self.exclude.as_deref().map(split_keywords).unwrap_or_default(),
                match_mode,
                exclude_mode,
                fields,
                case_sensitive,
            },
            output,
        })
    }
}

/// Blank or absent values fall back to the default.
fn parse_or_default<T>(raw: Option<&str>) -> Result<T, ApiError>
where
    T: FromStr + Default,
    ApiError: From<T::Err>,
{
    match raw.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.parse()?),
        _ => Ok(T::default()),
    }
}

fn parse_bool(name: &str, raw: Option<&str>) -> Result<bool, ApiError> {
    match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("false") => Ok(false),
        Some("true") => Ok(true),
        Some(other) => Err(ApiError::Validation(format!(
            "Invalid value '{}' for {} (expected true or false)",
            other, name
        ))),
    }
}
