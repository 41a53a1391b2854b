//! Retrieval of encrypted resources from the origin store
//!
//! Only cache validators and the byte range travel from the client to the
//! origin. Cookies, user agent and every other inbound header stay behind.

mod http;

pub use http::{HttpConfig, HttpOrigin};

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use bytes::Bytes;
use reqwest::Url;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OriginError {
    #[error("invalid origin URL: {0}")]
    InvalidUrl(String),

    #[error("origin request failed: {0}")]
    Request(String),

    #[error("origin request timed out")]
    Timeout,

    #[error("origin responded {status} {reason}")]
    Status { status: u16, reason: String },

    #[error("origin body exceeds {limit} bytes")]
    BodyTooLarge { limit: u64 },
}

/// Inbound headers that are forwarded to the origin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionalHeaders {
    pub if_none_match: Option<HeaderValue>,
    pub if_modified_since: Option<HeaderValue>,
    pub range: Option<HeaderValue>,
}

impl ConditionalHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            if_none_match: headers.get(header::IF_NONE_MATCH).cloned(),
            if_modified_since: headers.get(header::IF_MODIFIED_SINCE).cloned(),
            range: headers.get(header::RANGE).cloned(),
        }
    }

    /// Headers actually present, in a fixed order.
    pub fn iter(&self) -> impl Iterator<Item = (HeaderName, &HeaderValue)> {
        [
            (header::IF_NONE_MATCH, self.if_none_match.as_ref()),
            (header::IF_MODIFIED_SINCE, self.if_modified_since.as_ref()),
            (header::RANGE, self.range.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
    }
}

/// Origin response headers passed through to the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validators {
    pub etag: Option<HeaderValue>,
    pub last_modified: Option<HeaderValue>,
    pub content_type: Option<String>,
}

impl Validators {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            etag: headers.get(header::ETAG).cloned(),
            last_modified: headers.get(header::LAST_MODIFIED).cloned(),
            content_type: headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned),
        }
    }
}

/// Outcome of one origin round trip.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status: StatusCode,
    /// Absent when the origin answered 304.
    pub body: Option<Bytes>,
    pub validators: Validators,
}

impl FetchResult {
    pub fn fetched(status: StatusCode, body: Bytes, validators: Validators) -> Self {
        Self {
            status,
            body: Some(body),
            validators,
        }
    }

    pub fn not_modified(validators: Validators) -> Self {
        Self {
            status: StatusCode::NOT_MODIFIED,
            body: None,
            validators,
        }
    }

    pub fn is_not_modified(&self) -> bool {
        self.status == StatusCode::NOT_MODIFIED
    }
}

/// Where encrypted images come from. One call is one network round trip;
/// implementations do not retry.
#[async_trait]
pub trait Origin: Send + Sync {
    async fn fetch(
        &self,
        url: &Url,
        conditional: &ConditionalHeaders,
    ) -> Result<FetchResult, OriginError>;
}

/// Parses the client-supplied origin URL. Only absolute http(s) URLs are accepted.
pub fn parse_origin_url(raw: &str) -> Result<Url, OriginError> {
    let url = Url::parse(raw).map_err(|e| OriginError::InvalidUrl(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(OriginError::InvalidUrl(format!("unsupported scheme '{other}'"))),
    }
}
