//! reqwest-backed origin client

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use hyper::ext::ReasonPhrase;
use reqwest::{Client, Response, StatusCode, Url};
use std::time::Duration;
use tracing::debug;

use super::{ConditionalHeaders, FetchResult, Origin, OriginError, Validators};
use crate::config::OriginConfig;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_redirects: usize,
    pub max_body_bytes: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            max_redirects: 10,
            max_body_bytes: 32 * 1024 * 1024,
        }
    }
}

impl From<&OriginConfig> for HttpConfig {
    fn from(config: &OriginConfig) -> Self {
        Self {
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            max_redirects: config.max_redirects,
            max_body_bytes: config.max_body_bytes.as_u64(),
        }
    }
}

pub struct HttpOrigin {
    client: Client,
    max_body_bytes: u64,
}

impl HttpOrigin {
    pub fn new(config: HttpConfig) -> Result<Self, OriginError> {
        // No user agent: the origin learns nothing about the client or about us
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| OriginError::Request(e.to_string()))?;

        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> OriginError {
    if err.is_timeout() {
        OriginError::Timeout
    } else {
        // The URL may carry signed query parameters; keep it out of messages
        OriginError::Request(err.without_url().to_string())
    }
}

/// Status text as the origin sent it. hyper only records the phrase when it
/// differs from the canonical one, so the canonical reason is the fallback.
fn reason_phrase(response: &Response) -> String {
    match response.extensions().get::<ReasonPhrase>() {
        Some(reason) => String::from_utf8_lossy(reason.as_bytes()).into_owned(),
        None => response
            .status()
            .canonical_reason()
            .unwrap_or("Unknown")
            .to_string(),
    }
}

#[async_trait]
impl Origin for HttpOrigin {
    async fn fetch(
        &self,
        url: &Url,
        conditional: &ConditionalHeaders,
    ) -> Result<FetchResult, OriginError> {
        let mut request = self.client.get(url.clone());
        for (name, value) in conditional.iter() {
            request = request.header(name, value.clone());
        }

        let mut response = request.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        let validators = Validators::from_headers(response.headers());

        if status == StatusCode::NOT_MODIFIED {
            debug!("origin reports not modified");
            return Ok(FetchResult::not_modified(validators));
        }

        if !status.is_success() {
            return Err(OriginError::Status {
                status: status.as_u16(),
                reason: reason_phrase(&response),
            });
        }

        let limit = self.max_body_bytes;
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(OriginError::BodyTooLarge { limit });
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(map_reqwest_error)? {
            if (body.len() + chunk.len()) as u64 > limit {
                return Err(OriginError::BodyTooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }

        let body: Bytes = body.freeze();
        debug!(status = status.as_u16(), size = body.len(), "origin body received");

        Ok(FetchResult::fetched(status, body, validators))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::humanize::ByteSize;

    fn origin_response(status: u16, reason: Option<&'static [u8]>) -> Response {
        let mut response = axum::http::Response::builder().status(status);
        if let Some(reason) = reason {
            response = response.extension(ReasonPhrase::from_static(reason));
        }
        Response::from(response.body("").unwrap())
    }

    #[test]
    fn test_reason_phrase_prefers_origin_text() {
        let response = origin_response(403, Some(b"Signature Expired"));
        assert_eq!(reason_phrase(&response), "Signature Expired");

        let response = origin_response(404, None);
        assert_eq!(reason_phrase(&response), "Not Found");

        let response = origin_response(599, None);
        assert_eq!(reason_phrase(&response), "Unknown");
    }

    #[test]
    fn test_http_config_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.max_redirects, 10);
        assert_eq!(config.max_body_bytes, 32 * 1024 * 1024);
    }

    #[test]
    fn test_http_config_from_origin_config() {
        let origin = OriginConfig {
            connect_timeout_ms: 250,
            request_timeout_ms: 1500,
            max_redirects: 2,
            max_body_bytes: ByteSize::mib(1),
        };
        let config = HttpConfig::from(&origin);
        assert_eq!(config.connect_timeout, Duration::from_millis(250));
        assert_eq!(config.request_timeout, Duration::from_millis(1500));
        assert_eq!(config.max_redirects, 2);
        assert_eq!(config.max_body_bytes, 1024 * 1024);
    }
}
