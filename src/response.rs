//! Outbound response construction
//!
//! Two shapes: `304` carrying only cache headers, and `200` carrying the
//! decrypted image. Building a response does no I/O.

use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::Response;
use bon::Builder;
use bytes::Bytes;
use mime::Mime;

use crate::origin::Validators;

/// Public, finite freshness window for everything this service serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    max_age_secs: u32,
}

impl CachePolicy {
    pub const DEFAULT_MAX_AGE_SECS: u32 = 600;

    pub fn public(max_age_secs: u32) -> Self {
        Self { max_age_secs }
    }

    pub fn header_value(&self) -> HeaderValue {
        HeaderValue::try_from(format!("public, max-age={}", self.max_age_secs))
            .unwrap_or_else(|_| HeaderValue::from_static("public, max-age=600"))
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::public(Self::DEFAULT_MAX_AGE_SECS)
    }
}

/// Every header this service may set on a response, by name.
#[derive(Debug, Clone, Builder)]
pub struct ResponseHeaders {
    cache_control: CachePolicy,
    content_type: Option<Mime>,
    #[builder(default)]
    inline: bool,
    etag: Option<HeaderValue>,
    last_modified: Option<HeaderValue>,
}

impl ResponseHeaders {
    pub fn into_header_map(self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Some(value) = self
            .content_type
            .and_then(|media| HeaderValue::from_str(media.as_ref()).ok())
        {
            headers.insert(header::CONTENT_TYPE, value);
        }
        if self.inline {
            headers.insert(header::CONTENT_DISPOSITION, HeaderValue::from_static("inline"));
        }
        headers.insert(header::CACHE_CONTROL, self.cache_control.header_value());
        if let Some(etag) = self.etag {
            headers.insert(header::ETAG, etag);
        }
        if let Some(last_modified) = self.last_modified {
            headers.insert(header::LAST_MODIFIED, last_modified);
        }

        headers
    }
}

/// `304`: empty body, cache policy and the entity tag only.
pub fn not_modified(validators: &Validators, cache: CachePolicy) -> Response {
    let headers = ResponseHeaders::builder()
        .cache_control(cache)
        .maybe_etag(validators.etag.clone())
        .build();
    build(StatusCode::NOT_MODIFIED, headers, Body::empty())
}

/// `200`: the decrypted image, served inline.
pub fn full(body: Bytes, content_type: Mime, validators: &Validators, cache: CachePolicy) -> Response {
    let headers = ResponseHeaders::builder()
        .cache_control(cache)
        .content_type(content_type)
        .inline(true)
        .maybe_etag(validators.etag.clone())
        .maybe_last_modified(validators.last_modified.clone())
        .build();
    build(StatusCode::OK, headers, Body::from(body))
}

fn build(status: StatusCode, headers: ResponseHeaders, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers.into_header_map();
    response
}
