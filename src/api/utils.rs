//! API utility functions
//!
//! Pure helpers for turning raw request parts into pipeline input.

use percent_encoding::percent_decode_str;
use reqwest::Url;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed percent escape at byte {0}")]
    MalformedEscape(usize),
    #[error("decoded value is not valid UTF-8")]
    InvalidUtf8,
}

/// Returns the parameter if it is present and not blank.
pub fn required_param(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Percent-decodes a value that the query extractor already decoded once.
///
/// Clients double-encode `imageUrl`; a value without escapes passes through
/// unchanged. A `%` not followed by two hex digits is an error rather than a
/// literal.
pub fn decode_component(raw: &str) -> Result<String, DecodeError> {
    let bytes = raw.as_bytes();
    if let Some(pos) = bytes.iter().enumerate().position(|(i, &b)| {
        b == b'%'
            && !(bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit))
    }) {
        return Err(DecodeError::MalformedEscape(pos));
    }

    percent_decode_str(raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| DecodeError::InvalidUtf8)
}

/// Host of the origin URL, for log fields. The path and query are left out
/// since they may carry signed tokens.
pub fn origin_host(raw: &str) -> Option<String> {
    Url::parse(raw).ok()?.host_str().map(str::to_owned)
}
