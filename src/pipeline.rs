//! Per-request orchestration: fetch, decrypt, resolve type, respond
//!
//! ```text
//! start -> key -> fetch -+-> 304 ---------------------------------> respond
//!                        +-> body -> decrypt -> resolve type -> respond
//! ```
//!
//! Every step error aborts the run; nothing is retried here.

use axum::http::HeaderMap;
use axum::response::Response;
use bon::Builder;
use bytes::Bytes;
use reqwest::Url;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::crypto::{DecryptError, KeyError, KeyManager, check_signature, decrypt};
use crate::media::{MediaDescriptor, resolve_content_type};
use crate::observability::RequestTimer;
use crate::origin::{ConditionalHeaders, Origin, OriginError, parse_origin_url};
use crate::response::{self, CachePolicy};

/// Header that opts a request into timing diagnostics.
pub const DEBUG_HEADER: &str = "x-debug";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("key initialization failed: {0}")]
    Key(#[from] KeyError),

    #[error(transparent)]
    Origin(#[from] OriginError),

    #[error("decryption failed: {0}")]
    Decrypt(#[from] DecryptError),
}

impl PipelineError {
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Key(_) => "KEY_INITIALIZATION",
            PipelineError::Origin(_) => "ORIGIN_FETCH",
            PipelineError::Decrypt(_) => "DECRYPTION",
        }
    }
}

/// What the pipeline needs from the inbound request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub origin_url: String,
    pub conditional: ConditionalHeaders,
    pub debug: bool,
}

impl RequestContext {
    pub fn new(origin_url: impl Into<String>, headers: &HeaderMap) -> Self {
        Self {
            origin_url: origin_url.into(),
            conditional: ConditionalHeaders::from_headers(headers),
            debug: headers
                .get(DEBUG_HEADER)
                .is_some_and(|value| value.as_bytes() == b"1"),
        }
    }

    /// A running timer for debug requests; nothing is measured otherwise.
    pub fn timer(&self) -> Option<RequestTimer> {
        self.debug.then(RequestTimer::start)
    }
}

#[derive(Builder)]
pub struct Pipeline {
    keys: Arc<KeyManager>,
    origin: Arc<dyn Origin>,
    #[builder(default)]
    cache: CachePolicy,
    #[builder(default = true)]
    validate_signatures: bool,
}

impl Pipeline {
    pub async fn run(&self, ctx: &RequestContext) -> Result<Response, PipelineError> {
        let mut timer = ctx.timer();

        let key = self.keys.get_key()?;
        let url = parse_origin_url(&ctx.origin_url)?;

        let fetched = self.origin.fetch(&url, &ctx.conditional).await?;
        if let Some(timer) = timer.as_mut() {
            timer.mark_fetched();
        }

        if fetched.is_not_modified() {
            if let Some(timer) = &timer {
                timer.report(0);
            }
            return Ok(response::not_modified(&fetched.validators, self.cache));
        }

        let ciphertext = fetched.body.unwrap_or_default();
        let plaintext = decrypt(&ciphertext, &key)?;
        if let Some(timer) = timer.as_mut() {
            timer.mark_decrypted();
        }

        let media = self.describe(&url, fetched.validators.content_type.as_deref(), &plaintext);
        debug!(
            content_type = %media.content_type,
            signature_ok = media.signature_ok,
            size = plaintext.len(),
            "image decrypted"
        );

        if let Some(timer) = &timer {
            timer.report(ciphertext.len());
        }

        Ok(response::full(
            Bytes::from(plaintext),
            media.content_type,
            &fetched.validators,
            self.cache,
        ))
    }

    fn describe(&self, url: &Url, declared: Option<&str>, plaintext: &[u8]) -> MediaDescriptor {
        let content_type = resolve_content_type(url, declared);

        let signature_ok = !self.validate_signatures
            || match check_signature(&content_type, plaintext) {
                Some(mismatch) => {
                    warn!(
                        content_type = %content_type,
                        expected = %mismatch.expected,
                        detected = ?mismatch.detected,
                        "{mismatch}; serving anyway"
                    );
                    false
                }
                None => true,
            };

        MediaDescriptor {
            content_type,
            signature_ok,
        }
    }
}
