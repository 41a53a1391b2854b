//! Content-Type resolution for decrypted images
//!
//! Precedence, highest first:
//! 1. a known image extension on the last path segment of the origin URL
//! 2. the `Content-Type` the origin declared
//! 3. `image/webp`

use mime::Mime;
use reqwest::Url;
use std::sync::LazyLock;
use tracing::{debug, warn};

// `mime` has no constant for WebP
static IMAGE_WEBP: LazyLock<Mime> =
    LazyLock::new(|| "image/webp".parse().unwrap_or(mime::IMAGE_STAR));

/// Content type used when neither the URL nor the origin says anything useful.
pub fn default_content_type() -> Mime {
    IMAGE_WEBP.clone()
}

/// The media type a response is served with, and whether the decrypted bytes
/// carried the matching container signature.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaDescriptor {
    pub content_type: Mime,
    pub signature_ok: bool,
}

pub fn resolve_content_type(url: &Url, origin_content_type: Option<&str>) -> Mime {
    if let Some(media) = extension_content_type(url) {
        return media;
    }

    if let Some(declared) = origin_content_type {
        match declared.parse::<Mime>() {
            Ok(media) => {
                if media.type_() != mime::IMAGE {
                    warn!(content_type = %media, "origin declared a non-image content type");
                }
                return media;
            }
            Err(_) => debug!(content_type = declared, "ignoring unparsable origin content type"),
        }
    }

    default_content_type()
}

fn extension_content_type(url: &Url) -> Option<Mime> {
    let segment = url.path_segments()?.last()?;
    let (_, ext) = segment.rsplit_once('.')?;

    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some(mime::IMAGE_JPEG),
        "png" => Some(mime::IMAGE_PNG),
        "gif" => Some(mime::IMAGE_GIF),
        "webp" => Some(default_content_type()),
        _ => None,
    }
}
