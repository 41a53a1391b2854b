//! Query shapes accepted by the image endpoint.

use serde::Deserialize;

/// `GET /?imageUrl=<percent-encoded origin URL>`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageQuery {
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
}
