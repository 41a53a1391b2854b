use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Response,
};
use tracing::{Instrument, error, info_span};
use uuid::Uuid;

use super::{error::ApiError, models::ImageQuery, state::AppState, utils};
use crate::pipeline::RequestContext;

/// Image endpoint (`/?imageUrl=...`)
///
/// Fetches the encrypted image named by `imageUrl`, decrypts it and serves
/// the plaintext. A missing or blank `imageUrl` is rejected before anything
/// touches the network. The value is percent-decoded a second time after
/// extraction, so double-encoded URLs resolve.
pub async fn decrypt_image(
    State(state): State<AppState>,
    Query(query): Query<ImageQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let image_url = utils::required_param(query.image_url).ok_or(ApiError::MissingParameter)?;
    let image_url = utils::decode_component(&image_url).inspect_err(|e| {
        error!(error = %e, "image request failed");
    })?;
    let ctx = RequestContext::new(image_url, &headers);

    let span = info_span!(
        "decrypt_image",
        request_id = %Uuid::new_v4(),
        origin_host = %utils::origin_host(&ctx.origin_url).unwrap_or_default(),
    );

    async move {
        state.pipeline.run(&ctx).await.map_err(|e| {
            error!(code = e.code(), error = %e, "image request failed");
            ApiError::from(e)
        })
    }
    .instrument(span)
    .await
}

/// Router fallback for every other path.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
