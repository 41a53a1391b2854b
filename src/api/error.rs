use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

use super::utils::DecodeError;
use crate::pipeline::PipelineError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing imageUrl parameter")]
    MissingParameter,
    #[error("not found")]
    NotFound,
    #[error("malformed imageUrl parameter: {0}")]
    MalformedParameter(#[from] DecodeError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingParameter => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MalformedParameter(_) | ApiError::Pipeline(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingParameter => "MISSING_PARAMETER",
            ApiError::NotFound => "NOT_FOUND",
            ApiError::MalformedParameter(_) => "MALFORMED_PARAMETER",
            ApiError::Pipeline(e) => e.code(),
        }
    }

    /// Short text shown to the client. Never carries key material or payload bytes.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::MissingParameter => "Missing imageUrl parameter".to_string(),
            ApiError::NotFound => "Not Found".to_string(),
            ApiError::MalformedParameter(e) => format!("Malformed imageUrl parameter: {e}"),
            ApiError::Pipeline(PipelineError::Key(_)) => "Server misconfigured".to_string(),
            ApiError::Pipeline(e) => e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        // String bodies go out as text/plain
        (self.status_code(), self.public_message()).into_response()
    }
}
