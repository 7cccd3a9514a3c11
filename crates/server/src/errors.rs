use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::types::ErrorBody;
use service::errors::StoreError;
use thiserror::Error;

/// Fixed responses of the storage endpoints. The underlying cause is logged
/// where it happens and never leaks into the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Invalid storage key")]
    InvalidKey,
    #[error("Invalid JSON body")]
    InvalidBody,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Failed to load data")]
    LoadFailed,
    #[error("Failed to save data")]
    SaveFailed,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidKey | Self::InvalidBody => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::LoadFailed | Self::SaveFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorBody::new(self.to_string()))).into_response()
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("storage unavailable: {0}")]
    Store(#[from] StoreError),
}
