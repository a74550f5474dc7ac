//! Request-boundary error type and its JSON representations.

use crate::catalog_store::CatalogError;
use crate::user::UserError;
use crate::validation::{FieldErrors, MSG_NOT_AUTHENTICATED, MSG_NO_PERMISSION};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    /// 400 with a field → messages map.
    Validation(FieldErrors),
    /// 400 with a `non_field_errors` list.
    NonField(String),
    Unauthorized,
    Forbidden,
    NotFound,
    /// 409, for the song deletion guard.
    Conflict(String),
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn field(field: &str, message: &str) -> ApiError {
        let mut errors = FieldErrors::new();
        errors.push(field, message);
        ApiError::Validation(errors)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(errors)).into_response()
            }
            ApiError::NonField(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "non_field_errors": [message] })),
            )
                .into_response(),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "detail": MSG_NOT_AUTHENTICATED })),
            )
                .into_response(),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                Json(json!({ "detail": MSG_NO_PERMISSION })),
            )
                .into_response(),
            ApiError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found." }))).into_response()
            }
            ApiError::Conflict(message) => {
                (StatusCode::CONFLICT, Json(json!({ "detail": message }))).into_response()
            }
            ApiError::Internal(err) => {
                error!("Internal error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": "Internal server error." })),
                )
                    .into_response()
            }
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::LastSongOfAlbum { .. } | CatalogError::BatchWouldEmptyAlbum => {
                ApiError::Conflict(err.to_string())
            }
            CatalogError::UnknownArtist(_)
            | CatalogError::UnknownAlbum(_)
            | CatalogError::UnknownSong(_) => ApiError::NotFound,
            CatalogError::DuplicateStageName => {
                ApiError::field("stage_name", crate::validation::MSG_UNIQUE)
            }
            CatalogError::Other(e) => ApiError::Internal(e),
        }
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Validation(errors) => ApiError::Validation(errors),
            UserError::InvalidCredentials => ApiError::NonField(err.to_string()),
            UserError::Forbidden => ApiError::Forbidden,
            UserError::NotFound => ApiError::NotFound,
            UserError::Other(e) => ApiError::Internal(e),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}
