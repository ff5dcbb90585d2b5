//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::{multipart::MultipartError, rejection::JsonRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use duka_core::access::AccessError;
use serde_json::json;
use thiserror::Error;

use crate::media::MediaError;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn internal<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    ApiError::Internal(Box::new(err))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
      ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
      ApiError::Internal(e) => {
        tracing::error!(error = %e, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_owned())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

// ─── Conversions ─────────────────────────────────────────────────────────────

impl From<duka_core::Error> for ApiError {
  fn from(err: duka_core::Error) -> Self {
    match err {
      duka_core::Error::Validation(m) => ApiError::BadRequest(m),
      duka_core::Error::NotFound(m) => ApiError::NotFound(m),
      other => ApiError::internal(other),
    }
  }
}

impl From<AccessError> for ApiError {
  fn from(err: AccessError) -> Self {
    match err {
      AccessError::Unauthenticated => ApiError::Unauthorized(err.to_string()),
      AccessError::Forbidden => ApiError::Forbidden(err.to_string()),
      AccessError::Upstream(e) => ApiError::Internal(e),
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}

impl From<MultipartError> for ApiError {
  fn from(err: MultipartError) -> Self { ApiError::BadRequest(err.body_text()) }
}

impl From<MediaError> for ApiError {
  fn from(err: MediaError) -> Self {
    match err {
      MediaError::Io(e) => ApiError::internal(e),
      other => ApiError::BadRequest(other.to_string()),
    }
  }
}
