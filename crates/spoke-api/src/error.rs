//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use spoke_core::store::{Classify, FailureKind};
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("unavailable: {0}")]
  Unavailable(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Map a backend failure onto a response by its [`FailureKind`].
  pub fn from_failure<E>(err: E) -> Self
  where
    E: std::error::Error + Classify + Send + Sync + 'static,
  {
    let message = err.to_string();
    match err.kind() {
      FailureKind::PermissionDenied => ApiError::Forbidden(message),
      FailureKind::NotFound => ApiError::NotFound(message),
      FailureKind::InvalidArgument => ApiError::BadRequest(message),
      FailureKind::Unavailable => ApiError::Unavailable(message),
      FailureKind::Internal => ApiError::Store(Box::new(err)),
    }
  }

  /// Like [`ApiError::from_failure`], but rejected credentials are a 401.
  pub fn from_auth_failure<E>(err: E) -> Self
  where
    E: std::error::Error + Classify + Send + Sync + 'static,
  {
    if err.is_permission_denied() {
      ApiError::Unauthorized(err.to_string())
    } else {
      ApiError::from_failure(err)
    }
  }
}

impl From<spoke_core::Error> for ApiError {
  fn from(err: spoke_core::Error) -> Self { ApiError::BadRequest(err.to_string()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m.clone()),
      ApiError::Store(e) => {
        error!(error = %e, "internal store error");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
