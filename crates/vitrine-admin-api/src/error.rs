//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Responses never carry backend internals; anything unexpected is logged
//! at the call site and surfaced as a short generic message.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an account-function handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// Missing, malformed, or expired bearer token.
  #[error("unauthorized")]
  Unauthorized,

  /// The caller is authenticated but not an admin.
  #[error("insufficient privileges")]
  Forbidden,

  #[error("bad request: {0}")]
  BadRequest(String),

  /// Generic failure; the real cause lives in the logs only.
  #[error("{0}")]
  Internal(&'static str),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::Forbidden => StatusCode::FORBIDDEN,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
