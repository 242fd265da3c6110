//! Error type for `vitrine-client`.

use reqwest::StatusCode;
use thiserror::Error;
use vitrine_core::{ClassifyError, ErrorClass};

#[derive(Debug, Error)]
pub enum ClientError {
  #[error("http transport error: {0}")]
  Http(#[from] reqwest::Error),

  /// The backend answered with a non-success status.
  #[error("{message} ({status})")]
  Status {
    status:  StatusCode,
    message: String,
  },

  #[error("row not found: {0}")]
  NotFound(String),

  #[error("unexpected response shape: {0}")]
  Decode(String),

  /// A privileged or session-scoped call was made without a session.
  #[error("not signed in")]
  NotSignedIn,

  #[error("already signed out")]
  AlreadySignedOut,
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

impl ClassifyError for ClientError {
  fn class(&self) -> ErrorClass {
    match self {
      // GoTrue-style auth endpoints answer invalid grants with 400.
      ClientError::Status { status, .. } => match status.as_u16() {
        400 | 401 => ErrorClass::Authentication,
        403 => ErrorClass::Authorization,
        _ => ErrorClass::Transient,
      },
      ClientError::NotSignedIn => ErrorClass::Authentication,
      ClientError::AlreadySignedOut => ErrorClass::AlreadySignedOut,
      _ => ErrorClass::Transient,
    }
  }
}
