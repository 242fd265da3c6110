//! The uniform error shape view code sees.
//!
//! Backend crates keep their own rich error enums; everything crossing the
//! session boundary is re-expressed into this taxonomy via
//! [`vitrine_core::ClassifyError`], so consumers never match on
//! backend-specific shapes.

use thiserror::Error;
use vitrine_core::{ClassifyError, ErrorClass};

#[derive(Debug, Error)]
pub enum SessionError {
  /// Invalid credentials, expired session, or disabled account.
  /// Never retried automatically.
  #[error("authentication failed: {0}")]
  Authentication(String),

  /// A privileged operation refused the caller.
  #[error("insufficient privileges")]
  Authorization,

  /// The request failed to reach (or be served by) the backend.
  /// No retry or backoff at this layer; the user retries via the UI.
  #[error("request failed: {0}")]
  Transient(String),

  /// Sign-out with no live session. [`crate::SessionStore::logout`]
  /// swallows this; it only surfaces from lower-level calls.
  #[error("already signed out")]
  AlreadySignedOut,

  /// Presence validation failed before anything was sent.
  #[error("{0} is required")]
  MissingField(&'static str),
}

impl SessionError {
  pub(crate) fn from_backend<E>(e: E) -> Self
  where
    E: ClassifyError + std::fmt::Display,
  {
    match e.class() {
      ErrorClass::Authentication => Self::Authentication(e.to_string()),
      ErrorClass::Authorization => Self::Authorization,
      ErrorClass::AlreadySignedOut => Self::AlreadySignedOut,
      ErrorClass::Transient => Self::Transient(e.to_string()),
    }
  }
}

pub type Result<T, E = SessionError> = std::result::Result<T, E>;
