//! Error types for `vitrine-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid email or password")]
  InvalidCredentials,

  #[error("account {0} is deactivated")]
  AccountDisabled(Uuid),

  #[error("email {0} is already registered")]
  EmailTaken(String),

  #[error("session token is expired or unknown")]
  SessionExpired,

  #[error("no session to sign out of")]
  AlreadySignedOut,

  #[error("profile not found: {0}")]
  ProfileNotFound(Uuid),

  #[error("artifact not found: {0}")]
  ArtifactNotFound(Uuid),

  #[error("report not found: {0}")]
  ReportNotFound(Uuid),

  #[error("{0} is required")]
  MissingField(&'static str),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Classification ──────────────────────────────────────────────────────────

/// The coarse failure category the session layer surfaces to view code.
///
/// Backend crates keep their own rich error enums; the session store only
/// needs to know which of these four buckets a failure lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
  /// Invalid credentials, expired session, or disabled account.
  Authentication,
  /// A privileged operation refused the caller.
  Authorization,
  /// Sign-out when no session exists; the desired end state already holds.
  AlreadySignedOut,
  /// The request failed to reach (or be served by) the backend.
  Transient,
}

/// Implemented by every transport/store error so the session layer can
/// re-express it without depending on the concrete backend.
pub trait ClassifyError {
  fn class(&self) -> ErrorClass;
}

impl ClassifyError for Error {
  fn class(&self) -> ErrorClass {
    match self {
      Error::InvalidCredentials
      | Error::AccountDisabled(_)
      | Error::SessionExpired => ErrorClass::Authentication,
      Error::AlreadySignedOut => ErrorClass::AlreadySignedOut,
      _ => ErrorClass::Transient,
    }
  }
}
