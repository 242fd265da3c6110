//! The authentication transport seam.
//!
//! Implemented by `vitrine-store-sqlite` (local backend) and
//! `vitrine-client` (hosted backend). The session layer consumes this trait
//! and never sees a concrete token store.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::role::Role;

// ─── Values ──────────────────────────────────────────────────────────────────

/// The authentication-level principal: stable id plus email, nothing more.
/// Everything else about a user lives in their [`crate::profile::Profile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub user_id: Uuid,
  pub email:   String,
}

/// An open session: the identity it belongs to and the bearer token that
/// authorises calls made on its behalf.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
  pub identity:     Identity,
  pub access_token: String,
  pub expires_at:   DateTime<Utc>,
}

impl AuthSession {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    self.expires_at <= now
  }
}

/// Input to [`AuthTransport::sign_up`]. Registration creates the identity
/// and its profile row; it does not open a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUp {
  pub name:       String,
  pub email:      String,
  pub password:   String,
  pub department: Option<String>,
  pub role:       Role,
}

/// Auth-state notifications. Every event makes the session layer re-derive
/// identity, profile, and permissions from scratch — no diffing.
#[derive(Debug, Clone)]
pub enum AuthEvent {
  SignedIn(AuthSession),
  SignedOut,
  TokenRefreshed(AuthSession),
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Abstraction over the authentication backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait AuthTransport: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Password-grant sign-in. Must refuse deactivated profiles.
  fn sign_in_with_password<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<AuthSession, Self::Error>> + Send + 'a;

  /// Create a new identity and its profile row. Does not sign the new
  /// user in.
  fn sign_up(
    &self,
    input: SignUp,
  ) -> impl Future<Output = Result<Identity, Self::Error>> + Send + '_;

  /// Invalidate the given token. Signing out of an already-dead session is
  /// an [`crate::ErrorClass::AlreadySignedOut`] error; callers generally
  /// swallow it.
  fn sign_out<'a>(
    &'a self,
    access_token: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// The transport's cached current session, if one is open and unexpired.
  fn session(
    &self,
  ) -> impl Future<Output = Result<Option<AuthSession>, Self::Error>> + Send + '_;

  /// Replace the password of the session's owner. The previous password is
  /// not demanded here; re-authentication is the transport's concern.
  fn update_password<'a>(
    &'a self,
    access_token: &'a str,
    new_password: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Subscribe to auth-state changes. Each receiver sees every event from
  /// the moment of subscription.
  fn events(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Resolution of a bearer token back to its identity — the privileged
/// account function uses this to authenticate its caller.
pub trait TokenIntrospection: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// `None` if the token is unknown or expired.
  fn resolve_token<'a>(
    &'a self,
    access_token: &'a str,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + 'a;
}
