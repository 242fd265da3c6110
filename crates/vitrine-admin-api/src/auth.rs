//! Caller authentication for the privileged account functions.
//!
//! The caller authenticates with their own bearer token; the handlers then
//! execute with the service's elevated store handle. The two never mix —
//! nothing here reads or writes the caller's session beyond resolving the
//! token to an identity.

use axum::http::{header, HeaderMap};
use vitrine_core::{auth::Identity, role::Role};

use crate::{error::ApiError, DirectoryBackend};

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)?
    .to_str()
    .ok()?
    .strip_prefix("Bearer ")
}

/// Resolve the bearer token and require the admin role.
///
/// 401 for a missing/unknown token, 403 for a valid non-admin caller —
/// deliberately distinct, so authorization failures are recognisable.
pub async fn require_admin<S>(
  headers: &HeaderMap,
  store: &S,
) -> Result<Identity, ApiError>
where
  S: DirectoryBackend,
{
  let token = bearer_token(headers).ok_or(ApiError::Unauthorized)?;

  let identity = store
    .resolve_token(token)
    .await
    .map_err(|e| {
      tracing::error!(error = %e, "token resolution failed");
      ApiError::Internal("token resolution failed")
    })?
    .ok_or(ApiError::Unauthorized)?;

  let profile = store
    .get_profile(identity.user_id)
    .await
    .map_err(|e| {
      tracing::error!(error = %e, "caller profile fetch failed");
      ApiError::Internal("caller profile fetch failed")
    })?
    .ok_or(ApiError::Forbidden)?;

  if profile.role != Role::Admin || !profile.is_active {
    tracing::warn!(caller = %identity.email, "non-admin caller refused");
    return Err(ApiError::Forbidden);
  }

  Ok(identity)
}
