//! Handlers for the two privileged account functions.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/functions/create-user` | Admin bearer token required |
//! | `POST` | `/functions/delete-user` | Hard delete, deactivation fallback |

use axum::{
  extract::State,
  http::HeaderMap,
  response::IntoResponse,
  Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use vitrine_core::{
  account::{CreatedAccount, DeleteAction, NewAccount},
  role::Role,
};

use crate::{auth::require_admin, error::ApiError, AppState, DirectoryBackend};

// ─── Create user ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateUserBody {
  pub name:          String,
  pub email:         String,
  pub department:    Option<String>,
  pub role:          Role,
  pub temp_password: String,
}

/// `POST /functions/create-user`
///
/// Creates the identity with the service's elevated handle. The caller's
/// session is untouched by construction: the new user's credentials exist
/// only in this isolated context and are never installed anywhere.
pub async fn create_user<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  Json(body): Json<CreateUserBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryBackend,
{
  let caller = require_admin(&headers, state.store.as_ref()).await?;

  if body.name.trim().is_empty() {
    return Err(ApiError::BadRequest("name is required".into()));
  }
  if body.email.trim().is_empty() {
    return Err(ApiError::BadRequest("email is required".into()));
  }
  if body.temp_password.is_empty() {
    return Err(ApiError::BadRequest("temp_password is required".into()));
  }

  let account = NewAccount {
    name:       body.name,
    email:      body.email,
    department: body.department,
    role:       body.role,
  };

  let profile = state
    .store
    .create_account(&account, &body.temp_password)
    .await
    .map_err(|e| {
      tracing::error!(error = %e, email = %account.email, "user creation failed");
      ApiError::Internal("failed to create user")
    })?;

  tracing::info!(
    user_id = %profile.user_id,
    role = %profile.role,
    by = %caller.email,
    "user created"
  );
  Ok(Json(json!({
    "success": true,
    "user": CreatedAccount::from(profile),
  })))
}

// ─── Delete user ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DeleteUserBody {
  pub user_id: Uuid,
}

/// `POST /functions/delete-user`
///
/// Hard-deletes the identity; if the store refuses, deactivates the
/// profile instead. Both outcomes leave the user unusable.
pub async fn delete_user<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  Json(body): Json<DeleteUserBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryBackend,
{
  let caller = require_admin(&headers, state.store.as_ref()).await?;

  let action = match state.store.delete_account(body.user_id).await {
    Ok(()) => DeleteAction::Deleted,
    Err(e) => {
      tracing::warn!(
        error = %e, user_id = %body.user_id,
        "hard delete failed; deactivating instead"
      );
      state
        .store
        .set_active(body.user_id, false)
        .await
        .map_err(|e| {
          tracing::error!(error = %e, user_id = %body.user_id, "deactivation failed");
          ApiError::Internal("failed to delete user")
        })?;
      DeleteAction::Deactivated
    }
  };

  tracing::info!(user_id = %body.user_id, %action, by = %caller.email, "user deleted");
  Ok(Json(json!({ "success": true, "action": action })))
}
