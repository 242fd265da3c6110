//! The isolated privileged account function for Vitrine.
//!
//! Exposes an axum [`Router`] with `POST /functions/create-user` and
//! `POST /functions/delete-user`. The calling admin authenticates with
//! their own bearer token; the handlers execute against the service's own
//! elevated store handle. The caller's session is never held, refreshed,
//! or replaced here — that isolation is the point of deploying this as a
//! separate service instead of calling privileged APIs from the browser.

pub mod auth;
pub mod error;
pub mod handlers;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{routing::post, Router};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use vitrine_core::{
  account::AdminDirectory, auth::TokenIntrospection, store::CollectionStore,
};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:          String,
  pub port:          u16,
  pub database_path: PathBuf,
}

// ─── Backend bound ───────────────────────────────────────────────────────────

/// Everything the handlers need from the elevated backend handle.
pub trait DirectoryBackend:
  AdminDirectory + CollectionStore + TokenIntrospection + Clone + Send + Sync + 'static
{
}

impl<T> DirectoryBackend for T where
  T: AdminDirectory
    + CollectionStore
    + TokenIntrospection
    + Clone
    + Send
    + Sync
    + 'static
{
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      config: Arc::clone(&self.config),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the account-function service.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: DirectoryBackend,
{
  Router::new()
    .route("/functions/create-user", post(handlers::create_user::<S>))
    .route("/functions/delete-user", post(handlers::delete_user::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{header, Request, StatusCode},
  };
  use tower::ServiceExt as _;
  use uuid::Uuid;
  use vitrine_core::{
    account::{AdminDirectory as _, NewAccount},
    auth::{AuthTransport as _, TokenIntrospection as _},
    role::Role,
    store::CollectionStore as _,
  };
  use vitrine_store_sqlite::SqliteBackend;

  struct Harness {
    backend:     SqliteBackend,
    state:       AppState<SqliteBackend>,
    admin_token: String,
  }

  async fn harness() -> Harness {
    let backend = SqliteBackend::open_in_memory().await.unwrap();
    backend
      .create_account(
        &NewAccount {
          name:       "Root Admin".into(),
          email:      "admin@museum.test".into(),
          department: None,
          role:       Role::Admin,
        },
        "admin password",
      )
      .await
      .unwrap();
    let session = backend
      .sign_in_with_password("admin@museum.test", "admin password")
      .await
      .unwrap();

    let state = AppState {
      store:  Arc::new(backend.clone()),
      config: Arc::new(ServerConfig {
        host:          "127.0.0.1".to_string(),
        port:          8790,
        database_path: PathBuf::from(":memory:"),
      }),
    };

    Harness {
      backend,
      state,
      admin_token: session.access_token,
    }
  }

  async fn post_json(
    state: AppState<SqliteBackend>,
    path: &str,
    token: Option<&str>,
    body: serde_json::Value,
  ) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder()
      .method("POST")
      .uri(path)
      .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
      builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = builder.body(Body::from(body.to_string())).unwrap();

    let resp = router(state).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let json = if bytes.is_empty() {
      serde_json::Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
  }

  fn create_body(email: &str) -> serde_json::Value {
    serde_json::json!({
      "name": "New Curator",
      "email": email,
      "department": "Textiles",
      "role": "curator",
      "temp_password": "Temp0rary!pw",
    })
  }

  // ── Auth gating ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn missing_token_is_401() {
    let h = harness().await;
    let (status, body) = post_json(
      h.state,
      "/functions/create-user",
      None,
      create_body("x@museum.test"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
  }

  #[tokio::test]
  async fn unknown_token_is_401() {
    let h = harness().await;
    let (status, _) = post_json(
      h.state,
      "/functions/create-user",
      Some("not-a-real-token"),
      create_body("x@museum.test"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn non_admin_caller_is_403() {
    let h = harness().await;
    h.backend
      .create_account(
        &NewAccount {
          name:       "Plain Viewer".into(),
          email:      "viewer@museum.test".into(),
          department: None,
          role:       Role::Viewer,
        },
        "viewer password",
      )
      .await
      .unwrap();
    let viewer = h
      .backend
      .sign_in_with_password("viewer@museum.test", "viewer password")
      .await
      .unwrap();

    let (status, body) = post_json(
      h.state,
      "/functions/create-user",
      Some(&viewer.access_token),
      create_body("x@museum.test"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "insufficient privileges");
  }

  // ── Create ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn admin_creates_user() {
    let h = harness().await;
    let (status, body) = post_json(
      h.state.clone(),
      "/functions/create-user",
      Some(&h.admin_token),
      create_body("curator@museum.test"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["email"], "curator@museum.test");
    assert_eq!(body["user"]["role"], "curator");

    let roster = h.backend.list_profiles().await.unwrap();
    let entry = roster
      .iter()
      .find(|p| p.email == "curator@museum.test")
      .expect("profile row");
    assert!(entry.is_active);

    // the temporary password works
    assert!(
      h.backend
        .sign_in_with_password("curator@museum.test", "Temp0rary!pw")
        .await
        .is_ok()
    );
  }

  #[tokio::test]
  async fn creating_a_user_never_touches_the_callers_session() {
    let h = harness().await;
    post_json(
      h.state.clone(),
      "/functions/create-user",
      Some(&h.admin_token),
      create_body("curator@museum.test"),
    )
    .await;

    let caller = h
      .backend
      .resolve_token(&h.admin_token)
      .await
      .unwrap()
      .expect("admin token still valid");
    assert_eq!(caller.email, "admin@museum.test");
  }

  #[tokio::test]
  async fn missing_fields_are_400() {
    let h = harness().await;
    let (status, _) = post_json(
      h.state,
      "/functions/create-user",
      Some(&h.admin_token),
      serde_json::json!({
        "name": "",
        "email": "x@museum.test",
        "role": "viewer",
        "temp_password": "pw",
      }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn duplicate_email_is_a_generic_failure() {
    let h = harness().await;
    let (status, body) = post_json(
      h.state,
      "/functions/create-user",
      Some(&h.admin_token),
      create_body("admin@museum.test"),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    // backend internals stay out of the response
    assert_eq!(body["error"], "failed to create user");
  }

  // ── Delete ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn admin_deletes_user() {
    let h = harness().await;
    post_json(
      h.state.clone(),
      "/functions/create-user",
      Some(&h.admin_token),
      create_body("doomed@museum.test"),
    )
    .await;
    let doomed = h
      .backend
      .list_profiles()
      .await
      .unwrap()
      .into_iter()
      .find(|p| p.email == "doomed@museum.test")
      .unwrap();

    let (status, body) = post_json(
      h.state.clone(),
      "/functions/delete-user",
      Some(&h.admin_token),
      serde_json::json!({ "user_id": doomed.user_id }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["action"], "deleted");
    assert!(
      h.backend
        .get_profile(doomed.user_id)
        .await
        .unwrap()
        .is_none()
    );
  }

  #[tokio::test]
  async fn deleting_an_unknown_user_fails_generically() {
    let h = harness().await;
    let (status, body) = post_json(
      h.state,
      "/functions/delete-user",
      Some(&h.admin_token),
      serde_json::json!({ "user_id": Uuid::new_v4() }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "failed to delete user");
  }
}
