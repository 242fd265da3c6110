//! Async HTTP client implementing the Vitrine trait seams against a hosted
//! backend: a password-grant auth endpoint under `/auth`, PostgREST-style
//! table CRUD under `/rest`, and the privileged account functions under
//! `/functions`.
//!
//! Row-level policies on the hosted side are the real authorization
//! boundary; this client just carries the caller's bearer token. The live
//! change-feed transport is not implemented here — deployments that need
//! it pair this client with a feed-capable backend.

mod auth;
mod functions;
mod tables;

pub mod error;

pub use error::{ClientError, Result};

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use reqwest::Client;
use tokio::sync::broadcast;
use vitrine_core::auth::{AuthEvent, AuthSession};

/// Connection settings for the hosted backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
  /// E.g. `https://vitrine.example.org`.
  pub base_url: String,
  /// The project's public API key, sent with every request.
  pub api_key:  String,
}

/// Async HTTP backend for Vitrine.
///
/// Cheap to clone — the inner [`reqwest::Client`], session cache, and
/// event channel are all shared.
#[derive(Clone)]
pub struct HttpBackend {
  pub(crate) http:    Client,
  pub(crate) config:  ClientConfig,
  /// The cached current session, mirroring what a browser SDK keeps in
  /// local storage.
  pub(crate) current: Arc<Mutex<Option<AuthSession>>>,
  pub(crate) events:  broadcast::Sender<AuthEvent>,
}

impl HttpBackend {
  pub fn new(config: ClientConfig) -> Result<Self> {
    let http = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()?;
    Ok(Self {
      http,
      config,
      current: Arc::new(Mutex::new(None)),
      events: broadcast::channel(16).0,
    })
  }

  pub(crate) fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  pub(crate) fn current_lock(&self) -> MutexGuard<'_, Option<AuthSession>> {
    // A poisoned lock only means another task panicked mid-swap; the
    // Option inside is still usable.
    self.current.lock().unwrap_or_else(|e| e.into_inner())
  }

  /// Attach the API key and, when signed in, the caller's bearer token.
  pub(crate) fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    let req = req.header("apikey", &self.config.api_key);
    match self.current_lock().as_ref() {
      Some(session) => req.bearer_auth(&session.access_token),
      None => req,
    }
  }

  /// The caller's bearer token, required for privileged calls.
  pub(crate) fn bearer(&self) -> Result<String> {
    self
      .current_lock()
      .as_ref()
      .map(|s| s.access_token.clone())
      .ok_or(ClientError::NotSignedIn)
  }

  /// Turn a non-success response into a [`ClientError::Status`], pulling
  /// the message out of the JSON body when there is one.
  pub(crate) async fn error_for(resp: reqwest::Response) -> ClientError {
    let status = resp.status();
    let url = resp.url().path().to_owned();
    let message = resp
      .json::<serde_json::Value>()
      .await
      .ok()
      .and_then(|v| {
        ["error", "error_description", "msg", "message"]
          .iter()
          .find_map(|k| v.get(k).and_then(|m| m.as_str()).map(str::to_owned))
      })
      .unwrap_or_else(|| status.to_string());
    tracing::debug!(%status, path = %url, %message, "backend request failed");
    ClientError::Status { status, message }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn backend() -> HttpBackend {
    HttpBackend::new(ClientConfig {
      base_url: "https://vitrine.example.org/".into(),
      api_key:  "public-key".into(),
    })
    .unwrap()
  }

  #[test]
  fn url_joins_without_double_slash() {
    let b = backend();
    assert_eq!(
      b.url("/rest/profiles"),
      "https://vitrine.example.org/rest/profiles"
    );
  }

  #[test]
  fn bearer_requires_a_session() {
    let b = backend();
    assert!(matches!(b.bearer(), Err(ClientError::NotSignedIn)));
  }
}
