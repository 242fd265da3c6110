//! [`AuthTransport`] implementation over the hosted auth endpoints.
//!
//! The backend's own events cannot reach us without a live socket, so the
//! event stream carries the transitions this client performs itself —
//! which is exactly what the session layer needs to stay converged.

use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;
use uuid::Uuid;
use vitrine_core::auth::{AuthEvent, AuthSession, AuthTransport, Identity, SignUp};

use crate::{ClientError, HttpBackend, Result};

#[derive(Debug, Deserialize)]
struct WireUser {
  id:    Uuid,
  email: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
  access_token: String,
  /// Lifetime in seconds.
  expires_in:   i64,
  user:         WireUser,
}

impl AuthTransport for HttpBackend {
  type Error = ClientError;

  async fn sign_in_with_password(
    &self,
    email: &str,
    password: &str,
  ) -> Result<AuthSession> {
    let resp = self
      .authed(self.http.post(self.url("/auth/token")))
      .query(&[("grant_type", "password")])
      .json(&json!({ "email": email, "password": password }))
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(Self::error_for(resp).await);
    }
    let token: TokenResponse = resp.json().await?;

    let session = AuthSession {
      identity:     Identity {
        user_id: token.user.id,
        email:   token.user.email,
      },
      access_token: token.access_token,
      expires_at:   Utc::now() + Duration::seconds(token.expires_in),
    };
    *self.current_lock() = Some(session.clone());
    let _ = self.events.send(AuthEvent::SignedIn(session.clone()));
    Ok(session)
  }

  async fn sign_up(&self, input: SignUp) -> Result<Identity> {
    let body = json!({
      "email": input.email,
      "password": input.password,
      "data": {
        "name": input.name,
        "department": input.department,
        "role": input.role,
      },
    });

    let resp = self
      .authed(self.http.post(self.url("/auth/signup")))
      .json(&body)
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(Self::error_for(resp).await);
    }
    let user: WireUser = resp.json().await?;
    Ok(Identity {
      user_id: user.id,
      email:   user.email,
    })
  }

  async fn sign_out(&self, access_token: &str) -> Result<()> {
    let resp = self
      .http
      .post(self.url("/auth/logout"))
      .header("apikey", &self.config.api_key)
      .bearer_auth(access_token)
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      // The desired end state (signed out) already holds.
      if status.as_u16() == 401 || status.as_u16() == 404 {
        return Err(ClientError::AlreadySignedOut);
      }
      return Err(Self::error_for(resp).await);
    }

    let mut current = self.current_lock();
    if current
      .as_ref()
      .is_some_and(|s| s.access_token == access_token)
    {
      *current = None;
      drop(current);
      let _ = self.events.send(AuthEvent::SignedOut);
    }
    Ok(())
  }

  async fn session(&self) -> Result<Option<AuthSession>> {
    let mut current = self.current_lock();
    if current
      .as_ref()
      .is_some_and(|s| s.is_expired(Utc::now()))
    {
      *current = None;
    }
    Ok(current.clone())
  }

  async fn update_password(
    &self,
    access_token: &str,
    new_password: &str,
  ) -> Result<()> {
    let resp = self
      .http
      .put(self.url("/auth/user"))
      .header("apikey", &self.config.api_key)
      .bearer_auth(access_token)
      .json(&json!({ "password": new_password }))
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(Self::error_for(resp).await);
    }
    Ok(())
  }

  fn events(&self) -> broadcast::Receiver<AuthEvent> {
    self.events.subscribe()
  }
}
