//! [`AccountFunctions`] implementation over the deployed privileged
//! account functions (`vitrine-admin-api`).
//!
//! The calling admin's bearer token authenticates the request; the
//! function executes with its own elevated credential. Nothing in the
//! response ever carries a session, so the caller's cannot be replaced.

use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use vitrine_core::account::{
  AccountFunctions, CreatedAccount, DeleteAction, NewAccount,
};

use crate::{HttpBackend, Result};

#[derive(Debug, Deserialize)]
struct CreateUserResponse {
  user: CreatedAccount,
}

#[derive(Debug, Deserialize)]
struct DeleteUserResponse {
  action: DeleteAction,
}

impl AccountFunctions for HttpBackend {
  type Error = crate::ClientError;

  async fn create_user(
    &self,
    account: &NewAccount,
    temp_password: &str,
  ) -> Result<CreatedAccount> {
    let token = self.bearer()?;
    let resp = self
      .http
      .post(self.url("/functions/create-user"))
      .header("apikey", &self.config.api_key)
      .bearer_auth(token)
      .json(&json!({
        "name": account.name,
        "email": account.email,
        "department": account.department,
        "role": account.role,
        "temp_password": temp_password,
      }))
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(Self::error_for(resp).await);
    }
    let body: CreateUserResponse = resp.json().await?;
    Ok(body.user)
  }

  async fn delete_user(&self, user_id: Uuid) -> Result<DeleteAction> {
    let token = self.bearer()?;
    let resp = self
      .http
      .post(self.url("/functions/delete-user"))
      .header("apikey", &self.config.api_key)
      .bearer_auth(token)
      .json(&json!({ "user_id": user_id }))
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(Self::error_for(resp).await);
    }
    let body: DeleteUserResponse = resp.json().await?;
    Ok(body.action)
  }
}
