//! Account lifecycle operations: provisioning, role changes, deactivation,
//! and deletion.
//!
//! Creating or hard-deleting credentials runs through the privileged
//! account functions — an isolated execution context with its own elevated
//! credential. The calling admin's session is never handed over, so it can
//! never be swapped for the newly created user's.

use rand_core::{OsRng, RngCore as _};
use uuid::Uuid;
use vitrine_core::{
  account::{AccountFunctions, CreatedAccount, DeleteAction, NewAccount},
  auth::AuthTransport,
  profile::Profile,
  role::Role,
  store::CollectionStore,
  ClassifyError,
};

use crate::{
  error::{Result, SessionError},
  session::SessionStore,
};

// ─── Temporary passwords ─────────────────────────────────────────────────────

/// The alphabet temporary passwords are drawn from: mixed-case letters,
/// digits, and eight symbols.
pub const TEMP_PASSWORD_ALPHABET: &[u8] =
  b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*";

pub const TEMP_PASSWORD_LEN: usize = 12;

/// Generate a temporary password from the OS RNG. Rejection sampling keeps
/// every alphabet character equally likely.
pub fn generate_temp_password() -> String {
  // 70 alphabet characters; 210 = 3 * 70 is the largest multiple that
  // fits a byte, so bytes >= 210 are rejected.
  const LIMIT: u8 = (u8::MAX / 70) * 70;

  let mut out = String::with_capacity(TEMP_PASSWORD_LEN);
  let mut buf = [0u8; 32];
  while out.len() < TEMP_PASSWORD_LEN {
    OsRng.fill_bytes(&mut buf);
    for &byte in &buf {
      if out.len() == TEMP_PASSWORD_LEN {
        break;
      }
      if byte < LIMIT {
        out.push(TEMP_PASSWORD_ALPHABET[(byte % 70) as usize] as char);
      }
    }
  }
  out
}

/// The one-time result of provisioning a user. The temporary password is
/// surfaced here exactly once — it is never persisted and never appears in
/// the roster.
#[derive(Debug, Clone)]
pub struct ProvisionedAccount {
  pub account:       CreatedAccount,
  pub temp_password: String,
}

// ─── Operations ──────────────────────────────────────────────────────────────

impl<A, C, F> SessionStore<A, C, F>
where
  A: AuthTransport + 'static,
  A::Error: ClassifyError,
  C: CollectionStore + 'static,
  C::Error: ClassifyError,
  F: AccountFunctions + 'static,
  F::Error: ClassifyError,
{
  /// Provision a new user through the privileged function and refresh the
  /// roster. Returns the generated temporary password exactly once.
  pub async fn create_user(
    &self,
    name: &str,
    email: &str,
    department: Option<String>,
    role: Role,
  ) -> Result<ProvisionedAccount> {
    if name.trim().is_empty() {
      return Err(SessionError::MissingField("name"));
    }
    if email.trim().is_empty() {
      return Err(SessionError::MissingField("email"));
    }

    let temp_password = generate_temp_password();
    let account = NewAccount {
      name:       name.to_owned(),
      email:      email.to_owned(),
      department,
      role,
    };

    let created = self
      .funcs
      .create_user(&account, &temp_password)
      .await
      .map_err(SessionError::from_backend)?;

    self.refresh_roster_after("create_user").await;
    Ok(ProvisionedAccount {
      account: created,
      temp_password,
    })
  }

  /// Change a user's role, then refresh the roster.
  pub async fn update_role(&self, user_id: Uuid, role: Role) -> Result<Profile> {
    let profile = self
      .store
      .update_role(user_id, role)
      .await
      .map_err(SessionError::from_backend)?;
    self.refresh_roster_after("update_role").await;
    Ok(profile)
  }

  /// Flip a user's active flag, then refresh the roster. Two calls in
  /// sequence restore the original state.
  pub async fn toggle_active(&self, user_id: Uuid) -> Result<Profile> {
    let current = self
      .store
      .get_profile(user_id)
      .await
      .map_err(SessionError::from_backend)?
      .ok_or_else(|| {
        SessionError::from_backend(vitrine_core::Error::ProfileNotFound(user_id))
      })?;

    let profile = self
      .store
      .set_active(user_id, !current.is_active)
      .await
      .map_err(SessionError::from_backend)?;
    self.refresh_roster_after("toggle_active").await;
    Ok(profile)
  }

  /// Delete a user: hard delete through the privileged function first,
  /// deactivation as the fallback. Either way the user ends up unusable —
  /// never present-and-active in the roster afterwards.
  pub async fn delete_user(&self, user_id: Uuid) -> Result<DeleteAction> {
    let action = match self.funcs.delete_user(user_id).await {
      Ok(action) => action,
      Err(e) => {
        tracing::warn!(
          error = %e, %user_id,
          "hard delete unavailable; deactivating instead"
        );
        self
          .store
          .set_active(user_id, false)
          .await
          .map_err(SessionError::from_backend)?;
        DeleteAction::Deactivated
      }
    };

    self.refresh_roster_after("delete_user").await;
    Ok(action)
  }

  /// The mutation already succeeded; a failed refresh only delays the
  /// roster until the next change-feed event, so it is logged, not raised.
  async fn refresh_roster_after(&self, operation: &'static str) {
    if let Err(e) = self.refresh_roster().await {
      tracing::warn!(error = %e, operation, "roster refresh failed");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn temp_password_has_documented_shape() {
    for _ in 0..64 {
      let password = generate_temp_password();
      assert_eq!(password.len(), TEMP_PASSWORD_LEN);
      assert!(
        password
          .bytes()
          .all(|b| TEMP_PASSWORD_ALPHABET.contains(&b)),
        "unexpected character in {password:?}"
      );
    }
  }

  #[test]
  fn temp_passwords_are_not_repeated() {
    // 70^12 possibilities; two draws colliding means the RNG is broken.
    assert_ne!(generate_temp_password(), generate_temp_password());
  }
}
