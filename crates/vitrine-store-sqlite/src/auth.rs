//! Auth-side trait implementations for [`SqliteBackend`]: password-grant
//! sessions, token introspection, and the elevated admin directory.
//!
//! Passwords are stored as argon2 PHC strings. Bearer tokens are 32 random
//! bytes, base64-encoded for the caller and stored only as SHA-256 digests.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use chrono::{Duration, Utc};
use rand_core::{OsRng, RngCore as _};
use rusqlite::OptionalExtension as _;
use sha2::{Digest as _, Sha256};
use uuid::Uuid;
use vitrine_core::{
  account::{AccountFunctions, AdminDirectory, CreatedAccount, DeleteAction, NewAccount},
  auth::{AuthEvent, AuthSession, AuthTransport, Identity, SignUp, TokenIntrospection},
  event::{ChangeAction, Table},
  profile::Profile,
  store::CollectionStore as _,
};

use crate::{encode::{encode_dt, encode_uuid}, Error, Result, SqliteBackend};

/// How long a bearer token stays valid.
const TOKEN_TTL_HOURS: i64 = 12;

// ─── Hashing helpers ─────────────────────────────────────────────────────────

fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| Error::PasswordHash(e.to_string()))?
      .to_string(),
  )
}

fn verify_password(hash: &str, password: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(hash) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

fn new_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  B64.encode(bytes)
}

fn token_digest(token: &str) -> String {
  hex::encode(Sha256::digest(token.as_bytes()))
}

// ─── Backend helpers ─────────────────────────────────────────────────────────

impl SqliteBackend {
  fn current_lock(&self) -> std::sync::MutexGuard<'_, Option<AuthSession>> {
    // A poisoned lock only means another thread panicked mid-swap; the
    // Option inside is still usable.
    self.current.lock().unwrap_or_else(|e| e.into_inner())
  }

  async fn email_taken(&self, email: &str) -> Result<bool> {
    let email = email.to_owned();
    let taken: bool = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM accounts WHERE email = ?1",
              rusqlite::params![email],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(taken)
  }

  /// Insert the account row and upsert its profile in one transaction.
  /// Returns the resulting profile.
  async fn insert_account(
    &self,
    user_id: Uuid,
    email: &str,
    password_hash: String,
    name: &str,
    role: vitrine_core::role::Role,
    department: Option<String>,
  ) -> Result<Profile> {
    let now = Utc::now();
    let profile = Profile {
      user_id,
      name: name.to_owned(),
      email: email.to_owned(),
      role,
      department,
      is_active: true,
      created_at: now,
      last_login: None,
    };

    let id_str   = encode_uuid(user_id);
    let at_str   = encode_dt(now);
    let role_str = role.to_string();
    let p        = profile.clone();

    self
      .conn
      .call(move |conn| {
        // Account and profile land together or not at all; a failed
        // profile write must not leave an orphaned identity behind.
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO accounts (user_id, email, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, p.email, password_hash, at_str],
        )?;
        tx.execute(
          "INSERT INTO profiles
             (user_id, name, email, role, department, is_active, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
           ON CONFLICT(user_id) DO UPDATE SET
             name = excluded.name, email = excluded.email,
             role = excluded.role, department = excluded.department,
             is_active = 1",
          rusqlite::params![
            id_str, p.name, p.email, role_str, p.department, at_str,
          ],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    self.feeds.emit(
      Table::Profiles,
      ChangeAction::Insert,
      user_id,
      None,
      Some(serde_json::to_value(&profile)?),
    );
    Ok(profile)
  }
}

// ─── AuthTransport impl ──────────────────────────────────────────────────────

impl AuthTransport for SqliteBackend {
  type Error = Error;

  async fn sign_in_with_password(
    &self,
    email: &str,
    password: &str,
  ) -> Result<AuthSession> {
    let email_owned = email.to_owned();
    let row: Option<(String, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, password_hash FROM accounts WHERE email = ?1",
              rusqlite::params![email_owned],
              |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?,
        )
      })
      .await?;

    let Some((user_id_str, password_hash)) = row else {
      return Err(vitrine_core::Error::InvalidCredentials.into());
    };
    if !verify_password(&password_hash, password) {
      return Err(vitrine_core::Error::InvalidCredentials.into());
    }

    let user_id = Uuid::parse_str(&user_id_str)?;
    let mut profile = self
      .get_profile(user_id)
      .await?
      .ok_or(vitrine_core::Error::ProfileNotFound(user_id))?;
    if !profile.is_active {
      return Err(vitrine_core::Error::AccountDisabled(user_id).into());
    }

    let now = Utc::now();
    let token = new_token();
    let digest = token_digest(&token);
    let expires_at = now + Duration::hours(TOKEN_TTL_HOURS);

    let id_str      = encode_uuid(user_id);
    let now_str     = encode_dt(now);
    let expires_str = encode_dt(expires_at);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![digest, id_str, now_str, expires_str],
        )?;
        conn.execute(
          "UPDATE profiles SET last_login = ?2 WHERE user_id = ?1",
          rusqlite::params![id_str, now_str],
        )?;
        Ok(())
      })
      .await?;

    profile.last_login = Some(now);
    self.feeds.emit(
      Table::Profiles,
      ChangeAction::Update,
      user_id,
      None,
      Some(serde_json::to_value(&profile)?),
    );

    let session = AuthSession {
      identity: Identity {
        user_id,
        email: profile.email.clone(),
      },
      access_token: token,
      expires_at,
    };
    *self.current_lock() = Some(session.clone());
    let _ = self.events.send(AuthEvent::SignedIn(session.clone()));
    Ok(session)
  }

  async fn sign_up(&self, input: SignUp) -> Result<Identity> {
    if self.email_taken(&input.email).await? {
      return Err(vitrine_core::Error::EmailTaken(input.email).into());
    }

    let user_id = Uuid::new_v4();
    let password_hash = hash_password(&input.password)?;
    let profile = self
      .insert_account(
        user_id,
        &input.email,
        password_hash,
        &input.name,
        input.role,
        input.department,
      )
      .await?;

    Ok(Identity {
      user_id,
      email: profile.email,
    })
  }

  async fn sign_out(&self, access_token: &str) -> Result<()> {
    let digest = token_digest(access_token);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM sessions WHERE token_hash = ?1",
          rusqlite::params![digest],
        )?)
      })
      .await?;

    if deleted == 0 {
      return Err(vitrine_core::Error::AlreadySignedOut.into());
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
    let identity = self
      .resolve_token(access_token)
      .await?
      .ok_or(vitrine_core::Error::SessionExpired)?;

    let password_hash = hash_password(new_password)?;
    let id_str = encode_uuid(identity.user_id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE accounts SET password_hash = ?2 WHERE user_id = ?1",
          rusqlite::params![id_str, password_hash],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  fn events(&self) -> tokio::sync::broadcast::Receiver<AuthEvent> {
    self.events.subscribe()
  }
}

// ─── TokenIntrospection impl ─────────────────────────────────────────────────

impl TokenIntrospection for SqliteBackend {
  type Error = Error;

  async fn resolve_token(&self, access_token: &str) -> Result<Option<Identity>> {
    let digest = token_digest(access_token);
    let now_str = encode_dt(Utc::now());

    let row: Option<(String, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT a.user_id, a.email
               FROM sessions s
               JOIN accounts a ON a.user_id = s.user_id
               WHERE s.token_hash = ?1 AND s.expires_at > ?2",
              rusqlite::params![digest, now_str],
              |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?,
        )
      })
      .await?;

    row
      .map(|(user_id_str, email)| {
        Ok(Identity {
          user_id: Uuid::parse_str(&user_id_str)?,
          email,
        })
      })
      .transpose()
  }
}

// ─── AdminDirectory impl ─────────────────────────────────────────────────────

impl AdminDirectory for SqliteBackend {
  type Error = Error;

  async fn create_account(
    &self,
    account: &NewAccount,
    temp_password: &str,
  ) -> Result<Profile> {
    if self.email_taken(&account.email).await? {
      return Err(vitrine_core::Error::EmailTaken(account.email.clone()).into());
    }

    let password_hash = hash_password(temp_password)?;
    self
      .insert_account(
        Uuid::new_v4(),
        &account.email,
        password_hash,
        &account.name,
        account.role,
        account.department.clone(),
      )
      .await
  }

  async fn delete_account(&self, user_id: Uuid) -> Result<()> {
    let id_str = encode_uuid(user_id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM accounts WHERE user_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if deleted == 0 {
      return Err(vitrine_core::Error::ProfileNotFound(user_id).into());
    }

    self
      .feeds
      .emit(Table::Profiles, ChangeAction::Delete, user_id, None, None);
    Ok(())
  }
}

// ─── AccountFunctions impl ───────────────────────────────────────────────────

/// The in-process privileged path, for self-hosted deployments and tests.
/// Deployed setups go through `vitrine-client`'s HTTP function client and
/// the `vitrine-admin-api` service instead.
impl AccountFunctions for SqliteBackend {
  type Error = Error;

  async fn create_user(
    &self,
    account: &NewAccount,
    temp_password: &str,
  ) -> Result<CreatedAccount> {
    let profile = self.create_account(account, temp_password).await?;
    Ok(CreatedAccount::from(profile))
  }

  async fn delete_user(&self, user_id: Uuid) -> Result<DeleteAction> {
    self.delete_account(user_id).await?;
    Ok(DeleteAction::Deleted)
  }
}
