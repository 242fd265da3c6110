//! The privileged account-management seams.
//!
//! Creating or hard-deleting another user's credentials needs elevated
//! privilege a signed-in admin's client must never hold. [`AccountFunctions`]
//! is the narrow client-side view of that boundary; [`AdminDirectory`] is
//! the elevated handle the isolated server-side function executes with.
//! Nothing implementing [`AdminDirectory`] may ever touch the calling
//! admin's session.

use std::future::Future;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{profile::Profile, role::Role};

// ─── Values ──────────────────────────────────────────────────────────────────

/// An admin's request to provision a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
  pub name:       String,
  pub email:      String,
  pub department: Option<String>,
  pub role:       Role,
}

/// What the privileged function reports back on success. The temporary
/// password is never echoed here; the caller already holds it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedAccount {
  pub user_id:    Uuid,
  pub email:      String,
  pub name:       String,
  pub role:       Role,
  pub department: Option<String>,
}

impl From<Profile> for CreatedAccount {
  fn from(p: Profile) -> Self {
    Self {
      user_id:    p.user_id,
      email:      p.email,
      name:       p.name,
      role:       p.role,
      department: p.department,
    }
  }
}

/// How a delete request was honoured. Both outcomes converge to the same
/// visible state: the user is no longer usable.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
  Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeleteAction {
  /// Identity hard-deleted; the profile row cascaded away.
  Deleted,
  /// Hard delete unavailable; the profile was deactivated instead.
  Deactivated,
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Client-side view of the privileged account function.
pub trait AccountFunctions: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn create_user<'a>(
    &'a self,
    account: &'a NewAccount,
    temp_password: &'a str,
  ) -> impl Future<Output = Result<CreatedAccount, Self::Error>> + Send + 'a;

  fn delete_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<DeleteAction, Self::Error>> + Send + '_;
}

/// The elevated server-side handle: direct identity creation and deletion,
/// bypassing row-level policy. Only the isolated account function holds one.
pub trait AdminDirectory: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create the identity and its profile row. If a profile row already
  /// exists for the email's identity (e.g. trigger-created), it is
  /// overwritten with the submitted fields and activated.
  fn create_account<'a>(
    &'a self,
    account: &'a NewAccount,
    temp_password: &'a str,
  ) -> impl Future<Output = Result<Profile, Self::Error>> + Send + 'a;

  /// Hard-delete the identity; sessions and profile rows cascade.
  fn delete_account(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
