//! Profile — the domain-level user record, one per authenticated identity.
//!
//! Profiles are created alongside identities (by the signup path or the
//! privileged account function) and are never deleted in the common path;
//! "deletion" is a cascade from the identity or an `is_active` flip.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::Role;

/// The domain-level user record. `user_id` equals the identity id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
  pub user_id:    Uuid,
  pub name:       String,
  pub email:      String,
  pub role:       Role,
  pub department: Option<String>,
  /// Deactivated profiles are refused new sign-ins; sessions already open
  /// are left to expire.
  pub is_active:  bool,
  pub created_at: DateTime<Utc>,
  pub last_login: Option<DateTime<Utc>>,
}
