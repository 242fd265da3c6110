//! Roles, the fixed capability table, and the authorization gate.
//!
//! The role set is closed; anything unrecognised degrades to [`Role::Viewer`].
//! Permission checks here are advisory only — they gate what the UI offers,
//! not what the backend accepts. Enforcement lives behind the store.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

// ─── Role ────────────────────────────────────────────────────────────────────

/// The closed set of roles a profile can hold.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Admin,
  Curator,
  Researcher,
  #[default]
  Viewer,
}

impl Role {
  /// Parse a role string, degrading to [`Role::Viewer`] for anything outside
  /// the closed set. Used wherever role values cross a trust boundary
  /// (database rows, wire payloads).
  pub fn parse_or_viewer(s: &str) -> Self {
    s.parse().unwrap_or(Role::Viewer)
  }

  /// The fixed capability table. Pure and total; no runtime mutation.
  pub fn permissions(self) -> PermissionSet {
    match self {
      Role::Admin => PermissionSet {
        can_create:       true,
        can_edit:         true,
        can_delete:       true,
        can_export:       true,
        can_manage_users: true,
      },
      Role::Curator => PermissionSet {
        can_create:       true,
        can_edit:         true,
        can_delete:       false,
        can_export:       true,
        can_manage_users: false,
      },
      Role::Researcher => PermissionSet {
        can_create:       false,
        can_edit:         false,
        can_delete:       false,
        can_export:       true,
        can_manage_users: false,
      },
      Role::Viewer => PermissionSet::NONE,
    }
  }
}

// ─── PermissionSet ───────────────────────────────────────────────────────────

/// Derived, immutable capability flags for one role. Never persisted;
/// recomputed from the role on every profile change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
  pub can_create:       bool,
  pub can_edit:         bool,
  pub can_delete:       bool,
  pub can_export:       bool,
  pub can_manage_users: bool,
}

impl PermissionSet {
  /// The viewer set — every capability denied. Also the fallback for a
  /// missing or unrecognised role.
  pub const NONE: Self = Self {
    can_create:       false,
    can_edit:         false,
    can_delete:       false,
    can_export:       false,
    can_manage_users: false,
  };

  /// The authorization gate: synchronous, no I/O.
  pub fn allows(&self, permission: Permission) -> bool {
    match permission {
      Permission::Create => self.can_create,
      Permission::Edit => self.can_edit,
      Permission::Delete => self.can_delete,
      Permission::Export => self.can_export,
      Permission::ManageUsers => self.can_manage_users,
    }
  }
}

impl Default for PermissionSet {
  fn default() -> Self { Self::NONE }
}

/// The five capability names the gate understands.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
  Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Permission {
  Create,
  Edit,
  Delete,
  Export,
  ManageUsers,
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::*;

  #[test]
  fn capability_table_full_truth_table() {
    use Permission::*;
    // (role, permission) -> expected, all 20 combinations.
    let expected = [
      (Role::Admin, Create, true),
      (Role::Admin, Edit, true),
      (Role::Admin, Delete, true),
      (Role::Admin, Export, true),
      (Role::Admin, ManageUsers, true),
      (Role::Curator, Create, true),
      (Role::Curator, Edit, true),
      (Role::Curator, Delete, false),
      (Role::Curator, Export, true),
      (Role::Curator, ManageUsers, false),
      (Role::Researcher, Create, false),
      (Role::Researcher, Edit, false),
      (Role::Researcher, Delete, false),
      (Role::Researcher, Export, true),
      (Role::Researcher, ManageUsers, false),
      (Role::Viewer, Create, false),
      (Role::Viewer, Edit, false),
      (Role::Viewer, Delete, false),
      (Role::Viewer, Export, false),
      (Role::Viewer, ManageUsers, false),
    ];

    for (role, permission, want) in expected {
      assert_eq!(
        role.permissions().allows(permission),
        want,
        "{role} / {permission}"
      );
    }

    // The table above must cover the whole closed set.
    assert_eq!(Role::iter().count() * Permission::iter().count(), expected.len());
  }

  #[test]
  fn unknown_role_degrades_to_viewer() {
    assert_eq!(Role::parse_or_viewer("superuser"), Role::Viewer);
    assert_eq!(Role::parse_or_viewer(""), Role::Viewer);
    assert_eq!(Role::parse_or_viewer("curator"), Role::Curator);
    assert_eq!(
      Role::parse_or_viewer("intern").permissions(),
      PermissionSet::NONE
    );
  }

  #[test]
  fn role_round_trips_through_display() {
    for role in Role::iter() {
      assert_eq!(Role::parse_or_viewer(&role.to_string()), role);
    }
  }
}
