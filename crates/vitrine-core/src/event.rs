//! Change-feed events and the feed seam.
//!
//! A change event is a refresh trigger, never a patch: consumers re-fetch
//! the affected collection wholesale. This sidesteps ordering and merge
//! logic at the cost of redundant reads.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use tokio::sync::broadcast;
use uuid::Uuid;

// ─── Tables ──────────────────────────────────────────────────────────────────

/// The watched tables. Closed set; one broadcast stream each.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
  Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Table {
  Profiles,
  Artifacts,
  Reports,
  ArtifactHistory,
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
  Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChangeAction {
  Insert,
  Update,
  Delete,
}

/// One remote row change. `old`/`new` carry whatever the backend chose to
/// include; consumers must not apply them as patches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
  pub table:  Table,
  pub action: ChangeAction,
  pub row_id: Uuid,
  pub old:    Option<serde_json::Value>,
  pub new:    Option<serde_json::Value>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// One logical change stream per table.
///
/// A backend that cannot deliver live changes simply hands out a receiver
/// that never fires; feed failure is silence, not an error.
pub trait ChangeFeed: Send + Sync {
  fn watch(&self, table: Table) -> broadcast::Receiver<ChangeEvent>;
}
