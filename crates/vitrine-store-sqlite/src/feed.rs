//! In-process change feed: one broadcast channel per watched table.
//!
//! Mutation paths call [`FeedHub::emit`] after the row is committed. Sends
//! with no live receivers are fine; the event is simply dropped.

use tokio::sync::broadcast;
use uuid::Uuid;
use vitrine_core::event::{ChangeAction, ChangeEvent, Table};

const CHANNEL_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct FeedHub {
  profiles:  broadcast::Sender<ChangeEvent>,
  artifacts: broadcast::Sender<ChangeEvent>,
  reports:   broadcast::Sender<ChangeEvent>,
  history:   broadcast::Sender<ChangeEvent>,
}

impl FeedHub {
  pub fn new() -> Self {
    let channel = || broadcast::channel(CHANNEL_CAPACITY).0;
    Self {
      profiles:  channel(),
      artifacts: channel(),
      reports:   channel(),
      history:   channel(),
    }
  }

  pub fn sender(&self, table: Table) -> &broadcast::Sender<ChangeEvent> {
    match table {
      Table::Profiles => &self.profiles,
      Table::Artifacts => &self.artifacts,
      Table::Reports => &self.reports,
      Table::ArtifactHistory => &self.history,
    }
  }

  pub fn emit(
    &self,
    table: Table,
    action: ChangeAction,
    row_id: Uuid,
    old: Option<serde_json::Value>,
    new: Option<serde_json::Value>,
  ) {
    let _ = self.sender(table).send(ChangeEvent {
      table,
      action,
      row_id,
      old,
      new,
    });
  }
}

impl Default for FeedHub {
  fn default() -> Self { Self::new() }
}
