//! Reference-counted change-feed subscriptions.
//!
//! The manager opens at most one underlying feed stream per table and fans
//! events out to every logical subscriber, so N mounted views cost one
//! channel, not N. When the last subscriber for a table goes away the pump
//! task is aborted and the entry removed.
//!
//! Failure semantics are deliberate silence: if the underlying stream
//! closes (transport reconnect, backend gone), subscribers simply stop
//! receiving events. Refreshes are idempotent full re-fetches, so a lagged
//! receiver skips ahead and only pays staleness until the next event.

use std::{
  collections::HashMap,
  sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard,
  },
};

use tokio::sync::broadcast;
use vitrine_core::event::{ChangeAction, ChangeEvent, ChangeFeed, Table};

// ─── Hooks ───────────────────────────────────────────────────────────────────

pub type Hook = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Per-subscriber callbacks; each is optional. The event payload is a
/// refresh trigger only — never apply it as a patch.
#[derive(Clone, Default)]
pub struct Hooks {
  pub on_insert: Option<Hook>,
  pub on_update: Option<Hook>,
  pub on_delete: Option<Hook>,
}

impl Hooks {
  /// The same callback for all three actions — the common "just re-fetch"
  /// shape.
  pub fn on_any(f: impl Fn(&ChangeEvent) + Send + Sync + 'static) -> Self {
    let hook: Hook = Arc::new(f);
    Self {
      on_insert: Some(Arc::clone(&hook)),
      on_update: Some(Arc::clone(&hook)),
      on_delete: Some(hook),
    }
  }

  fn dispatch(&self, event: &ChangeEvent) {
    let hook = match event.action {
      ChangeAction::Insert => &self.on_insert,
      ChangeAction::Update => &self.on_update,
      ChangeAction::Delete => &self.on_delete,
    };
    if let Some(hook) = hook {
      hook(event);
    }
  }
}

// ─── Manager ─────────────────────────────────────────────────────────────────

struct Fanout {
  subscribers: HashMap<u64, Hooks>,
  pump:        tokio::task::JoinHandle<()>,
}

type Tables = Arc<Mutex<HashMap<Table, Fanout>>>;

fn lock_tables(tables: &Tables) -> MutexGuard<'_, HashMap<Table, Fanout>> {
  tables.lock().unwrap_or_else(|e| e.into_inner())
}

/// Shares one feed stream per table across any number of subscribers.
pub struct SubscriptionManager<F> {
  feed:    Arc<F>,
  tables:  Tables,
  next_id: AtomicU64,
}

impl<F> SubscriptionManager<F>
where
  F: ChangeFeed + 'static,
{
  pub fn new(feed: Arc<F>) -> Self {
    Self {
      feed,
      tables: Arc::new(Mutex::new(HashMap::new())),
      next_id: AtomicU64::new(0),
    }
  }

  /// Register `hooks` for `table`, opening the underlying stream if this
  /// is the table's first subscriber. Dropping the returned guard (or
  /// calling [`Subscription::unsubscribe`]) deregisters.
  pub fn subscribe(&self, table: Table, hooks: Hooks) -> Subscription {
    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
    let mut tables = lock_tables(&self.tables);

    let fanout = tables.entry(table).or_insert_with(|| Fanout {
      subscribers: HashMap::new(),
      pump:        spawn_pump(self.feed.watch(table), table, Arc::clone(&self.tables)),
    });
    fanout.subscribers.insert(id, hooks);

    Subscription {
      tables: Arc::clone(&self.tables),
      table,
      id,
    }
  }

  /// Live subscriber count for a table (diagnostics and tests).
  pub fn subscriber_count(&self, table: Table) -> usize {
    lock_tables(&self.tables)
      .get(&table)
      .map(|f| f.subscribers.len())
      .unwrap_or(0)
  }
}

/// One pump per table: drain the broadcast stream and fan out. The hooks
/// are cloned out under the lock and invoked after it is released, so a
/// hook may itself subscribe or unsubscribe.
fn spawn_pump(
  mut rx: broadcast::Receiver<ChangeEvent>,
  table: Table,
  tables: Tables,
) -> tokio::task::JoinHandle<()> {
  tokio::spawn(async move {
    loop {
      match rx.recv().await {
        Ok(event) => {
          let hooks: Vec<Hooks> = lock_tables(&tables)
            .get(&table)
            .map(|f| f.subscribers.values().cloned().collect())
            .unwrap_or_default();
          for hook in hooks {
            hook.dispatch(&event);
          }
        }
        Err(broadcast::error::RecvError::Lagged(skipped)) => {
          tracing::debug!(%table, skipped, "change feed lagged; skipping ahead");
        }
        Err(broadcast::error::RecvError::Closed) => {
          tracing::debug!(%table, "change feed closed; going silent");
          break;
        }
      }
    }
  })
}

// ─── Subscription guard ──────────────────────────────────────────────────────

/// Handle for one logical subscription. Unsubscribing is idempotent and
/// never fails, even after the underlying channel has closed.
pub struct Subscription {
  tables: Tables,
  table:  Table,
  id:     u64,
}

impl Subscription {
  pub fn unsubscribe(&self) {
    let mut tables = lock_tables(&self.tables);
    let Some(fanout) = tables.get_mut(&self.table) else {
      return;
    };
    fanout.subscribers.remove(&self.id);
    if fanout.subscribers.is_empty() {
      if let Some(fanout) = tables.remove(&self.table) {
        fanout.pump.abort();
      }
    }
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    self.unsubscribe();
  }
}
