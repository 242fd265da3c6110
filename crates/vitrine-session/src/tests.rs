//! Integration tests for the session core against the SQLite backend.

use std::{
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  },
  time::Duration,
};

use tokio::time::{sleep, timeout};
use uuid::Uuid;
use vitrine_core::{
  account::{AccountFunctions, CreatedAccount, DeleteAction, NewAccount},
  auth::{AuthTransport, SignUp},
  event::Table,
  role::{Permission, Role},
  store::CollectionStore,
  ClassifyError, ErrorClass,
};
use vitrine_store_sqlite::SqliteBackend;

use crate::{
  accounts::{TEMP_PASSWORD_ALPHABET, TEMP_PASSWORD_LEN},
  Hooks, SessionError, SessionStore, SubscriptionManager,
};

const PASSWORD: &str = "hunter2hunter2";

async fn backend() -> Arc<SqliteBackend> {
  Arc::new(
    SqliteBackend::open_in_memory()
      .await
      .expect("in-memory backend"),
  )
}

/// One SQLite backend plays all three collaborators.
fn session(
  b: &Arc<SqliteBackend>,
) -> SessionStore<SqliteBackend, SqliteBackend, SqliteBackend> {
  SessionStore::new(Arc::clone(b), Arc::clone(b), Arc::clone(b))
}

async fn seed(b: &SqliteBackend, name: &str, email: &str, role: Role) {
  b.sign_up(SignUp {
    name: name.into(),
    email: email.into(),
    password: PASSWORD.into(),
    department: None,
    role,
  })
  .await
  .expect("seed user");
}

// ─── Session lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn start_without_session_resolves_loading() {
  let b = backend().await;
  let store = session(&b);
  assert!(store.snapshot().is_loading);

  store.start().await;
  let snap = store.snapshot();
  assert!(!snap.is_loading);
  assert!(!snap.is_authenticated);
  assert!(snap.profile.is_none());
}

#[tokio::test]
async fn login_derives_permissions_from_role() {
  let b = backend().await;
  seed(&b, "Clara", "clara@museum.test", Role::Curator).await;
  let store = session(&b);
  store.start().await;

  store.login("clara@museum.test", PASSWORD).await.unwrap();

  let snap = store.snapshot();
  assert!(snap.is_authenticated);
  assert!(!snap.is_loading);
  assert_eq!(snap.profile.as_ref().unwrap().role, Role::Curator);
  assert_eq!(snap.permissions, Role::Curator.permissions());
  assert_eq!(snap.roster.len(), 1);

  // the gate reads straight off the snapshot
  assert!(store.can(Permission::Create));
  assert!(!store.can(Permission::Delete));
}

#[tokio::test]
async fn failed_login_is_an_authentication_error() {
  let b = backend().await;
  seed(&b, "Clara", "clara@museum.test", Role::Curator).await;
  let store = session(&b);
  store.start().await;

  let err = store.login("clara@museum.test", "wrong").await.unwrap_err();
  assert!(matches!(err, SessionError::Authentication(_)));

  let snap = store.snapshot();
  assert!(!snap.is_authenticated);
  assert!(!snap.is_loading);
}

#[tokio::test]
async fn deactivated_user_cannot_log_in() {
  let b = backend().await;
  seed(&b, "Walter", "walter@museum.test", Role::Viewer).await;
  let walter = b.list_profiles().await.unwrap()[0].user_id;
  b.set_active(walter, false).await.unwrap();

  let store = session(&b);
  store.start().await;
  let err = store.login("walter@museum.test", PASSWORD).await.unwrap_err();
  assert!(matches!(err, SessionError::Authentication(_)));
}

#[tokio::test]
async fn logout_clears_state_synchronously_and_twice_is_fine() {
  let b = backend().await;
  seed(&b, "Clara", "clara@museum.test", Role::Curator).await;
  let store = session(&b);
  store.start().await;
  store.login("clara@museum.test", PASSWORD).await.unwrap();

  store.logout().await.unwrap();
  let snap = store.snapshot();
  assert!(!snap.is_authenticated);
  assert!(snap.identity.is_none());
  assert!(snap.profile.is_none());
  assert!(snap.roster.is_empty());
  assert!(!snap.permissions.allows(Permission::Export));

  // second logout: already signed out, swallowed
  store.logout().await.unwrap();
  assert!(!store.snapshot().is_authenticated);
}

#[tokio::test]
async fn register_validates_presence_and_does_not_sign_in() {
  let b = backend().await;
  let store = session(&b);
  store.start().await;

  let err = store
    .register(SignUp {
      name: "  ".into(),
      email: "new@museum.test".into(),
      password: PASSWORD.into(),
      department: None,
      role: Role::Viewer,
    })
    .await
    .unwrap_err();
  assert!(matches!(err, SessionError::MissingField("name")));

  store
    .register(SignUp {
      name: "Newcomer".into(),
      email: "new@museum.test".into(),
      password: PASSWORD.into(),
      department: None,
      role: Role::Viewer,
    })
    .await
    .unwrap();

  // registered, not signed in
  assert!(!store.snapshot().is_authenticated);
  assert!(b.get_profile(b.list_profiles().await.unwrap()[0].user_id)
    .await
    .unwrap()
    .is_some());
}

#[tokio::test]
async fn change_password_round_trip() {
  let b = backend().await;
  seed(&b, "Clara", "clara@museum.test", Role::Curator).await;
  let store = session(&b);
  store.start().await;

  // not signed in yet
  let err = store.change_password(PASSWORD, "next password").await.unwrap_err();
  assert!(matches!(err, SessionError::Authentication(_)));

  store.login("clara@museum.test", PASSWORD).await.unwrap();
  store.change_password(PASSWORD, "next password").await.unwrap();
  store.logout().await.unwrap();

  assert!(store.login("clara@museum.test", PASSWORD).await.is_err());
  store.login("clara@museum.test", "next password").await.unwrap();
}

// ─── Account lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn create_user_provisions_and_refreshes_roster() {
  let b = backend().await;
  seed(&b, "Admin", "admin@museum.test", Role::Admin).await;
  let store = session(&b);
  store.start().await;
  store.login("admin@museum.test", PASSWORD).await.unwrap();

  let provisioned = store
    .create_user("New Curator", "curator@museum.test", None, Role::Curator)
    .await
    .unwrap();

  assert_eq!(provisioned.temp_password.len(), TEMP_PASSWORD_LEN);
  assert!(provisioned
    .temp_password
    .bytes()
    .all(|byte| TEMP_PASSWORD_ALPHABET.contains(&byte)));
  assert_eq!(provisioned.account.role, Role::Curator);

  let snap = store.snapshot();
  let entry = snap
    .roster
    .iter()
    .find(|p| p.email == "curator@museum.test")
    .expect("roster entry");
  assert_eq!(entry.role, Role::Curator);
  assert!(entry.is_active);

  // the temporary password signs the new user in
  store.logout().await.unwrap();
  store
    .login("curator@museum.test", &provisioned.temp_password)
    .await
    .unwrap();
}

#[tokio::test]
async fn create_user_does_not_swap_the_admin_session() {
  let b = backend().await;
  seed(&b, "Admin", "admin@museum.test", Role::Admin).await;
  let store = session(&b);
  store.start().await;
  store.login("admin@museum.test", PASSWORD).await.unwrap();

  store
    .create_user("New Viewer", "viewer@museum.test", None, Role::Viewer)
    .await
    .unwrap();

  let snap = store.snapshot();
  assert_eq!(
    snap.identity.as_ref().unwrap().email,
    "admin@museum.test",
    "admin session must survive user creation"
  );
  assert!(snap.permissions.allows(Permission::ManageUsers));
}

#[tokio::test]
async fn delete_user_hard_path_removes_roster_entry() {
  let b = backend().await;
  seed(&b, "Admin", "admin@museum.test", Role::Admin).await;
  let store = session(&b);
  store.start().await;
  store.login("admin@museum.test", PASSWORD).await.unwrap();

  let provisioned = store
    .create_user("Doomed", "doomed@museum.test", None, Role::Viewer)
    .await
    .unwrap();

  let action = store.delete_user(provisioned.account.user_id).await.unwrap();
  assert_eq!(action, DeleteAction::Deleted);

  let snap = store.snapshot();
  assert!(snap.roster.iter().all(|p| p.email != "doomed@museum.test"));
}

/// Privileged functions that are always down, forcing the soft-delete path.
#[derive(Debug, thiserror::Error)]
#[error("account functions unreachable")]
struct Offline;

impl ClassifyError for Offline {
  fn class(&self) -> ErrorClass {
    ErrorClass::Transient
  }
}

struct OfflineFunctions;

impl AccountFunctions for OfflineFunctions {
  type Error = Offline;

  async fn create_user(
    &self,
    _account: &NewAccount,
    _temp_password: &str,
  ) -> Result<CreatedAccount, Offline> {
    Err(Offline)
  }

  async fn delete_user(&self, _user_id: Uuid) -> Result<DeleteAction, Offline> {
    Err(Offline)
  }
}

#[tokio::test]
async fn delete_user_falls_back_to_deactivation() {
  let b = backend().await;
  seed(&b, "Admin", "admin@museum.test", Role::Admin).await;
  seed(&b, "Doomed", "doomed@museum.test", Role::Viewer).await;
  let doomed = b.list_profiles().await.unwrap()[0].user_id;

  let store: SessionStore<_, _, OfflineFunctions> =
    SessionStore::new(Arc::clone(&b), Arc::clone(&b), Arc::new(OfflineFunctions));
  store.start().await;
  store.login("admin@museum.test", PASSWORD).await.unwrap();

  let action = store.delete_user(doomed).await.unwrap();
  assert_eq!(action, DeleteAction::Deactivated);

  // present in the roster, but never present-and-active
  let entry = store
    .snapshot()
    .roster
    .iter()
    .find(|p| p.user_id == doomed)
    .cloned()
    .expect("soft-deleted entry stays in roster");
  assert!(!entry.is_active);
}

#[tokio::test]
async fn toggle_active_twice_restores_original_state() {
  let b = backend().await;
  seed(&b, "Admin", "admin@museum.test", Role::Admin).await;
  seed(&b, "Flip", "flip@museum.test", Role::Viewer).await;
  let flip = b.list_profiles().await.unwrap()[0].user_id;

  let store = session(&b);
  store.start().await;
  store.login("admin@museum.test", PASSWORD).await.unwrap();

  let off = store.toggle_active(flip).await.unwrap();
  assert!(!off.is_active);
  let on = store.toggle_active(flip).await.unwrap();
  assert!(on.is_active);
}

#[tokio::test]
async fn update_role_refreshes_roster() {
  let b = backend().await;
  seed(&b, "Admin", "admin@museum.test", Role::Admin).await;
  seed(&b, "Viewer", "viewer@museum.test", Role::Viewer).await;
  let viewer = b.list_profiles().await.unwrap()[0].user_id;

  let store = session(&b);
  store.start().await;
  store.login("admin@museum.test", PASSWORD).await.unwrap();

  store.update_role(viewer, Role::Researcher).await.unwrap();

  let snap = store.snapshot();
  let entry = snap.roster.iter().find(|p| p.user_id == viewer).unwrap();
  assert_eq!(entry.role, Role::Researcher);
}

// ─── Subscriptions ───────────────────────────────────────────────────────────

fn counting_hooks(counter: Arc<AtomicUsize>) -> Hooks {
  Hooks::on_any(move |_| {
    counter.fetch_add(1, Ordering::SeqCst);
  })
}

#[tokio::test]
async fn one_event_fires_each_live_subscription_once() {
  let b = backend().await;
  let subs = SubscriptionManager::new(Arc::clone(&b));

  let first = Arc::new(AtomicUsize::new(0));
  let second = Arc::new(AtomicUsize::new(0));
  let dropped = Arc::new(AtomicUsize::new(0));

  let _keep_a = subs.subscribe(Table::Profiles, counting_hooks(Arc::clone(&first)));
  let _keep_b = subs.subscribe(Table::Profiles, counting_hooks(Arc::clone(&second)));
  let gone = subs.subscribe(Table::Profiles, counting_hooks(Arc::clone(&dropped)));
  drop(gone);

  assert_eq!(subs.subscriber_count(Table::Profiles), 2);

  seed(&b, "Event", "event@museum.test", Role::Viewer).await;
  sleep(Duration::from_millis(100)).await;

  assert_eq!(first.load(Ordering::SeqCst), 1);
  assert_eq!(second.load(Ordering::SeqCst), 1);
  assert_eq!(dropped.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unsubscribe_is_idempotent() {
  let b = backend().await;
  let subs = SubscriptionManager::new(Arc::clone(&b));

  let counter = Arc::new(AtomicUsize::new(0));
  let sub = subs.subscribe(Table::Profiles, counting_hooks(Arc::clone(&counter)));
  sub.unsubscribe();
  sub.unsubscribe();
  assert_eq!(subs.subscriber_count(Table::Profiles), 0);

  seed(&b, "Quiet", "quiet@museum.test", Role::Viewer).await;
  sleep(Duration::from_millis(50)).await;
  assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn remote_profile_change_refreshes_the_roster() {
  let b = backend().await;
  seed(&b, "Admin", "admin@museum.test", Role::Admin).await;

  let store = session(&b);
  store.start().await;
  store.login("admin@museum.test", PASSWORD).await.unwrap();

  let subs = SubscriptionManager::new(Arc::clone(&b));
  let _watch = store.watch_roster(&subs);
  let mut rx = store.subscribe();

  // another admin elsewhere provisions a user
  seed(&b, "Concurrent", "concurrent@museum.test", Role::Viewer).await;

  timeout(
    Duration::from_secs(1),
    rx.wait_for(|snap| snap.roster.len() == 2),
  )
  .await
  .expect("roster converged")
  .expect("watch channel open");

  assert!(store
    .snapshot()
    .roster
    .iter()
    .any(|p| p.email == "concurrent@museum.test"));
}
