//! [`SessionStore`] — the single owner of the published session view.
//!
//! The store is cheap to clone; all clones share one watch channel, one
//! cached session, and the same transports. The published
//! [`SessionSnapshot`] is mutated only here: by the explicit operations
//! below, by the auth-event listener, and by roster refreshes. Everything
//! else reads snapshots.

use std::sync::{
  atomic::{AtomicU64, Ordering},
  Arc, Mutex, MutexGuard,
};

use tokio::sync::{broadcast, watch};
use vitrine_core::{
  auth::{AuthEvent, AuthSession, AuthTransport, Identity, SignUp},
  account::AccountFunctions,
  event::{ChangeFeed, Table},
  profile::Profile,
  role::{Permission, PermissionSet},
  store::CollectionStore,
  ClassifyError, ErrorClass,
};

use crate::{
  error::{Result, SessionError},
  subscription::{Hooks, Subscription, SubscriptionManager},
};

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// The immutable view every consumer reads. Cloned out of the watch
/// channel; never mutated in place by readers.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
  pub identity:         Option<Identity>,
  pub profile:          Option<Profile>,
  /// Derived from the profile's role; the viewer set when signed out.
  pub permissions:      PermissionSet,
  /// All profiles, newest first. Only populated while authenticated.
  pub roster:           Vec<Profile>,
  pub is_authenticated: bool,
  /// True from construction until the first session resolution, and again
  /// while a login/register round trip is in flight.
  pub is_loading:       bool,
}

impl SessionSnapshot {
  fn initial() -> Self {
    Self {
      identity:         None,
      profile:          None,
      permissions:      PermissionSet::NONE,
      roster:           Vec::new(),
      is_authenticated: false,
      is_loading:       true,
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// The session store. Generic over the auth transport, the collection
/// store, and the privileged account functions; see `vitrine-store-sqlite`
/// and `vitrine-client` for the two backend families.
pub struct SessionStore<A, C, F> {
  pub(crate) auth:    Arc<A>,
  pub(crate) store:   Arc<C>,
  pub(crate) funcs:   Arc<F>,
  pub(crate) state:   Arc<watch::Sender<SessionSnapshot>>,
  /// The bearer session, held privately — tokens never enter the snapshot.
  pub(crate) session: Arc<Mutex<Option<AuthSession>>>,
  /// Bumped on every local transition. An in-flight refresh that started
  /// under an older epoch must not publish — the standard guard against a
  /// slow response landing on torn-down state.
  pub(crate) epoch:   Arc<AtomicU64>,
}

impl<A, C, F> Clone for SessionStore<A, C, F> {
  fn clone(&self) -> Self {
    Self {
      auth:    Arc::clone(&self.auth),
      store:   Arc::clone(&self.store),
      funcs:   Arc::clone(&self.funcs),
      state:   Arc::clone(&self.state),
      session: Arc::clone(&self.session),
      epoch:   Arc::clone(&self.epoch),
    }
  }
}

impl<A, C, F> SessionStore<A, C, F>
where
  A: AuthTransport + 'static,
  A::Error: ClassifyError,
  C: CollectionStore + 'static,
  C::Error: ClassifyError,
  F: AccountFunctions + 'static,
  F::Error: ClassifyError,
{
  pub fn new(auth: Arc<A>, store: Arc<C>, funcs: Arc<F>) -> Self {
    let (tx, _) = watch::channel(SessionSnapshot::initial());
    Self {
      auth,
      store,
      funcs,
      state: Arc::new(tx),
      session: Arc::new(Mutex::new(None)),
      epoch: Arc::new(AtomicU64::new(0)),
    }
  }

  /// Subscribe to snapshot updates.
  pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
    self.state.subscribe()
  }

  /// The current snapshot, cloned.
  pub fn snapshot(&self) -> SessionSnapshot {
    self.state.borrow().clone()
  }

  /// The route-guard check: advisory only, synchronous, no I/O.
  pub fn can(&self, permission: Permission) -> bool {
    self.state.borrow().permissions.allows(permission)
  }

  /// Resolve any existing session and install the persistent auth-event
  /// listener. Call once, right after construction.
  pub async fn start(&self) {
    self.spawn_auth_listener();

    match self.auth.session().await {
      Ok(Some(session)) => {
        let epoch = self.bump_epoch();
        self.apply_session(session, epoch).await;
      }
      Ok(None) => {
        self.bump_epoch();
        self.clear_local_state();
      }
      Err(e) => {
        tracing::warn!(error = %e, "could not resolve existing session");
        self.bump_epoch();
        self.clear_local_state();
      }
    }
  }

  // ── Operations ────────────────────────────────────────────────────────────

  /// Password-grant sign-in. Failures come back as values so callers can
  /// render them inline. Concurrent calls are not coalesced: the last
  /// response to land wins (the UI disables the control while
  /// `is_loading` is true).
  pub async fn login(&self, email: &str, password: &str) -> Result<()> {
    self.state.send_modify(|s| s.is_loading = true);
    match self.auth.sign_in_with_password(email, password).await {
      Ok(session) => {
        let epoch = self.bump_epoch();
        self.apply_session(session, epoch).await;
        Ok(())
      }
      Err(e) => {
        self.state.send_modify(|s| s.is_loading = false);
        Err(SessionError::from_backend(e))
      }
    }
  }

  /// Create a new identity. Presence validation only — format and strength
  /// checks are the form's job. Does not sign the new user in.
  pub async fn register(&self, input: SignUp) -> Result<Identity> {
    if input.name.trim().is_empty() {
      return Err(SessionError::MissingField("name"));
    }
    if input.email.trim().is_empty() {
      return Err(SessionError::MissingField("email"));
    }
    if input.password.is_empty() {
      return Err(SessionError::MissingField("password"));
    }

    self.state.send_modify(|s| s.is_loading = true);
    let result = self.auth.sign_up(input).await;
    self.state.send_modify(|s| s.is_loading = false);
    result.map_err(SessionError::from_backend)
  }

  /// Clear local state synchronously, then tell the transport. The UI
  /// reads "signed out" immediately even if the network call is slow or
  /// fails; a "session already gone" response is swallowed. Calling this
  /// with no session open is a no-op, never an error.
  pub async fn logout(&self) -> Result<()> {
    self.bump_epoch();
    let token = self.session_lock().take().map(|s| s.access_token);
    self.clear_local_state();

    let Some(token) = token else {
      return Ok(());
    };
    match self.auth.sign_out(&token).await {
      Ok(()) => Ok(()),
      Err(e) if e.class() == ErrorClass::AlreadySignedOut => Ok(()),
      Err(e) => Err(SessionError::from_backend(e)),
    }
  }

  /// Forwarded to the transport. The current password is accepted for UX
  /// symmetry; re-verification is the transport's responsibility.
  pub async fn change_password(
    &self,
    _current_password: &str,
    new_password: &str,
  ) -> Result<()> {
    if new_password.is_empty() {
      return Err(SessionError::MissingField("new password"));
    }
    let token = self
      .session_lock()
      .as_ref()
      .map(|s| s.access_token.clone())
      .ok_or_else(|| SessionError::Authentication("not signed in".into()))?;

    self
      .auth
      .update_password(&token, new_password)
      .await
      .map_err(SessionError::from_backend)
  }

  /// Wholesale roster re-fetch. Idempotent; safe to trigger redundantly.
  /// A response landing after sign-out is dropped — the roster is only
  /// populated while authenticated.
  pub async fn refresh_roster(&self) -> Result<()> {
    let roster = self
      .store
      .list_profiles()
      .await
      .map_err(SessionError::from_backend)?;
    self.state.send_modify(|s| {
      if s.is_authenticated {
        s.roster = roster;
      }
    });
    Ok(())
  }

  /// Wire the roster to the profiles change feed: any remote profile
  /// change triggers a full refresh. Returns the subscription guard; drop
  /// it to stop.
  pub fn watch_roster<W>(&self, subs: &SubscriptionManager<W>) -> Subscription
  where
    W: ChangeFeed + 'static,
  {
    let this = self.clone();
    subs.subscribe(
      Table::Profiles,
      Hooks::on_any(move |_| {
        let this = this.clone();
        tokio::spawn(async move {
          if let Err(e) = this.refresh_roster().await {
            tracing::warn!(error = %e, "roster refresh failed");
          }
        });
      }),
    )
  }

  // ── Internals ─────────────────────────────────────────────────────────────

  pub(crate) fn session_lock(&self) -> MutexGuard<'_, Option<AuthSession>> {
    // A poisoned lock only means another task panicked mid-swap; the
    // Option inside is still usable.
    self.session.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn bump_epoch(&self) -> u64 {
    self.epoch.fetch_add(1, Ordering::SeqCst) + 1
  }

  fn epoch_is(&self, epoch: u64) -> bool {
    self.epoch.load(Ordering::SeqCst) == epoch
  }

  /// Re-derive everything the snapshot holds from a live session.
  /// Called on login and on every auth event — no incremental diffing.
  /// `epoch` pins the transition this derivation belongs to: if a newer
  /// one (another login, a logout) lands while the fetches are in flight,
  /// the result is discarded instead of clobbering it.
  async fn apply_session(&self, session: AuthSession, epoch: u64) {
    if !self.epoch_is(epoch) {
      return;
    }
    let identity = session.identity.clone();
    *self.session_lock() = Some(session);

    let profile = match self.store.get_profile(identity.user_id).await {
      Ok(p) => p,
      Err(e) => {
        tracing::warn!(error = %e, "profile fetch failed");
        None
      }
    };
    let roster = match self.store.list_profiles().await {
      Ok(r) => r,
      Err(e) => {
        tracing::warn!(error = %e, "roster fetch failed");
        Vec::new()
      }
    };
    let permissions = profile
      .as_ref()
      .map(|p| p.role.permissions())
      .unwrap_or(PermissionSet::NONE);

    if !self.epoch_is(epoch) {
      return;
    }
    self.state.send_modify(|s| {
      s.identity = Some(identity);
      s.profile = profile;
      s.permissions = permissions;
      s.roster = roster;
      s.is_authenticated = true;
      s.is_loading = false;
    });
  }

  fn clear_local_state(&self) {
    *self.session_lock() = None;
    self.state.send_modify(|s| {
      s.identity = None;
      s.profile = None;
      s.permissions = PermissionSet::NONE;
      s.roster = Vec::new();
      s.is_authenticated = false;
      s.is_loading = false;
    });
  }

  /// One persistent listener on the transport's auth-state events — the
  /// anchor that converges the local view to server truth after any auth
  /// event, at the cost of an extra round trip per event.
  fn spawn_auth_listener(&self) {
    let mut rx = self.auth.events();
    let this = self.clone();
    tokio::spawn(async move {
      loop {
        match rx.recv().await {
          Ok(AuthEvent::SignedIn(session))
          | Ok(AuthEvent::TokenRefreshed(session)) => {
            // Echoes of sessions a local operation already derived are
            // skipped; that derivation is authoritative.
            let already_applied = this
              .session_lock()
              .as_ref()
              .is_some_and(|s| s.access_token == session.access_token);
            if already_applied {
              continue;
            }
            // For the rest, re-derive from scratch — but only when the
            // transport still considers the session current, so a stale
            // sign-in echo cannot resurrect a signed-out session.
            let still_current = this
              .auth
              .session()
              .await
              .ok()
              .flatten()
              .is_some_and(|s| s.access_token == session.access_token);
            if still_current {
              let epoch = this.bump_epoch();
              this.apply_session(session, epoch).await;
            }
          }
          Ok(AuthEvent::SignedOut) => {
            this.bump_epoch();
            this.clear_local_state();
          }
          Err(broadcast::error::RecvError::Lagged(skipped)) => {
            tracing::debug!(skipped, "auth event stream lagged");
          }
          Err(broadcast::error::RecvError::Closed) => break,
        }
      }
    });
  }
}
