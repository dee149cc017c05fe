//! The session controller: gates the client on identity and profile state.
//!
//! A single driver task owns the identity subscription. Notifications are
//! handled one at a time; a notification that arrives while a profile lookup
//! is outstanding cancels that lookup and takes its place.
//!
//! Every asynchronous publish is tagged with the sign-out epoch it started
//! in. [`SessionController::sign_out`] bumps the epoch while holding the
//! state lock, so nothing that began before a sign-out can publish after it.

use std::sync::{
  Arc,
  atomic::{AtomicU64, Ordering},
};

use aloha_core::{
  identity::{Identity, IdentityProvider},
  profile::{Category, Profile, ProfileDraft, ProfileStore},
};
use tokio::{sync::watch, task::JoinHandle, time::timeout};
use tracing::{debug, info, warn};

use crate::{
  Timeouts,
  error::{ProfileWriteError, SignInError, SignOutError},
};

// ─── State ────────────────────────────────────────────────────────────────────

/// The gating state. Exactly one of four phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
  /// No determination made yet. Only ever the initial state.
  Loading,
  /// No signed-in identity.
  Unauthenticated,
  /// Signed in, no profile record for the identity.
  Onboarding { identity: Identity },
  /// Signed in with a profile record.
  Registered { identity: Identity, profile: Profile },
}

impl SessionState {
  pub fn is_loading(&self) -> bool { matches!(self, Self::Loading) }

  pub fn identity(&self) -> Option<&Identity> {
    match self {
      Self::Onboarding { identity } | Self::Registered { identity, .. } => Some(identity),
      Self::Loading | Self::Unauthenticated => None,
    }
  }

  pub fn profile(&self) -> Option<&Profile> {
    match self {
      Self::Registered { profile, .. } => Some(profile),
      _ => None,
    }
  }

  /// Category context for completions; `child` when no profile is loaded.
  pub fn category(&self) -> Category {
    self.profile().map(|p| p.category).unwrap_or_default()
  }

  fn label(&self) -> &'static str {
    match self {
      Self::Loading => "loading",
      Self::Unauthenticated => "unauthenticated",
      Self::Onboarding { .. } => "onboarding",
      Self::Registered { .. } => "registered",
    }
  }
}

// ─── Controller ───────────────────────────────────────────────────────────────

/// Owns the [`SessionState`] and the only operations that change it.
///
/// Dropping the controller stops the driver task and with it the identity
/// subscription.
pub struct SessionController<P, S> {
  shared: Arc<Shared<P, S>>,
  driver: JoinHandle<()>,
}

struct Shared<P, S> {
  provider: Arc<P>,
  store:    Arc<S>,
  timeouts: Timeouts,
  state:    watch::Sender<SessionState>,
  epoch:    AtomicU64,
}

impl<P, S> SessionController<P, S>
where
  P: IdentityProvider + 'static,
  S: ProfileStore + 'static,
{
  /// Start the controller in [`SessionState::Loading`] and spawn its driver.
  ///
  /// Must be called from within a tokio runtime.
  pub fn start(provider: Arc<P>, store: Arc<S>, timeouts: Timeouts) -> Self {
    let (state, _) = watch::channel(SessionState::Loading);
    let shared = Arc::new(Shared {
      provider,
      store,
      timeouts,
      state,
      epoch: AtomicU64::new(0),
    });
    let driver = tokio::spawn(drive(shared.clone()));
    Self { shared, driver }
  }

  /// Current snapshot.
  pub fn state(&self) -> SessionState { self.shared.state.borrow().clone() }

  /// Subscribe to state changes.
  pub fn subscribe(&self) -> watch::Receiver<SessionState> { self.shared.state.subscribe() }

  /// Wait for the first determination and return it.
  pub async fn settled(&self) -> SessionState {
    let mut rx = self.shared.state.subscribe();
    match rx.wait_for(|s| !s.is_loading()).await {
      Ok(state) => state.clone(),
      Err(_) => self.state(),
    }
  }

  /// Start a redirect-based sign-in.
  ///
  /// Does not change the gating state; the provider's eventual notification
  /// does.
  pub async fn begin_sign_in(&self) -> Result<(), SignInError> {
    info!("starting redirect sign-in");
    let limit = self.shared.timeouts.provider;
    match timeout(limit, self.shared.provider.begin_redirect_sign_in()).await {
      Ok(result) => result.map_err(|e| SignInError::Provider(Box::new(e))),
      Err(_) => Err(SignInError::Timeout(limit)),
    }
  }

  /// Write the profile for the signed-in identity and move to
  /// [`SessionState::Registered`] with the written record.
  ///
  /// On error the gating state is unchanged. Nothing is retried.
  pub async fn save_profile(
    &self,
    category: Category,
    display_name: &str,
  ) -> Result<Profile, ProfileWriteError> {
    let epoch = self.shared.epoch();
    let identity = self
      .state()
      .identity()
      .cloned()
      .ok_or(ProfileWriteError::NotSignedIn)?;
    let draft = ProfileDraft::new(category, display_name)?;

    let limit = self.shared.timeouts.store;
    let profile = timeout(limit, self.shared.store.write(&identity.uid, draft))
      .await
      .map_err(|_| ProfileWriteError::Timeout(limit))?
      .map_err(|e| ProfileWriteError::Store(Box::new(e)))?;
    info!(uid = %identity.uid, category = %profile.category, "profile saved");

    let record = profile.clone();
    let published = self.shared.state.send_if_modified(|state| {
      let same_identity = state.identity().is_some_and(|i| i.uid == identity.uid);
      if self.shared.epoch() != epoch || !same_identity {
        return false;
      }
      *state = SessionState::Registered { identity, profile: record };
      true
    });
    if !published {
      debug!("session changed while saving; written profile not published");
    }

    Ok(profile)
  }

  /// Clear the local session, then ask the provider to sign out.
  ///
  /// Local state is authoritative for the UI: it is `Unauthenticated` on
  /// return whether or not the provider call succeeded.
  pub async fn sign_out(&self) -> Result<(), SignOutError> {
    self.shared.state.send_modify(|state| {
      self.shared.epoch.fetch_add(1, Ordering::AcqRel);
      *state = SessionState::Unauthenticated;
    });
    info!("signed out locally");

    let limit = self.shared.timeouts.provider;
    let result = match timeout(limit, self.shared.provider.sign_out()).await {
      Ok(Ok(())) => Ok(()),
      Ok(Err(e)) => Err(SignOutError::Provider(Box::new(e))),
      Err(_) => Err(SignOutError::Timeout(limit)),
    };
    if let Err(e) = &result {
      warn!(error = %e, "provider sign-out failed; local session stays signed out");
    }
    result
  }
}

impl<P, S> Drop for SessionController<P, S> {
  fn drop(&mut self) { self.driver.abort(); }
}

// ─── Driver ───────────────────────────────────────────────────────────────────

impl<P, S> Shared<P, S>
where
  P: IdentityProvider,
  S: ProfileStore,
{
  fn epoch(&self) -> u64 { self.epoch.load(Ordering::Acquire) }

  /// Publish `next` unless a sign-out has happened since `epoch`.
  fn publish(&self, epoch: u64, next: SessionState) {
    let published = self.state.send_if_modified(|state| {
      if self.epoch() != epoch {
        return false;
      }
      debug!(from = state.label(), to = next.label(), "session transition");
      *state = next;
      true
    });
    if !published {
      debug!("discarding result that predates a sign-out");
    }
  }

  /// Resolve the phase for a signed-in identity.
  ///
  /// A failed or timed-out read settles as "not found" so the client never
  /// stays in `Loading`.
  async fn lookup(&self, identity: Identity) -> SessionState {
    let limit = self.timeouts.store;
    match timeout(limit, self.store.read(&identity.uid)).await {
      Ok(Ok(Some(profile))) => SessionState::Registered { identity, profile },
      Ok(Ok(None)) => SessionState::Onboarding { identity },
      Ok(Err(e)) => {
        warn!(uid = %identity.uid, error = %e, "profile lookup failed");
        SessionState::Onboarding { identity }
      }
      Err(_) => {
        warn!(uid = %identity.uid, ?limit, "profile lookup timed out");
        SessionState::Onboarding { identity }
      }
    }
  }
}

async fn drive<P, S>(shared: Arc<Shared<P, S>>)
where
  P: IdentityProvider,
  S: ProfileStore,
{
  // The identity notification that follows is authoritative, so a failed
  // redirect resolution is only worth a debug line.
  let limit = shared.timeouts.provider;
  match timeout(limit, shared.provider.resolve_pending_redirect()).await {
    Ok(Ok(Some(identity))) => debug!(uid = %identity.uid, "resolved pending redirect"),
    Ok(Ok(None)) => {}
    Ok(Err(e)) => debug!(error = %e, "discarding redirect resolution failure"),
    Err(_) => debug!(?limit, "redirect resolution timed out; discarding"),
  }

  let mut identities = shared.provider.subscribe();
  let mut current = identities.borrow_and_update().clone();

  loop {
    let epoch = shared.epoch();
    let next = match current.take() {
      None => SessionState::Unauthenticated,
      Some(identity) => tokio::select! {
        settled = shared.lookup(identity) => settled,
        Ok(()) = identities.changed() => {
          debug!("identity changed during profile lookup; superseding");
          current = identities.borrow_and_update().clone();
          continue;
        }
      },
    };
    shared.publish(epoch, next);

    if identities.changed().await.is_err() {
      debug!("identity provider closed; session driver stopping");
      break;
    }
    current = identities.borrow_and_update().clone();
  }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
