//! In-memory fakes for the three capabilities, shared by the unit tests.

use std::{
  collections::{HashMap, HashSet, VecDeque},
  sync::{
    Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
  time::Duration,
};

use aloha_core::{
  completion::{CompletionClient, CompletionError, CompletionRequest},
  identity::{Identity, IdentityProvider},
  profile::{Category, Profile, ProfileDraft, ProfileStore},
};
use chrono::Utc;
use thiserror::Error;
use tokio::sync::{Semaphore, watch};

#[derive(Debug, Error)]
#[error("fake failure: {0}")]
pub struct FakeError(pub &'static str);

/// Wait (bounded) until `cond` holds, yielding to spawned tasks meanwhile.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
  tokio::time::timeout(Duration::from_secs(2), async {
    while !cond() {
      tokio::task::yield_now().await;
    }
  })
  .await
  .expect("condition not reached in time");
}

// ─── Identity provider ───────────────────────────────────────────────────────

pub struct FakeIdentity {
  tx:                  Mutex<Option<watch::Sender<Option<Identity>>>>,
  pub redirect_fails:  AtomicBool,
  pub sign_out_fails:  AtomicBool,
  /// Calls that never complete while set.
  pub hold_redirect:   AtomicBool,
  pub hold_sign_in:    AtomicBool,
  pub hold_sign_out:   AtomicBool,
  pub sign_in_calls:   AtomicUsize,
  pub sign_out_calls:  AtomicUsize,
}

impl FakeIdentity {
  pub fn new(initial: Option<Identity>) -> Self {
    let (tx, _) = watch::channel(initial);
    Self {
      tx:             Mutex::new(Some(tx)),
      redirect_fails: AtomicBool::new(false),
      sign_out_fails: AtomicBool::new(false),
      hold_redirect:  AtomicBool::new(false),
      hold_sign_in:   AtomicBool::new(false),
      hold_sign_out:  AtomicBool::new(false),
      sign_in_calls:  AtomicUsize::new(0),
      sign_out_calls: AtomicUsize::new(0),
    }
  }

  pub fn signed_in(uid: &str) -> Self { Self::new(Some(Identity::new(uid))) }

  pub fn signed_out() -> Self { Self::new(None) }

  /// Deliver an identity-state notification.
  pub fn notify(&self, identity: Option<Identity>) {
    if let Some(tx) = self.tx.lock().unwrap().as_ref() {
      tx.send_replace(identity);
    }
  }

  /// Drop the sender, as a provider that has gone away would.
  pub fn close(&self) { self.tx.lock().unwrap().take(); }
}

impl IdentityProvider for FakeIdentity {
  type Error = FakeError;

  fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
    match self.tx.lock().unwrap().as_ref() {
      Some(tx) => tx.subscribe(),
      None => watch::channel(None).1,
    }
  }

  async fn begin_redirect_sign_in(&self) -> Result<(), FakeError> {
    self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
    hold(&self.hold_sign_in).await;
    Ok(())
  }

  async fn resolve_pending_redirect(&self) -> Result<Option<Identity>, FakeError> {
    hold(&self.hold_redirect).await;
    if self.redirect_fails.load(Ordering::SeqCst) {
      return Err(FakeError("redirect"));
    }
    Ok(None)
  }

  async fn sign_out(&self) -> Result<(), FakeError> {
    self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
    hold(&self.hold_sign_out).await;
    if self.sign_out_fails.load(Ordering::SeqCst) {
      return Err(FakeError("sign-out"));
    }
    self.notify(None);
    Ok(())
  }
}

async fn hold(flag: &AtomicBool) {
  if flag.load(Ordering::SeqCst) {
    std::future::pending::<()>().await;
  }
}

// ─── Profile store ───────────────────────────────────────────────────────────

/// A map-backed store whose reads and writes can be held open or failed.
pub struct FakeStore {
  records:            Mutex<HashMap<String, Profile>>,
  held_reads:         Mutex<HashSet<String>>,
  pub hold_writes:    AtomicBool,
  pub fail_reads:     AtomicBool,
  pub fail_writes:    AtomicBool,
  pub writes_started: AtomicUsize,
  gate:               Semaphore,
}

impl FakeStore {
  pub fn new() -> Self {
    Self {
      records:        Mutex::new(HashMap::new()),
      held_reads:     Mutex::new(HashSet::new()),
      hold_writes:    AtomicBool::new(false),
      fail_reads:     AtomicBool::new(false),
      fail_writes:    AtomicBool::new(false),
      writes_started: AtomicUsize::new(0),
      gate:           Semaphore::new(0),
    }
  }

  pub fn with_profile(owner_key: &str, category: Category, name: &str) -> Self {
    let store = Self::new();
    let now = Utc::now();
    store.records.lock().unwrap().insert(owner_key.to_owned(), Profile {
      owner_key:    owner_key.to_owned(),
      category,
      display_name: name.to_owned(),
      created_at:   now,
      updated_at:   now,
    });
    store
  }

  /// Reads for `owner_key` block until [`FakeStore::release`].
  pub fn hold_reads_for(&self, owner_key: &str) {
    self.held_reads.lock().unwrap().insert(owner_key.to_owned());
  }

  pub fn release(&self, permits: usize) { self.gate.add_permits(permits); }

  pub fn get(&self, owner_key: &str) -> Option<Profile> {
    self.records.lock().unwrap().get(owner_key).cloned()
  }
}

impl ProfileStore for FakeStore {
  type Error = FakeError;

  async fn read(&self, owner_key: &str) -> Result<Option<Profile>, FakeError> {
    let held = self.held_reads.lock().unwrap().contains(owner_key);
    if held {
      self.gate.acquire().await.expect("gate open").forget();
    }
    if self.fail_reads.load(Ordering::SeqCst) {
      return Err(FakeError("read"));
    }
    Ok(self.get(owner_key))
  }

  async fn write(&self, owner_key: &str, draft: ProfileDraft) -> Result<Profile, FakeError> {
    self.writes_started.fetch_add(1, Ordering::SeqCst);
    if self.hold_writes.load(Ordering::SeqCst) {
      self.gate.acquire().await.expect("gate open").forget();
    }
    if self.fail_writes.load(Ordering::SeqCst) {
      return Err(FakeError("write"));
    }
    let now = Utc::now();
    let mut records = self.records.lock().unwrap();
    let created_at = records.get(owner_key).map_or(now, |p| p.created_at);
    let profile = Profile {
      owner_key: owner_key.to_owned(),
      category: draft.category,
      display_name: draft.display_name,
      created_at,
      updated_at: now,
    };
    records.insert(owner_key.to_owned(), profile.clone());
    Ok(profile)
  }
}

// ─── Completion endpoint ─────────────────────────────────────────────────────

/// Replies from a script, in order. An exhausted script never replies.
pub struct FakeCompletion {
  script:        Mutex<VecDeque<Result<String, CompletionError>>>,
  requests:      Mutex<Vec<CompletionRequest>>,
  pub gated:     AtomicBool,
  gate:          Semaphore,
}

impl FakeCompletion {
  pub fn replying(replies: Vec<Result<String, CompletionError>>) -> Self {
    let fake = Self {
      script:   Mutex::new(VecDeque::new()),
      requests: Mutex::new(Vec::new()),
      gated:    AtomicBool::new(false),
      gate:     Semaphore::new(0),
    };
    fake.script.lock().unwrap().extend(replies);
    fake
  }

  pub fn silent() -> Self { Self::replying(Vec::new()) }

  /// Hold every reply until [`FakeCompletion::release`].
  pub fn gated(self) -> Self {
    self.gated.store(true, Ordering::SeqCst);
    self
  }

  pub fn release(&self) { self.gate.add_permits(1); }

  pub fn requests(&self) -> Vec<CompletionRequest> { self.requests.lock().unwrap().clone() }
}

impl CompletionClient for FakeCompletion {
  async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
    self.requests.lock().unwrap().push(request);
    if self.gated.load(Ordering::SeqCst) {
      self.gate.acquire().await.expect("gate open").forget();
    }
    let next = self.script.lock().unwrap().pop_front();
    match next {
      Some(reply) => reply,
      None => std::future::pending().await,
    }
  }
}
