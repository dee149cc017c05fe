//! A file-backed identity provider for running the client on one machine.
//!
//! Signing in records a *pending* sign-in in a JSON session file and then
//! completes it, the same two steps a redirect-based provider takes. A
//! pending record left behind by an interrupted run is promoted by
//! [`IdentityProvider::resolve_pending_redirect`] on the next start.

use std::path::{Path, PathBuf};

use aloha_core::identity::{Identity, IdentityProvider};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info};

use crate::config::AccountConfig;

#[derive(Debug, Error)]
pub enum IdentityError {
  #[error("session file {}: {source}", .path.display())]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("session file is corrupt: {0}")]
  Corrupt(#[from] serde_json::Error),
}

/// On-disk shape of the session file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
  #[serde(default)]
  signed_in: Option<Identity>,
  #[serde(default)]
  pending:   Option<Identity>,
  /// uid generated for an account configured without one. Survives sign-out
  /// so the same account keeps the same profile.
  #[serde(default)]
  local_uid: Option<String>,
}

pub struct LocalIdentityProvider {
  path:    PathBuf,
  account: AccountConfig,
  state:   watch::Sender<Option<Identity>>,
  /// Serialises read-modify-write cycles on the session file.
  file:    Mutex<()>,
}

impl LocalIdentityProvider {
  /// Open the session file at `path`, reporting whoever is signed in.
  pub fn open(path: impl Into<PathBuf>, account: AccountConfig) -> Result<Self, IdentityError> {
    let path = path.into();
    let session = match std::fs::read(&path) {
      Ok(bytes) => serde_json::from_slice::<SessionFile>(&bytes)?,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => SessionFile::default(),
      Err(source) => return Err(IdentityError::Io { path, source }),
    };
    let (state, _) = watch::channel(session.signed_in);
    Ok(Self { path, account, state, file: Mutex::new(()) })
  }

  pub fn path(&self) -> &Path { &self.path }

  async fn load(&self) -> Result<SessionFile, IdentityError> {
    match tokio::fs::read(&self.path).await {
      Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SessionFile::default()),
      Err(source) => Err(self.io(source)),
    }
  }

  async fn store(&self, session: &SessionFile) -> Result<(), IdentityError> {
    if let Some(dir) = self.path.parent()
      && !dir.as_os_str().is_empty()
    {
      tokio::fs::create_dir_all(dir).await.map_err(|e| self.io(e))?;
    }
    let bytes = serde_json::to_vec_pretty(session)?;
    tokio::fs::write(&self.path, bytes).await.map_err(|e| self.io(e))
  }

  fn io(&self, source: std::io::Error) -> IdentityError {
    IdentityError::Io { path: self.path.clone(), source }
  }

  /// The identity the configured account signs in as.
  fn account_identity(&self, session: &mut SessionFile) -> Identity {
    let uid = match &self.account.uid {
      Some(uid) => uid.clone(),
      None => session
        .local_uid
        .get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
        .clone(),
    };
    Identity {
      uid,
      email: self.account.email.clone(),
      display_name: self.account.display_name.clone(),
    }
  }
}

impl IdentityProvider for LocalIdentityProvider {
  type Error = IdentityError;

  fn subscribe(&self) -> watch::Receiver<Option<Identity>> { self.state.subscribe() }

  async fn begin_redirect_sign_in(&self) -> Result<(), IdentityError> {
    {
      let _guard = self.file.lock().await;
      let mut session = self.load().await?;
      let identity = self.account_identity(&mut session);
      debug!(uid = %identity.uid, "recording pending sign-in");
      session.pending = Some(identity);
      self.store(&session).await?;
    }
    // The local "redirect" returns straight away.
    self.resolve_pending_redirect().await.map(|_| ())
  }

  async fn resolve_pending_redirect(&self) -> Result<Option<Identity>, IdentityError> {
    let _guard = self.file.lock().await;
    let mut session = self.load().await?;
    let Some(identity) = session.pending.take() else {
      return Ok(None);
    };
    session.signed_in = Some(identity.clone());
    self.store(&session).await?;

    info!(uid = %identity.uid, "signed in");
    self.state.send_replace(Some(identity.clone()));
    Ok(Some(identity))
  }

  async fn sign_out(&self) -> Result<(), IdentityError> {
    let _guard = self.file.lock().await;
    let mut session = self.load().await?;
    session.signed_in = None;
    session.pending = None;
    self.store(&session).await?;

    info!("signed out");
    self.state.send_replace(None);
    Ok(())
  }
}
