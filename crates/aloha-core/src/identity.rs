//! Identity: the authenticated principal, and the provider that reports it.
//!
//! An [`Identity`] is only ever observed by this system. It is created and
//! destroyed by the external identity provider.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// An authenticated principal reference.
///
/// `uid` is stable for the lifetime of the account and doubles as the owner
/// key of the principal's profile record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub uid:          String,
  pub email:        Option<String>,
  pub display_name: Option<String>,
}

impl Identity {
  pub fn new(uid: impl Into<String>) -> Self {
    Self { uid: uid.into(), email: None, display_name: None }
  }
}

/// Abstraction over a redirect-based identity provider.
pub trait IdentityProvider: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Subscribe to identity-state notifications.
  ///
  /// The receiver's current value is the first notification; every later
  /// value is a subsequent one. Dropping the receiver unsubscribes. A closed
  /// channel means the provider has gone away and the last value is final.
  fn subscribe(&self) -> watch::Receiver<Option<Identity>>;

  /// Start a redirect-based sign-in. The outcome arrives as a notification.
  fn begin_redirect_sign_in(
    &self,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Complete a sign-in that was interrupted by a redirect, if any.
  fn resolve_pending_redirect(
    &self,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  /// Sign the current principal out.
  fn sign_out(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
