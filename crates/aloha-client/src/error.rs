//! Errors surfaced by the session controller.
//!
//! Completion failures never surface here; they become transcript entries
//! (see [`crate::conversation`]).

use std::time::Duration;

use thiserror::Error;

/// `save_profile` did not persist a record. Gating state is unchanged.
#[derive(Debug, Error)]
pub enum ProfileWriteError {
  #[error("no signed-in identity")]
  NotSignedIn,

  #[error(transparent)]
  Invalid(#[from] aloha_core::Error),

  #[error("profile store write failed: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("profile store write timed out after {0:?}")]
  Timeout(Duration),
}

/// The identity provider did not start a sign-in.
#[derive(Debug, Error)]
pub enum SignInError {
  #[error("identity provider sign-in failed: {0}")]
  Provider(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("identity provider sign-in timed out after {0:?}")]
  Timeout(Duration),
}

/// The identity provider did not confirm a sign-out.
///
/// Local session state is already `Unauthenticated` when this is returned.
#[derive(Debug, Error)]
pub enum SignOutError {
  #[error("identity provider sign-out failed: {0}")]
  Provider(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("identity provider sign-out timed out after {0:?}")]
  Timeout(Duration),
}
