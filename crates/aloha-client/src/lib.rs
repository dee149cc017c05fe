//! Session gating and the chat exchange loop.
//!
//! [`SessionController`] decides which of four gating states the client is
//! in. Once it reaches [`SessionState::Registered`], a [`ConversationLoop`]
//! exchanges messages with the completion endpoint, one request at a time.
//!
//! Both components publish snapshots through `tokio::sync::watch`; callers
//! read or subscribe but never mutate them directly.

pub mod conversation;
pub mod error;
pub mod session;

#[cfg(test)]
mod testing;

use std::time::Duration;

pub use conversation::{ConversationLoop, PendingRequest, Transcript, Turn, TurnOutcome};
pub use error::{ProfileWriteError, SignInError, SignOutError};
pub use session::{SessionController, SessionState};

/// Upper bounds on every outstanding call to an external collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
  /// Profile store reads and writes.
  pub store:      Duration,
  /// Identity provider calls: redirect resolution, sign-in and sign-out.
  pub provider:   Duration,
  /// Completion endpoint requests.
  pub completion: Duration,
}

impl Default for Timeouts {
  fn default() -> Self {
    Self {
      store:      Duration::from_secs(10),
      provider:   Duration::from_secs(10),
      completion: Duration::from_secs(60),
    }
  }
}
