//! Error types for `aloha-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("display name must not be empty")]
  EmptyDisplayName,

  #[error("unknown facility category: {0:?}")]
  UnknownCategory(String),

  #[error("message text must not be empty")]
  EmptyMessage,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
