//! Conversation turns.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
  User,
  Assistant,
}

/// One turn in the conversation. `text` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  pub speaker: Speaker,
  pub text:    String,
  /// Set on assistant turns that render a failed completion.
  #[serde(default)]
  pub failed:  bool,
}

impl Message {
  pub fn user(text: impl Into<String>) -> Result<Self> {
    Self::checked(Speaker::User, text.into())
  }

  pub fn assistant(text: impl Into<String>) -> Result<Self> {
    Self::checked(Speaker::Assistant, text.into())
  }

  /// An assistant turn rendering `reason` as a visibly-marked error.
  pub fn failure(reason: impl std::fmt::Display) -> Self {
    Self {
      speaker: Speaker::Assistant,
      text:    format!("⚠️ {reason}"),
      failed:  true,
    }
  }

  fn checked(speaker: Speaker, text: String) -> Result<Self> {
    if text.trim().is_empty() {
      return Err(Error::EmptyMessage);
    }
    Ok(Self { speaker, text, failed: false })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blank_text_is_rejected() {
    assert!(matches!(Message::user(" \t"), Err(Error::EmptyMessage)));
    assert!(matches!(Message::assistant(""), Err(Error::EmptyMessage)));
  }

  #[test]
  fn failure_is_marked() {
    let m = Message::failure("rate limited");
    assert_eq!(m.speaker, Speaker::Assistant);
    assert_eq!(m.text, "⚠️ rate limited");
    assert!(m.failed);
  }
}
