//! Client configuration: an optional TOML file under `ALOHA_` environment
//! variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use aloha_client::Timeouts;
use anyhow::{Context, Result, bail};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
  pub completion_url:       String,
  pub store_path:           PathBuf,
  pub session_path:         PathBuf,
  pub log_file:             PathBuf,
  pub title:                String,
  pub greeting:             String,
  pub request_timeout_secs: u64,
  pub store_timeout_secs:   u64,
  pub account:              AccountConfig,
}

/// The account the local identity provider signs in as.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
  /// Stable account id. Generated once and kept in the session file when
  /// unset.
  pub uid:          Option<String>,
  pub email:        Option<String>,
  pub display_name: Option<String>,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      completion_url:       "http://localhost:3000/api/chat".into(),
      store_path:           "~/.local/share/aloha/aloha.db".into(),
      session_path:         "~/.local/share/aloha/session.json".into(),
      log_file:             "~/.local/share/aloha/aloha.log".into(),
      title:                "Aloha".into(),
      greeting:             "Aloha! How can I help you today?".into(),
      request_timeout_secs: 60,
      store_timeout_secs:   10,
      account:              AccountConfig::default(),
    }
  }
}

impl ClientConfig {
  /// Read `path` (if it exists) and `ALOHA_*` variables, e.g.
  /// `ALOHA_COMPLETION_URL` or `ALOHA_ACCOUNT__UID`.
  pub fn load(path: &Path) -> Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path.to_path_buf()).required(false))
      .add_source(
        config::Environment::with_prefix("ALOHA")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()
      .context("failed to read config file")?;

    let cfg: Self = settings
      .try_deserialize()
      .context("failed to deserialise client config")?;
    cfg.validated()
  }

  fn validated(mut self) -> Result<Self> {
    if self.greeting.trim().is_empty() {
      bail!("greeting must not be empty");
    }
    if self.request_timeout_secs == 0 || self.store_timeout_secs == 0 {
      bail!("timeouts must be at least one second");
    }
    self.store_path = expand_tilde(&self.store_path);
    self.session_path = expand_tilde(&self.session_path);
    self.log_file = expand_tilde(&self.log_file);
    Ok(self)
  }

  pub fn timeouts(&self) -> Timeouts {
    let store = Duration::from_secs(self.store_timeout_secs);
    Timeouts {
      store,
      provider: store,
      completion: Duration::from_secs(self.request_timeout_secs),
    }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn scratch_file(contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("aloha-config-{}.toml", uuid::Uuid::new_v4()));
    std::fs::write(&path, contents).unwrap();
    path
  }

  #[test]
  fn missing_file_yields_defaults() {
    let path = std::env::temp_dir().join(format!("aloha-absent-{}.toml", uuid::Uuid::new_v4()));
    let cfg = ClientConfig::load(&path).unwrap();
    assert_eq!(cfg.title, "Aloha");
    assert_eq!(cfg.timeouts().completion, Duration::from_secs(60));
    assert!(cfg.account.uid.is_none());
  }

  #[test]
  fn file_values_override_defaults() {
    let path = scratch_file(
      r#"
completion_url = "http://chat.internal/api/chat"
store_path = "/var/lib/aloha/aloha.db"
request_timeout_secs = 5

[account]
uid = "staff-1"
email = "staff@example.org"
"#,
    );
    let cfg = ClientConfig::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(cfg.completion_url, "http://chat.internal/api/chat");
    assert_eq!(cfg.store_path, PathBuf::from("/var/lib/aloha/aloha.db"));
    assert_eq!(cfg.timeouts().completion, Duration::from_secs(5));
    assert_eq!(cfg.timeouts().store, Duration::from_secs(10));
    assert_eq!(cfg.account.uid.as_deref(), Some("staff-1"));
    assert_eq!(cfg.greeting, ClientConfig::default().greeting);
  }

  #[test]
  fn blank_greeting_is_rejected() {
    let path = scratch_file("greeting = \"   \"\n");
    let result = ClientConfig::load(&path);
    std::fs::remove_file(&path).ok();
    assert!(result.is_err());
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/x/y.db")), PathBuf::from(home).join("x/y.db"));
    assert_eq!(expand_tilde(Path::new("/abs/y.db")), PathBuf::from("/abs/y.db"));
  }
}
