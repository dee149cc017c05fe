//! Profile records: the registered facility tied 1:1 to an [`Identity`].
//!
//! [`Identity`]: crate::identity::Identity

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Category ────────────────────────────────────────────────────────────────

/// The kind of facility a profile registers. A closed set.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
  strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
  /// Child care; also the context used when no profile is loaded.
  #[default]
  Child,
  Elderly,
}

impl Category {
  /// Parse a stored or user-supplied discriminant.
  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::UnknownCategory(s.to_owned()))
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// The fields a caller supplies when saving a profile.
///
/// Constructing one through [`ProfileDraft::new`] guarantees a trimmed,
/// non-empty display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDraft {
  pub category:     Category,
  pub display_name: String,
}

impl ProfileDraft {
  pub fn new(category: Category, display_name: &str) -> Result<Self> {
    let display_name = display_name.trim();
    if display_name.is_empty() {
      return Err(Error::EmptyDisplayName);
    }
    Ok(Self { category, display_name: display_name.to_owned() })
  }
}

/// A persisted profile record.
///
/// `owner_key` equals the owning identity's `uid` and is never reassigned.
/// Timestamps are stamped by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
  pub owner_key:    String,
  pub category:     Category,
  pub display_name: String,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the document store holding profile records.
///
/// At most one record exists per owner key. Writes overwrite by key.
pub trait ProfileStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read the record stored under `owner_key`. Returns `None` if not found.
  fn read<'a>(
    &'a self,
    owner_key: &'a str,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + 'a;

  /// Write `draft` under `owner_key`, overwriting any existing record.
  ///
  /// The store sets `created_at` on the first write for a key and refreshes
  /// `updated_at` on every write. Returns the record as persisted.
  fn write<'a>(
    &'a self,
    owner_key: &'a str,
    draft: ProfileDraft,
  ) -> impl Future<Output = Result<Profile, Self::Error>> + Send + 'a;
}
