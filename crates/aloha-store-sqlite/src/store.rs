//! [`SqliteProfileStore`]: the SQLite implementation of [`ProfileStore`].

use std::path::Path;

use aloha_core::profile::{Profile, ProfileDraft, ProfileStore};
use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tracing::debug;

use crate::{
  Result,
  encode::{RawProfile, encode_category, encode_dt},
  schema::SCHEMA,
};

const SELECT_PROFILE: &str = "SELECT owner_key, category, display_name, created_at, updated_at
   FROM facilities WHERE owner_key = ?1";

/// A profile store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteProfileStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteProfileStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

impl ProfileStore for SqliteProfileStore {
  type Error = crate::Error;

  async fn read(&self, owner_key: &str) -> Result<Option<Profile>> {
    let key = owner_key.to_owned();

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(SELECT_PROFILE, rusqlite::params![key], RawProfile::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn write(&self, owner_key: &str, draft: ProfileDraft) -> Result<Profile> {
    let key          = owner_key.to_owned();
    let category     = encode_category(&draft.category).to_owned();
    let display_name = draft.display_name;
    let now          = encode_dt(Utc::now());

    // Upsert and read back in one call so the returned row is the one written.
    let raw: RawProfile = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO facilities (owner_key, category, display_name, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?4)
           ON CONFLICT(owner_key) DO UPDATE SET
             category     = excluded.category,
             display_name = excluded.display_name,
             updated_at   = excluded.updated_at",
          rusqlite::params![key, category, display_name, now],
        )?;
        let raw = tx.query_row(SELECT_PROFILE, rusqlite::params![key], RawProfile::from_row)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    debug!(owner_key, "profile written");
    raw.into_profile()
  }
}
