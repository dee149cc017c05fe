//! SQL schema for the Aloha SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per identity. owner_key is the identity uid and is never reassigned.
CREATE TABLE IF NOT EXISTS facilities (
    owner_key     TEXT PRIMARY KEY,
    category      TEXT NOT NULL,   -- 'child' | 'elderly'
    display_name  TEXT NOT NULL CHECK (length(display_name) > 0),
    created_at    TEXT NOT NULL,   -- ISO 8601 UTC; set on first write
    updated_at    TEXT NOT NULL    -- ISO 8601 UTC; refreshed on every write
);

PRAGMA user_version = 1;
";
