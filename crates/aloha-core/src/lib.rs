//! Core types and capability traits for the Aloha client.
//!
//! This crate is free of HTTP and database dependencies. The session and
//! conversation logic in `aloha-client` depends only on the traits defined
//! here; concrete backends live in their own crates.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod completion;
pub mod error;
pub mod identity;
pub mod message;
pub mod profile;

pub use error::{Error, Result};
