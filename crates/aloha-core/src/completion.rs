//! The completion endpoint contract.

use std::{future::Future, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::profile::Category;

/// Request body sent to the completion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
  pub message:       String,
  pub facility_type: Category,
}

/// Why a completion produced no reply.
///
/// The `Display` form is what the transcript shows, so it carries the
/// reason alone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
  /// Non-success status with an `error` description in the body.
  #[error("{message}")]
  Rejected { status: u16, message: String },

  /// Non-success status with no usable description.
  #[error("server responded with status {0}")]
  Status(u16),

  #[error("{0}")]
  Transport(String),

  #[error("no reply within {0:?}")]
  Timeout(Duration),

  #[error("malformed reply: {0}")]
  Malformed(String),
}

/// Abstraction over the backend chat-completion endpoint.
pub trait CompletionClient: Send + Sync {
  /// Send `request` and return the reply text.
  fn complete(
    &self,
    request: CompletionRequest,
  ) -> impl Future<Output = Result<String, CompletionError>> + Send + '_;
}
