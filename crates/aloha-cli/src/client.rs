//! Async HTTP client for the chat-completion endpoint.

use std::time::Duration;

use aloha_core::completion::{CompletionClient, CompletionError, CompletionRequest};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// Posts [`CompletionRequest`]s as JSON to a single endpoint.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpCompletionClient {
  client:   Client,
  endpoint: String,
  timeout:  Duration,
}

#[derive(Deserialize)]
struct ReplyBody {
  reply: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
  error: Option<String>,
}

impl HttpCompletionClient {
  pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, endpoint: endpoint.into(), timeout })
  }

  fn transport(&self, e: reqwest::Error) -> CompletionError {
    if e.is_timeout() {
      CompletionError::Timeout(self.timeout)
    } else {
      CompletionError::Transport(e.to_string())
    }
  }
}

impl CompletionClient for HttpCompletionClient {
  async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
    let resp = self
      .client
      .post(&self.endpoint)
      .json(&request)
      .send()
      .await
      .map_err(|e| self.transport(e))?;

    let status = resp.status();
    let body = resp.bytes().await.map_err(|e| self.transport(e))?;
    debug!(%status, bytes = body.len(), "completion response");

    if !status.is_success() {
      let message = serde_json::from_slice::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.trim().is_empty());
      return Err(match message {
        Some(message) => CompletionError::Rejected { status: status.as_u16(), message },
        None => CompletionError::Status(status.as_u16()),
      });
    }

    let body: ReplyBody =
      serde_json::from_slice(&body).map_err(|e| CompletionError::Malformed(e.to_string()))?;
    body
      .reply
      .filter(|r| !r.trim().is_empty())
      .ok_or_else(|| CompletionError::Malformed("response has no reply".into()))
  }
}
