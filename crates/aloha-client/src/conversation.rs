//! The conversation loop: an append-only transcript and a single-flight
//! request lifecycle against the completion endpoint.
//!
//! Submission is split in two. [`ConversationLoop::submit`] is synchronous:
//! it applies the guard, appends the user turn, clears the caller's input
//! buffer and marks the request pending, all under the transcript lock.
//! [`Turn::run`] then performs the request and settles it. Because the guard
//! is checked and set atomically, the transcript always alternates user and
//! assistant turns after the greeting.

use std::{sync::Arc, time::Duration};

use aloha_core::{
  completion::{CompletionClient, CompletionError, CompletionRequest},
  message::Message,
  profile::Category,
};
use chrono::{DateTime, Utc};
use tokio::{sync::watch, time::timeout};
use tracing::{debug, warn};

/// Snapshot of the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
  /// In conversation order; the first entry is the greeting.
  pub messages: Vec<Message>,
  pub pending:  Option<PendingRequest>,
}

impl Transcript {
  pub fn is_pending(&self) -> bool { self.pending.is_some() }
}

/// The single in-flight request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
  pub submitted_text: String,
  pub started_at:     DateTime<Utc>,
}

/// How a turn settled. Failures are already in the transcript either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
  Replied,
  Failed(CompletionError),
}

// ─── Loop ────────────────────────────────────────────────────────────────────

/// Owns the transcript. Cloning yields another handle to the same loop.
pub struct ConversationLoop<C> {
  inner: Arc<Inner<C>>,
}

impl<C> Clone for ConversationLoop<C> {
  fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

struct Inner<C> {
  client:     Arc<C>,
  category:   Category,
  timeout:    Duration,
  transcript: watch::Sender<Transcript>,
}

impl<C> Inner<C> {
  /// Append the assistant turn and clear the pending marker.
  fn settle(&self, message: Message) {
    self.transcript.send_modify(|t| {
      t.messages.push(message);
      t.pending = None;
    });
  }
}

impl<C: CompletionClient> ConversationLoop<C> {
  /// Start a conversation seeded with an assistant-authored `greeting`.
  ///
  /// `category` is the context sent with every request.
  pub fn new(
    client: Arc<C>,
    category: Category,
    greeting: &str,
    timeout: Duration,
  ) -> aloha_core::Result<Self> {
    let (transcript, _) = watch::channel(Transcript {
      messages: vec![Message::assistant(greeting)?],
      pending:  None,
    });
    Ok(Self {
      inner: Arc::new(Inner { client, category, timeout, transcript }),
    })
  }

  pub fn transcript(&self) -> Transcript { self.inner.transcript.borrow().clone() }

  pub fn subscribe(&self) -> watch::Receiver<Transcript> { self.inner.transcript.subscribe() }

  pub fn is_pending(&self) -> bool { self.inner.transcript.borrow().is_pending() }

  pub fn category(&self) -> Category { self.inner.category }

  /// Accept the text in `input` as the next user turn.
  ///
  /// Returns `None` and leaves `input` untouched when the trimmed text is
  /// empty or a request is already pending. Otherwise the user turn is
  /// appended, `input` is cleared and the returned [`Turn`] must be run to
  /// issue the request.
  pub fn submit(&self, input: &mut String) -> Option<Turn<C>> {
    let message = Message::user(input.trim()).ok()?;
    let text = message.text.clone();

    let accepted = self.inner.transcript.send_if_modified(|t| {
      if t.pending.is_some() {
        return false;
      }
      t.pending = Some(PendingRequest {
        submitted_text: message.text.clone(),
        started_at:     Utc::now(),
      });
      t.messages.push(message);
      true
    });
    if !accepted {
      debug!("request already pending; submission ignored");
      return None;
    }

    input.clear();
    Some(Turn { inner: self.inner.clone(), text, settled: false })
  }

  /// Submit `text` and run the resulting turn to completion.
  #[cfg(test)]
  pub(crate) async fn send(&self, text: &str) -> Option<TurnOutcome> {
    let mut buffer = text.to_owned();
    let turn = self.submit(&mut buffer)?;
    Some(turn.run().await)
  }
}

// ─── Turn ────────────────────────────────────────────────────────────────────

/// An accepted submission whose request has not settled yet.
///
/// Dropping an unfinished turn settles it as abandoned, so the pending
/// marker is always cleared.
#[must_use = "the request is only issued when the turn is run"]
pub struct Turn<C> {
  inner:   Arc<Inner<C>>,
  text:    String,
  settled: bool,
}

impl<C: CompletionClient> Turn<C> {
  /// Issue the request and append the reply, or an error rendering of the
  /// failure, to the transcript.
  pub async fn run(mut self) -> TurnOutcome {
    let request = CompletionRequest {
      message:       self.text.clone(),
      facility_type: self.inner.category,
    };
    let limit = self.inner.timeout;
    let result = match timeout(limit, self.inner.client.complete(request)).await {
      Ok(result) => result,
      Err(_) => Err(CompletionError::Timeout(limit)),
    };

    let result = result.and_then(|reply| {
      Message::assistant(reply).map_err(|_| CompletionError::Malformed("empty reply".into()))
    });
    let (message, outcome) = match result {
      Ok(reply) => (reply, TurnOutcome::Replied),
      Err(e) => {
        warn!(error = %e, "completion failed");
        (Message::failure(&e), TurnOutcome::Failed(e))
      }
    };

    self.inner.settle(message);
    self.settled = true;
    outcome
  }
}

impl<C> Drop for Turn<C> {
  fn drop(&mut self) {
    if !self.settled {
      debug!("turn dropped before settling");
      self.inner.settle(Message::failure("request abandoned"));
    }
  }
}

#[cfg(test)]
mod tests {
  use aloha_core::message::Speaker;

  use super::*;
  use crate::testing::{FakeCompletion, eventually};

  const GREETING: &str = "Hello! How can I help?";

  fn convo(client: &Arc<FakeCompletion>) -> ConversationLoop<FakeCompletion> {
    ConversationLoop::new(
      client.clone(),
      Category::Elderly,
      GREETING,
      Duration::from_millis(200),
    )
    .unwrap()
  }

  fn said(speaker: Speaker, text: &str) -> Message {
    Message { speaker, text: text.into(), failed: false }
  }

  #[test]
  fn starts_with_greeting_only() {
    let client = Arc::new(FakeCompletion::silent());
    let t = convo(&client).transcript();
    assert_eq!(t.messages, vec![said(Speaker::Assistant, GREETING)]);
    assert!(!t.is_pending());
  }

  #[test]
  fn blank_greeting_is_rejected() {
    let client = Arc::new(FakeCompletion::silent());
    let result = ConversationLoop::new(client, Category::Child, "  ", Duration::from_secs(1));
    assert!(matches!(result, Err(aloha_core::Error::EmptyMessage)));
  }

  #[tokio::test]
  async fn submit_then_reply() {
    let client = Arc::new(FakeCompletion::replying(vec![Ok("Hi there".into())]).gated());
    let convo = convo(&client);

    let mut input = String::from("Hello");
    let turn = convo.submit(&mut input).expect("accepted");
    assert!(input.is_empty());
    assert!(convo.is_pending());
    let t = convo.transcript();
    assert_eq!(t.messages.last(), Some(&said(Speaker::User, "Hello")));
    assert_eq!(t.pending.as_ref().unwrap().submitted_text, "Hello");

    let running = tokio::spawn(turn.run());
    client.release();
    assert_eq!(running.await.unwrap(), TurnOutcome::Replied);

    let t = convo.transcript();
    assert_eq!(t.messages, vec![
      said(Speaker::Assistant, GREETING),
      said(Speaker::User, "Hello"),
      said(Speaker::Assistant, "Hi there"),
    ]);
    assert!(!t.is_pending());
    assert_eq!(client.requests(), vec![CompletionRequest {
      message:       "Hello".into(),
      facility_type: Category::Elderly,
    }]);
  }

  #[tokio::test]
  async fn failure_is_rendered_inline_and_next_submit_proceeds() {
    let client = Arc::new(FakeCompletion::replying(vec![
      Err(CompletionError::Rejected { status: 429, message: "rate limited".into() }),
      Ok("Back again".into()),
    ]));
    let convo = convo(&client);

    let outcome = convo.send("Hello").await.expect("accepted");
    assert!(matches!(outcome, TurnOutcome::Failed(CompletionError::Rejected { .. })));
    let t = convo.transcript();
    let last = t.messages.last().unwrap();
    assert_eq!(last.speaker, Speaker::Assistant);
    assert!(last.failed);
    assert!(last.text.contains("rate limited"), "{}", last.text);
    assert!(!t.is_pending());

    assert_eq!(convo.send("Again").await, Some(TurnOutcome::Replied));
    assert_eq!(convo.transcript().messages.last().unwrap().text, "Back again");
  }

  #[tokio::test]
  async fn whitespace_only_is_ignored() {
    let client = Arc::new(FakeCompletion::replying(vec![Ok("unused".into())]));
    let convo = convo(&client);

    let mut input = String::from("   \t ");
    assert!(convo.submit(&mut input).is_none());
    assert_eq!(input, "   \t ");
    assert_eq!(convo.transcript().messages.len(), 1);
    assert!(client.requests().is_empty());
  }

  #[tokio::test]
  async fn submission_while_pending_is_ignored() {
    let client = Arc::new(FakeCompletion::replying(vec![Ok("first".into())]).gated());
    let convo = convo(&client);

    let mut input = String::from("one");
    let turn = convo.submit(&mut input).unwrap();
    let running = tokio::spawn(turn.run());
    eventually(|| client.requests().len() == 1).await;

    let mut second = String::from("two");
    assert!(convo.submit(&mut second).is_none());
    assert_eq!(second, "two");
    assert_eq!(convo.transcript().messages.len(), 2);

    client.release();
    running.await.unwrap();
    assert_eq!(client.requests().len(), 1);
    assert_eq!(convo.transcript().messages.len(), 3);
  }

  #[tokio::test]
  async fn sequential_turns_alternate() {
    let client = Arc::new(FakeCompletion::replying(
      (1..=3).map(|n| Ok(format!("reply {n}"))).collect(),
    ));
    let convo = convo(&client);

    for n in 1..=3 {
      assert_eq!(convo.send(&format!("  user {n} ")).await, Some(TurnOutcome::Replied));
    }

    let mut expected = vec![said(Speaker::Assistant, GREETING)];
    for n in 1..=3 {
      expected.push(said(Speaker::User, &format!("user {n}")));
      expected.push(said(Speaker::Assistant, &format!("reply {n}")));
    }
    assert_eq!(convo.transcript().messages, expected);
  }

  #[tokio::test]
  async fn silent_endpoint_times_out() {
    let client = Arc::new(FakeCompletion::silent());
    let convo = ConversationLoop::new(
      client.clone(),
      Category::Child,
      GREETING,
      Duration::from_millis(20),
    )
    .unwrap();

    let outcome = convo.send("Hello").await.unwrap();
    assert!(matches!(outcome, TurnOutcome::Failed(CompletionError::Timeout(_))));
    let t = convo.transcript();
    assert!(t.messages.last().unwrap().failed);
    assert!(!t.is_pending());
  }

  #[tokio::test]
  async fn empty_reply_is_malformed() {
    let client = Arc::new(FakeCompletion::replying(vec![Ok("  ".into())]));
    let convo = convo(&client);

    let outcome = convo.send("Hello").await.unwrap();
    assert!(matches!(outcome, TurnOutcome::Failed(CompletionError::Malformed(_))));
  }

  #[tokio::test]
  async fn dropped_turn_clears_pending() {
    let client = Arc::new(FakeCompletion::silent());
    let convo = convo(&client);

    let mut input = String::from("Hello");
    let turn = convo.submit(&mut input).unwrap();
    assert!(convo.is_pending());
    drop(turn);

    let t = convo.transcript();
    assert!(!t.is_pending());
    assert!(t.messages.last().unwrap().text.contains("abandoned"));
    assert!(client.requests().is_empty());
  }
}
