//! Application state machine and event dispatcher.

use std::{sync::Arc, time::Duration};

use aloha_client::{ConversationLoop, SessionController, SessionState};
use aloha_core::profile::Category;
use aloha_store_sqlite::SqliteProfileStore;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use strum::IntoEnumIterator;
use tokio::sync::mpsc;
use tracing::debug;

use crate::{client::HttpCompletionClient, config::ClientConfig, identity::LocalIdentityProvider};

pub type Session = SessionController<LocalIdentityProvider, SqliteProfileStore>;
pub type Conversation = ConversationLoop<HttpCompletionClient>;

// ─── Screen ───────────────────────────────────────────────────────────────────

/// Which view is shown. Always derived from the session's gating state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
  /// Nothing determined yet.
  Loading,
  SignIn,
  Onboarding,
  Chat,
}

impl Screen {
  pub fn of(state: &SessionState) -> Self {
    match state {
      SessionState::Loading => Self::Loading,
      SessionState::Unauthenticated => Self::SignIn,
      SessionState::Onboarding { .. } => Self::Onboarding,
      SessionState::Registered { .. } => Self::Chat,
    }
  }
}

// ─── Onboarding form ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormStep {
  #[default]
  Category,
  Name,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnboardingForm {
  pub step:     FormStep,
  /// Highlighted entry of [`OnboardingForm::categories`].
  pub cursor:   usize,
  /// Set once step one is confirmed.
  pub category: Option<Category>,
  pub name:     String,
  /// Inline error from the last save attempt.
  pub error:    Option<String>,
  /// A save is in flight; the form ignores input until it reports back.
  pub saving:   bool,
}

impl OnboardingForm {
  pub fn categories() -> Vec<Category> { Category::iter().collect() }

  pub fn highlighted(&self) -> Category {
    Self::categories().get(self.cursor).copied().unwrap_or_default()
  }

  fn move_cursor(&mut self, forward: bool) {
    let n = Self::categories().len();
    self.cursor = if forward { (self.cursor + 1) % n } else { (self.cursor + n - 1) % n };
  }
}

// ─── Notices ──────────────────────────────────────────────────────────────────

/// Outcome of a session action that ran off the key handler.
#[derive(Debug)]
enum Notice {
  SignIn(Result<(), String>),
  /// The saved display name.
  Save(Result<String, String>),
  SignOut(Result<(), String>),
}

// ─── App ──────────────────────────────────────────────────────────────────────

/// Top-level application state.
pub struct App {
  pub session: Arc<Session>,

  /// The chat for the registered profile, with the profile it belongs to.
  pub chat: Option<(ChatKey, Conversation)>,

  pub form: OnboardingForm,

  /// Chat input buffer.
  pub input: String,

  /// Transcript lines scrolled back from the bottom.
  pub scroll_back: u16,

  /// One-line status message shown in the status bar.
  pub status_msg: String,

  /// Shown in the header when no profile is loaded.
  pub title: String,

  completion: Arc<HttpCompletionClient>,
  greeting:   String,
  timeout:    Duration,
  notices_tx: mpsc::UnboundedSender<Notice>,
  notices:    mpsc::UnboundedReceiver<Notice>,
}

/// Identifies which registered profile a conversation was opened for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatKey {
  pub owner_key: String,
  pub category:  Category,
}

impl App {
  pub fn new(session: Session, completion: HttpCompletionClient, config: &ClientConfig) -> Self {
    let (notices_tx, notices) = mpsc::unbounded_channel();
    Self {
      session: Arc::new(session),
      chat: None,
      form: OnboardingForm::default(),
      input: String::new(),
      scroll_back: 0,
      status_msg: String::new(),
      title: config.title.clone(),
      completion: Arc::new(completion),
      greeting: config.greeting.clone(),
      timeout: config.timeouts().completion,
      notices_tx,
      notices,
    }
  }

  pub fn screen(&self) -> Screen { Screen::of(&self.session.state()) }

  pub fn conversation(&self) -> Option<&Conversation> { self.chat.as_ref().map(|(_, c)| c) }

  /// Reconcile view state with the session. Called before every frame.
  ///
  /// Entering `Registered` opens a fresh conversation; leaving it drops the
  /// conversation and its input.
  pub fn sync(&mut self) {
    while let Ok(notice) = self.notices.try_recv() {
      self.apply(notice);
    }

    let state = self.session.state();

    let key = state.profile().map(|p| ChatKey {
      owner_key: p.owner_key.clone(),
      category:  p.category,
    });
    let current = self.chat.as_ref().map(|(k, _)| k);
    if key.as_ref() != current {
      self.chat = None;
      self.input.clear();
      self.scroll_back = 0;
      if let Some(key) = key {
        match ConversationLoop::new(self.completion.clone(), key.category, &self.greeting, self.timeout) {
          Ok(conversation) => {
            debug!(owner = %key.owner_key, category = %key.category, "conversation opened");
            self.chat = Some((key, conversation));
          }
          Err(e) => self.status_msg = format!("Error: {e}"),
        }
      }
    }

    if !matches!(state, SessionState::Onboarding { .. }) {
      self.form = OnboardingForm::default();
    }
  }

  fn apply(&mut self, notice: Notice) {
    match notice {
      Notice::SignIn(Ok(())) => self.status_msg.clear(),
      Notice::SignIn(Err(e)) => self.status_msg = format!("Sign-in failed: {e}"),
      Notice::Save(Ok(name)) => {
        self.form.saving = false;
        self.status_msg = format!("Registered {name}");
      }
      Notice::Save(Err(e)) => {
        self.form.saving = false;
        self.status_msg.clear();
        self.form.error = Some(e);
      }
      Notice::SignOut(Ok(())) => self.status_msg = "Signed out".into(),
      Notice::SignOut(Err(e)) => self.status_msg = format!("Signed out locally ({e})"),
    }
  }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event. Returns `true` to continue, `false` to quit.
  pub async fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    // Global: Ctrl-C quits from anywhere.
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      return Ok(false);
    }

    match self.screen() {
      Screen::Loading => Ok(key.code != KeyCode::Char('q')),
      Screen::SignIn => Ok(self.handle_sign_in_key(key)),
      Screen::Onboarding => Ok(self.handle_onboarding_key(key)),
      Screen::Chat => Ok(self.handle_chat_key(key)),
    }
  }

  fn handle_sign_in_key(&mut self, key: KeyEvent) -> bool {
    match key.code {
      KeyCode::Char('q') => return false,
      KeyCode::Enter => {
        self.status_msg = "Signing in…".into();
        let session = self.session.clone();
        let tx = self.notices_tx.clone();
        tokio::spawn(async move {
          let result = session.begin_sign_in().await.map_err(|e| e.to_string());
          tx.send(Notice::SignIn(result)).ok();
        });
      }
      _ => {}
    }
    true
  }

  fn handle_onboarding_key(&mut self, key: KeyEvent) -> bool {
    if self.form.saving {
      return true;
    }
    match self.form.step {
      FormStep::Category => match key.code {
        KeyCode::Char('q') => return false,
        KeyCode::Up | KeyCode::Left | KeyCode::Char('k') | KeyCode::Char('h') => {
          self.form.move_cursor(false);
        }
        KeyCode::Down | KeyCode::Right | KeyCode::Tab | KeyCode::Char('j') | KeyCode::Char('l') => {
          self.form.move_cursor(true);
        }
        KeyCode::Enter | KeyCode::Char(' ') => {
          self.form.category = Some(self.form.highlighted());
          self.form.step = FormStep::Name;
          self.form.error = None;
        }
        _ => {}
      },
      FormStep::Name => match key.code {
        KeyCode::Esc => {
          self.form.step = FormStep::Category;
          self.form.error = None;
        }
        KeyCode::Enter => self.save_profile(),
        KeyCode::Backspace => {
          self.form.name.pop();
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
          self.form.name.push(c);
        }
        _ => {}
      },
    }
    true
  }

  /// Start writing the profile. The result arrives as a [`Notice`].
  fn save_profile(&mut self) {
    let Some(category) = self.form.category else {
      self.form.step = FormStep::Category;
      return;
    };
    if self.form.name.trim().is_empty() {
      self.form.error = Some("Enter the facility name.".into());
      return;
    }

    self.form.saving = true;
    self.form.error = None;
    self.status_msg = "Saving…".into();
    let session = self.session.clone();
    let tx = self.notices_tx.clone();
    let name = self.form.name.clone();
    tokio::spawn(async move {
      let result = session
        .save_profile(category, &name)
        .await
        .map(|profile| profile.display_name)
        .map_err(|e| e.to_string());
      tx.send(Notice::Save(result)).ok();
    });
  }

  fn handle_chat_key(&mut self, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
      if key.code == KeyCode::Char('l') {
        self.sign_out();
      }
      return true;
    }

    let Some((_, conversation)) = &self.chat else {
      return true;
    };
    match key.code {
      KeyCode::PageUp => self.scroll_back = self.scroll_back.saturating_add(5),
      KeyCode::PageDown => self.scroll_back = self.scroll_back.saturating_sub(5),
      // Input is disabled while a request is in flight.
      _ if conversation.is_pending() => {}
      KeyCode::Enter => {
        if let Some(turn) = conversation.submit(&mut self.input) {
          self.scroll_back = 0;
          tokio::spawn(async move {
            turn.run().await;
          });
        }
      }
      KeyCode::Backspace => {
        self.input.pop();
      }
      KeyCode::Char(c) => self.input.push(c),
      _ => {}
    }
    true
  }

  /// The controller clears the session as soon as the task first runs; the
  /// provider's answer arrives later as a [`Notice`].
  fn sign_out(&mut self) {
    self.status_msg = "Signing out…".into();
    let session = self.session.clone();
    let tx = self.notices_tx.clone();
    tokio::spawn(async move {
      let result = session.sign_out().await.map_err(|e| e.to_string());
      tx.send(Notice::SignOut(result)).ok();
    });
  }
}
