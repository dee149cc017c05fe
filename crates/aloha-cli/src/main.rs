//! `aloha`: terminal client for the Aloha facility assistant.
//!
//! # Usage
//!
//! ```
//! aloha --config ~/.config/aloha/aloha.toml
//! ALOHA_COMPLETION_URL=http://localhost:3000/api/chat aloha
//! ```
//!
//! Logs go to `log_file` (the terminal belongs to the UI). Set `RUST_LOG`
//! to change the level.

mod app;
mod client;
mod config;
mod identity;
mod ui;

use std::{io, path::PathBuf, sync::Arc, time::Duration};

use aloha_client::SessionController;
use aloha_store_sqlite::SqliteProfileStore;
use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use client::HttpCompletionClient;
use crate::config::{ClientConfig, expand_tilde};
use crossterm::{
  event::{self, Event},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use identity::LocalIdentityProvider;
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "aloha", version, about = "Terminal client for the Aloha facility assistant")]
struct Args {
  /// Path to the TOML configuration file.
  #[arg(short, long, value_name = "FILE", default_value = "aloha.toml")]
  config: PathBuf,

  /// Completion endpoint URL (overrides `completion_url`).
  #[arg(long)]
  url: Option<String>,

  /// SQLite profile database (overrides `store_path`).
  #[arg(long, value_name = "FILE")]
  store: Option<PathBuf>,

  /// Log file (overrides `log_file`).
  #[arg(long, value_name = "FILE")]
  log_file: Option<PathBuf>,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  // Flags override the config file and environment.
  let mut cfg = ClientConfig::load(&args.config)?;
  if let Some(url) = args.url {
    cfg.completion_url = url;
  }
  if let Some(store) = args.store {
    cfg.store_path = expand_tilde(&store);
  }
  if let Some(log_file) = args.log_file {
    cfg.log_file = expand_tilde(&log_file);
  }

  init_tracing(&cfg)?;
  info!(endpoint = %cfg.completion_url, store = %cfg.store_path.display(), "starting aloha");

  if let Some(dir) = cfg.store_path.parent() {
    std::fs::create_dir_all(dir)
      .with_context(|| format!("creating store directory {}", dir.display()))?;
  }
  let store = SqliteProfileStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {}", cfg.store_path.display()))?;
  let provider = LocalIdentityProvider::open(&cfg.session_path, cfg.account.clone())
    .context("failed to open session file")?;
  info!(session = %provider.path().display(), "identity provider ready");

  let session = SessionController::start(Arc::new(provider), Arc::new(store), cfg.timeouts());
  let completion = HttpCompletionClient::new(cfg.completion_url.clone(), cfg.timeouts().completion)?;
  let mut app = App::new(session, completion, &cfg);

  // Set up the terminal.
  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  let run_result = run_event_loop(&mut terminal, &mut app).await;

  // Restore terminal regardless of result.
  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  info!("exiting");
  run_result
}

fn init_tracing(cfg: &ClientConfig) -> Result<()> {
  if let Some(dir) = cfg.log_file.parent() {
    std::fs::create_dir_all(dir)
      .with_context(|| format!("creating log directory {}", dir.display()))?;
  }
  let file = std::fs::OpenOptions::new()
    .create(true)
    .append(true)
    .open(&cfg.log_file)
    .with_context(|| format!("opening log file {}", cfg.log_file.display()))?;

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::sync::Mutex::new(file))
    .with_ansi(false)
    .init();
  Ok(())
}

// ─── Event loop ───────────────────────────────────────────────────────────────

async fn run_event_loop(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App,
) -> Result<()> {
  loop {
    app.sync();
    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    // Poll for an event, yielding control to tokio while waiting.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(50))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    if let Some(Event::Key(key)) = maybe_event {
      let cont = app.handle_key(key).await?;
      if !cont {
        break;
      }
    }
  }

  Ok(())
}
