//! TUI rendering: picks the view for the current screen.

pub mod chat;
pub mod onboarding;
pub mod sign_in;

use chrono::Local;
use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Paragraph},
};

use crate::app::{App, FormStep, Screen};

// ─── Root draw ────────────────────────────────────────────────────────────────

/// Main draw function called each frame.
pub fn draw(f: &mut Frame, app: &App) {
  let area = f.area();
  let screen = app.screen();

  // Vertical stack: header, body, status bar.
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // header
      Constraint::Min(0),    // body
      Constraint::Length(1), // status bar
    ])
    .split(area);

  draw_header(f, rows[0], app);
  match screen {
    Screen::Loading => draw_loading(f, rows[1]),
    Screen::SignIn => sign_in::draw(f, rows[1], app),
    Screen::Onboarding => onboarding::draw(f, rows[1], app),
    Screen::Chat => chat::draw(f, rows[1], app),
  }
  draw_status(f, rows[2], app, screen);
}

// ─── Header ───────────────────────────────────────────────────────────────────

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
  let state = app.session.state();
  let name = state
    .profile()
    .map(|p| p.display_name.clone())
    .unwrap_or_else(|| app.title.clone());
  let date = Local::now().format("%Y-%m-%d").to_string();

  let left = Span::styled(
    format!(" {name}"),
    Style::default()
      .fg(Color::White)
      .add_modifier(Modifier::BOLD),
  );
  let right = Span::styled(
    format!("{date} "),
    Style::default().fg(Color::Gray),
  );

  let pad = area
    .width
    .saturating_sub(left.width() as u16)
    .saturating_sub(right.width() as u16);

  let line = Line::from(vec![left, Span::raw(" ".repeat(pad as usize)), right]);
  let block = Block::default().style(Style::default().bg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(Paragraph::new(line), inner);
}

fn draw_loading(f: &mut Frame, area: Rect) {
  let centre = centred(area, 3);
  f.render_widget(
    Paragraph::new("Loading…")
      .alignment(Alignment::Center)
      .style(Style::default().fg(Color::DarkGray)),
    centre,
  );
}

/// A full-width strip of `height` rows in the vertical middle of `area`.
pub(crate) fn centred(area: Rect, height: u16) -> Rect {
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Fill(1),
      Constraint::Length(height),
      Constraint::Fill(1),
    ])
    .split(area);
  rows[1]
}

// ─── Status bar ───────────────────────────────────────────────────────────────

fn draw_status(f: &mut Frame, area: Rect, app: &App, screen: Screen) {
  let (mode_label, hints) = match screen {
    Screen::Loading => ("LOADING", "q quit"),
    Screen::SignIn => ("SIGN IN", "Enter sign in  q quit"),
    Screen::Onboarding if app.form.step == FormStep::Category => (
      "SETUP",
      "↑↓/jk choose  Enter next  q quit",
    ),
    Screen::Onboarding => ("SETUP", "Type the name  Enter save  Esc back"),
    Screen::Chat if app.conversation().is_some_and(|c| c.is_pending()) => (
      "WAITING",
      "PgUp/PgDn scroll  Ctrl-L sign out  Ctrl-C quit",
    ),
    Screen::Chat => (
      "CHAT",
      "Enter send  PgUp/PgDn scroll  Ctrl-L sign out  Ctrl-C quit",
    ),
  };

  let status = if app.status_msg.is_empty() {
    hints.to_string()
  } else {
    app.status_msg.clone()
  };

  let mode_span = Span::styled(
    format!(" {mode_label} "),
    Style::default()
      .fg(Color::Black)
      .bg(Color::Cyan)
      .add_modifier(Modifier::BOLD),
  );
  let hint_span = Span::styled(
    format!("  {status}"),
    Style::default().fg(Color::DarkGray),
  );

  f.render_widget(
    Paragraph::new(Line::from(vec![mode_span, hint_span]))
      .style(Style::default().bg(Color::Black)),
    area,
  );
}
