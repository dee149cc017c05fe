//! Sign-in view.

use ratatui::{
  Frame,
  layout::{Alignment, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::Paragraph,
};

use super::centred;
use crate::app::App;

pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let lines = vec![
    Line::from(Span::styled(
      app.title.clone(),
      Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )),
    Line::from(""),
    Line::from("Sign in to chat with your facility assistant."),
    Line::from(""),
    Line::from(Span::styled(
      "Press Enter to sign in",
      Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    )),
  ];
  f.render_widget(
    Paragraph::new(lines).alignment(Alignment::Center),
    centred(area, 5),
  );
}
