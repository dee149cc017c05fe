//! Chat view: transcript above, input line below.

use aloha_core::message::{Message, Speaker};
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::app::App;

pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let Some(conversation) = app.conversation() else {
    return;
  };
  let transcript = conversation.transcript();
  let pending = transcript.is_pending();

  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([Constraint::Min(0), Constraint::Length(3)])
    .split(area);

  // Transcript.
  let block = Block::default()
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(rows[0]);
  f.render_widget(block, rows[0]);

  let mut lines: Vec<Line> = Vec::new();
  for message in &transcript.messages {
    lines.extend(message_lines(message));
    lines.push(Line::from(""));
  }
  if pending {
    lines.push(Line::from(Span::styled(
      "assistant is thinking…",
      Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    )));
  }

  // Keep the newest lines in view unless scrolled back.
  let rendered = wrapped_height(&lines, inner.width);
  let bottom = rendered.saturating_sub(inner.height);
  let offset = bottom.saturating_sub(app.scroll_back);
  f.render_widget(
    Paragraph::new(lines).wrap(Wrap { trim: false }).scroll((offset, 0)),
    inner,
  );

  // Input.
  let input_style = if pending {
    Style::default().fg(Color::DarkGray)
  } else {
    Style::default().fg(Color::White)
  };
  let input = Block::default()
    .title(if pending { " waiting for reply " } else { " message " })
    .borders(Borders::ALL)
    .border_style(input_style);
  let mut spans = vec![Span::styled(app.input.clone(), input_style)];
  if !pending {
    spans.push(Span::styled("█", Style::default().fg(Color::Cyan)));
  }
  f.render_widget(Paragraph::new(Line::from(spans)).block(input), rows[1]);
}

fn message_lines(message: &Message) -> Vec<Line<'static>> {
  let (who, who_style) = match message.speaker {
    Speaker::User => ("you", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
    Speaker::Assistant => ("assistant", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
  };
  let text_style = if message.failed {
    Style::default().fg(Color::Red)
  } else {
    Style::default()
  };

  let mut lines = vec![Line::from(Span::styled(who, who_style))];
  lines.extend(
    message
      .text
      .lines()
      .map(|l| Line::from(Span::styled(l.to_owned(), text_style))),
  );
  lines
}

/// Rows `lines` occupy when wrapped to `width` columns.
fn wrapped_height(lines: &[Line], width: u16) -> u16 {
  let width = usize::from(width.max(1));
  let rows: usize = lines.iter().map(|l| l.width().max(1).div_ceil(width)).sum();
  u16::try_from(rows).unwrap_or(u16::MAX)
}
