//! Facility registration: pick a category, then name the facility.

use aloha_core::profile::Category;
use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph},
};

use crate::app::{App, FormStep, OnboardingForm};

pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let form = &app.form;
  let step = match form.step {
    FormStep::Category => 1,
    FormStep::Name => 2,
  };
  let block = Block::default()
    .title(format!(" Register your facility ({step}/2) "))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);

  let mut lines = match form.step {
    FormStep::Category => category_lines(form),
    FormStep::Name => name_lines(form),
  };

  if let Some(error) = &form.error {
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
      error.clone(),
      Style::default().fg(Color::Red),
    )));
  }

  f.render_widget(Paragraph::new(lines), inner);
}

fn category_lines(form: &OnboardingForm) -> Vec<Line<'static>> {
  let mut lines = vec![Line::from("Who does your facility care for?"), Line::from("")];
  for (i, category) in OnboardingForm::categories().into_iter().enumerate() {
    let selected = i == form.cursor;
    let marker = if selected { "▶ " } else { "  " };
    let style = if selected {
      Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
      Style::default()
    };
    lines.push(Line::from(Span::styled(format!("{marker}{}", label(category)), style)));
  }
  lines
}

fn name_lines(form: &OnboardingForm) -> Vec<Line<'static>> {
  let category = form.category.map(label).unwrap_or_default();
  let tail = if form.saving {
    Span::styled("  saving…", Style::default().fg(Color::DarkGray))
  } else {
    Span::styled("█", Style::default().fg(Color::Cyan))
  };
  vec![
    Line::from(Span::styled(
      format!("Category: {category}"),
      Style::default().fg(Color::DarkGray),
    )),
    Line::from(""),
    Line::from("Facility name:"),
    Line::from(vec![
      Span::styled("> ", Style::default().fg(Color::Cyan)),
      Span::raw(form.name.clone()),
      tail,
    ]),
  ]
}

fn label(category: Category) -> &'static str {
  match category {
    Category::Child => "Child care",
    Category::Elderly => "Elderly care",
  }
}
