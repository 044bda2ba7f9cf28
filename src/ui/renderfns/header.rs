use crate::ui::view::ShortcutInfo;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar with logo, API host, and the current view's shortcuts
pub fn draw_header(frame: &mut Frame, area: Rect, host: &str, shortcuts: &[ShortcutInfo]) {
  let mut spans = vec![
    Span::styled(" jot ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", host), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::raw(" "),
  ];
  spans.extend(shortcut_spans(shortcuts));

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

/// Keys highlighted, descriptions dimmed, lowest priority first
fn shortcut_spans(shortcuts: &[ShortcutInfo]) -> Vec<Span<'static>> {
  let mut sorted: Vec<&ShortcutInfo> = shortcuts.iter().collect();
  sorted.sort_by_key(|s| s.priority);

  sorted
    .into_iter()
    .enumerate()
    .flat_map(|(i, s)| {
      let gap = if i == 0 { "" } else { "  " };
      [
        Span::raw(gap),
        Span::styled(format!("<{}>", s.key), Style::default().fg(Color::Cyan)),
        Span::styled(format!(" {}", s.label), Style::default().fg(Color::DarkGray)),
      ]
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_shortcuts_sorted_by_priority() {
    let shortcuts = [
      ShortcutInfo::new("q", "back").with_priority(30),
      ShortcutInfo::new(":", "command").with_priority(10),
    ];
    let text: String = shortcut_spans(&shortcuts)
      .iter()
      .map(|s| s.content.clone())
      .collect();
    assert_eq!(text, "<:> command  <q> back");
  }
}
