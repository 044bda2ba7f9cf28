use ratatui::prelude::Color;

/// Truncate a string to at most `max_len` characters, adding "..." if
/// truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Display label and color for a note's enabled state
pub fn note_state(is_disabled: bool) -> (&'static str, Color) {
  if is_disabled {
    ("disabled", Color::DarkGray)
  } else {
    ("enabled", Color::Green)
  }
}
