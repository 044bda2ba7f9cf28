pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::ListState;

/// Main draw function: header, current view, footer, then overlays
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Current view
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  let shortcuts = app.current_view().map(|v| v.shortcuts()).unwrap_or_default();
  renderfns::draw_header(frame, chunks[0], app.host(), &shortcuts);

  if let Some(view) = app.current_view_mut() {
    view.render(frame, chunks[1]);
  }

  let status = app.current_view().and_then(|v| v.status());
  renderfns::draw_footer(frame, chunks[2], &app.breadcrumb(), status.as_deref());

  app.command_input().render_overlay(frame, chunks[1]);
}

/// Keep a list selection inside `0..len`, selecting the first row when
/// there is something to select.
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  match state.selected() {
    _ if len == 0 => state.select(None),
    Some(i) if i >= len => state.select(Some(len - 1)),
    None => state.select(Some(0)),
    Some(_) => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_ensure_valid_selection() {
    let mut state = ListState::default();
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(0));

    state.select(Some(7));
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(2));

    ensure_valid_selection(&mut state, 0);
    assert_eq!(state.selected(), None);
  }
}
