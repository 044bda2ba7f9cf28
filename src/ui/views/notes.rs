use crate::api::types::Note;
use crate::api::NotesService;
use crate::query::{Mutation, MutationState, Query, QueryState};
use crate::ui::components::{KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{note_state, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::NoteFormView;
use crate::view_state::NotesFilter;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// Which write the pending mutation is, for the footer message
#[derive(Debug, Clone, Copy)]
enum PendingWrite {
  Delete,
  Enable,
  Disable,
}

/// Home view: every note, with search, the enabled-only toggle and quick
/// enable/disable/delete.
pub struct NotesView {
  service: NotesService,
  query: Query<Vec<Note>>,
  filter: NotesFilter,
  search: SearchInput,
  list_state: ListState,
  write: Mutation<Note>,
  pending: Option<PendingWrite>,
  status: Option<String>,
}

impl NotesView {
  pub fn new(service: NotesService) -> Self {
    let query = service.queries.watch(service.queries.notes_options(None));

    Self {
      service,
      query,
      filter: NotesFilter::default(),
      search: SearchInput::new(),
      list_state: ListState::default(),
      write: Mutation::new(),
      pending: None,
      status: None,
    }
  }

  fn live(&self) -> &[Note] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn visible(&self) -> &[Note] {
    self.filter.visible(self.live())
  }

  fn selected(&self) -> Option<&Note> {
    self.list_state.selected().and_then(|i| self.visible().get(i))
  }

  fn apply_search(&mut self, text: &str) {
    let options = self.service.queries.notes_options(Some(text));
    self.query.set_options(options);
  }

  fn start_write(&mut self, kind: PendingWrite) {
    let Some(id) = self.selected().map(|n| n.id) else {
      return;
    };
    if self.write.is_loading() {
      return;
    }

    let mutations = self.service.mutations.clone();
    self.write.mutate(async move {
      match kind {
        PendingWrite::Delete => mutations.delete_note(id).await,
        PendingWrite::Enable => mutations.enable_note(id).await,
        PendingWrite::Disable => mutations.disable_note(id).await,
      }
    });
    self.pending = Some(kind);
    self.status = None;
  }

  fn title(&self) -> String {
    let mut title = String::from(" Notes");
    if !self.search.query().is_empty() {
      title.push_str(&format!(" /{}", self.search.query()));
    }
    if self.filter.is_enabled_only() {
      title.push_str(" [enabled only]");
    }

    match self.query.state() {
      QueryState::Loading if self.query.data().is_none() => title.push_str(" (loading...) "),
      QueryState::Error(e) => title.push_str(&format!(" (error: {}) ", e)),
      _ if self.query.is_fetching() => {
        title.push_str(&format!(" ({}, refreshing...) ", self.visible().len()))
      }
      _ => title.push_str(&format!(" ({}) ", self.visible().len())),
    }
    title
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.visible().len();
    ensure_valid_selection(&mut self.list_state, len);

    let block = Block::default()
      .title(self.title())
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 {
      let content = if self.query.data().is_none() && self.query.is_loading() {
        "Loading notes..."
      } else if self.query.is_error() {
        "Failed to load notes. Press 'r' to retry."
      } else if self.filter.is_enabled_only() {
        "No enabled notes. Press 'a' to show all."
      } else {
        "No notes yet. Press 'n' to write one."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let dim = self.query.is_previous_data();
    let items: Vec<ListItem> = self
      .visible()
      .iter()
      .map(|note| {
        let (state, color) = note_state(note.is_disabled);
        let line = Line::from(vec![
          Span::styled(format!("{:>4}", note.id), Style::default().fg(Color::Cyan)),
          Span::raw(" "),
          Span::styled(format!("{:<9}", state), Style::default().fg(color)),
          Span::raw(" "),
          Span::styled(
            format!("{:<30}", truncate(&note.title, 30)),
            Style::default().bold(),
          ),
          Span::raw(" "),
          Span::styled(truncate(&note.content, 60), Style::default().fg(Color::Gray)),
        ]);
        let item = ListItem::new(line);
        if dim {
          item.style(Style::default().add_modifier(Modifier::DIM))
        } else {
          item
        }
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  fn handle_search(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match self.search.handle_key(key) {
      KeyResult::Handled => Some(ViewAction::None),
      KeyResult::Event(SearchEvent::Changed(text)) => {
        self.apply_search(&text);
        Some(ViewAction::None)
      }
      KeyResult::Event(SearchEvent::Submitted) => Some(ViewAction::None),
      KeyResult::NotHandled => None,
    }
  }

  fn handle_navigation(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
        Some(ViewAction::None)
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
        Some(ViewAction::None)
      }
      _ => None,
    }
  }

  fn handle_actions(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('e') => {
        let live = self.query.data().cloned().unwrap_or_default();
        self.filter.show_enabled_only(&live);
        self.list_state.select(Some(0));
      }
      KeyCode::Char('a') => {
        self.filter.reset();
      }
      KeyCode::Char('t') => {
        let kind = match self.selected() {
          Some(note) if note.is_disabled => PendingWrite::Enable,
          Some(_) => PendingWrite::Disable,
          None => return Some(ViewAction::None),
        };
        self.start_write(kind);
      }
      KeyCode::Char('d') => self.start_write(PendingWrite::Delete),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('n') => {
        return Some(ViewAction::Push(Box::new(NoteFormView::create(
          self.service.clone(),
        ))))
      }
      KeyCode::Enter => {
        let id = self.selected().map(|n| n.id)?;
        return Some(ViewAction::Push(Box::new(NoteFormView::edit(
          self.service.clone(),
          id,
        ))));
      }
      KeyCode::Char('q') | KeyCode::Esc => return Some(ViewAction::Pop),
      _ => return None,
    }
    Some(ViewAction::None)
  }
}

impl View for NotesView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_search(key)
      .or_else(|| self.handle_navigation(key))
      .or_else(|| self.handle_actions(key))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    self.search.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Notes".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    self.query.poll();

    if self.write.poll() {
      self.status = match (self.write.state(), self.pending.take()) {
        (MutationState::Success(note), Some(kind)) => Some(match kind {
          PendingWrite::Delete => format!("Deleted \"{}\"", note.title),
          PendingWrite::Enable => format!("Enabled \"{}\"", note.title),
          PendingWrite::Disable => format!("Disabled \"{}\"", note.title),
        }),
        (MutationState::Error(e), _) => Some(format!("Write failed: {}", e)),
        _ => None,
      };
    }
    ViewAction::None
  }

  fn is_editing(&self) -> bool {
    self.search.is_active()
  }

  fn status(&self) -> Option<String> {
    self.status.clone()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "search").with_priority(20),
      ShortcutInfo::new("n", "new").with_priority(30),
      ShortcutInfo::new("e", "enabled only").with_priority(40),
      ShortcutInfo::new("a", "all").with_priority(41),
      ShortcutInfo::new("t", "toggle").with_priority(50),
      ShortcutInfo::new("d", "delete").with_priority(60),
      ShortcutInfo::new("r", "refresh").with_priority(70),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::fake::{note, FakeNotesApi};
  use crate::query::QueryCache;
  use crossterm::event::KeyModifiers;
  use std::sync::Arc;
  use std::time::Duration;

  fn key(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
  }

  async fn settle(view: &mut NotesView) {
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick();
  }

  async fn seeded_view() -> NotesView {
    let api = FakeNotesApi::with_notes(vec![
      note(1, "A", "aa", false),
      note(2, "B", "bb", true),
    ]);
    let mut view = NotesView::new(NotesService::new(Arc::new(api), QueryCache::default()));
    settle(&mut view).await;
    view
  }

  fn ids(view: &NotesView) -> Vec<u64> {
    view.visible().iter().map(|n| n.id).collect()
  }

  #[tokio::test]
  async fn test_enabled_only_toggle() {
    let mut view = seeded_view().await;
    assert_eq!(ids(&view), vec![1, 2]);

    view.handle_key(key('e'));
    assert_eq!(ids(&view), vec![1]);

    view.handle_key(key('a'));
    assert_eq!(ids(&view), vec![1, 2]);
  }

  #[tokio::test]
  async fn test_toggle_disables_selected_note() {
    let mut view = seeded_view().await;
    view.list_state.select(Some(0));

    view.handle_key(key('t'));
    settle(&mut view).await;
    assert_eq!(view.status().as_deref(), Some("Disabled \"A\""));

    // The invalidated list reloads in the background
    settle(&mut view).await;
    assert!(view.visible().iter().all(|n| n.is_disabled));
  }

  #[tokio::test]
  async fn test_delete_removes_note() {
    let mut view = seeded_view().await;
    view.list_state.select(Some(1));

    view.handle_key(key('d'));
    settle(&mut view).await;
    settle(&mut view).await;

    assert_eq!(ids(&view), vec![1]);
  }

  #[tokio::test]
  async fn test_search_keeps_previous_results_while_loading() {
    let mut view = seeded_view().await;

    view.handle_key(key('/'));
    assert!(view.is_editing());
    view.handle_key(key('b'));

    // New key is still loading; the old list stays visible
    assert!(view.query.is_previous_data());
    assert_eq!(ids(&view), vec![1, 2]);

    settle(&mut view).await;
    assert_eq!(ids(&view), vec![2]);
  }

  #[tokio::test]
  async fn test_enter_opens_editor() {
    let mut view = seeded_view().await;
    view.list_state.select(Some(0));
    assert!(matches!(
      view.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)),
      ViewAction::Push(_)
    ));
    assert!(matches!(view.handle_key(key('q')), ViewAction::Pop));
  }
}
