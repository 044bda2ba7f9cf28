use crate::api::types::Note;
use crate::api::NotesService;
use crate::query::{Mutation, MutationState, Query};
use crate::ui::components::TextInput;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::validation::{validate_note, Field, ValidationError};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Form for writing a new note or editing an existing one.
///
/// Editing waits for `note(id)` before filling the fields. Validation and
/// API errors keep the form open; a successful write closes it.
pub struct NoteFormView {
  service: NotesService,
  editing: Option<u64>,
  note: Option<Query<Note>>,
  prefilled: bool,
  title: TextInput,
  content: TextInput,
  focus: Field,
  errors: Vec<ValidationError>,
  submit: Mutation<Note>,
}

impl NoteFormView {
  pub fn create(service: NotesService) -> Self {
    Self::new(service, None)
  }

  pub fn edit(service: NotesService, id: u64) -> Self {
    Self::new(service, Some(id))
  }

  fn new(service: NotesService, editing: Option<u64>) -> Self {
    let note = editing.map(|id| service.queries.watch(service.queries.note_options(id)));

    let mut view = Self {
      service,
      editing,
      note,
      prefilled: editing.is_none(),
      title: TextInput::new(),
      content: TextInput::new(),
      focus: Field::Title,
      errors: Vec::new(),
      submit: Mutation::new(),
    };
    view.prefill();
    view
  }

  /// Copy the loaded note into the inputs, once
  fn prefill(&mut self) {
    if self.prefilled {
      return;
    }
    if let Some(note) = self.note.as_ref().and_then(|q| q.data()) {
      self.title.set_value(&note.title);
      self.content.set_value(&note.content);
      self.prefilled = true;
    }
  }

  fn focused(&mut self) -> &mut TextInput {
    match self.focus {
      Field::Title => &mut self.title,
      Field::Content => &mut self.content,
    }
  }

  fn switch_focus(&mut self) {
    self.focus = match self.focus {
      Field::Title => Field::Content,
      Field::Content => Field::Title,
    };
  }

  fn submit(&mut self) {
    if self.submit.is_loading() || !self.prefilled {
      return;
    }

    let new_note = match validate_note(self.title.value(), self.content.value()) {
      Ok(note) => note,
      Err(errors) => {
        if let Some(first) = errors.first() {
          self.focus = first.field();
        }
        self.errors = errors;
        return;
      }
    };
    self.errors.clear();

    let mutations = self.service.mutations.clone();
    match self.editing {
      Some(id) => {
        let note = Note {
          id,
          title: new_note.title,
          content: new_note.content,
          is_disabled: false,
        };
        self
          .submit
          .mutate(async move { mutations.update_note(note).await });
      }
      None => self
        .submit
        .mutate(async move { mutations.create_note(new_note).await.map(|c| c.note) }),
    }
  }

  fn field_error(&self, field: Field) -> Option<&ValidationError> {
    self.errors.iter().find(|e| e.field() == field)
  }

  fn render_field(&self, frame: &mut Frame, area: Rect, field: Field, input: &TextInput) {
    let focused = self.focus == field;
    let border = if self.field_error(field).is_some() {
      Color::Red
    } else if focused {
      Color::Yellow
    } else {
      Color::Blue
    };

    let block = Block::default()
      .title(format!(" {} ", field))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(border));

    let line = if focused {
      let (before, after) = input.split_at_cursor();
      Line::from(vec![
        Span::raw(before),
        Span::styled("_", Style::default().fg(Color::Yellow)),
        Span::raw(after),
      ])
    } else {
      Line::raw(input.value())
    };

    frame.render_widget(Paragraph::new(line).block(block), area);
  }

  fn message(&self) -> Option<(String, Color)> {
    if let Some(query) = &self.note {
      if !self.prefilled {
        return Some(match query.error() {
          Some(e) if e.is_not_found() => ("Note not found.".to_string(), Color::Red),
          Some(e) => (format!("Failed to load note: {}", e), Color::Red),
          None => ("Loading note...".to_string(), Color::DarkGray),
        });
      }
    }

    if !self.errors.is_empty() {
      let text = self
        .errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n");
      return Some((text, Color::Red));
    }

    if self.submit.is_loading() {
      return Some(("Saving...".to_string(), Color::DarkGray));
    }
    self
      .submit
      .error()
      .map(|e| (format!("Save failed: {}", e), Color::Red))
  }
}

impl View for NoteFormView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Esc => return ViewAction::Pop,
      KeyCode::Tab | KeyCode::BackTab => self.switch_focus(),
      KeyCode::Enter => self.submit(),
      _ => {
        // A failed save stays on screen until the user edits again
        if self.submit.error().is_some() {
          self.submit.reset();
        }
        self.focused().handle_key(key);
      }
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let heading = match self.editing {
      Some(id) => format!(" Edit note {} ", id),
      None => " New note ".to_string(),
    };
    let block = Block::default()
      .title(heading)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(3), // Title
        Constraint::Length(3), // Content
        Constraint::Min(1),    // Errors and status
      ])
      .split(inner);

    self.render_field(frame, chunks[0], Field::Title, &self.title);
    self.render_field(frame, chunks[1], Field::Content, &self.content);

    if let Some((text, color)) = self.message() {
      let paragraph = Paragraph::new(text)
        .style(Style::default().fg(color))
        .wrap(Wrap { trim: false });
      frame.render_widget(paragraph, chunks[2]);
    }
  }

  fn breadcrumb_label(&self) -> String {
    match self.editing {
      Some(id) => format!("Edit [{}]", id),
      None => "New".to_string(),
    }
  }

  fn tick(&mut self) -> ViewAction {
    if let Some(query) = &mut self.note {
      query.poll();
    }
    self.prefill();

    if self.submit.poll() {
      if let MutationState::Success(note) = self.submit.state() {
        tracing::debug!(id = note.id, "note form saved");
        return ViewAction::Pop;
      }
    }
    ViewAction::None
  }

  fn is_editing(&self) -> bool {
    true
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("tab", "next field").with_priority(10),
      ShortcutInfo::new("enter", "save").with_priority(20),
      ShortcutInfo::new("esc", "cancel").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::fake::{note, FakeNotesApi};
  use crate::api::ApiError;
  use crate::query::QueryCache;
  use crossterm::event::KeyModifiers;
  use std::sync::Arc;
  use std::time::Duration;

  fn press(view: &mut NoteFormView, code: KeyCode) -> ViewAction {
    view.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
  }

  fn type_text(view: &mut NoteFormView, text: &str) {
    for c in text.chars() {
      press(view, KeyCode::Char(c));
    }
  }

  async fn settle(view: &mut NoteFormView) -> ViewAction {
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick()
  }

  fn service(api: &Arc<FakeNotesApi>) -> NotesService {
    NotesService::new(api.clone(), QueryCache::default())
  }

  #[tokio::test]
  async fn test_create_closes_on_success() {
    let api = Arc::new(FakeNotesApi::default());
    let service = service(&api);
    let mut view = NoteFormView::create(service.clone());

    type_text(&mut view, "New");
    press(&mut view, KeyCode::Tab);
    type_text(&mut view, "hello");
    press(&mut view, KeyCode::Enter);

    assert!(matches!(settle(&mut view).await, ViewAction::Pop));
    let notes = service.queries.notes(None).await.unwrap();
    assert_eq!(*notes, vec![note(1, "New", "hello", false)]);
  }

  #[tokio::test]
  async fn test_validation_keeps_form_open() {
    let api = Arc::new(FakeNotesApi::default());
    let mut view = NoteFormView::create(service(&api));

    type_text(&mut view, "ab");
    press(&mut view, KeyCode::Enter);

    assert_eq!(view.errors.len(), 2);
    assert_eq!(view.focus, Field::Title);
    assert!(matches!(settle(&mut view).await, ViewAction::None));
    assert!(api.list_calls() == 0);
  }

  #[tokio::test]
  async fn test_edit_prefills_and_reenables() {
    let api = Arc::new(FakeNotesApi::with_notes(vec![note(3, "Old", "text", true)]));
    let service = service(&api);
    let mut view = NoteFormView::edit(service.clone(), 3);

    settle(&mut view).await;
    assert_eq!(view.title.value(), "Old");
    assert_eq!(view.content.value(), "text");

    type_text(&mut view, "er");
    press(&mut view, KeyCode::Enter);
    assert!(matches!(settle(&mut view).await, ViewAction::Pop));

    let saved = service.queries.note(3).await.unwrap();
    assert_eq!(*saved, note(3, "Older", "text", false));
  }

  #[tokio::test]
  async fn test_api_error_keeps_form_open() {
    let api = Arc::new(FakeNotesApi::default());
    api.fail_next_write(ApiError::Status { status: 500 });
    let mut view = NoteFormView::create(service(&api));

    type_text(&mut view, "New");
    press(&mut view, KeyCode::Tab);
    type_text(&mut view, "hello");
    press(&mut view, KeyCode::Enter);

    assert!(matches!(settle(&mut view).await, ViewAction::None));
    assert!(matches!(view.submit.state(), MutationState::Error(_)));
    assert_eq!(view.title.value(), "New");
    let (text, _) = view.message().unwrap();
    assert_eq!(text, "Save failed: server returned HTTP 500");

    type_text(&mut view, "!");
    assert!(matches!(view.submit.state(), MutationState::Idle));
    assert!(view.message().is_none());
  }

  #[tokio::test]
  async fn test_edit_missing_note() {
    let api = Arc::new(FakeNotesApi::default());
    let mut view = NoteFormView::edit(service(&api), 9);

    settle(&mut view).await;
    let (text, _) = view.message().unwrap();
    assert_eq!(text, "Note not found.");

    // Nothing to save until the note has loaded
    press(&mut view, KeyCode::Enter);
    assert!(!view.submit.is_loading());
  }
}
