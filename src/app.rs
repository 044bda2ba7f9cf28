use crate::api::NotesService;
use crate::event::{Event, EventHandler};
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{NoteFormView, NotesView, SkillsView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::{debug, info};

const TICK_RATE: Duration = Duration::from_millis(250);

/// Ticks between cache garbage collection passes (about a minute)
const GC_EVERY_TICKS: u32 = 240;

/// Main application state
pub struct App {
  service: NotesService,
  /// API host shown in the header
  host: String,
  skills_page_size: u32,

  /// Navigation stack - root is always at index 0
  views: Vec<Box<dyn View>>,

  command: CommandInput,
  ticks: u32,
  should_quit: bool,
}

impl App {
  pub fn new(service: NotesService, host: String, skills_page_size: u32) -> Self {
    let root: Box<dyn View> = Box::new(NotesView::new(service.clone()));

    Self {
      service,
      host,
      skills_page_size,
      views: vec![root],
      command: CommandInput::new(),
      ticks: 0,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.event_loop(&mut terminal).await;

    // Restore the terminal even if the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);

    while !self.should_quit() {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => self.tick(),
        Some(Event::Resize) => {}
        None => break,
      }
    }

    Ok(())
  }

  fn tick(&mut self) {
    if let Some(view) = self.views.last_mut() {
      let action = view.tick();
      self.apply(action);
    }

    self.ticks = self.ticks.wrapping_add(1);
    if self.ticks % GC_EVERY_TICKS == 0 {
      let removed = self.service.cache().collect_garbage();
      if removed > 0 {
        debug!(removed, "collected idle cache entries");
      }
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let editing = self.current_view().is_some_and(|v| v.is_editing());
    if !editing || self.command.is_active() {
      match self.command.handle_key(key) {
        KeyResult::Event(CommandEvent::Submitted(cmd)) => {
          self.execute_command(&cmd);
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    if let Some(view) = self.views.last_mut() {
      let action = view.handle_key(key);
      self.apply(action);
    }
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.views.push(view),
      ViewAction::Pop => {
        if self.views.len() > 1 {
          self.views.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn execute_command(&mut self, cmd: &str) {
    info!(command = cmd, "running command");
    match cmd {
      "notes" => self.reset_to(Box::new(NotesView::new(self.service.clone()))),
      "skills" => self.reset_to(Box::new(SkillsView::new(
        self.service.clone(),
        self.skills_page_size,
      ))),
      "add" => self
        .views
        .push(Box::new(NoteFormView::create(self.service.clone()))),
      "quit" => self.should_quit = true,
      other => debug!(command = other, "unknown command"),
    }
  }

  /// Replace the whole stack with a new root view
  fn reset_to(&mut self, view: Box<dyn View>) {
    self.views.clear();
    self.views.push(view);
  }

  // Accessors for UI rendering
  pub fn current_view(&self) -> Option<&dyn View> {
    self.views.last().map(|v| v.as_ref())
  }

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.views.last_mut()
  }

  pub fn host(&self) -> &str {
    &self.host
  }

  pub fn command_input(&self) -> &CommandInput {
    &self.command
  }

  pub fn breadcrumb(&self) -> Vec<String> {
    self.views.iter().map(|v| v.breadcrumb_label()).collect()
  }

  pub fn should_quit(&self) -> bool {
    self.should_quit
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::fake::{note, FakeNotesApi};
  use crate::query::QueryCache;
  use ratatui::backend::TestBackend;
  use std::sync::Arc;

  fn app() -> App {
    let api = FakeNotesApi::with_notes(vec![note(1, "Groceries", "milk", false)]);
    let service = NotesService::new(Arc::new(api), QueryCache::default());
    App::new(service, "localhost".to_string(), 10)
  }

  fn press(app: &mut App, code: KeyCode) {
    app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
  }

  fn command(app: &mut App, name: &str) {
    press(app, KeyCode::Char(':'));
    for c in name.chars() {
      press(app, KeyCode::Char(c));
    }
    press(app, KeyCode::Enter);
  }

  #[tokio::test]
  async fn test_commands_switch_views() {
    let mut app = app();
    assert_eq!(app.breadcrumb(), vec!["Notes"]);

    command(&mut app, "add");
    assert_eq!(app.breadcrumb(), vec!["Notes", "New"]);

    // The form takes ':' as text, so leave it first
    press(&mut app, KeyCode::Esc);
    command(&mut app, "skills");
    assert_eq!(app.breadcrumb(), vec!["Skills"]);

    command(&mut app, "q");
    assert!(app.should_quit());
  }

  #[tokio::test]
  async fn test_form_captures_command_key() {
    let mut app = app();
    command(&mut app, "add");
    press(&mut app, KeyCode::Char(':'));
    assert!(!app.command_input().is_active());
  }

  #[tokio::test]
  async fn test_pop_at_root_quits() {
    let mut app = app();
    press(&mut app, KeyCode::Char('n'));
    assert_eq!(app.breadcrumb().len(), 2);

    press(&mut app, KeyCode::Esc);
    assert!(!app.should_quit());
    press(&mut app, KeyCode::Char('q'));
    assert!(app.should_quit());
  }

  #[tokio::test]
  async fn test_draws_loaded_notes() {
    let mut app = app();
    tokio::time::sleep(Duration::from_millis(20)).await;
    app.tick();

    let mut terminal = Terminal::new(TestBackend::new(100, 10)).unwrap();
    terminal.draw(|frame| ui::draw(frame, &mut app)).unwrap();

    let screen: String = terminal
      .backend()
      .buffer()
      .content
      .iter()
      .map(|cell| cell.symbol())
      .collect();
    assert!(screen.contains("jot"));
    assert!(screen.contains("localhost"));
    assert!(screen.contains("Groceries"));
  }
}
