use crate::api::types::{Skill, SkillPage};
use crate::api::NotesService;
use crate::query::{Query, QueryState};
use crate::ui::renderfns::truncate;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};

/// Paginated skills table
pub struct SkillsView {
  service: NotesService,
  page: SkillPage,
  query: Query<Vec<Skill>>,
  table_state: TableState,
}

impl SkillsView {
  pub fn new(service: NotesService, page_size: u32) -> Self {
    let page = SkillPage::new(1, page_size);
    let query = service.queries.watch(service.queries.skills_options(page));

    Self {
      service,
      page,
      query,
      table_state: TableState::default(),
    }
  }

  fn skills(&self) -> &[Skill] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn go_to(&mut self, page: SkillPage) {
    if page == self.page {
      return;
    }
    self.page = page;
    self.query.set_options(self.service.queries.skills_options(page));
    self.table_state.select(Some(0));
  }

  /// A short page means there is nothing after it
  fn is_last_page(&self) -> bool {
    !self.query.is_previous_data() && self.skills().len() < self.page.limit as usize
  }

  /// Load the next page ahead of time once this one is in
  fn prefetch_next(&self) {
    if self.query.is_success() && !self.is_last_page() {
      self.service.queries.prefetch_skills(self.page.next());
    }
  }

  fn title(&self) -> String {
    match self.query.state() {
      QueryState::Error(e) => format!(" Skills, page {} (error: {}) ", self.page.page, e),
      _ if self.query.is_previous_data() => format!(" Skills, page {} (loading...) ", self.page.page),
      QueryState::Loading => format!(" Skills, page {} (loading...) ", self.page.page),
      _ => format!(" Skills, page {} ", self.page.page),
    }
  }
}

impl View for SkillsView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Char(']') | KeyCode::Right => {
        if !self.is_last_page() {
          self.go_to(self.page.next());
        }
      }
      KeyCode::Char('[') | KeyCode::Left => self.go_to(self.page.previous()),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(self.title())
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if self.skills().is_empty() {
      let content = if self.query.is_loading() {
        "Loading skills..."
      } else if self.query.is_error() {
        "Failed to load skills. Press 'r' to retry."
      } else {
        "No skills on this page."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let row_style = if self.query.is_previous_data() {
      Style::default().add_modifier(Modifier::DIM)
    } else {
      Style::default()
    };

    let rows: Vec<Row> = self
      .skills()
      .iter()
      .map(|skill| {
        Row::new(vec![
          Cell::from(skill.id.to_string()).style(Style::default().fg(Color::Cyan)),
          Cell::from(truncate(&skill.name, 40)),
          Cell::from(truncate(&skill.value, 40)).style(Style::default().fg(Color::Yellow)),
        ])
        .style(row_style)
      })
      .collect();

    let table = Table::new(
      rows,
      [
        Constraint::Length(6),
        Constraint::Percentage(50),
        Constraint::Percentage(50),
      ],
    )
    .header(Row::new(vec!["ID", "Name", "Value"]).style(Style::default().bold()))
    .block(block)
    .row_highlight_style(Style::default().bg(Color::DarkGray))
    .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut self.table_state);
  }

  fn breadcrumb_label(&self) -> String {
    "Skills".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    if self.query.poll() {
      self.prefetch_next();
    }
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("]", "next page").with_priority(20),
      ShortcutInfo::new("[", "previous page").with_priority(21),
      ShortcutInfo::new("r", "refresh").with_priority(30),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::fake::FakeNotesApi;
  use crate::query::QueryCache;
  use crossterm::event::KeyModifiers;
  use std::sync::Arc;
  use std::time::Duration;

  fn key(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
  }

  async fn settle(view: &mut SkillsView) {
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick();
  }

  fn first_id(view: &SkillsView) -> u64 {
    view.skills()[0].id
  }

  #[tokio::test]
  async fn test_paging_keeps_previous_page_visible() {
    let api = Arc::new(FakeNotesApi::default().with_skills(25));
    let mut view = SkillsView::new(NotesService::new(api, QueryCache::default()), 10);
    settle(&mut view).await;
    assert_eq!(first_id(&view), 1);

    view.handle_key(key(']'));
    assert_eq!(view.page.page, 2);
    assert!(view.query.is_previous_data());
    assert_eq!(first_id(&view), 1);

    settle(&mut view).await;
    assert_eq!(first_id(&view), 11);

    view.handle_key(key('['));
    // Page 1 is still cached
    assert_eq!(first_id(&view), 1);
  }

  #[tokio::test]
  async fn test_next_page_is_ready_before_paging() {
    let api = Arc::new(FakeNotesApi::default().with_skills(25));
    let mut view = SkillsView::new(NotesService::new(api, QueryCache::default()), 10);
    settle(&mut view).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    view.handle_key(key(']'));
    assert!(!view.query.is_previous_data());
    assert!(view.query.is_success());
    assert_eq!(first_id(&view), 11);
  }

  #[tokio::test]
  async fn test_paging_stops_at_bounds() {
    let api = Arc::new(FakeNotesApi::default().with_skills(15));
    let mut view = SkillsView::new(NotesService::new(api, QueryCache::default()), 10);
    settle(&mut view).await;

    view.handle_key(key('['));
    assert_eq!(view.page.page, 1);

    view.handle_key(key(']'));
    settle(&mut view).await;
    assert_eq!(view.skills().len(), 5);

    view.handle_key(key(']'));
    assert_eq!(view.page.page, 2);
  }
}
