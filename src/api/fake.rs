//! In-memory stand-in for the REST service, used by tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};

use super::client::NotesApi;
use super::error::ApiError;
use super::types::{CreatedNote, NewNote, Note, Skill, SkillPage};

pub fn note(id: u64, title: &str, content: &str, is_disabled: bool) -> Note {
  Note {
    id,
    title: title.to_string(),
    content: content.to_string(),
    is_disabled,
  }
}

#[derive(Default)]
pub struct FakeNotesApi {
  notes: Mutex<Vec<Note>>,
  skills: Vec<Skill>,
  latency: Duration,
  fail_next_write: Mutex<Option<ApiError>>,
  list_calls: AtomicUsize,
  get_calls: AtomicUsize,
}

impl FakeNotesApi {
  pub fn with_notes(notes: Vec<Note>) -> Self {
    Self {
      notes: Mutex::new(notes),
      ..Self::default()
    }
  }

  pub fn with_skills(mut self, count: u64) -> Self {
    self.skills = (1..=count)
      .map(|id| Skill {
        id,
        name: format!("skill-{}", id),
        value: format!("{}", id * 10),
      })
      .collect();
    self
  }

  /// Delay every read by `latency`
  pub fn with_latency(mut self, latency: Duration) -> Self {
    self.latency = latency;
    self
  }

  /// Make the next write fail with `err` without touching the store
  pub fn fail_next_write(&self, err: ApiError) {
    *self.fail_next_write.lock().unwrap() = Some(err);
  }

  pub fn list_calls(&self) -> usize {
    self.list_calls.load(Ordering::SeqCst)
  }

  pub fn get_calls(&self) -> usize {
    self.get_calls.load(Ordering::SeqCst)
  }

  async fn delay(&self) {
    if !self.latency.is_zero() {
      tokio::time::sleep(self.latency).await;
    }
  }

  fn check_write(&self) -> Result<(), ApiError> {
    match self.fail_next_write.lock().unwrap().take() {
      Some(err) => Err(err),
      None => Ok(()),
    }
  }

  fn modify<F>(&self, id: u64, change: F) -> Result<Note, ApiError>
  where
    F: FnOnce(&mut Note),
  {
    self.check_write()?;
    let mut notes = self.notes.lock().unwrap();
    let note = notes
      .iter_mut()
      .find(|n| n.id == id)
      .ok_or_else(|| ApiError::NotFound(format!("/notes/{}", id)))?;
    change(note);
    Ok(note.clone())
  }
}

impl NotesApi for FakeNotesApi {
  fn list_notes<'a>(&'a self, filter: Option<&'a str>) -> BoxFuture<'a, Result<Vec<Note>, ApiError>> {
    self.list_calls.fetch_add(1, Ordering::SeqCst);
    async move {
      self.delay().await;
      let needle = filter.unwrap_or_default().to_lowercase();
      let notes = self.notes.lock().unwrap();
      Ok(
        notes
          .iter()
          .filter(|n| {
            needle.is_empty()
              || n.title.to_lowercase().contains(&needle)
              || n.content.to_lowercase().contains(&needle)
          })
          .cloned()
          .collect(),
      )
    }
    .boxed()
  }

  fn get_note(&self, id: u64) -> BoxFuture<'_, Result<Note, ApiError>> {
    self.get_calls.fetch_add(1, Ordering::SeqCst);
    async move {
      self.delay().await;
      self
        .notes
        .lock()
        .unwrap()
        .iter()
        .find(|n| n.id == id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("/notes/{}", id)))
    }
    .boxed()
  }

  fn create_note<'a>(&'a self, note: &'a NewNote) -> BoxFuture<'a, Result<CreatedNote, ApiError>> {
    async move {
      self.check_write()?;
      let mut notes = self.notes.lock().unwrap();
      let id = notes.iter().map(|n| n.id).max().unwrap_or(0) + 1;
      let created = Note {
        id,
        title: note.title.clone(),
        content: note.content.clone(),
        is_disabled: false,
      };
      notes.push(created.clone());
      Ok::<_, ApiError>(CreatedNote { note: created })
    }
    .boxed()
  }

  fn update_note<'a>(&'a self, note: &'a Note) -> BoxFuture<'a, Result<Note, ApiError>> {
    async move {
      self.modify(note.id, |stored| {
        stored.title = note.title.clone();
        stored.content = note.content.clone();
        stored.is_disabled = note.is_disabled;
      })
    }
    .boxed()
  }

  fn delete_note(&self, id: u64) -> BoxFuture<'_, Result<Note, ApiError>> {
    async move {
      self.check_write()?;
      let mut notes = self.notes.lock().unwrap();
      let index = notes
        .iter()
        .position(|n| n.id == id)
        .ok_or_else(|| ApiError::NotFound(format!("/notes/{}", id)))?;
      Ok::<_, ApiError>(notes.remove(index))
    }
    .boxed()
  }

  fn set_note_disabled(
    &self,
    id: u64,
    is_disabled: bool,
  ) -> BoxFuture<'_, Result<Note, ApiError>> {
    async move { self.modify(id, |stored| stored.is_disabled = is_disabled) }.boxed()
  }

  fn list_skills(&self, page: SkillPage) -> BoxFuture<'_, Result<Vec<Skill>, ApiError>> {
    async move {
      self.delay().await;
      let skip = (page.page.saturating_sub(1) * page.limit) as usize;
      Ok(
        self
          .skills
          .iter()
          .skip(skip)
          .take(page.limit as usize)
          .cloned()
          .collect(),
      )
    }
    .boxed()
  }
}
