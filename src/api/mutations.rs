//! Writes against the notes resource and the cache entries they invalidate.

use std::sync::Arc;

use tracing::{info, warn};

use crate::query::{QueryCache, QueryKey, Resource};

use super::client::NotesApi;
use super::error::ApiError;
use super::types::{CreatedNote, NewNote, Note};

/// A write, classified by which reads it can change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteWrite {
  Create,
  Update(u64),
  Delete(u64),
  SetDisabled(u64),
}

impl NoteWrite {
  /// Whether this write may have changed the data cached under `key`.
  /// Every write touches all variants of the notes list.
  pub fn invalidates(&self, key: &QueryKey) -> bool {
    if key.resource() == Resource::Notes {
      return true;
    }
    match (self, key) {
      (Self::Update(id) | Self::Delete(id) | Self::SetDisabled(id), QueryKey::Note { id: key_id }) => {
        id == key_id
      }
      _ => false,
    }
  }
}

/// Performs writes and invalidates the cache once they succeed.
///
/// Nothing is applied to the cache before the server answers, so a failed
/// write leaves the cache untouched.
#[derive(Clone)]
pub struct NoteMutations {
  api: Arc<dyn NotesApi>,
  cache: QueryCache,
}

impl NoteMutations {
  pub fn new(api: Arc<dyn NotesApi>, cache: QueryCache) -> Self {
    Self { api, cache }
  }

  pub async fn create_note(&self, note: NewNote) -> Result<CreatedNote, ApiError> {
    let result = self.api.create_note(&note).await;
    self.settle(NoteWrite::Create, result)
  }

  /// Update title and content. The note is always re-enabled by an edit.
  pub async fn update_note(&self, note: Note) -> Result<Note, ApiError> {
    let note = Note {
      is_disabled: false,
      ..note
    };
    let result = self.api.update_note(&note).await;
    self.settle(NoteWrite::Update(note.id), result)
  }

  pub async fn delete_note(&self, id: u64) -> Result<Note, ApiError> {
    let result = self.api.delete_note(id).await;
    self.settle(NoteWrite::Delete(id), result)
  }

  pub async fn disable_note(&self, id: u64) -> Result<Note, ApiError> {
    self.set_disabled(id, true).await
  }

  pub async fn enable_note(&self, id: u64) -> Result<Note, ApiError> {
    self.set_disabled(id, false).await
  }

  async fn set_disabled(&self, id: u64, is_disabled: bool) -> Result<Note, ApiError> {
    let result = self.api.set_note_disabled(id, is_disabled).await;
    self.settle(NoteWrite::SetDisabled(id), result)
  }

  fn settle<T>(&self, write: NoteWrite, result: Result<T, ApiError>) -> Result<T, ApiError> {
    match &result {
      Ok(_) => {
        let invalidated = self.cache.invalidate_matching(|key| write.invalidates(key));
        info!(?write, invalidated, "write applied");
      }
      Err(err) => warn!(?write, status = ?err.status(), error = %err, "write failed"),
    }
    result
  }
}
