//! REST client for the notes service, plus the cached reads and
//! invalidating writes built on top of it.

pub mod client;
pub mod error;
#[cfg(test)]
pub mod fake;
pub mod mutations;
pub mod queries;
pub mod types;

use std::sync::Arc;

use crate::query::QueryCache;

pub use client::{NotesApi, NotesClient};
pub use error::ApiError;
pub use mutations::NoteMutations;
pub use queries::NoteQueries;

/// Reads and writes sharing one cache, handed to every view.
#[derive(Clone)]
pub struct NotesService {
  pub queries: NoteQueries,
  pub mutations: NoteMutations,
}

impl NotesService {
  pub fn new(api: Arc<dyn NotesApi>, cache: QueryCache) -> Self {
    Self {
      queries: NoteQueries::new(Arc::clone(&api), cache.clone()),
      mutations: NoteMutations::new(api, cache),
    }
  }

  pub fn cache(&self) -> &QueryCache {
    self.queries.cache()
  }
}
