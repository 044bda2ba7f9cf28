//! Cached reads of notes and skills.

use std::sync::Arc;

use tracing::debug;

use crate::query::{Query, QueryCache, QueryKey, QueryOptions};

use super::client::NotesApi;
use super::error::ApiError;
use super::types::{Note, Skill, SkillPage};

/// Binds the notes API to the query cache.
///
/// The `*_options` methods describe a read (key plus loader) for a [`Query`];
/// the async methods perform a one-off cached read.
#[derive(Clone)]
pub struct NoteQueries {
  api: Arc<dyn NotesApi>,
  cache: QueryCache,
}

impl NoteQueries {
  pub fn new(api: Arc<dyn NotesApi>, cache: QueryCache) -> Self {
    Self { api, cache }
  }

  pub fn cache(&self) -> &QueryCache {
    &self.cache
  }

  /// `notes(filter)`
  pub fn notes_options(&self, filter: Option<&str>) -> QueryOptions<Vec<Note>> {
    let key = QueryKey::notes(filter);
    let filter = match &key {
      QueryKey::Notes { filter } => filter.clone(),
      _ => None,
    };
    let api = Arc::clone(&self.api);

    QueryOptions::new(key, move || {
      let api = Arc::clone(&api);
      let filter = filter.clone();
      async move { api.list_notes(filter.as_deref()).await }
    })
  }

  /// `note(id)`
  pub fn note_options(&self, id: u64) -> QueryOptions<Note> {
    let api = Arc::clone(&self.api);

    QueryOptions::new(QueryKey::note(id), move || {
      let api = Arc::clone(&api);
      async move { api.get_note(id).await }
    })
  }

  /// `skills(page, limit)`
  pub fn skills_options(&self, page: SkillPage) -> QueryOptions<Vec<Skill>> {
    let api = Arc::clone(&self.api);

    QueryOptions::new(QueryKey::skills(page), move || {
      let api = Arc::clone(&api);
      async move { api.list_skills(page).await }
    })
  }

  /// Subscribe a new [`Query`] and start loading it.
  pub fn watch<T: Send + Sync + 'static>(&self, options: QueryOptions<T>) -> Query<T> {
    let mut query = Query::new(self.cache.clone(), options);
    query.fetch();
    query
  }

  /// Warm the cache for `page` in the background, unless it already holds
  /// fresh data for it.
  pub fn prefetch_skills(&self, page: SkillPage) {
    let fresh = self
      .cache
      .snapshot(&QueryKey::skills(page))
      .is_some_and(|entry| entry.data.is_some() && !entry.is_stale);
    if fresh {
      return;
    }

    let queries = self.clone();
    tokio::spawn(async move {
      if let Err(err) = queries.skills(page).await {
        debug!(page = page.page, error = %err, "skills prefetch failed");
      }
    });
  }

  #[cfg(test)]
  pub async fn notes(&self, filter: Option<&str>) -> Result<Arc<Vec<Note>>, ApiError> {
    self.read(self.notes_options(filter)).await
  }

  #[cfg(test)]
  pub async fn note(&self, id: u64) -> Result<Arc<Note>, ApiError> {
    self.read(self.note_options(id)).await
  }

  pub async fn skills(&self, page: SkillPage) -> Result<Arc<Vec<Skill>>, ApiError> {
    self.read(self.skills_options(page)).await
  }

  async fn read<T: Send + Sync + 'static>(
    &self,
    options: QueryOptions<T>,
  ) -> Result<Arc<T>, ApiError> {
    let loader = options.loader;
    self.cache.fetch(options.key, move || loader()).await
  }
}
