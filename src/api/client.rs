use std::time::Duration;

use color_eyre::{eyre::eyre, Result};
use futures::future::{BoxFuture, FutureExt};
use reqwest::header::ACCEPT;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;

use super::error::ApiError;
use super::types::{CreatedNote, NewNote, Note, NotePatch, Skill, SkillPage};

/// The REST operations the client needs from the notes service.
///
/// Implemented by [`NotesClient`] over HTTP. The query cache and the mutation
/// dispatcher only talk to this trait.
pub trait NotesApi: Send + Sync {
  /// `GET /notes`, or `GET /notes?q=<filter>` for a non-empty filter
  fn list_notes<'a>(&'a self, filter: Option<&'a str>) -> BoxFuture<'a, Result<Vec<Note>, ApiError>>;

  /// `GET /notes/:id`
  fn get_note(&self, id: u64) -> BoxFuture<'_, Result<Note, ApiError>>;

  /// `POST /notes`
  fn create_note<'a>(&'a self, note: &'a NewNote) -> BoxFuture<'a, Result<CreatedNote, ApiError>>;

  /// `PATCH /notes/:id` with every field of `note`
  fn update_note<'a>(&'a self, note: &'a Note) -> BoxFuture<'a, Result<Note, ApiError>>;

  /// `DELETE /notes/:id`, echoing the removed note
  fn delete_note(&self, id: u64) -> BoxFuture<'_, Result<Note, ApiError>>;

  /// `PATCH /notes/:id` with only `isDisabled`
  fn set_note_disabled(&self, id: u64, is_disabled: bool)
    -> BoxFuture<'_, Result<Note, ApiError>>;

  /// `GET /skills?_page=<n>&_limit=<n>`
  fn list_skills(&self, page: SkillPage) -> BoxFuture<'_, Result<Vec<Skill>, ApiError>>;
}

/// HTTP client for the notes service
#[derive(Clone)]
pub struct NotesClient {
  http: reqwest::Client,
  base_url: Url,
}

impl NotesClient {
  pub fn new(config: &Config) -> Result<Self> {
    if config.api_url.cannot_be_a_base() {
      return Err(eyre!("API URL {} cannot be used as a base URL", config.api_url));
    }

    let http = reqwest::Client::builder()
      .user_agent(concat!("jot/", env!("CARGO_PKG_VERSION")))
      .timeout(Duration::from_secs(config.api.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url: config.api_url.clone(),
    })
  }

  /// Host part of the base URL, for display
  pub fn host(&self) -> &str {
    self.base_url.host_str().unwrap_or("")
  }

  fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Url {
    build_url(&self.base_url, segments, query)
  }

  async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
    let request = builder
      .header(ACCEPT, "application/json")
      .build()
      .map_err(|e| ApiError::Network(e.to_string()))?;
    let method = request.method().clone();
    let url = request.url().clone();

    debug!(%method, %url, "sending request");

    let response = self.http.execute(request).await.map_err(|e| {
      warn!(%method, %url, error = %e, "request failed");
      ApiError::Network(e.to_string())
    })?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
      return Err(ApiError::NotFound(url.path().to_string()));
    }
    if !status.is_success() {
      warn!(%method, %url, status = status.as_u16(), "request rejected");
      return Err(ApiError::Status {
        status: status.as_u16(),
      });
    }

    response.json::<T>().await.map_err(ApiError::from)
  }
}

impl NotesApi for NotesClient {
  fn list_notes<'a>(&'a self, filter: Option<&'a str>) -> BoxFuture<'a, Result<Vec<Note>, ApiError>> {
    let query: Vec<(&str, &str)> = match filter {
      Some(q) if !q.is_empty() => vec![("q", q)],
      _ => Vec::new(),
    };
    let url = self.endpoint(&["notes"], &query);
    self.send(self.http.get(url)).boxed()
  }

  fn get_note(&self, id: u64) -> BoxFuture<'_, Result<Note, ApiError>> {
    let id = id.to_string();
    let url = self.endpoint(&["notes", &id], &[]);
    self.send(self.http.get(url)).boxed()
  }

  fn create_note<'a>(&'a self, note: &'a NewNote) -> BoxFuture<'a, Result<CreatedNote, ApiError>> {
    let url = self.endpoint(&["notes"], &[]);
    self.send(self.http.post(url).json(note)).boxed()
  }

  fn update_note<'a>(&'a self, note: &'a Note) -> BoxFuture<'a, Result<Note, ApiError>> {
    let id = note.id.to_string();
    let url = self.endpoint(&["notes", &id], &[]);
    self
      .send(self.http.patch(url).json(&NotePatch::from(note)))
      .boxed()
  }

  fn delete_note(&self, id: u64) -> BoxFuture<'_, Result<Note, ApiError>> {
    let id = id.to_string();
    let url = self.endpoint(&["notes", &id], &[]);
    self.send(self.http.delete(url)).boxed()
  }

  fn set_note_disabled(
    &self,
    id: u64,
    is_disabled: bool,
  ) -> BoxFuture<'_, Result<Note, ApiError>> {
    let id = id.to_string();
    let url = self.endpoint(&["notes", &id], &[]);
    self
      .send(self.http.patch(url).json(&NotePatch::disabled(is_disabled)))
      .boxed()
  }

  fn list_skills(&self, page: SkillPage) -> BoxFuture<'_, Result<Vec<Skill>, ApiError>> {
    let page_no = page.page.to_string();
    let limit = page.limit.to_string();
    let url = self.endpoint(&["skills"], &[("_page", &page_no), ("_limit", &limit)]);
    self.send(self.http.get(url)).boxed()
  }
}

/// Append path segments and query pairs to the base URL.
///
/// A trailing slash on the base is dropped first so that `http://host/api/`
/// and `http://host/api` produce the same endpoints.
fn build_url(base: &Url, segments: &[&str], query: &[(&str, &str)]) -> Url {
  let mut url = base.clone();
  if let Ok(mut path) = url.path_segments_mut() {
    path.pop_if_empty().extend(segments);
  }
  if !query.is_empty() {
    url.query_pairs_mut().extend_pairs(query);
  }
  url
}

#[cfg(test)]
mod tests {
  use super::*;

  fn base(s: &str) -> Url {
    Url::parse(s).unwrap()
  }

  #[test]
  fn test_build_url_plain_host() {
    let url = build_url(&base("http://localhost:3000"), &["notes"], &[]);
    assert_eq!(url.as_str(), "http://localhost:3000/notes");
  }

  #[test]
  fn test_build_url_keeps_base_path() {
    let with_slash = build_url(&base("https://example.com/api/"), &["notes", "4"], &[]);
    let without = build_url(&base("https://example.com/api"), &["notes", "4"], &[]);
    assert_eq!(with_slash.as_str(), "https://example.com/api/notes/4");
    assert_eq!(with_slash, without);
  }

  #[test]
  fn test_build_url_encodes_search_text() {
    let url = build_url(
      &base("http://localhost:3000"),
      &["notes"],
      &[("q", "hello world&more")],
    );
    assert_eq!(
      url.as_str(),
      "http://localhost:3000/notes?q=hello+world%26more"
    );
  }

  #[test]
  fn test_build_url_skills_page() {
    let url = build_url(
      &base("http://localhost:3000"),
      &["skills"],
      &[("_page", "2"), ("_limit", "10")],
    );
    assert_eq!(url.query(), Some("_page=2&_limit=10"));
  }
}
