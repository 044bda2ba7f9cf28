//! Async query abstraction for data fetching with caching support.
//!
//! Inspired by TanStack Query. A [`Query<T>`] is a view's handle on one entry
//! of the shared [`QueryCache`]: it subscribes to the entry, mirrors its
//! loading/success/error state, and keeps the previous key's data visible
//! while a new key loads.
//!
//! # Example
//!
//! ```ignore
//! let mut query = Query::new(cache.clone(), queries.notes_options(None));
//!
//! // Subscribe and start loading
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! match query.state() {
//!     QueryState::Loading => render_spinner(),
//!     QueryState::Success(notes) => render_notes(notes),
//!     QueryState::Error(e) => render_error(e),
//!     QueryState::Idle => {}
//! }
//! ```

mod cache;
mod key;
mod mutation;

use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::watch;

use crate::api::ApiError;

pub use cache::{CacheOptions, EntrySnapshot, QueryCache, QueryStatus};
pub use key::{QueryKey, Resource};
pub use mutation::{Mutation, MutationState};

/// A factory function that creates futures for fetching data
pub type Loader<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;

/// What to load and under which key
pub struct QueryOptions<T> {
  pub key: QueryKey,
  pub loader: Loader<T>,
}

impl<T> QueryOptions<T> {
  pub fn new<F, Fut>(key: QueryKey, loader: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    Self {
      key,
      loader: Arc::new(move || loader().boxed()),
    }
  }
}

impl<T> Clone for QueryOptions<T> {
  fn clone(&self) -> Self {
    Self {
      key: self.key.clone(),
      loader: Arc::clone(&self.loader),
    }
  }
}

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// First load for the current key is running
  Loading,
  /// Query completed successfully
  Success(Arc<T>),
  /// Query failed with an error
  Error(ApiError),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn error(&self) -> Option<&ApiError> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

/// Observer of one cache entry.
///
/// Dropping the query unsubscribes it from the cache.
pub struct Query<T> {
  cache: QueryCache,
  options: QueryOptions<T>,
  receiver: Option<watch::Receiver<EntrySnapshot>>,
  state: QueryState<T>,
  /// Data of the current key; survives failed refetches
  data: Option<Arc<T>>,
  /// Data of the previous key, shown until the current key settles
  previous: Option<Arc<T>>,
  is_fetching: bool,
}

impl<T: Send + Sync + 'static> Query<T> {
  pub fn new(cache: QueryCache, options: QueryOptions<T>) -> Self {
    Self {
      cache,
      options,
      receiver: None,
      state: QueryState::Idle,
      data: None,
      previous: None,
      is_fetching: false,
    }
  }

  /// Get the current state of the query.
  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  /// Data to display: the current key's data, or the previous key's data
  /// while the current key is still loading.
  pub fn data(&self) -> Option<&T> {
    self.data.as_deref().or(self.previous.as_deref())
  }

  /// Whether [`Query::data`] is showing the previous key's result
  pub fn is_previous_data(&self) -> bool {
    self.data.is_none() && self.previous.is_some()
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  pub fn is_success(&self) -> bool {
    self.state.is_success()
  }

  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  pub fn error(&self) -> Option<&ApiError> {
    self.state.error()
  }

  /// A load is running, including background refetches of existing data
  pub fn is_fetching(&self) -> bool {
    self.is_fetching
  }

  /// Subscribe to the cache entry, loading it if needed.
  ///
  /// This is a no-op if already subscribed.
  pub fn fetch(&mut self) {
    if self.receiver.is_some() {
      return;
    }
    let loader = Arc::clone(&self.options.loader);
    let receiver = self
      .cache
      .subscribe(self.options.key.clone(), move || loader());
    self.receiver = Some(receiver);
    self.sync();
  }

  /// Force a reload of the current key.
  ///
  /// Subscribes first if needed. When that already started a load, or one is
  /// running, nothing more happens.
  pub fn refetch(&mut self) {
    self.fetch();
    self.sync();
    if self.is_fetching {
      return;
    }
    self.cache.invalidate(&self.options.key);
    self.sync();
  }

  /// Switch to a different key, keeping the current data visible until the
  /// new key resolves or fails.
  pub fn set_options(&mut self, options: QueryOptions<T>) {
    if options.key == self.options.key {
      return;
    }
    self.previous = self.data.take().or_else(|| self.previous.take());
    self.options = options;
    self.receiver = None;
    self.state = QueryState::Idle;
    self.fetch();
  }

  /// Pick up changes published by the cache.
  ///
  /// Returns `true` if the state changed. Call this in your event loop tick
  /// handler.
  pub fn poll(&mut self) -> bool {
    let changed = match &self.receiver {
      Some(rx) => rx.has_changed(),
      None => return false,
    };

    match changed {
      Ok(true) => {
        self.sync();
        true
      }
      Ok(false) => false,
      Err(_) => {
        // Entry was evicted; resubscribe on the next fetch
        self.receiver = None;
        false
      }
    }
  }

  fn sync(&mut self) {
    let snapshot = match &mut self.receiver {
      Some(rx) => rx.borrow_and_update().clone(),
      None => return,
    };

    self.is_fetching = snapshot.is_fetching;
    self.data = snapshot.data::<T>();
    self.state = match (snapshot.status, &self.data) {
      (QueryStatus::Pending, _) => QueryState::Loading,
      (QueryStatus::Success, Some(data)) => QueryState::Success(Arc::clone(data)),
      (QueryStatus::Success, None) => QueryState::Idle,
      // A retry is running; the error is only final once it fails too
      (QueryStatus::Error, _) if snapshot.is_fetching => QueryState::Loading,
      (QueryStatus::Error, _) => QueryState::Error(
        snapshot
          .error
          .unwrap_or_else(|| ApiError::Network("unknown error".to_string())),
      ),
    };

    if !self.state.is_loading() {
      self.previous = None;
    }
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("key", &self.options.key)
      .field("state", &self.state)
      .field("is_fetching", &self.is_fetching)
      .finish_non_exhaustive()
  }
}
