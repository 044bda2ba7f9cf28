//! Process-wide store of query results.
//!
//! Every entry is addressed by a [`QueryKey`] and owns:
//! - the last successful payload (kept across failed refetches)
//! - at most one in-flight load, shared by every concurrent reader
//! - a generation, drawn from a cache-wide counter so it never repeats across
//!   evictions; a load only writes back if the generation it was started
//!   under is still current
//! - a `watch` channel; its receivers are the entry's observers

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::api::ApiError;

use super::key::QueryKey;

/// Type-erased payload of a cache entry
pub type Payload = Arc<dyn Any + Send + Sync>;

type ErasedLoader = Arc<dyn Fn() -> BoxFuture<'static, Result<Payload, ApiError>> + Send + Sync>;
type SharedLoad = Shared<BoxFuture<'static, Result<Payload, ApiError>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
  /// No data yet, first load running
  Pending,
  /// Last load succeeded
  Success,
  /// Last load failed; earlier data may still be present
  Error,
}

/// Point-in-time view of a cache entry, as seen by observers
#[derive(Debug, Clone)]
pub struct EntrySnapshot {
  pub status: QueryStatus,
  pub data: Option<Payload>,
  pub error: Option<ApiError>,
  pub is_fetching: bool,
  pub is_stale: bool,
}

impl EntrySnapshot {
  /// The payload, if present and of type `T`
  pub fn data<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
    self.data.clone()?.downcast::<T>().ok()
  }
}

/// Cache timing knobs.
#[derive(Debug, Clone, Copy)]
pub struct CacheOptions {
  /// Age after which successful data is reloaded on the next read.
  /// `None` means data only goes stale through invalidation.
  pub stale_time: Option<Duration>,
  /// How long an unobserved, idle entry is kept before garbage collection
  pub gc_time: Duration,
}

impl Default for CacheOptions {
  fn default() -> Self {
    Self {
      stale_time: None,
      gc_time: Duration::minutes(5),
    }
  }
}

struct Entry {
  generation: u64,
  status: QueryStatus,
  data: Option<Payload>,
  error: Option<ApiError>,
  stale: bool,
  updated_at: Option<DateTime<Utc>>,
  last_used: DateTime<Utc>,
  in_flight: Option<SharedLoad>,
  loader: Option<ErasedLoader>,
  tx: watch::Sender<EntrySnapshot>,
}

impl Entry {
  fn new(generation: u64) -> Self {
    let (tx, _) = watch::channel(EntrySnapshot {
      status: QueryStatus::Pending,
      data: None,
      error: None,
      is_fetching: false,
      is_stale: true,
    });

    Self {
      generation,
      status: QueryStatus::Pending,
      data: None,
      error: None,
      stale: true,
      updated_at: None,
      last_used: Utc::now(),
      in_flight: None,
      loader: None,
      tx,
    }
  }

  fn is_expired(&self, stale_time: Option<Duration>) -> bool {
    match (stale_time, self.updated_at) {
      (Some(stale_time), Some(updated_at)) => Utc::now() - updated_at > stale_time,
      _ => false,
    }
  }

  fn needs_load(&self, stale_time: Option<Duration>) -> bool {
    self.data.is_none() || self.stale || self.is_expired(stale_time)
  }

  fn observers(&self) -> usize {
    self.tx.receiver_count()
  }

  fn snapshot(&self, stale_time: Option<Duration>) -> EntrySnapshot {
    EntrySnapshot {
      status: self.status,
      data: self.data.clone(),
      error: self.error.clone(),
      is_fetching: self.in_flight.is_some(),
      is_stale: self.stale || self.is_expired(stale_time),
    }
  }

  fn publish(&self, stale_time: Option<Duration>) {
    self.tx.send_replace(self.snapshot(stale_time));
  }
}

struct CacheInner {
  entries: Mutex<HashMap<QueryKey, Entry>>,
  generations: AtomicU64,
  options: CacheOptions,
}

impl CacheInner {
  fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn next_generation(&self) -> u64 {
    self.generations.fetch_add(1, Ordering::Relaxed)
  }

  fn entry<'a>(
    &self,
    entries: &'a mut HashMap<QueryKey, Entry>,
    key: &QueryKey,
  ) -> &'a mut Entry {
    entries
      .entry(key.clone())
      .or_insert_with(|| Entry::new(self.next_generation()))
  }

  /// Write a finished load back, unless an invalidation superseded it.
  fn complete(&self, key: &QueryKey, generation: u64, result: &Result<Payload, ApiError>) {
    let mut entries = self.lock();
    let Some(entry) = entries.get_mut(key) else {
      return;
    };

    if entry.generation != generation {
      debug!(%key, generation, current = entry.generation, "discarding superseded load");
      return;
    }

    entry.in_flight = None;
    entry.last_used = Utc::now();
    match result {
      Ok(data) => {
        debug!(%key, "load complete");
        entry.status = QueryStatus::Success;
        entry.data = Some(Arc::clone(data));
        entry.error = None;
        entry.stale = false;
        entry.updated_at = Some(Utc::now());
      }
      Err(err) => {
        warn!(%key, error = %err, "load failed");
        entry.status = QueryStatus::Error;
        entry.error = Some(err.clone());
        entry.stale = true;
      }
    }
    entry.publish(self.options.stale_time);
  }
}

/// Shared handle to the query cache. Clones address the same store.
#[derive(Clone)]
pub struct QueryCache {
  inner: Arc<CacheInner>,
}

impl Default for QueryCache {
  fn default() -> Self {
    Self::new(CacheOptions::default())
  }
}

impl QueryCache {
  pub fn new(options: CacheOptions) -> Self {
    Self {
      inner: Arc::new(CacheInner {
        entries: Mutex::new(HashMap::new()),
        generations: AtomicU64::new(0),
        options,
      }),
    }
  }

  /// Read-through fetch.
  ///
  /// Returns cached data when it is fresh. Otherwise joins the load already in
  /// flight for `key`, or starts one with `loader`.
  pub async fn fetch<T, F, Fut>(&self, key: QueryKey, loader: F) -> Result<Arc<T>, ApiError>
  where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let load = {
      let mut entries = self.inner.lock();
      let entry = self.inner.entry(&mut entries, &key);
      let loader = erase(loader);
      entry.loader = Some(Arc::clone(&loader));
      entry.last_used = Utc::now();

      if !entry.needs_load(self.inner.options.stale_time) {
        if let Some(data) = entry.data.clone() {
          trace!(%key, "cache hit");
          return downcast(&key, data);
        }
      }

      match &entry.in_flight {
        Some(load) => {
          trace!(%key, "joining in-flight load");
          load.clone()
        }
        None => self.start_load(&key, entry, loader),
      }
    };

    let payload = load.await?;
    downcast(&key, payload)
  }

  /// Register an observer for `key`.
  ///
  /// Starts a load if the entry has no fresh data and none is running. The
  /// observer is unsubscribed when the receiver is dropped.
  pub fn subscribe<T, F, Fut>(&self, key: QueryKey, loader: F) -> watch::Receiver<EntrySnapshot>
  where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let mut entries = self.inner.lock();
    let entry = self.inner.entry(&mut entries, &key);
    let loader = erase(loader);
    entry.loader = Some(Arc::clone(&loader));
    entry.last_used = Utc::now();

    let receiver = entry.tx.subscribe();
    if entry.in_flight.is_none() && entry.needs_load(self.inner.options.stale_time) {
      let _ = self.start_load(&key, entry, loader);
    }
    receiver
  }

  /// Mark one entry stale. Returns whether it existed.
  pub fn invalidate(&self, key: &QueryKey) -> bool {
    self.invalidate_matching(|candidate| candidate == key) > 0
  }

  /// Mark every entry matching `predicate` stale.
  ///
  /// Loads in flight for those entries are superseded. Entries that currently
  /// have observers are reloaded right away; the rest reload on their next
  /// read. Returns the number of entries invalidated.
  pub fn invalidate_matching<P>(&self, predicate: P) -> usize
  where
    P: Fn(&QueryKey) -> bool,
  {
    let mut entries = self.inner.lock();
    let mut count = 0;

    for (key, entry) in entries.iter_mut().filter(|(key, _)| predicate(key)) {
      count += 1;
      entry.generation = self.inner.next_generation();
      entry.in_flight = None;
      entry.stale = true;

      let reload = entry.loader.clone().filter(|_| entry.observers() > 0);
      match reload {
        Some(loader) => {
          let _ = self.start_load(key, entry, loader);
        }
        None => {
          debug!(%key, "invalidated");
          entry.publish(self.inner.options.stale_time);
        }
      }
    }

    count
  }

  /// Current state of an entry, without triggering a load
  pub fn snapshot(&self, key: &QueryKey) -> Option<EntrySnapshot> {
    let stale_time = self.inner.options.stale_time;
    self.inner.lock().get(key).map(|entry| entry.snapshot(stale_time))
  }

  #[cfg(test)]
  fn observer_count(&self, key: &QueryKey) -> usize {
    self
      .inner
      .lock()
      .get(key)
      .map(Entry::observers)
      .unwrap_or(0)
  }

  /// Drop entries nobody observes, with no load running, that have been idle
  /// for longer than the gc time. Observed entries count as used at the time
  /// of the pass. Returns the number of entries dropped.
  pub fn collect_garbage(&self) -> usize {
    let now = Utc::now();
    let gc_time = self.inner.options.gc_time;
    let mut entries = self.inner.lock();
    let before = entries.len();

    entries.retain(|key, entry| {
      if entry.observers() > 0 || entry.in_flight.is_some() {
        entry.last_used = now;
        return true;
      }
      let keep = now - entry.last_used < gc_time;
      if !keep {
        trace!(%key, "evicting idle entry");
      }
      keep
    });

    before - entries.len()
  }

  /// Start a load for `entry` under its current generation. The load is
  /// spawned so that it completes even when nobody awaits it.
  fn start_load(&self, key: &QueryKey, entry: &mut Entry, loader: ErasedLoader) -> SharedLoad {
    let generation = entry.generation;
    let inner: Weak<CacheInner> = Arc::downgrade(&self.inner);
    let load_key = key.clone();

    let load = async move {
      let result = loader().await;
      if let Some(inner) = inner.upgrade() {
        inner.complete(&load_key, generation, &result);
      }
      result
    }
    .boxed()
    .shared();

    debug!(%key, generation, "loading");
    entry.in_flight = Some(load.clone());
    if entry.data.is_none() {
      entry.status = QueryStatus::Pending;
    }
    entry.publish(self.inner.options.stale_time);

    tokio::spawn(load.clone());
    load
  }
}

fn erase<T, F, Fut>(loader: F) -> ErasedLoader
where
  T: Send + Sync + 'static,
  F: Fn() -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
{
  Arc::new(move || {
    loader()
      .map(|result| result.map(|value| Arc::new(value) as Payload))
      .boxed()
  })
}

fn downcast<T: Send + Sync + 'static>(key: &QueryKey, payload: Payload) -> Result<Arc<T>, ApiError> {
  payload
    .downcast::<T>()
    .map_err(|_| ApiError::Decode(format!("cached value for {} has an unexpected type", key)))
}
