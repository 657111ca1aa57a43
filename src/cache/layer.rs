//! Polling loader: cache-first start, periodic refresh, stale-on-error fallback.

use chrono::{DateTime, Utc};
use color_eyre::Result;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::entry::CacheEntry;
use super::state::LoaderState;
use super::storage::{KeyValueStore, NoopStore};
use super::traits::{Cacheable, DataSource, PollError};

/// Refresh interval used when none is configured (30 minutes).
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// A boxed future that returns a fetched value
type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// Builder for a keyed polling loader.
///
/// ```ignore
/// let handle = PollingCache::new("nepal-weather", move || {
///     let client = client.clone();
///     async move { client.fetch_weather(&cities).await }
/// })
/// .with_interval(Duration::from_secs(600))
/// .with_store(store)
/// .start();
///
/// let state = handle.state();
/// ```
pub struct PollingCache<T> {
  key: String,
  fetcher: FetcherFn<T>,
  interval: Duration,
  store: Arc<dyn KeyValueStore>,
}

impl<T: Cacheable> PollingCache<T> {
  /// Create a loader for `key` with the given fetcher.
  ///
  /// The fetcher is called once on start, on every tick and on every
  /// `refresh()`. Without `with_store` nothing is persisted.
  pub fn new<F, Fut>(key: impl Into<String>, fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    Self {
      key: key.into(),
      fetcher: Box::new(move || Box::pin(fetcher())),
      interval: DEFAULT_REFRESH_INTERVAL,
      store: Arc::new(NoopStore),
    }
  }

  /// Create a loader under the payload type's default cache key.
  pub fn for_feed<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    Self::new(T::cache_key(), fetcher)
  }

  /// Set the refresh interval. `Duration::ZERO` disables periodic refresh.
  pub fn with_interval(mut self, interval: Duration) -> Self {
    self.interval = interval;
    self
  }

  /// Set the store used for the persisted entry.
  pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
    self.store = store;
    self
  }

  /// Seed state from the store, kick off the first fetch and the timer.
  ///
  /// Must be called from within a tokio runtime.
  pub fn start(self) -> PollHandle<T> {
    let initial = match load_entry::<T>(self.store.as_ref(), &self.key) {
      Some(entry) => {
        debug!(key = %self.key, cached_at = %entry.timestamp, "Serving cached data while refreshing");
        LoaderState::from_cache(entry.data, entry.timestamp)
      }
      None => LoaderState::loading(),
    };

    let (tx, rx) = watch::channel(initial);
    let shared = Arc::new(Shared {
      key: self.key,
      store: self.store,
      fetcher: self.fetcher,
      tx,
      live: AtomicBool::new(true),
    });

    tokio::spawn(run_fetch(Arc::clone(&shared)));

    let ticker = if self.interval.is_zero() {
      None
    } else {
      Some(tokio::spawn(run_ticker(Arc::clone(&shared), self.interval)))
    };

    info!(key = %shared.key, interval = ?self.interval, "Started polling");

    PollHandle { shared, rx, ticker }
  }
}

/// Read and decode the persisted entry for `key`.
///
/// Unreadable or corrupt entries are logged and reported as a miss.
pub fn load_entry<T: Cacheable>(store: &dyn KeyValueStore, key: &str) -> Option<CacheEntry<T>> {
  let raw = match store.get(key) {
    Ok(Some(raw)) => raw,
    Ok(None) => return None,
    Err(e) => {
      let err = PollError::Storage {
        key: key.to_string(),
        reason: format!("{:#}", e),
      };
      warn!(error = %err, "Cache read failed, treating as miss");
      return None;
    }
  };

  match CacheEntry::decode(key, &raw) {
    Ok(entry) => Some(entry),
    Err(err) => {
      warn!(error = %err, "Ignoring unreadable cache entry");
      None
    }
  }
}

/// State shared by the handle, the ticker and every in-flight fetch.
struct Shared<T> {
  key: String,
  store: Arc<dyn KeyValueStore>,
  fetcher: FetcherFn<T>,
  tx: watch::Sender<LoaderState<T>>,
  /// Cleared by `stop()` while holding the channel's write lock
  live: AtomicBool,
}

impl<T: Cacheable> Shared<T> {
  fn is_live(&self) -> bool {
    self.live.load(Ordering::Acquire)
  }

  fn begin_fetch(&self) {
    self.tx.send_if_modified(|state| {
      // Loading is only surfaced when there is nothing to show
      if !self.is_live() || state.loading || state.data.is_some() {
        return false;
      }
      state.loading = true;
      true
    });
  }

  fn apply_success(&self, data: T) {
    self.tx.send_if_modified(|state| {
      if !self.is_live() {
        return false;
      }

      let now = Utc::now();
      let timestamp = match state.last_updated {
        Some(previous) if previous > now => previous,
        _ => now,
      };
      self.persist(&data, timestamp);

      state.data = Some(data);
      state.last_updated = Some(timestamp);
      state.source = Some(DataSource::Network);
      state.error = None;
      state.loading = false;
      true
    });
  }

  fn apply_failure(&self, err: PollError) {
    self.tx.send_if_modified(|state| {
      if !self.is_live() {
        return false;
      }

      warn!(key = %self.key, error = %err, "Fetch failed");

      // Another loader on the same key may have persisted data since start
      if state.data.is_none() {
        if let Some(entry) = load_entry::<T>(self.store.as_ref(), &self.key) {
          state.data = Some(entry.data);
          state.last_updated = Some(entry.timestamp);
          state.source = Some(DataSource::Cache);
        }
      }

      state.error = Some(err.to_string());
      state.loading = false;
      true
    });
  }

  fn persist(&self, data: &T, timestamp: DateTime<Utc>) {
    let entry = CacheEntry { data, timestamp };
    let written = entry
      .encode()
      .map_err(|e| e.to_string())
      .and_then(|raw| {
        self
          .store
          .set(&self.key, &raw)
          .map_err(|e| format!("{:#}", e))
      });

    if let Err(reason) = written {
      let err = PollError::Storage {
        key: self.key.clone(),
        reason,
      };
      warn!(error = %err, "Failed to persist fetched data");
    }
  }
}

async fn run_fetch<T: Cacheable>(shared: Arc<Shared<T>>) {
  if !shared.is_live() {
    return;
  }

  shared.begin_fetch();
  debug!(key = %shared.key, "Fetching");

  match (shared.fetcher)().await {
    Ok(data) => {
      shared.apply_success(data);
      debug!(key = %shared.key, "Fetch succeeded");
    }
    Err(report) => shared.apply_failure(PollError::fetch(&report)),
  }
}

async fn run_ticker<T: Cacheable>(shared: Arc<Shared<T>>, period: Duration) {
  let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
  ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

  loop {
    ticks.tick().await;
    if !shared.is_live() {
      break;
    }
    // Each tick fetches independently so a hung fetch never blocks the next
    tokio::spawn(run_fetch(Arc::clone(&shared)));
  }
}

/// Handle to a running loader.
///
/// Dropping the handle stops the loader.
pub struct PollHandle<T: Cacheable> {
  shared: Arc<Shared<T>>,
  rx: watch::Receiver<LoaderState<T>>,
  ticker: Option<JoinHandle<()>>,
}

impl<T: Cacheable> PollHandle<T> {
  pub fn key(&self) -> &str {
    &self.shared.key
  }

  /// Current state snapshot.
  pub fn state(&self) -> LoaderState<T> {
    self.rx.borrow().clone()
  }

  /// A receiver that observes every state change.
  pub fn subscribe(&self) -> watch::Receiver<LoaderState<T>> {
    self.rx.clone()
  }

  /// Wait for the next state change.
  ///
  /// Returns `None` once the loader is stopped.
  pub async fn changed(&mut self) -> Option<LoaderState<T>> {
    if !self.is_active() {
      return None;
    }
    self.rx.changed().await.ok()?;
    Some(self.rx.borrow_and_update().clone())
  }

  /// Wait until a fetch has succeeded or failed.
  ///
  /// A stopped loader never settles; its current state is returned as is.
  pub async fn settled(&mut self) -> LoaderState<T> {
    // stop() publishes nothing, so waiting on a stopped loader never wakes
    if !self.is_active() {
      return self.state();
    }

    let shared = &self.shared;
    let settled = self
      .rx
      .wait_for(|state| state.is_settled() || !shared.is_live())
      .await
      .map(|state| state.clone());
    settled.unwrap_or_else(|_| self.state())
  }

  /// Fetch now, outside the timer.
  ///
  /// Concurrent fetches are not coalesced: whichever completes last wins.
  /// The returned handle resolves once this fetch has been applied.
  pub fn refresh(&self) -> JoinHandle<()> {
    tokio::spawn(run_fetch(Arc::clone(&self.shared)))
  }

  pub fn is_active(&self) -> bool {
    self.shared.is_live()
  }

  /// Stop the timer and discard the results of fetches still in flight.
  pub fn stop(&mut self) {
    if let Some(ticker) = self.ticker.take() {
      ticker.abort();
    }

    let shared = &self.shared;
    let mut was_live = false;
    // Flip under the write lock so no in-flight write can land after this
    shared.tx.send_if_modified(|_| {
      was_live = shared.live.swap(false, Ordering::AcqRel);
      false
    });

    if was_live {
      info!(key = %shared.key, "Stopped polling");
    }
  }
}

impl<T: Cacheable> Drop for PollHandle<T> {
  fn drop(&mut self) {
    self.stop();
  }
}

impl<T: Cacheable + std::fmt::Debug> std::fmt::Debug for PollHandle<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PollHandle")
      .field("key", &self.shared.key)
      .field("state", &*self.rx.borrow())
      .field("active", &self.is_active())
      .finish_non_exhaustive()
  }
}
