use chrono::{DateTime, Utc};
use clap::ValueEnum;
use color_eyre::Result;
use serde_json::json;
use std::fmt::{Display, Write as _};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::{
  CacheEntry, Cacheable, FileStore, KeyValueStore, LoaderState, MemoryStore, NoopStore,
  PollHandle, PollingCache, SqliteStore,
};
use crate::config::{Config, StorageBackend, StorageConfig};
use crate::event::{Event, EventHandler};
use crate::nepal::geo::{find_city, nearest_city, nepal_offset, validate_location, NEPAL_PROVINCES};
use crate::nepal::types::{BandhAlerts, RoadTrekkingStatus, UtilitiesStatus, WeatherReport};
use crate::nepal::NepalClient;

/// The feeds nepwatch knows how to poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Feed {
  /// Current weather for the configured cities
  Weather,
  /// Highway and trekking route status
  Roads,
  /// Bandh (strike) alerts
  Bandh,
  /// Load-shedding schedule and fuel prices
  Utilities,
}

impl Feed {
  pub const ALL: [Feed; 4] = [Feed::Weather, Feed::Roads, Feed::Bandh, Feed::Utilities];

  /// Key the feed's snapshot is persisted under
  pub fn cache_key(self) -> &'static str {
    match self {
      Feed::Weather => WeatherReport::cache_key(),
      Feed::Roads => RoadTrekkingStatus::cache_key(),
      Feed::Bandh => BandhAlerts::cache_key(),
      Feed::Utilities => UtilitiesStatus::cache_key(),
    }
  }
}

impl Display for Feed {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      Feed::Weather => "weather",
      Feed::Roads => "roads",
      Feed::Bandh => "bandh",
      Feed::Utilities => "utilities",
    };
    f.pad(name)
  }
}

/// One status line for a loader state: phase, age, summary, error.
pub fn describe<T: Display>(state: &LoaderState<T>) -> String {
  let mut line = state.phase().to_string();
  if let Some(ts) = state.last_updated {
    let _ = write!(line, " @ {}", local_time(ts));
  }
  if let Some(data) = &state.data {
    let _ = write!(line, " | {}", data);
  }
  if let Some(error) = &state.error {
    let _ = write!(line, " | error: {}", error);
  }
  line
}

fn local_time(ts: DateTime<Utc>) -> String {
  ts.with_timezone(&nepal_offset())
    .format("%Y-%m-%d %H:%M NPT")
    .to_string()
}

/// Open the configured store.
///
/// `path` only applies to the backend it was configured for. A store that
/// cannot be opened is replaced by [`NoopStore`] so feeds still load.
pub fn open_store(
  config: &StorageConfig,
  backend: StorageBackend,
) -> Arc<dyn KeyValueStore> {
  let path = if backend == config.backend {
    config.path.clone()
  } else {
    None
  };

  let opened: Result<Arc<dyn KeyValueStore>> = match backend {
    StorageBackend::Sqlite => path
      .map_or_else(SqliteStore::default_path, Ok)
      .and_then(|p| SqliteStore::open(&p))
      .map(|s| Arc::new(s) as Arc<dyn KeyValueStore>),
    StorageBackend::File => path
      .map_or_else(FileStore::default_dir, Ok)
      .and_then(|p| FileStore::open(&p))
      .map(|s| Arc::new(s) as Arc<dyn KeyValueStore>),
    StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    StorageBackend::Disabled => Ok(Arc::new(NoopStore)),
  };

  match opened {
    Ok(store) => {
      debug!(?backend, "Opened cache store");
      store
    }
    Err(e) => {
      warn!(?backend, error = %e, "Cache store unavailable, continuing without persistence");
      Arc::new(NoopStore)
    }
  }
}

/// Type-erased view of a running loader, for driving several feeds at once
trait FeedLoader: Send {
  fn request_refresh(&self);
  fn halt(&mut self);
}

impl<T: Cacheable> FeedLoader for PollHandle<T> {
  fn request_refresh(&self) {
    // Detached; the result lands through the state channel
    drop(self.refresh());
  }

  fn halt(&mut self) {
    self.stop();
  }
}

/// Main application state
pub struct App {
  config: Config,
  client: NepalClient,
  store: Arc<dyn KeyValueStore>,
}

impl App {
  /// Create the app. `backend` overrides the configured storage backend.
  pub fn new(config: Config, backend: Option<StorageBackend>) -> Result<Self> {
    let client = NepalClient::new(&config)?;
    let store = open_store(&config.storage, backend.unwrap_or(config.storage.backend));
    Ok(Self::with_parts(config, client, store))
  }

  pub fn with_parts(config: Config, client: NepalClient, store: Arc<dyn KeyValueStore>) -> Self {
    Self {
      config,
      client,
      store,
    }
  }

  fn poll<T, F, Fut>(&self, interval: Duration, fetcher: F) -> PollHandle<T>
  where
    T: Cacheable,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    PollingCache::for_feed(fetcher)
      .with_interval(interval)
      .with_store(Arc::clone(&self.store))
      .start()
  }

  fn weather(&self, interval: Duration) -> PollHandle<WeatherReport> {
    let client = self.client.clone();
    let cities = self.config.weather.cities.clone();
    self.poll(interval, move || {
      let client = client.clone();
      let cities = cities.clone();
      async move { client.fetch_weather(&cities).await }
    })
  }

  fn roads(&self, interval: Duration) -> PollHandle<RoadTrekkingStatus> {
    let client = self.client.clone();
    self.poll(interval, move || {
      let client = client.clone();
      async move { client.fetch_road_status().await }
    })
  }

  fn bandh(&self, interval: Duration) -> PollHandle<BandhAlerts> {
    let client = self.client.clone();
    self.poll(interval, move || {
      let client = client.clone();
      async move { client.fetch_bandh_alerts().await }
    })
  }

  fn utilities(&self, interval: Duration) -> PollHandle<UtilitiesStatus> {
    let client = self.client.clone();
    self.poll(interval, move || {
      let client = client.clone();
      async move { client.fetch_utilities().await }
    })
  }

  fn start_watching(
    &self,
    feed: Feed,
    interval: Duration,
    events: &EventHandler,
  ) -> Box<dyn FeedLoader> {
    fn watched<T: Cacheable + Display>(
      handle: PollHandle<T>,
      feed: Feed,
      events: &EventHandler,
    ) -> Box<dyn FeedLoader> {
      events.watch(feed, handle.subscribe());
      Box::new(handle)
    }

    match feed {
      Feed::Weather => watched(self.weather(interval), feed, events),
      Feed::Roads => watched(self.roads(interval), feed, events),
      Feed::Bandh => watched(self.bandh(interval), feed, events),
      Feed::Utilities => watched(self.utilities(interval), feed, events),
    }
  }

  /// Poll `feeds` (all when empty) and print a line per state change until
  /// interrupted. SIGHUP refreshes every feed immediately.
  pub async fn watch(&self, feeds: &[Feed], interval: Option<Duration>) -> Result<()> {
    let requested = if feeds.is_empty() { &Feed::ALL[..] } else { feeds };
    let mut selected: Vec<Feed> = Vec::with_capacity(requested.len());
    for feed in requested {
      if !selected.contains(feed) {
        selected.push(*feed);
      }
    }
    let interval = interval.unwrap_or_else(|| self.config.refresh_interval());

    let mut events = EventHandler::new();
    let mut loaders: Vec<Box<dyn FeedLoader>> = selected
      .iter()
      .map(|feed| self.start_watching(*feed, interval, &events))
      .collect();

    while let Some(event) = events.next().await {
      match event {
        Event::Feed { feed, line } => println!("{:<10} {}", feed, line),
        Event::Refresh => {
          info!(feeds = loaders.len(), "Refreshing all feeds");
          for loader in &loaders {
            loader.request_refresh();
          }
        }
        Event::Shutdown => break,
      }
    }

    for loader in &mut loaders {
      loader.halt();
    }
    Ok(())
  }

  /// Run a single fetch cycle and report the settled state.
  ///
  /// Periodic refresh is disabled; the persisted entry is served first and
  /// updated on success like any other loader.
  pub async fn once(&self, feed: Feed) -> serde_json::Value {
    match feed {
      Feed::Weather => settle(self.weather(Duration::ZERO)).await,
      Feed::Roads => settle(self.roads(Duration::ZERO)).await,
      Feed::Bandh => settle(self.bandh(Duration::ZERO)).await,
      Feed::Utilities => settle(self.utilities(Duration::ZERO)).await,
    }
  }

  /// The persisted entry for `feed`, without fetching.
  pub fn show(&self, feed: Feed) -> Result<Option<CacheEntry<serde_json::Value>>> {
    let key = feed.cache_key();
    match self.store.get(key)? {
      Some(raw) => Ok(Some(CacheEntry::decode(key, &raw)?)),
      None => Ok(None),
    }
  }

  /// Remove the persisted entry for `feed`.
  pub fn forget(&self, feed: Feed) -> Result<()> {
    self.store.remove(feed.cache_key())?;
    info!(key = feed.cache_key(), "Removed cached entry");
    Ok(())
  }
}

async fn settle<T: Cacheable>(mut handle: PollHandle<T>) -> serde_json::Value {
  let state = handle.settled().await;
  handle.stop();

  json!({
    "key": handle.key(),
    "phase": state.phase().to_string(),
    "loading": state.loading,
    "error": state.error,
    "last_updated": state.last_updated,
    "source": state.source,
    "data": state.data,
  })
}

/// Geofence verdict for a coordinate pair or a city name.
///
/// Coordinates win when both are given. Coordinates report the nearest
/// reference city; a name reports the matching one.
pub fn locate(coords: Option<(f64, f64)>, city: Option<&str>) -> String {
  let subject = match (coords, city) {
    (Some((lat, lng)), _) => format!("{:.4}, {:.4}", lat, lng),
    (None, Some(name)) => name.trim().to_string(),
    (None, None) => return "no location given".to_string(),
  };

  if !validate_location(coords, city) {
    return match coords {
      Some(_) => format!("{}: outside Nepal", subject),
      None => format!("{}: not a known city in Nepal", subject),
    };
  }

  let (label, matched) = match coords {
    Some((lat, lng)) => ("nearest city", nearest_city(lat, lng)),
    None => ("city", city.and_then(find_city)),
  };

  match matched {
    Some(c) => {
      let province = NEPAL_PROVINCES
        .iter()
        .find(|p| p.name == c.province)
        .map(|p| format!("{} ({})", p.name, p.nepali))
        .unwrap_or_else(|| c.province.to_string());
      format!(
        "{}: inside Nepal; {} {} ({}), {}",
        subject, label, c.name, c.nepali, province
      )
    }
    None => format!("{}: inside Nepal", subject),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{DataSource, Phase};
  use crate::config::SourcesConfig;
  use chrono::TimeZone;

  fn offline_app(store: Arc<dyn KeyValueStore>) -> App {
    let mut config = Config::default();
    config.weather.base_url = "http://127.0.0.1:9/data/2.5/weather".to_string();
    config.sources = SourcesConfig {
      roads_url: "http://127.0.0.1:9/roads".to_string(),
      bandh_feed_url: "http://127.0.0.1:9/rss".to_string(),
      load_shedding_url: "http://127.0.0.1:9/nea".to_string(),
      fuel_prices_url: "http://127.0.0.1:9/noc".to_string(),
    };
    config.http.timeout_secs = 2;
    let client = NepalClient::new(&config).unwrap().with_api_key(None);
    App::with_parts(config, client, store)
  }

  #[test]
  fn test_feed_keys() {
    let keys: Vec<_> = Feed::ALL.iter().map(|f| f.cache_key()).collect();
    assert_eq!(
      keys,
      vec![
        "nepal-weather",
        "nepal-road-trekking",
        "nepal-bandh-alerts",
        "nepal-loadshedding-fuel"
      ]
    );
    assert_eq!(format!("{:<10}|", Feed::Bandh), "bandh     |");
  }

  #[test]
  fn test_describe() {
    assert_eq!(describe(&LoaderState::<String>::loading()), "loading");

    let ts = Utc.with_ymd_and_hms(2025, 12, 17, 6, 15, 0).unwrap();
    let mut state = LoaderState::from_cache("12 items".to_string(), ts);
    assert_eq!(describe(&state), "stale @ 2025-12-17 12:00 NPT | 12 items");

    state.error = Some("timed out".to_string());
    assert_eq!(
      describe(&state),
      "degraded @ 2025-12-17 12:00 NPT | 12 items | error: timed out"
    );
  }

  #[test]
  fn test_open_store_backends() {
    let config = StorageConfig::default();

    let memory = open_store(&config, StorageBackend::Memory);
    memory.set("k", "v").unwrap();
    assert_eq!(memory.get("k").unwrap().as_deref(), Some("v"));

    let disabled = open_store(&config, StorageBackend::Disabled);
    disabled.set("k", "v").unwrap();
    assert!(disabled.get("k").unwrap().is_none());

    let dir = tempfile::tempdir().unwrap();
    let config = StorageConfig {
      backend: StorageBackend::File,
      path: Some(dir.path().join("entries")),
    };
    let files = open_store(&config, StorageBackend::File);
    files.set("k", "v").unwrap();
    assert_eq!(files.get("k").unwrap().as_deref(), Some("v"));
  }

  #[tokio::test]
  async fn test_once_persists_then_show_and_forget() {
    let app = offline_app(Arc::new(MemoryStore::new()));
    assert!(app.show(Feed::Roads).unwrap().is_none());

    let report = app.once(Feed::Roads).await;
    assert_eq!(report["key"], "nepal-road-trekking");
    assert_eq!(report["phase"], "fresh");
    assert_eq!(report["source"], "network");
    assert_eq!(report["data"]["source"], "offline");

    let entry = app.show(Feed::Roads).unwrap().unwrap();
    assert_eq!(entry.data["highways"].as_array().map(Vec::len), Some(6));

    app.forget(Feed::Roads).unwrap();
    assert!(app.show(Feed::Roads).unwrap().is_none());
  }

  #[tokio::test]
  async fn test_once_without_api_key_fails_without_data() {
    let app = offline_app(Arc::new(MemoryStore::new()));

    let report = app.once(Feed::Weather).await;
    assert_eq!(report["phase"], "failed");
    assert!(report["data"].is_null());
    assert!(report["error"]
      .as_str()
      .unwrap()
      .contains("API key not configured"));
  }

  #[tokio::test]
  async fn test_once_serves_cached_weather_when_fetch_fails() {
    let store = Arc::new(MemoryStore::new());
    let cached = CacheEntry {
      data: WeatherReport {
        readings: Vec::new(),
        fetched_at: Utc::now(),
      },
      timestamp: Utc.with_ymd_and_hms(2025, 12, 17, 0, 0, 0).unwrap(),
    };
    store
      .set("nepal-weather", &cached.encode().unwrap())
      .unwrap();

    let app = offline_app(store);
    let mut handle = app.weather(Duration::ZERO);
    let state = handle.settled().await;
    assert_eq!(state.phase(), Phase::Degraded);
    assert_eq!(state.source, Some(DataSource::Cache));
    assert_eq!(state.last_updated, Some(cached.timestamp));
  }

  #[test]
  fn test_locate() {
    assert_eq!(
      locate(Some((27.72, 85.32)), None),
      "27.7200, 85.3200: inside Nepal; nearest city Kathmandu (काठमाडौं), Bagmati (बागमती प्रदेश)"
    );
    assert_eq!(
      locate(Some((28.61, 77.21)), None),
      "28.6100, 77.2100: outside Nepal"
    );
    // Coordinates take precedence over the name
    assert_eq!(
      locate(Some((28.61, 77.21)), Some("Pokhara")),
      "28.6100, 77.2100: outside Nepal"
    );
  }

  #[test]
  fn test_locate_by_city_name() {
    assert_eq!(
      locate(None, Some(" pokhara ")),
      "pokhara: inside Nepal; city Pokhara (पोखरा), Gandaki (गण्डकी प्रदेश)"
    );
    assert_eq!(
      locate(None, Some("Lucknow")),
      "Lucknow: not a known city in Nepal"
    );
    assert_eq!(locate(None, None), "no location given");
  }
}
