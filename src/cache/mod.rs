//! Keyed polling cache with local persistence.
//!
//! A loader for one cache key:
//! - Serves the persisted entry immediately on start, if there is one
//! - Fetches in the background, then again on a fixed interval
//! - Persists every successful fetch as `{data, timestamp}`
//! - Keeps serving the last good value when a fetch fails (degraded mode)

mod entry;
mod layer;
mod state;
mod storage;
mod traits;

pub use entry::CacheEntry;
pub use layer::{load_entry, PollHandle, PollingCache, DEFAULT_REFRESH_INTERVAL};
pub use state::{LoaderState, Phase};
pub use storage::{FileStore, KeyValueStore, MemoryStore, NoopStore, SqliteStore};
pub use traits::{Cacheable, DataSource, PollError};
