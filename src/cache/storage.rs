//! Key-value store trait and its backends.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Trait for the durable string store that backs polled feeds.
///
/// Values are opaque strings; encoding is the caller's concern.
pub trait KeyValueStore: Send + Sync {
  /// Read the value stored under `key`.
  fn get(&self, key: &str) -> Result<Option<String>>;

  /// Store `value` under `key`, replacing any previous value.
  fn set(&self, key: &str, value: &str) -> Result<()>;

  /// Remove the value stored under `key`. Missing keys are not an error.
  fn remove(&self, key: &str) -> Result<()>;
}

/// Store used when persistence is unavailable or disabled.
/// All operations are no-ops.
pub struct NoopStore;

impl KeyValueStore for NoopStore {
  fn get(&self, _key: &str) -> Result<Option<String>> {
    Ok(None) // Always miss
  }

  fn set(&self, _key: &str, _value: &str) -> Result<()> {
    Ok(()) // Discard
  }

  fn remove(&self, _key: &str) -> Result<()> {
    Ok(())
  }
}

/// Process-local store. Lost on exit.
#[derive(Default)]
pub struct MemoryStore {
  entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl KeyValueStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(entries.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.remove(key);
    Ok(())
  }
}

/// SQLite-based store implementation.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open (or create) the store at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Open a throwaway in-memory database.
  pub fn in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;
    Self::with_connection(conn)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("cache.db"))
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_cache (
    cache_key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    written_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl KeyValueStore for SqliteStore {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .query_row(
        "SELECT value FROM kv_cache WHERE cache_key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read cache entry '{}': {}", key, e))
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO kv_cache (cache_key, value, written_at)
         VALUES (?, ?, datetime('now'))",
        params![key, value],
      )
      .map_err(|e| eyre!("Failed to store cache entry '{}': {}", key, e))?;

    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM kv_cache WHERE cache_key = ?", params![key])
      .map_err(|e| eyre!("Failed to remove cache entry '{}': {}", key, e))?;

    Ok(())
  }
}

/// Directory-backed store: one JSON file per key.
///
/// File names are the SHA256 of the key, so any key string is a valid name.
pub struct FileStore {
  dir: PathBuf,
}

impl FileStore {
  pub fn open(dir: &Path) -> Result<Self> {
    std::fs::create_dir_all(dir)
      .map_err(|e| eyre!("Failed to create cache directory {}: {}", dir.display(), e))?;

    Ok(Self {
      dir: dir.to_path_buf(),
    })
  }

  /// Get the default entries directory.
  pub fn default_dir() -> Result<PathBuf> {
    Ok(data_dir()?.join("entries"))
  }

  fn entry_path(&self, key: &str) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    self.dir.join(format!("{}.json", hex::encode(hasher.finalize())))
  }
}

impl KeyValueStore for FileStore {
  fn get(&self, key: &str) -> Result<Option<String>> {
    match std::fs::read_to_string(self.entry_path(key)) {
      Ok(contents) => Ok(Some(contents)),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(eyre!("Failed to read cache entry '{}': {}", key, e)),
    }
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    let path = self.entry_path(key);
    // Write then rename so readers never see a half-written entry
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, value)
      .map_err(|e| eyre!("Failed to write cache entry '{}': {}", key, e))?;
    std::fs::rename(&tmp, &path)
      .map_err(|e| eyre!("Failed to replace cache entry '{}': {}", key, e))?;
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    match std::fs::remove_file(self.entry_path(key)) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(eyre!("Failed to remove cache entry '{}': {}", key, e)),
    }
  }
}

/// Application data directory ($XDG_DATA_HOME/nepwatch).
fn data_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join("nepwatch"))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn exercise(store: &dyn KeyValueStore) {
    assert_eq!(store.get("wx").unwrap(), None);

    store.set("wx", "first").unwrap();
    assert_eq!(store.get("wx").unwrap().as_deref(), Some("first"));

    store.set("wx", "second").unwrap();
    assert_eq!(store.get("wx").unwrap().as_deref(), Some("second"));
    assert_eq!(store.get("other").unwrap(), None);

    store.remove("wx").unwrap();
    assert_eq!(store.get("wx").unwrap(), None);
    // Removing again is fine
    store.remove("wx").unwrap();
  }

  #[test]
  fn test_memory_store() {
    exercise(&MemoryStore::new());
  }

  #[test]
  fn test_sqlite_store() {
    exercise(&SqliteStore::in_memory().unwrap());
  }

  #[test]
  fn test_file_store() {
    let dir = tempfile::tempdir().unwrap();
    exercise(&FileStore::open(dir.path()).unwrap());
  }

  #[test]
  fn test_noop_store_never_hits() {
    let store = NoopStore;
    store.set("wx", "value").unwrap();
    assert_eq!(store.get("wx").unwrap(), None);
  }

  #[test]
  fn test_sqlite_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("cache.db");

    SqliteStore::open(&path).unwrap().set("wx", "kept").unwrap();

    let reopened = SqliteStore::open(&path).unwrap();
    assert_eq!(reopened.get("wx").unwrap().as_deref(), Some("kept"));
  }

  #[test]
  fn test_file_store_hashes_awkward_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();

    store.set("../escape/attempt", "v").unwrap();
    assert_eq!(store.get("../escape/attempt").unwrap().as_deref(), Some("v"));

    let names: Vec<_> = std::fs::read_dir(dir.path())
      .unwrap()
      .map(|e| e.unwrap().file_name().into_string().unwrap())
      .collect();
    assert_eq!(names.len(), 1);
    assert_eq!(names[0].len(), 64 + ".json".len());
  }
}
