//! Core traits and types for the polling cache.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Trait for feed payloads that can be polled and persisted.
///
/// Implementors name the key their snapshots are stored under by default, so
/// independent loaders for the same feed share one persisted entry.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Default cache key for this payload type (e.g., "nepal-weather")
  fn cache_key() -> &'static str;
}

/// Indicates where the data held by a loader came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
  /// Loaded from the persisted entry at startup or after a failed fetch
  Cache,
  /// Returned by a successful fetch
  Network,
}

/// Everything that can go wrong inside a loader.
///
/// None of these are fatal: they are logged and folded into the loader state.
#[derive(Error, Debug)]
pub enum PollError {
  #[error("{0}")]
  Fetch(String),

  #[error("corrupt cache entry for '{key}': {source}")]
  CacheParse {
    key: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("cache store failed for '{key}': {reason}")]
  Storage { key: String, reason: String },
}

impl PollError {
  /// Build a fetch error from the fetcher's report, keeping its cause chain.
  pub fn fetch(report: &color_eyre::Report) -> Self {
    Self::Fetch(format!("{:#}", report))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use color_eyre::eyre::eyre;

  #[test]
  fn test_fetch_error_keeps_cause_chain() {
    let report = eyre!("connection refused").wrap_err("Failed to fetch weather");
    let err = PollError::fetch(&report);
    assert_eq!(err.to_string(), "Failed to fetch weather: connection refused");
  }

  #[test]
  fn test_cache_parse_error_names_key() {
    let source = serde_json::from_str::<u32>("{").unwrap_err();
    let err = PollError::CacheParse {
      key: "wx".to_string(),
      source,
    };
    assert!(err.to_string().starts_with("corrupt cache entry for 'wx'"));
  }
}
