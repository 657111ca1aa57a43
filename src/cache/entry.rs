//! Persisted envelope for a polled value.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::traits::PollError;

/// A value as it is written to the key-value store.
///
/// Serialized as `{"data": ..., "timestamp": <epoch-millis>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
  pub data: T,
  #[serde(with = "chrono::serde::ts_milliseconds")]
  pub timestamp: DateTime<Utc>,
}

impl<T: Serialize> CacheEntry<T> {
  pub fn encode(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string(self)
  }
}

impl<T: DeserializeOwned> CacheEntry<T> {
  /// Parse a raw stored string for `key`.
  pub fn decode(key: &str, raw: &str) -> Result<Self, PollError> {
    serde_json::from_str(raw).map_err(|source| PollError::CacheParse {
      key: key.to_string(),
      source,
    })
  }
}
