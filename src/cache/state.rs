//! Observable state of a polling loader.

use chrono::{DateTime, Utc};

use super::traits::DataSource;

/// Snapshot of what a loader currently knows.
///
/// Replaced as a whole on every transition; consumers receive clones through
/// a `watch` channel.
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderState<T> {
  /// Last known good value, if any
  pub data: Option<T>,
  /// True only while nothing is held and a fetch is pending
  pub loading: bool,
  /// Message from the most recent failed fetch, cleared by the next success
  pub error: Option<String>,
  /// When `data` was fetched
  pub last_updated: Option<DateTime<Utc>>,
  /// Where `data` came from
  pub source: Option<DataSource>,
}

/// Coarse lifecycle phase derived from a [`LoaderState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  /// No data yet, first fetch pending
  Loading,
  /// Serving persisted data, no fetch has completed yet
  Stale,
  /// Serving data from the last successful fetch
  Fresh,
  /// Serving last known good data alongside an error
  Degraded,
  /// No data and the last fetch failed
  Failed,
}

impl<T> LoaderState<T> {
  /// State before any cache lookup or fetch.
  pub fn loading() -> Self {
    Self {
      data: None,
      loading: true,
      error: None,
      last_updated: None,
      source: None,
    }
  }

  /// State seeded from a persisted entry.
  pub fn from_cache(data: T, timestamp: DateTime<Utc>) -> Self {
    Self {
      data: Some(data),
      loading: false,
      error: None,
      last_updated: Some(timestamp),
      source: Some(DataSource::Cache),
    }
  }

  pub fn phase(&self) -> Phase {
    match (&self.data, &self.error) {
      (None, Some(_)) => Phase::Failed,
      (None, None) => Phase::Loading,
      (Some(_), Some(_)) => Phase::Degraded,
      (Some(_), None) if self.source == Some(DataSource::Network) => Phase::Fresh,
      (Some(_), None) => Phase::Stale,
    }
  }

  /// True once the loader has something worth showing or a definite failure.
  pub fn is_settled(&self) -> bool {
    !self.loading && (self.error.is_some() || self.source == Some(DataSource::Network))
  }
}

impl std::fmt::Display for Phase {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let label = match self {
      Phase::Loading => "loading",
      Phase::Stale => "stale",
      Phase::Fresh => "fresh",
      Phase::Degraded => "degraded",
      Phase::Failed => "failed",
    };
    f.write_str(label)
  }
}
