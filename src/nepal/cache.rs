//! Caching implementations for Nepal feed types.

use crate::cache::Cacheable;

use super::types::{BandhAlerts, RoadTrekkingStatus, UtilitiesStatus, WeatherReport};

// ============================================================================
// Cacheable implementations
// ============================================================================

impl Cacheable for WeatherReport {
  fn cache_key() -> &'static str {
    "nepal-weather"
  }
}

impl Cacheable for RoadTrekkingStatus {
  fn cache_key() -> &'static str {
    "nepal-road-trekking"
  }
}

impl Cacheable for BandhAlerts {
  fn cache_key() -> &'static str {
    "nepal-bandh-alerts"
  }
}

impl Cacheable for UtilitiesStatus {
  fn cache_key() -> &'static str {
    "nepal-loadshedding-fuel"
  }
}
