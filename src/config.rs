use clap::ValueEnum;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::DEFAULT_REFRESH_INTERVAL;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Seconds between background refreshes; 0 disables them
  pub refresh_interval_secs: u64,
  pub storage: StorageConfig,
  pub weather: WeatherConfig,
  pub sources: SourcesConfig,
  pub http: HttpConfig,
  pub log: LogConfig,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      refresh_interval_secs: DEFAULT_REFRESH_INTERVAL.as_secs(),
      storage: StorageConfig::default(),
      weather: WeatherConfig::default(),
      sources: SourcesConfig::default(),
      http: HttpConfig::default(),
      log: LogConfig::default(),
    }
  }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
  /// SQLite database (default: $XDG_DATA_HOME/nepwatch/cache.db)
  #[default]
  Sqlite,
  /// One JSON file per cache key (default: $XDG_DATA_HOME/nepwatch/entries)
  File,
  /// Kept in memory for the lifetime of the process
  Memory,
  /// Persistence disabled
  #[serde(rename = "none")]
  #[value(name = "none")]
  Disabled,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
  #[serde(default)]
  pub backend: StorageBackend,
  /// Database file (sqlite) or directory (file); defaults per backend
  pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherConfig {
  /// City names as listed in the Nepal reference cities
  #[serde(default = "default_cities", deserialize_with = "deserialize_city_list")]
  pub cities: Vec<String>,
  #[serde(default = "default_weather_url")]
  pub base_url: String,
}

impl Default for WeatherConfig {
  fn default() -> Self {
    Self {
      cities: default_cities(),
      base_url: default_weather_url(),
    }
  }
}

fn default_cities() -> Vec<String> {
  ["Kathmandu", "Pokhara", "Biratnagar", "Nepalgunj", "Dhangadhi"]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_weather_url() -> String {
  "https://api.openweathermap.org/data/2.5/weather".to_string()
}

/// Trim names and drop blanks and case-insensitive duplicates, keeping order.
fn deserialize_city_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
  D: serde::Deserializer<'de>,
{
  let v: Vec<String> = Vec::deserialize(deserializer)?;
  let mut cities: Vec<String> = Vec::with_capacity(v.len());
  for name in v {
    let name = name.trim();
    if !name.is_empty() && !cities.iter().any(|c| c.eq_ignore_ascii_case(name)) {
      cities.push(name.to_string());
    }
  }
  Ok(cities)
}

/// Public pages probed by the daily essentials feeds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
  pub roads_url: String,
  pub bandh_feed_url: String,
  pub load_shedding_url: String,
  pub fuel_prices_url: String,
}

impl Default for SourcesConfig {
  fn default() -> Self {
    Self {
      roads_url: "https://dor.gov.np/home/page/highway-traffic-updates".to_string(),
      bandh_feed_url: "https://ekantipur.com/rss/news".to_string(),
      load_shedding_url: "https://www.nea.org.np/loadshedding".to_string(),
      fuel_prices_url: "https://noc.org.np/retailprice".to_string(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
  pub timeout_secs: u64,
  pub user_agent: String,
}

impl Default for HttpConfig {
  fn default() -> Self {
    Self {
      timeout_secs: 15,
      user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
  /// Also write a daily-rolling log file here
  pub dir: Option<PathBuf>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./nepwatch.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/nepwatch/config.yaml
  ///
  /// Built-in defaults are used when no file is found.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };
    config.validate()?;

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("nepwatch.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("nepwatch").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    if self.http.timeout_secs == 0 {
      return Err(eyre!("http.timeout_secs must be greater than zero"));
    }
    Ok(())
  }

  pub fn refresh_interval(&self) -> Duration {
    Duration::from_secs(self.refresh_interval_secs)
  }

  /// Get the OpenWeatherMap API key from environment variables.
  ///
  /// Checks NEPWATCH_OWM_API_KEY first, then OPENWEATHERMAP_API_KEY as fallback.
  pub fn weather_api_key() -> Option<String> {
    std::env::var("NEPWATCH_OWM_API_KEY")
      .or_else(|_| std::env::var("OPENWEATHERMAP_API_KEY"))
      .ok()
      .filter(|key| !key.trim().is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_file_uses_defaults() {
    let config = Config::from_yaml("{}").unwrap();
    assert_eq!(config.refresh_interval(), Duration::from_secs(30 * 60));
    assert_eq!(config.storage.backend, StorageBackend::Sqlite);
    assert_eq!(config.weather.cities.len(), 5);
    assert_eq!(config.http.timeout_secs, 15);
    assert!(config.log.dir.is_none());
  }

  #[test]
  fn test_full_file() {
    let yaml = r#"
refresh_interval_secs: 600
storage:
  backend: file
  path: /tmp/nepwatch-entries
weather:
  cities: [" Pokhara", "kathmandu", "Kathmandu", ""]
sources:
  roads_url: http://localhost:9000/roads
http:
  timeout_secs: 5
log:
  dir: /var/log/nepwatch
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.refresh_interval(), Duration::from_secs(600));
    assert_eq!(config.storage.backend, StorageBackend::File);
    assert_eq!(
      config.storage.path.as_deref(),
      Some(Path::new("/tmp/nepwatch-entries"))
    );
    assert_eq!(config.weather.cities, vec!["Pokhara", "kathmandu"]);
    assert_eq!(
      config.weather.base_url,
      "https://api.openweathermap.org/data/2.5/weather"
    );
    assert_eq!(config.sources.roads_url, "http://localhost:9000/roads");
    // Unset sources keep their defaults
    assert_eq!(config.sources.bandh_feed_url, "https://ekantipur.com/rss/news");
    assert_eq!(config.http.timeout_secs, 5);
  }

  #[test]
  fn test_unknown_backend_is_rejected() {
    assert!(Config::from_yaml("storage:\n  backend: redis\n").is_err());
  }

  #[test]
  fn test_zero_timeout_is_rejected() {
    let config = Config::from_yaml("http:\n  timeout_secs: 0\n").unwrap();
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_missing_explicit_path() {
    let err = Config::load(Some(Path::new("/nonexistent/nepwatch.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }
}
