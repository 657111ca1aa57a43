use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use futures::future::join_all;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{Config, SourcesConfig};
use crate::nepal::api_types::ApiCurrentWeather;
use crate::nepal::geo::{find_city, nepal_time, weather_url};
use crate::nepal::mock;
use crate::nepal::types::{
  BandhAlerts, FeedSource, RoadTrekkingStatus, UtilitiesStatus, WeatherReading, WeatherReport,
};

/// Smallest road page that can plausibly hold the traffic table
const MIN_ROADS_PAGE_LEN: usize = 1000;

/// HTTP client for the Nepal feeds
#[derive(Clone)]
pub struct NepalClient {
  http: reqwest::Client,
  api_key: Option<String>,
  weather_base_url: String,
  sources: SourcesConfig,
}

impl NepalClient {
  pub fn new(config: &Config) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.http.timeout_secs))
      .user_agent(config.http.user_agent.clone())
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      api_key: Config::weather_api_key(),
      weather_base_url: config.weather.base_url.clone(),
      sources: config.sources.clone(),
    })
  }

  /// Replace the API key picked up from the environment.
  pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
    self.api_key = api_key;
    self
  }

  /// Fetch current weather for each city concurrently.
  ///
  /// Unknown cities, failed requests and answers located outside Nepal are
  /// dropped. It is an error when every requested city was dropped.
  pub async fn fetch_weather(&self, cities: &[String]) -> Result<WeatherReport> {
    let api_key = self
      .api_key
      .as_deref()
      .ok_or_else(|| eyre!("OpenWeatherMap API key not configured"))?;

    let readings: Vec<WeatherReading> = join_all(
      cities
        .iter()
        .map(|name| self.fetch_city_weather(name, api_key)),
    )
    .await
    .into_iter()
    .flatten()
    .collect();

    if readings.is_empty() && !cities.is_empty() {
      return Err(eyre!(
        "No weather readings within Nepal for {} requested cities",
        cities.len()
      ));
    }

    Ok(WeatherReport {
      readings,
      fetched_at: Utc::now(),
    })
  }

  async fn fetch_city_weather(&self, name: &str, api_key: &str) -> Option<WeatherReading> {
    let city = find_city(name)?;
    let url = weather_url(&self.weather_base_url, name, api_key)?;

    let response = match self.http.get(url).send().await {
      Ok(response) => response,
      Err(e) => {
        warn!(city = name, error = %e, "Weather API request failed");
        return None;
      }
    };

    let body: ApiCurrentWeather = match response.error_for_status() {
      Ok(response) => match response.json().await {
        Ok(body) => body,
        Err(e) => {
          warn!(city = name, error = %e, "Failed to parse weather response");
          return None;
        }
      },
      Err(e) => {
        warn!(city = name, error = %e, "Weather API returned an error");
        return None;
      }
    };

    let (lat, lng) = (body.coord.lat, body.coord.lon);
    let reading = body.into_reading(city);
    if reading.is_none() {
      warn!(city = name, lat, lng, "Weather API returned non-Nepal coordinates");
    }
    reading
  }

  /// Highway and trekking route status.
  ///
  /// The snapshot's `source` tells whether the DoR page answered.
  pub async fn fetch_road_status(&self) -> Result<RoadTrekkingStatus> {
    let reachable = self
      .probe(&self.sources.roads_url, |body| {
        body.len() > MIN_ROADS_PAGE_LEN
      })
      .await;

    // TODO: parse the DoR traffic table once its markup settles
    info!(reachable, "Using fallback data for road status");
    Ok(mock::road_trekking(FeedSource::fallback(reachable), Utc::now()))
  }

  /// Upcoming bandh (strike) events.
  ///
  /// `today_alert` is decided by the Nepal date. The fallback events are all
  /// dated after today, so it stays empty until the feed is parsed.
  pub async fn fetch_bandh_alerts(&self) -> Result<BandhAlerts> {
    let reachable = self
      .probe(&self.sources.bandh_feed_url, |body| body.contains("<?xml"))
      .await;

    let today = nepal_time().date_naive();
    info!(reachable, "Using fallback data for bandh alerts");
    Ok(mock::bandh_alerts(
      mock::bandh_events(today),
      today,
      FeedSource::fallback(reachable),
      Utc::now(),
    ))
  }

  /// Load-shedding schedule and fuel prices.
  pub async fn fetch_utilities(&self) -> Result<UtilitiesStatus> {
    let (nea, noc) = futures::join!(
      self.probe(&self.sources.load_shedding_url, |_| true),
      self.probe(&self.sources.fuel_prices_url, |_| true),
    );

    info!(nea, noc, "Using fallback data for utilities");
    Ok(mock::utilities(FeedSource::fallback(nea && noc), Utc::now()))
  }

  /// Check whether an upstream page answers with something usable.
  async fn probe(&self, url: &str, looks_valid: impl Fn(&str) -> bool) -> bool {
    let response = match self.http.get(url).send().await {
      Ok(response) if response.status().is_success() => response,
      Ok(response) => {
        debug!(url, status = %response.status(), "Source answered with an error");
        return false;
      }
      Err(e) => {
        debug!(url, error = %e, "Source unreachable");
        return false;
      }
    };

    match response.text().await {
      Ok(body) if looks_valid(&body) => {
        debug!(url, bytes = body.len(), "Source reachable");
        true
      }
      Ok(_) => {
        debug!(url, "Source answered with unexpected content");
        false
      }
      Err(e) => {
        debug!(url, error = %e, "Failed to read source body");
        false
      }
    }
  }
}
