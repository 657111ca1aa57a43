//! Serde-deserializable types matching OpenWeatherMap responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use serde::Deserialize;

use super::geo::{is_in_nepal, City};
use super::types::WeatherReading;

#[derive(Debug, Deserialize)]
pub struct ApiCoord {
  pub lat: f64,
  pub lon: f64,
}

#[derive(Debug, Deserialize)]
pub struct ApiMain {
  pub temp: f64,
  pub humidity: u8,
}

#[derive(Debug, Deserialize)]
pub struct ApiCondition {
  pub main: String,
}

/// Response of `GET /data/2.5/weather`
#[derive(Debug, Deserialize)]
pub struct ApiCurrentWeather {
  pub coord: ApiCoord,
  pub main: ApiMain,
  #[serde(default)]
  pub weather: Vec<ApiCondition>,
}

impl ApiCurrentWeather {
  /// Convert to a reading for `city`.
  ///
  /// Returns `None` when the API answered for a location outside Nepal.
  pub fn into_reading(self, city: &City) -> Option<WeatherReading> {
    if !is_in_nepal(self.coord.lat, self.coord.lon) {
      return None;
    }

    Some(WeatherReading {
      city: city.name.to_string(),
      city_nepali: city.nepali.to_string(),
      temp: self.main.temp.round() as i32,
      condition: self
        .weather
        .into_iter()
        .next()
        .map(|c| c.main)
        .unwrap_or_else(|| "Unknown".to_string()),
      humidity: self.main.humidity,
      lat: self.coord.lat,
      lng: self.coord.lon,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::nepal::geo::find_city;

  const KATHMANDU: &str = r#"{
    "coord": {"lon": 85.324, "lat": 27.7172},
    "weather": [{"id": 721, "main": "Haze", "description": "haze", "icon": "50d"}],
    "main": {"temp": 21.6, "feels_like": 21.0, "pressure": 1015, "humidity": 56},
    "name": "Kathmandu"
  }"#;

  #[test]
  fn test_reading_from_response() {
    let response: ApiCurrentWeather = serde_json::from_str(KATHMANDU).unwrap();
    let reading = response
      .into_reading(find_city("Kathmandu").unwrap())
      .unwrap();

    assert_eq!(reading.city, "Kathmandu");
    assert_eq!(reading.city_nepali, "काठमाडौं");
    assert_eq!(reading.temp, 22);
    assert_eq!(reading.condition, "Haze");
    assert_eq!(reading.humidity, 56);
  }

  #[test]
  fn test_response_outside_nepal_is_rejected() {
    let json = KATHMANDU.replace("85.324", "77.209").replace("27.7172", "28.6139");
    let response: ApiCurrentWeather = serde_json::from_str(&json).unwrap();
    assert!(response
      .into_reading(find_city("Kathmandu").unwrap())
      .is_none());
  }

  #[test]
  fn test_missing_condition() {
    let json = r#"{"coord": {"lon": 83.98, "lat": 28.2}, "main": {"temp": -0.4, "humidity": 80}}"#;
    let response: ApiCurrentWeather = serde_json::from_str(json).unwrap();
    let reading = response.into_reading(find_city("Pokhara").unwrap()).unwrap();
    assert_eq!(reading.condition, "Unknown");
    assert_eq!(reading.temp, 0);
  }
}
