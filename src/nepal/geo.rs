//! Nepal geography: bounding box, reference cities and local time.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use tracing::warn;
use url::Url;

/// A lat/lng rectangle, inclusive on every edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
  pub min_lat: f64,
  pub max_lat: f64,
  pub min_lng: f64,
  pub max_lng: f64,
}

impl Bounds {
  pub fn contains(&self, lat: f64, lng: f64) -> bool {
    lat >= self.min_lat && lat <= self.max_lat && lng >= self.min_lng && lng <= self.max_lng
  }
}

pub const NEPAL_BOUNDS: Bounds = Bounds {
  min_lat: 26.347,
  max_lat: 30.447,
  min_lng: 80.056,
  max_lng: 88.201,
};

/// Nepal Standard Time is UTC+05:45.
const NEPAL_OFFSET_SECS: i32 = 5 * 3600 + 45 * 60;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct City {
  pub name: &'static str,
  pub nepali: &'static str,
  pub lat: f64,
  pub lng: f64,
  pub province: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Province {
  pub name: &'static str,
  pub nepali: &'static str,
}

const fn city(
  name: &'static str,
  nepali: &'static str,
  lat: f64,
  lng: f64,
  province: &'static str,
) -> City {
  City {
    name,
    nepali,
    lat,
    lng,
    province,
  }
}

pub const NEPAL_CITIES: [City; 15] = [
  city("Kathmandu", "काठमाडौं", 27.7172, 85.324, "Bagmati"),
  city("Pokhara", "पोखरा", 28.2096, 83.9856, "Gandaki"),
  city("Lalitpur", "ललितपुर", 27.6667, 85.3333, "Bagmati"),
  city("Biratnagar", "विराटनगर", 26.4525, 87.2718, "Koshi"),
  city("Bharatpur", "भरतपुर", 27.6774, 84.4354, "Bagmati"),
  city("Dharan", "धरान", 26.8121, 87.2823, "Koshi"),
  city("Butwal", "बुटवल", 27.7006, 83.4479, "Lumbini"),
  city("Hetauda", "हेटौडा", 27.4281, 85.0326, "Bagmati"),
  city("Nepalgunj", "नेपालगंज", 28.0498, 81.6169, "Lumbini"),
  city("Dhangadhi", "धनगढी", 28.7049, 80.5884, "Sudurpashchim"),
  city("Itahari", "इटहरी", 26.6655, 87.2847, "Koshi"),
  city("Janakpur", "जनकपुर", 26.7288, 85.9244, "Madhesh"),
  city("Birtamod", "बिर्तामोड", 26.6711, 87.9761, "Koshi"),
  city("Tulsipur", "तुलसीपुर", 28.1302, 82.2932, "Lumbini"),
  city("Chitwan", "चितवन", 27.5291, 84.3542, "Bagmati"),
];

pub const NEPAL_PROVINCES: [Province; 7] = [
  Province { name: "Koshi", nepali: "कोशी प्रदेश" },
  Province { name: "Madhesh", nepali: "मधेश प्रदेश" },
  Province { name: "Bagmati", nepali: "बागमती प्रदेश" },
  Province { name: "Gandaki", nepali: "गण्डकी प्रदेश" },
  Province { name: "Lumbini", nepali: "लुम्बिनी प्रदेश" },
  Province { name: "Karnali", nepali: "कर्णाली प्रदेश" },
  Province { name: "Sudurpashchim", nepali: "सुदूरपश्चिम प्रदेश" },
];

pub fn is_in_nepal(lat: f64, lng: f64) -> bool {
  NEPAL_BOUNDS.contains(lat, lng)
}

/// Look up a city by English name (any case) or exact Nepali name.
pub fn find_city(name: &str) -> Option<&'static City> {
  let wanted = name.trim();
  NEPAL_CITIES
    .iter()
    .find(|c| c.name.eq_ignore_ascii_case(wanted) || c.nepali == wanted)
}

/// Check that a location belongs to Nepal.
///
/// Coordinates win when present; otherwise the name must be a known city.
pub fn validate_location(coords: Option<(f64, f64)>, name: Option<&str>) -> bool {
  match (coords, name) {
    (Some((lat, lng)), _) => is_in_nepal(lat, lng),
    (None, Some(name)) => find_city(name).is_some(),
    (None, None) => false,
  }
}

/// Closest reference city by straight-line distance in degrees.
///
/// Returns `None` for coordinates outside Nepal.
pub fn nearest_city(lat: f64, lng: f64) -> Option<&'static City> {
  if !is_in_nepal(lat, lng) {
    warn!(lat, lng, "Coordinates outside Nepal bounds");
    return None;
  }

  NEPAL_CITIES.iter().min_by(|a, b| {
    let da = (a.lat - lat).hypot(a.lng - lng);
    let db = (b.lat - lat).hypot(b.lng - lng);
    da.total_cmp(&db)
  })
}

/// OpenWeatherMap current-weather URL for a known city, by its coordinates.
pub fn weather_url(base: &str, city_name: &str, api_key: &str) -> Option<Url> {
  let Some(city) = find_city(city_name) else {
    warn!(city = city_name, "City not found in Nepal cities list");
    return None;
  };

  let lat = city.lat.to_string();
  let lon = city.lng.to_string();
  Url::parse_with_params(
    base,
    &[
      ("lat", lat.as_str()),
      ("lon", lon.as_str()),
      ("appid", api_key),
      ("units", "metric"),
    ],
  )
  .map_err(|e| warn!(base, error = %e, "Invalid weather API base URL"))
  .ok()
}

pub fn nepal_offset() -> FixedOffset {
  FixedOffset::east_opt(NEPAL_OFFSET_SECS).unwrap_or(Utc.fix())
}

/// Current wall-clock time in Nepal.
pub fn nepal_time() -> DateTime<FixedOffset> {
  Utc::now().with_timezone(&nepal_offset())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_bounds_are_inclusive() {
    assert!(is_in_nepal(27.7172, 85.324));
    assert!(is_in_nepal(NEPAL_BOUNDS.min_lat, NEPAL_BOUNDS.min_lng));
    assert!(is_in_nepal(NEPAL_BOUNDS.max_lat, NEPAL_BOUNDS.max_lng));
    // Delhi
    assert!(!is_in_nepal(28.6139, 77.209));
    // Lhasa
    assert!(!is_in_nepal(29.652, 91.172));
    assert!(!is_in_nepal(26.3, 85.0));
  }

  #[test]
  fn test_every_reference_city_is_inside() {
    for city in &NEPAL_CITIES {
      assert!(is_in_nepal(city.lat, city.lng), "{} out of bounds", city.name);
      assert!(
        NEPAL_PROVINCES.iter().any(|p| p.name == city.province),
        "{} has unknown province",
        city.name
      );
    }
  }

  #[test]
  fn test_find_city() {
    assert_eq!(find_city("pokhara").map(|c| c.name), Some("Pokhara"));
    assert_eq!(find_city(" KATHMANDU ").map(|c| c.name), Some("Kathmandu"));
    assert_eq!(find_city("धरान").map(|c| c.name), Some("Dharan"));
    assert_eq!(find_city("Delhi"), None);
  }

  #[test]
  fn test_validate_location() {
    assert!(validate_location(Some((27.7, 85.3)), None));
    // Coordinates take precedence over the name
    assert!(!validate_location(Some((28.6, 77.2)), Some("Kathmandu")));
    assert!(validate_location(None, Some("Butwal")));
    assert!(!validate_location(None, Some("Varanasi")));
    assert!(!validate_location(None, None));
  }

  #[test]
  fn test_nearest_city() {
    assert_eq!(nearest_city(27.70, 85.32).map(|c| c.name), Some("Kathmandu"));
    assert_eq!(nearest_city(28.20, 83.99).map(|c| c.name), Some("Pokhara"));
    assert_eq!(nearest_city(28.6139, 77.209), None);
  }

  #[test]
  fn test_weather_url() {
    let url = weather_url(
      "https://api.openweathermap.org/data/2.5/weather",
      "kathmandu",
      "secret",
    )
    .unwrap();

    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert!(pairs.contains(&("lat".into(), "27.7172".into())));
    assert!(pairs.contains(&("lon".into(), "85.324".into())));
    assert!(pairs.contains(&("appid".into(), "secret".into())));
    assert!(pairs.contains(&("units".into(), "metric".into())));

    assert!(weather_url("https://api.openweathermap.org/data/2.5/weather", "Agra", "k").is_none());
  }

  #[test]
  fn test_nepal_time_offset() {
    assert_eq!(nepal_time().offset().local_minus_utc(), NEPAL_OFFSET_SECS);
  }
}
