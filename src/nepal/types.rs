use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Where a feed snapshot came from.
///
/// Upstream pages are probed but not parsed, so every snapshot is the
/// built-in fallback; the variant records whether the source answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
  /// Fallback snapshot; the upstream source answered
  Mock,
  /// Fallback snapshot; the upstream source could not be reached
  Offline,
}

impl FeedSource {
  pub fn fallback(reachable: bool) -> Self {
    if reachable {
      FeedSource::Mock
    } else {
      FeedSource::Offline
    }
  }
}

impl std::fmt::Display for FeedSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      FeedSource::Mock => f.write_str("fallback"),
      FeedSource::Offline => f.write_str("fallback, source offline"),
    }
  }
}

/// Current conditions for one city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
  pub city: String,
  pub city_nepali: String,
  /// Degrees Celsius, rounded
  pub temp: i32,
  pub condition: String,
  /// Percent
  pub humidity: u8,
  pub lat: f64,
  pub lng: f64,
}

/// Weather for every configured city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
  pub readings: Vec<WeatherReading>,
  pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteStatus {
  Open,
  Partial,
  Caution,
  Closed,
}

impl RouteStatus {
  /// English and Nepali labels
  pub fn labels(self) -> (&'static str, &'static str) {
    match self {
      RouteStatus::Open => ("Open", "खुला"),
      RouteStatus::Partial => ("Partial", "आंशिक"),
      RouteStatus::Caution => ("Caution", "सावधान"),
      RouteStatus::Closed => ("Closed", "बन्द"),
    }
  }
}

/// Highway status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highway {
  pub name: String,
  pub name_np: String,
  pub status: RouteStatus,
  pub districts: Vec<String>,
  pub reason: Option<String>,
}

/// Trekking route status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trek {
  pub name: String,
  pub name_np: String,
  pub status: RouteStatus,
  pub difficulty: String,
  pub permits_required: bool,
  pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadTrekkingStatus {
  pub highways: Vec<Highway>,
  pub treks: Vec<Trek>,
  pub source: FeedSource,
  pub last_updated: DateTime<Utc>,
}

impl RoadTrekkingStatus {
  /// Routes that are not fully open
  pub fn disruptions(&self) -> usize {
    self
      .highways
      .iter()
      .map(|h| h.status)
      .chain(self.treks.iter().map(|t| t.status))
      .filter(|s| *s != RouteStatus::Open)
      .count()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Low,
  Medium,
  High,
}

/// A scheduled bandh (general strike)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandhEvent {
  pub date: NaiveDate,
  pub title: String,
  pub title_np: String,
  pub organizer: String,
  pub districts: Vec<String>,
  pub severity: Severity,
  pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandhAlerts {
  /// Event scheduled for today, if any
  pub today_alert: Option<BandhEvent>,
  pub upcoming_events: Vec<BandhEvent>,
  pub source: FeedSource,
  pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutageWindow {
  /// "HH:MM", Nepal time
  pub start: String,
  pub end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadSheddingGroup {
  pub group: String,
  pub today_schedule: Vec<OutageWindow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadShedding {
  pub active: bool,
  pub message: String,
  pub message_np: String,
  pub note: Option<String>,
  pub groups: Vec<LoadSheddingGroup>,
}

/// Retail prices in NPR. Liquids per liter, LPG per 14.2kg cylinder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelPrices {
  pub petrol: f64,
  pub diesel: f64,
  pub kerosene: f64,
  pub lpg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalFuelPrices {
  pub kathmandu: FuelPrices,
  pub terai: FuelPrices,
  pub remote: FuelPrices,
  pub currency: String,
  pub effective_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilitiesStatus {
  pub load_shedding: LoadShedding,
  pub fuel_prices: RegionalFuelPrices,
  pub source: FeedSource,
  pub last_updated: DateTime<Utc>,
}

// ============================================================================
// One-line summaries
// ============================================================================

impl std::fmt::Display for WeatherReport {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    if self.readings.is_empty() {
      return f.write_str("no readings");
    }
    for (i, r) in self.readings.iter().enumerate() {
      if i > 0 {
        f.write_str(", ")?;
      }
      write!(f, "{} {}°C {} {}%", r.city, r.temp, r.condition, r.humidity)?;
    }
    Ok(())
  }
}

impl std::fmt::Display for RoadTrekkingStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "{} highways, {} treks, {} disrupted",
      self.highways.len(),
      self.treks.len(),
      self.disruptions()
    )?;
    for h in self.highways.iter().filter(|h| h.status == RouteStatus::Closed) {
      let (en, np) = h.status.labels();
      write!(f, "; {}: {}/{}", h.name, en, np)?;
      if let Some(reason) = &h.reason {
        write!(f, " ({})", reason)?;
      }
    }
    write!(f, " [{}]", self.source)
  }
}

impl std::fmt::Display for BandhAlerts {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match &self.today_alert {
      Some(event) => write!(f, "BANDH TODAY: {} ({})", event.title, event.districts.join(", "))?,
      None => f.write_str("no bandh today")?,
    }
    let today = self.today_alert.as_ref().map(|e| e.date);
    if let Some(next) = self
      .upcoming_events
      .iter()
      .filter(|e| Some(e.date) != today)
      .min_by_key(|e| e.date)
    {
      write!(f, "; next: {} on {}", next.title, next.date)?;
    }
    write!(f, " [{}]", self.source)
  }
}

impl std::fmt::Display for UtilitiesStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let prices = &self.fuel_prices;
    write!(
      f,
      "{}; petrol {} {:.1}, diesel {} {:.1} (Kathmandu, from {}) [{}]",
      self.load_shedding.message,
      prices.currency,
      prices.kathmandu.petrol,
      prices.currency,
      prices.kathmandu.diesel,
      prices.effective_date,
      self.source
    )
  }
}
