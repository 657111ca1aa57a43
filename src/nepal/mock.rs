//! Built-in fallback snapshots served when no upstream source can be parsed.

use chrono::{DateTime, NaiveDate, Utc};

use super::types::{
  BandhAlerts, BandhEvent, FeedSource, FuelPrices, Highway, LoadShedding, RegionalFuelPrices,
  RoadTrekkingStatus, RouteStatus, Severity, Trek, UtilitiesStatus,
};

fn strings(items: &[&str]) -> Vec<String> {
  items.iter().map(|s| s.to_string()).collect()
}

fn highway(
  name: &str,
  name_np: &str,
  status: RouteStatus,
  districts: &[&str],
  reason: Option<&str>,
) -> Highway {
  Highway {
    name: name.to_string(),
    name_np: name_np.to_string(),
    status,
    districts: strings(districts),
    reason: reason.map(String::from),
  }
}

fn trek(
  name: &str,
  name_np: &str,
  status: RouteStatus,
  difficulty: &str,
  reason: Option<&str>,
) -> Trek {
  Trek {
    name: name.to_string(),
    name_np: name_np.to_string(),
    status,
    difficulty: difficulty.to_string(),
    permits_required: true,
    reason: reason.map(String::from),
  }
}

pub fn road_trekking(source: FeedSource, now: DateTime<Utc>) -> RoadTrekkingStatus {
  use RouteStatus::*;

  RoadTrekkingStatus {
    highways: vec![
      highway("Prithvi Highway", "पृथ्वी राजमार्ग", Open, &["Kathmandu", "Chitwan", "Pokhara"], None),
      highway("Siddhartha Highway", "सिद्धार्थ राजमार्ग", Open, &["Butwal", "Pokhara"], None),
      highway(
        "BP Highway",
        "बीपी राजमार्ग",
        Partial,
        &["Sindhuli", "Dhankuta"],
        Some("Landslide clearing in progress"),
      ),
      highway("Mahendra Highway", "महेन्द्र राजमार्ग", Open, &["East-West Terai"], None),
      highway(
        "Karnali Highway",
        "कर्णाली राजमार्ग",
        Closed,
        &["Jumla", "Surkhet"],
        Some("Heavy snowfall"),
      ),
      highway("Koshi Highway", "कोशी राजमार्ग", Open, &["Biratnagar", "Dharan"], None),
    ],
    treks: vec![
      trek("Annapurna Circuit", "अन्नपूर्ण परिक्रमा", Open, "Moderate", None),
      trek("Everest Base Camp", "सगरमाथा आधार शिविर", Open, "Challenging", None),
      trek(
        "Langtang Valley",
        "लाङटाङ उपत्यका",
        Partial,
        "Moderate",
        Some("Weather advisory"),
      ),
      trek("Manaslu Circuit", "मनास्लु परिक्रमा", Open, "Challenging", None),
    ],
    source,
    last_updated: now,
  }
}

/// Upcoming bandh events.
///
/// Dates are relative to `today` so the fallback never goes stale. Both lie
/// in the future, so alerts built from this list never carry a same-day
/// alert; only a parsed feed can promote one.
pub fn bandh_events(today: NaiveDate) -> Vec<BandhEvent> {
  vec![
    BandhEvent {
      date: today + chrono::Duration::days(3),
      title: "Nationwide Transport Strike".to_string(),
      title_np: "राष्ट्रव्यापी यातायात हड्ताल".to_string(),
      organizer: "Transport Workers' Union".to_string(),
      districts: strings(&["All Nepal"]),
      severity: Severity::High,
      description: "24-hour transport shutdown across the country".to_string(),
    },
    BandhEvent {
      date: today + chrono::Duration::days(7),
      title: "Teachers Union Protest".to_string(),
      title_np: "शिक्षक संघ प्रदर्शन".to_string(),
      organizer: "Nepal Teachers Federation".to_string(),
      districts: strings(&["Kathmandu", "Lalitpur", "Bhaktapur"]),
      severity: Severity::Medium,
      description: "Education sector protest in Kathmandu Valley".to_string(),
    },
  ]
}

/// Build the alert snapshot, promoting the event dated `today` if there is one.
pub fn bandh_alerts(
  events: Vec<BandhEvent>,
  today: NaiveDate,
  source: FeedSource,
  now: DateTime<Utc>,
) -> BandhAlerts {
  let today_alert = events.iter().find(|e| e.date == today).cloned();

  BandhAlerts {
    today_alert,
    upcoming_events: events,
    source,
    last_updated: now,
  }
}

pub fn utilities(source: FeedSource, now: DateTime<Utc>) -> UtilitiesStatus {
  UtilitiesStatus {
    load_shedding: LoadShedding {
      active: false,
      message: "No scheduled load-shedding today".to_string(),
      message_np: "आज कुनै लोडशेडिङ तालिका छैन".to_string(),
      note: Some("Dry season may cause occasional power cuts".to_string()),
      groups: Vec::new(),
    },
    fuel_prices: RegionalFuelPrices {
      kathmandu: FuelPrices {
        petrol: 158.5,
        diesel: 143.5,
        kerosene: 140.0,
        lpg: 1950.0,
      },
      terai: FuelPrices {
        petrol: 157.0,
        diesel: 142.0,
        kerosene: 139.0,
        lpg: 1900.0,
      },
      remote: FuelPrices {
        petrol: 165.0,
        diesel: 150.0,
        kerosene: 147.0,
        lpg: 2100.0,
      },
      currency: "NPR".to_string(),
      effective_date: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap_or_default(),
    },
    source,
    last_updated: now,
  }
}
