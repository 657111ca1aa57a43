//! Nepal data feeds: weather with a geofence, and the daily essentials
//! (road and trekking status, bandh alerts, load-shedding and fuel prices).

pub mod api_types;
mod cache;
pub mod client;
pub mod geo;
pub mod mock;
pub mod types;

pub use client::NepalClient;
