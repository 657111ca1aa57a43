//! nepwatch: offline-tolerant polling of Nepal weather and daily essentials
//! feeds, backed by a keyed local cache.

pub mod app;
pub mod cache;
pub mod config;
pub mod event;
pub mod logging;
pub mod nepal;
