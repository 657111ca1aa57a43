use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use nepwatch::app::{self, App, Feed};
use nepwatch::config::{Config, StorageBackend};
use nepwatch::logging;

#[derive(Parser, Debug)]
#[command(name = "nepwatch")]
#[command(about = "Offline-tolerant watcher for Nepal weather and daily essentials")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/nepwatch/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Cache backend, overriding storage.backend
  #[arg(long, value_enum, global = true)]
  store: Option<StorageBackend>,

  /// Increase log verbosity (-v info, -vv debug)
  #[arg(short, long, action = clap::ArgAction::Count, global = true)]
  verbose: u8,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Poll feeds and print a line on every change (all feeds by default)
  Watch {
    #[arg(value_enum)]
    feeds: Vec<Feed>,

    /// Seconds between refreshes; 0 fetches once
    #[arg(short, long)]
    interval: Option<u64>,
  },
  /// Fetch a feed once and print the settled state as JSON
  Once {
    #[arg(value_enum)]
    feed: Feed,
  },
  /// Print the cached entry for a feed without fetching
  Show {
    #[arg(value_enum)]
    feed: Feed,
  },
  /// Delete the cached entry for a feed
  Forget {
    #[arg(value_enum)]
    feed: Feed,
  },
  /// Check whether coordinates or a city name are in Nepal
  Locate {
    #[arg(
      allow_hyphen_values = true,
      requires = "lng",
      required_unless_present = "city",
      conflicts_with = "city"
    )]
    lat: Option<f64>,
    #[arg(allow_hyphen_values = true)]
    lng: Option<f64>,

    /// Look up a city by English or Nepali name instead
    #[arg(long)]
    city: Option<String>,
  },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(args.verbose, config.log.dir.as_deref())?;

  if let Command::Locate { lat, lng, city } = &args.command {
    println!("{}", app::locate((*lat).zip(*lng), city.as_deref()));
    return Ok(ExitCode::SUCCESS);
  }

  let app = App::new(config, args.store)?;

  let code = match args.command {
    Command::Watch { feeds, interval } => {
      app
        .watch(&feeds, interval.map(Duration::from_secs))
        .await?;
      ExitCode::SUCCESS
    }
    Command::Once { feed } => {
      let report = app.once(feed).await;
      println!("{}", serde_json::to_string_pretty(&report)?);
      if report["data"].is_null() {
        ExitCode::FAILURE
      } else {
        ExitCode::SUCCESS
      }
    }
    Command::Show { feed } => match app.show(feed)? {
      Some(entry) => {
        println!("{}", serde_json::to_string_pretty(&entry)?);
        ExitCode::SUCCESS
      }
      None => {
        eprintln!("No cached entry for {}", feed.cache_key());
        ExitCode::FAILURE
      }
    },
    Command::Forget { feed } => {
      app.forget(feed)?;
      ExitCode::SUCCESS
    }
    Command::Locate { .. } => ExitCode::SUCCESS,
  };

  Ok(code)
}
