use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter used when RUST_LOG is unset: 0 = warn, 1 = info, 2+ = debug
fn default_directive(verbosity: u8) -> &'static str {
  match verbosity {
    0 => "nepwatch=warn",
    1 => "nepwatch=info",
    _ => "nepwatch=debug",
  }
}

/// Install the global subscriber.
///
/// Logs go to stderr, and additionally to a daily-rolling file under
/// `log_dir` when one is configured. Keep the returned guard alive for the
/// lifetime of the process so buffered file output is flushed.
pub fn init(verbosity: u8, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

  let stderr = fmt::layer()
    .with_writer(std::io::stderr)
    .with_target(false);

  let (file, guard) = match log_dir {
    Some(dir) => {
      std::fs::create_dir_all(dir)
        .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;
      let appender = tracing_appender::rolling::daily(dir, "nepwatch.log");
      let (writer, guard) = tracing_appender::non_blocking(appender);
      (
        Some(fmt::layer().with_writer(writer).with_ansi(false)),
        Some(guard),
      )
    }
    None => (None, None),
  };

  tracing_subscriber::registry()
    .with(filter)
    .with(stderr)
    .with(file)
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_verbosity_levels() {
    assert_eq!(default_directive(0), "nepwatch=warn");
    assert_eq!(default_directive(1), "nepwatch=info");
    assert_eq!(default_directive(2), "nepwatch=debug");
    assert_eq!(default_directive(9), "nepwatch=debug");
  }
}
