use std::fmt::Display;
use tokio::sync::{mpsc, watch};
use tracing::warn;

use crate::app::{describe, Feed};
use crate::cache::{Cacheable, LoaderState};

/// Application events
#[derive(Debug)]
pub enum Event {
  /// A feed's loader state changed; carries the rendered status line
  Feed { feed: Feed, line: String },
  /// Refresh every feed now (SIGHUP)
  Refresh,
  /// Ctrl-C or SIGTERM
  Shutdown,
}

/// Event handler that merges feed state changes and process signals
pub struct EventHandler {
  tx: mpsc::UnboundedSender<Event>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  pub fn new() -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    // Spawn signal listener
    let signal_tx = tx.clone();
    tokio::spawn(async move {
      if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        return;
      }
      let _ = signal_tx.send(Event::Shutdown);
    });

    #[cfg(unix)]
    spawn_unix_signals(tx.clone());

    Self { tx, rx }
  }

  /// Forward every state change of a loader as an [`Event::Feed`].
  pub fn watch<T>(&self, feed: Feed, mut states: watch::Receiver<LoaderState<T>>)
  where
    T: Cacheable + Display,
  {
    let tx = self.tx.clone();
    tokio::spawn(async move {
      // Report the initial (possibly cached) state before any change
      let line = describe(&*states.borrow_and_update());
      if tx.send(Event::Feed { feed, line }).is_err() {
        return;
      }

      while states.changed().await.is_ok() {
        let line = describe(&*states.borrow_and_update());
        if tx.send(Event::Feed { feed, line }).is_err() {
          break;
        }
      }
    });
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}

impl Default for EventHandler {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(unix)]
fn spawn_unix_signals(tx: mpsc::UnboundedSender<Event>) {
  use tokio::signal::unix::{signal, SignalKind};

  tokio::spawn(async move {
    let (mut hangup, mut terminate) = match (
      signal(SignalKind::hangup()),
      signal(SignalKind::terminate()),
    ) {
      (Ok(hangup), Ok(terminate)) => (hangup, terminate),
      (Err(e), _) | (_, Err(e)) => {
        warn!(error = %e, "Failed to install signal handlers");
        return;
      }
    };

    loop {
      let event = tokio::select! {
        Some(()) = hangup.recv() => Event::Refresh,
        Some(()) = terminate.recv() => Event::Shutdown,
        else => break,
      };
      if tx.send(event).is_err() {
        break;
      }
    }
  });
}
