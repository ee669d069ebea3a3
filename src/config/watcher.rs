//! Configuration file watcher for hot reload of the mapping table.
//!
//! Stands in for a discovery backend when mappings come from the config
//! file: every accepted change produces a fresh [`GatewayConfig`] which the
//! server turns into a new mapping snapshot.

use std::path::{Path, PathBuf};
use std::time::Duration;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use crate::config::loader::load_config;
use crate::config::schema::GatewayConfig;

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<GatewayConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<GatewayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned watcher must be kept alive for updates to keep flowing.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    reload_on_change(&path, &event.kind, &tx);
                }
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Reload `path` if `kind` is a content change. Returns true when an update was sent.
fn reload_on_change(
    path: &Path,
    kind: &EventKind,
    tx: &mpsc::UnboundedSender<GatewayConfig>,
) -> bool {
    if !(kind.is_modify() || kind.is_create()) {
        return false;
    }

    tracing::info!(path = ?path, "Config file change detected, reloading mappings");
    match load_config(path) {
        Ok(new_config) => {
            tracing::debug!(mappings = new_config.mappings.len(), "Config reloaded");
            tx.send(new_config).is_ok()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to reload config, keeping current mappings");
            false
        }
    }
}
