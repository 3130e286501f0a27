//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

/// Why a route reload was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadRequest {
    /// The config file was modified or re-created.
    FileChanged,
    /// SIGHUP, or an explicit request from the host.
    Signal,
}

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    reload_tx: mpsc::UnboundedSender<ReloadRequest>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and the receiving end of its reload requests.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ReloadRequest>) {
        let (reload_tx, reload_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                reload_tx,
            },
            reload_rx,
        )
    }

    /// Another handle for sending reload requests (e.g. from signals).
    pub fn sender(&self) -> mpsc::UnboundedSender<ReloadRequest> {
        self.reload_tx.clone()
    }

    /// Start watching the file. Watching stops when the returned watcher is
    /// dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.reload_tx;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    tracing::info!("Config file change detected, requesting reload");
                    let _ = tx.send(ReloadRequest::FileChanged);
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sender_feeds_the_same_channel() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let (watcher, mut rx) = ConfigWatcher::new(file.path());

        watcher.sender().send(ReloadRequest::Signal).unwrap();
        assert_eq!(rx.recv().await, Some(ReloadRequest::Signal));
    }

    #[tokio::test]
    async fn missing_file_cannot_be_watched() {
        let dir = tempfile::tempdir().unwrap();
        let (watcher, _rx) = ConfigWatcher::new(&dir.path().join("absent.toml"));
        assert!(watcher.run().is_err());
    }
}
