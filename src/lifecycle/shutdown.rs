//! Shutdown coordination for the gateway.

use tokio::sync::broadcast;

/// Broadcast handle that stops the HTTP server, the admin API and the
/// reload loop together. Clones share the same channel.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Ask every subscriber to stop. In-flight requests are drained by the
    /// server before it returns.
    pub fn trigger(&self) {
        tracing::info!(listeners = self.tx.receiver_count(), "Shutdown requested");
        let _ = self.tx.send(());
    }

    /// Number of tasks still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
