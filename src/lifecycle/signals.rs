//! OS signal handling.
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGINT/SIGTERM trigger graceful shutdown once
//! - SIGHUP requests a route reload, not shutdown

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::ReloadRequest;
use crate::lifecycle::shutdown::Shutdown;

/// Listen for process signals until shutdown is triggered.
pub fn spawn_signal_handler(
    shutdown: Shutdown,
    reload_tx: mpsc::UnboundedSender<ReloadRequest>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_signals(reload_tx).await;
        tracing::info!("Shutdown signal received");
        shutdown.trigger();
    })
}

#[cfg(unix)]
async fn wait_for_signals(reload_tx: mpsc::UnboundedSender<ReloadRequest>) {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut terminate, mut hangup) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::hangup()),
    ) {
        (Ok(terminate), Ok(hangup)) => (terminate, hangup),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!(error = %e, "Failed to install signal handlers, only Ctrl+C will stop the gateway");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return,
            _ = terminate.recv() => return,
            _ = hangup.recv() => {
                tracing::info!("SIGHUP received, requesting route reload");
                let _ = reload_tx.send(ReloadRequest::Signal);
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signals(_reload_tx: mpsc::UnboundedSender<ReloadRequest>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
