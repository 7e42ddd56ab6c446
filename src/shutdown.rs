//! Graceful shutdown for watch mode.
//!
//! Listens for SIGINT (Ctrl+C) and SIGTERM, then cancels a
//! [`tokio_util::sync::CancellationToken`] so the rotation loop stops after
//! the cycle in flight. A second signal force-exits.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Install signal handlers and return a token cancelled on the first
/// SIGINT / SIGTERM.
pub(crate) fn install_signal_handler() -> std::io::Result<CancellationToken> {
    let token = CancellationToken::new();
    let count = Arc::new(AtomicU32::new(0));

    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    let handler_token = token.clone();
    tokio::spawn(async move {
        loop {
            #[cfg(unix)]
            {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }

            #[cfg(not(unix))]
            {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!(error = %e, "Cannot listen for Ctrl+C");
                    return;
                }
            }

            if count.fetch_add(1, Ordering::SeqCst) == 0 {
                tracing::info!("Received shutdown signal, stopping after the current cycle...");
                tracing::info!("Press Ctrl+C again to force exit");
                handler_token.cancel();
            } else {
                tracing::warn!("Force exit requested");
                std::process::exit(130);
            }
        }
    });

    Ok(token)
}
