// Signal handling module
//
// Supported signals:
// - SIGTERM: Graceful shutdown
// - SIGINT:  Graceful shutdown (Ctrl+C)

use std::sync::Arc;

use crate::config::AppState;
use crate::logger;

/// Start the shutdown signal listener (Unix)
///
/// Spawns a background task that starts the shutdown of `state` once on
/// SIGTERM or SIGINT. A signal that cannot be registered is logged and ignored.
#[cfg(unix)]
pub fn start_signal_handler(state: Arc<AppState>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    logger::log_error(&format!("Failed to register signal handlers: {e}"));
                    return;
                }
            };

        logger::log_debug(&format!(
            "[SIGNAL] SIGTERM/SIGINT handlers registered, pid {}",
            std::process::id()
        ));

        tokio::select! {
            _ = sigterm.recv() => logger::log_info("\n[SIGNAL] SIGTERM received, shutting down"),
            _ = sigint.recv() => logger::log_info("\n[SIGNAL] SIGINT received, shutting down"),
        }
        state.begin_shutdown();
    });
}

/// Windows fallback - only handles Ctrl+C
#[cfg(not(unix))]
pub fn start_signal_handler(state: Arc<AppState>) {
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            logger::log_info("\n[SIGNAL] Ctrl+C received, shutting down");
            state.begin_shutdown();
        }
    });
}
