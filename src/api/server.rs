use axum::Router;
use tracing::{info, warn};

use crate::errors::{Error, Result};
use crate::listener::AcquiredListener;

/// Serve `router` until SIGINT or SIGTERM.
pub async fn serve(acquired: AcquiredListener, router: Router) -> Result<()> {
    let local_addr = acquired.local_addr()?;
    info!(address = %local_addr, source = %acquired.source, "Starting HTTP server");

    axum::serve(acquired.listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::transport(format!("HTTP server error: {}", e)))?;

    info!("HTTP server shutdown completed");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Shutdown listener failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM listener failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
