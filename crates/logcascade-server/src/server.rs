//! Server startup and shutdown

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::signal;
use tracing::{info, warn};

use crate::routes::create_router;
use crate::state::AppState;

/// Serve until SIGINT or SIGTERM
pub async fn run_server(state: AppState) -> Result<()> {
    let addr: SocketAddr = state
        .settings
        .bind_address()
        .parse()
        .with_context(|| format!("Invalid listen address {}", state.settings.bind_address()))?;

    if state.settings.warm_up {
        info!("Warming up strategies...");
        state.cascade.warm_up().await;
    }

    for (name, availability) in state.cascade.availability() {
        info!("Strategy {}: {:?}", name, availability);
    }

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Log classifier listening on http://{}", addr);

    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
