//! Storefront Cache - product catalog and checkout server for a headless store
//!
//! Serves cached product data and payment sessions in front of a commerce backend.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_cache::{api::create_router, AppState, Config};

/// Main entry point for the storefront server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Check backend settings and build the catalog cache and cart session
/// 4. Resume or create the session's cart
/// 5. Create Axum router with all endpoints
/// 6. Serve until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info", can be overridden with RUST_LOG
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting storefront server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: products_ttl={}s, product_ttl={}s, loader_timeout={}s, max_entries={}, port={}",
        config.products_ttl,
        config.product_ttl,
        config.loader_timeout,
        config.max_entries,
        config.server_port
    );

    // Missing backend settings stop the server here
    let state = AppState::from_config(&config).context("Invalid backend configuration")?;
    info!("Catalog cache initialized");

    // Resume the stored cart; an unreachable backend is not fatal here
    match state.cart.initialize().await {
        Ok(()) => info!(
            cart_id = state.cart.cart_id().as_deref().unwrap_or_default(),
            path = %config.cart_store_path.display(),
            "Cart session ready"
        ),
        Err(err) => warn!(error = %err, "Cart session not initialized, will create on first item"),
    }

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
