//! # Boutique Commerce API
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Commerce API Server                              │
//! │                                                                         │
//! │  Storefront ───► HTTP (8080) ───► Services ───► SQLite                 │
//! │                                       │                                 │
//! │                            ┌──────────┼──────────┐                      │
//! │                            ▼          ▼          ▼                      │
//! │                          Redis     Payment     Email                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use boutique_db::{Database, DbConfig};
use commerce_api::cart_store::{CartStore, MemoryCartStore, RedisCartStore};
use commerce_api::gateways::{HttpEmailSender, HttpPaymentGateway};
use commerce_api::{router, AppState, CommerceConfig};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,boutique=debug,commerce_api=debug,sqlx=warn";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    info!("Starting Boutique commerce API...");

    // Load configuration
    let config = CommerceConfig::load().context("failed to load configuration")?;
    info!(
        port = config.http_port,
        database = %config.database_path,
        credit_policy = ?config.credit_policy,
        "Configuration loaded"
    );

    // Open database (runs migrations)
    let db = Database::new(DbConfig::new(&config.database_path))
        .await
        .context("failed to open database")?;
    info!("Database ready");

    // Cart store
    let store: Arc<dyn CartStore> = match config.redis_url {
        Some(ref url) => {
            let store = RedisCartStore::connect(url)
                .await
                .context("failed to connect to Redis cart store")?;
            Arc::new(store)
        }
        None => {
            warn!("No Redis URL configured, carts are kept in process memory");
            Arc::new(MemoryCartStore::new())
        }
    };

    // Outbound gateways
    let payment = HttpPaymentGateway::new(config.payment.clone()).context("failed to build payment client")?;
    let email = HttpEmailSender::new(config.email.clone()).context("failed to build email client")?;

    let state = AppState::build(&config, db.clone(), store, Arc::new(payment), Arc::new(email)).await;
    let events = state.events.clone();

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "Starting HTTP server");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    events.shutdown().await;
    db.close().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
///
/// A signal that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, starting graceful shutdown...");
}
