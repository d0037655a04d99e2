//! # Academy API Server
//!
//! Serves the academy backend over HTTP.
//!
//! ## Startup
//!
//! 1. Load configuration from the environment (and `.env`)
//! 2. Connect to PostgreSQL and apply pending migrations
//! 3. Enable federated login when Firebase is configured
//! 4. Serve until Ctrl-C, then drain connections and close the pool
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p academy-api
//! ```

use std::sync::Arc;

use academy_api::{
    app::{build_router, AppState},
    config::{Config, FirebaseConfig},
};
use academy_shared::auth::federated::FirebaseVerifier;
use academy_shared::db::{
    migrations::run_migrations,
    pool::{close_pool, create_pool},
};
use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "academy_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Academy API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = create_pool(config.pool_config())
        .await
        .context("Failed to connect to database")?;

    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let firebase = config.firebase.clone();
    let bind_address = config.bind_address();

    let mut state = AppState::new(pool.clone(), config);
    match firebase_verifier(&firebase)? {
        Some(verifier) => {
            tracing::info!(project_id = verifier.project_id(), "Federated login enabled");
            state = state.with_identity_verifier(Arc::new(verifier));
        }
        None => tracing::info!("Federated login disabled"),
    }

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    close_pool(pool).await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Builds the Firebase verifier; an explicit project id wins over the
/// credential file
fn firebase_verifier(config: &FirebaseConfig) -> anyhow::Result<Option<FirebaseVerifier>> {
    if let Some(project_id) = config.project_id.as_deref() {
        return Ok(Some(FirebaseVerifier::new(project_id)));
    }

    match config.credential_path.as_deref() {
        Some(path) => {
            let verifier = FirebaseVerifier::from_credential_file(path)
                .with_context(|| format!("Failed to load Firebase credentials from {}", path))?;
            Ok(Some(verifier))
        }
        None => Ok(None),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
