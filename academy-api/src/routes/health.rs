/// Health check endpoint
///
/// Reports whether the server is up and the database reachable, with pool
/// usage and migration state.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "pool": { "active_connections": 1, "idle_connections": 3, "total_connections": 4 },
///   "migrations": { "applied_migrations": 5, "known_migrations": 5, "latest_version": 5, "is_up_to_date": true }
/// }
/// ```

use crate::{app::AppState, error::ApiResult};
use academy_shared::db::{
    migrations::{get_migration_status, MigrationStatus},
    pool::{get_pool_stats, health_check as db_health_check, PoolStats},
};
use axum::{extract::State, Json};
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,

    pub version: String,

    /// `connected` or `disconnected`
    pub database: String,

    pub pool: PoolStats,

    /// Absent while the database is unreachable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migrations: Option<MigrationStatus>,
}

/// Health check handler
///
/// Always 200; a failing database only degrades the status.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let connected = db_health_check(&state.db).await.is_ok();

    let migrations = if connected {
        get_migration_status(&state.db)
            .await
            .map_err(|e| tracing::warn!(error = %e, "Could not read migration status"))
            .ok()
    } else {
        None
    };

    Ok(Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if connected { "connected" } else { "disconnected" }.to_string(),
        pool: get_pool_stats(&state.db),
        migrations,
    }))
}
