//! Health check endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::warn;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub cart_store: bool,
    pub cart_store_backend: &'static str,
}

/// 200 when the database answers; a failing cart store only degrades the
/// status since catalog and order reads still work.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = state.db.health_check().await;
    let cart_store = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Cart store health check failed");
            false
        }
    };

    let (code, status) = match (database, cart_store) {
        (true, true) => (StatusCode::OK, "ok"),
        (true, false) => (StatusCode::OK, "degraded"),
        (false, _) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
    };

    (
        code,
        Json(HealthResponse {
            status,
            database,
            cart_store,
            cart_store_backend: state.store.backend(),
        }),
    )
}
