use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::state::AppState;

/// GET /health
/// Liveness plus a database round trip. 503 when `SELECT 1` fails.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let database_ok = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => true,
        Err(e) => {
            warn!("Health check database query failed: {e}");
            false
        }
    };
    health_response(database_ok)
}

fn health_response(database_ok: bool) -> (StatusCode, Json<Value>) {
    let (status, label, database) = if database_ok {
        (StatusCode::OK, "ok", "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unavailable")
    };

    (
        status,
        Json(json!({
            "status": label,
            "database": database,
            "version": env!("CARGO_PKG_VERSION"),
            "service": "rfp-api"
        })),
    )
}
