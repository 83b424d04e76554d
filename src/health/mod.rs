/*!
 * # Health Check Module
 *
 * Liveness and readiness endpoints. The orchestrator holds no database and
 * no in-process saga state, so readiness reduces to the process being up;
 * downstream outages surface per-request through the circuit breakers.
 */

use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use serde_json::json;

pub fn health_routes() -> Router {
    Router::new()
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}

async fn liveness() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "up",
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
}

async fn readiness() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "up",
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
}
