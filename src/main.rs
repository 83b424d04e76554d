use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, Json, Router};
use serde_json::json;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use checkout_api::{api_v1_routes, config, health, middleware_helpers, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = config::load_config()?;
    config::init_tracing(config.log_level());

    tracing::info!("Starting checkout orchestrator...");

    let state = Arc::new(AppState::from_config(config.clone())?);

    let api_routes = api_v1_routes().with_state(state);

    let app = Router::new()
        // Health routes (no state needed)
        .nest("/health", health::health_routes())
        // API v1 routes
        .nest("/api/v1", api_routes)
        // Fallback 404 JSON
        .fallback(fallback_handler)
        // Middleware stack
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(60)))
                .layer(CorsLayer::permissive()),
        )
        // Request ID tagging for log correlation
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Checkout API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Checkout API server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

async fn fallback_handler() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "data": null,
            "message": "The requested resource was not found",
            "status": 404,
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
}
