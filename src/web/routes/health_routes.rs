use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use chrono::Utc;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::error;

use crate::version::VERSION;
use crate::web::{AppError, AppState};

pub fn create_health_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(health_check_handler))
        .route("/detailed", get(detailed_health_handler))
}

async fn health_check_handler(State(app_state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    match app_state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "timestamp": Utc::now(),
                "services": { "database": "up", "api": "up" },
                "version": VERSION,
            })),
        ),
        Err(e) => {
            error!(error = %e, "Health check failed to reach storage.");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "timestamp": Utc::now(),
                    "services": { "database": "down", "api": "up" },
                    "error": "Database connection failed",
                })),
            )
        }
    }
}

async fn detailed_health_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let counts = app_state.store.counts().await?;
    Ok(Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "database": {
            "status": "connected",
            "users": counts.users,
            "monitors": counts.monitors,
        },
        "environment": app_state.config.environment,
        "version": VERSION,
    })))
}
