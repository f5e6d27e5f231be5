use axum::{Router, http::Method, middleware as axum_middleware};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::db::Storage;
use crate::server::config::ServerConfig;
use crate::services::checker::Checker;
use crate::services::encryption_service::TokenCipher;
use crate::services::fix_generator::FixGenerator;
use crate::services::repository_service::RepositoryProbe;
use crate::web::{middleware::auth, routes::*};

pub use crate::web::error::AppError;

pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;

/// Shared handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Storage>,
    /// Runs `execute`.
    pub checker: Arc<dyn Checker>,
    /// Runs `POST /api/monitors/test`.
    pub config_tester: Arc<dyn Checker>,
    pub generator: Arc<dyn FixGenerator>,
    pub probe: Arc<dyn RepositoryProbe>,
    pub cipher: Arc<TokenCipher>,
    pub config: Arc<ServerConfig>,
}

pub fn create_axum_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .nest("/api/health", health_routes::create_health_router())
        .nest(
            "/api/auth",
            auth_routes::create_public_router()
                .merge(auth_routes::create_protected_router().route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth::auth))),
        )
        .nest(
            "/api/monitors",
            monitor_routes::create_monitor_router().route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth::auth)),
        )
        .nest("/api/ai", ai_routes::create_ai_router().route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth::auth)))
        .nest(
            "/api/repositories",
            repository_routes::create_repository_router().route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth::auth)),
        )
        .with_state(app_state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
