use axum::{
    Json, Router,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_extra::extract::WithRejection;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::db::models::{Monitor, MonitorLog, MonitorStats};
use crate::services::monitor_service;
use crate::web::models::monitor_models::{
    CreateMonitorRequest, ExecuteResponse, LogsQuery, MonitorListQuery, TestMonitorRequest,
    TestMonitorResponse, UpdateMonitorRequest,
};
use crate::web::models::{ApiResponse, AuthenticatedUser};
use crate::web::{AppError, AppState};

pub fn create_monitor_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_monitors).post(create_monitor))
        .route("/test", post(test_monitor))
        .route("/status/broken", get(list_broken_monitors))
        .route("/stats/overview", get(monitor_stats))
        .route(
            "/{id}",
            get(get_monitor).put(update_monitor).delete(delete_monitor),
        )
        .route("/{id}/execute", post(execute_monitor))
        .route("/{id}/logs", get(monitor_logs))
}

async fn list_monitors(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    WithRejection(Query(query), _): WithRejection<Query<MonitorListQuery>, AppError>,
) -> Result<Json<ApiResponse<Vec<Monitor>>>, AppError> {
    let monitors = monitor_service::list(app_state.store.as_ref(), &auth_user, query.status).await?;
    Ok(Json(ApiResponse::data(monitors)))
}

async fn create_monitor(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    WithRejection(Json(payload), _): WithRejection<Json<CreateMonitorRequest>, AppError>,
) -> Result<(StatusCode, Json<ApiResponse<Monitor>>), AppError> {
    let monitor = monitor_service::create(app_state.store.as_ref(), &auth_user, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Monitor created successfully", monitor)),
    ))
}

async fn test_monitor(
    State(app_state): State<Arc<AppState>>,
    WithRejection(Json(payload), _): WithRejection<Json<TestMonitorRequest>, AppError>,
) -> Result<Json<ApiResponse<TestMonitorResponse>>, AppError> {
    let result = monitor_service::test_config(app_state.config_tester.as_ref(), payload).await?;
    Ok(Json(ApiResponse::with_message("Monitor test completed", result)))
}

async fn list_broken_monitors(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Monitor>>>, AppError> {
    let monitors = monitor_service::broken(app_state.store.as_ref(), &auth_user).await?;
    Ok(Json(ApiResponse::data(monitors)))
}

async fn monitor_stats(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<MonitorStats>>, AppError> {
    let stats = monitor_service::stats(app_state.store.as_ref(), &auth_user).await?;
    Ok(Json(ApiResponse::data(stats)))
}

async fn get_monitor(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> Result<Json<ApiResponse<Monitor>>, AppError> {
    let monitor = monitor_service::get(app_state.store.as_ref(), &auth_user, id).await?;
    Ok(Json(ApiResponse::data(monitor)))
}

async fn update_monitor(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateMonitorRequest>, AppError>,
) -> Result<Json<ApiResponse<Monitor>>, AppError> {
    let monitor = monitor_service::update(app_state.store.as_ref(), &auth_user, id, payload).await?;
    Ok(Json(ApiResponse::with_message("Monitor updated successfully", monitor)))
}

async fn delete_monitor(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> Result<Json<Value>, AppError> {
    monitor_service::delete(app_state.store.as_ref(), &auth_user, id).await?;
    Ok(Json(json!({ "message": "Monitor deleted successfully" })))
}

async fn execute_monitor(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> Result<Json<ApiResponse<ExecuteResponse>>, AppError> {
    let result = monitor_service::execute(
        app_state.store.as_ref(),
        app_state.checker.as_ref(),
        &auth_user,
        id,
    )
    .await?;
    let message = format!("Monitor executed: {}", result.last_action);
    Ok(Json(ApiResponse::with_message(message, result)))
}

async fn monitor_logs(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
    WithRejection(Query(query), _): WithRejection<Query<LogsQuery>, AppError>,
) -> Result<Json<ApiResponse<Vec<MonitorLog>>>, AppError> {
    let logs = monitor_service::logs(app_state.store.as_ref(), &auth_user, id, query.limit).await?;
    Ok(Json(ApiResponse::data(logs)))
}
