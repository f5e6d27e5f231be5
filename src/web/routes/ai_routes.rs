use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    routing::{get, post},
};
use axum_extra::extract::WithRejection;
use std::sync::Arc;

use crate::services::fix_service;
use crate::web::models::ai_models::{
    AiFixView, AnalyzeRequest, AnalyzeResponse, ApplyFixResponse, TestUrlRequest, UrlAnalysis,
};
use crate::web::models::{ApiResponse, AuthenticatedUser};
use crate::web::{AppError, AppState};

pub fn create_ai_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/analyze", post(analyze_code))
        .route("/fixes/{monitor_id}", get(list_fixes))
        .route("/apply-fix/{fix_id}", post(apply_fix))
        .route("/test-url", post(test_url))
}

async fn analyze_code(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    WithRejection(Json(payload), _): WithRejection<Json<AnalyzeRequest>, AppError>,
) -> Result<Json<ApiResponse<AnalyzeResponse>>, AppError> {
    let fix = fix_service::generate(
        app_state.store.as_ref(),
        app_state.generator.as_ref(),
        &auth_user,
        payload,
    )
    .await?;
    Ok(Json(ApiResponse::with_message(
        "AI analysis completed",
        AnalyzeResponse::from(fix),
    )))
}

async fn list_fixes(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    WithRejection(Path(monitor_id), _): WithRejection<Path<i32>, AppError>,
) -> Result<Json<ApiResponse<Vec<AiFixView>>>, AppError> {
    let fixes = fix_service::list(app_state.store.as_ref(), &auth_user, monitor_id).await?;
    Ok(Json(ApiResponse::data(
        fixes.into_iter().map(AiFixView::from).collect(),
    )))
}

async fn apply_fix(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    WithRejection(Path(fix_id), _): WithRejection<Path<i32>, AppError>,
) -> Result<Json<ApiResponse<ApplyFixResponse>>, AppError> {
    let applied = fix_service::apply(app_state.store.as_ref(), &auth_user, fix_id).await?;
    Ok(Json(ApiResponse::with_message(
        "AI fix applied successfully",
        applied,
    )))
}

async fn test_url(
    State(app_state): State<Arc<AppState>>,
    WithRejection(Json(payload), _): WithRejection<Json<TestUrlRequest>, AppError>,
) -> Result<Json<ApiResponse<UrlAnalysis>>, AppError> {
    let analysis = fix_service::analyze_url(app_state.generator.as_ref(), payload).await?;
    Ok(Json(ApiResponse::with_message(
        "URL analysis completed",
        analysis,
    )))
}
