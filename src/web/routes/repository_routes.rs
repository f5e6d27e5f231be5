use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_extra::extract::WithRejection;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::services::repository_service;
use crate::web::models::repository_models::{
    ConnectionTestResponse, CreateRepositoryRequest, RepositoryView, UpdateRepositoryRequest,
};
use crate::web::models::{ApiResponse, AuthenticatedUser};
use crate::web::{AppError, AppState};

pub fn create_repository_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_repositories).post(create_repository))
        .route(
            "/{id}",
            get(get_repository)
                .put(update_repository)
                .delete(delete_repository),
        )
        .route("/{id}/test", post(test_repository))
}

async fn list_repositories(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<RepositoryView>>>, AppError> {
    let repositories = repository_service::list(app_state.store.as_ref(), &auth_user).await?;
    Ok(Json(ApiResponse::data(
        repositories.into_iter().map(RepositoryView::from).collect(),
    )))
}

async fn create_repository(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    WithRejection(Json(payload), _): WithRejection<Json<CreateRepositoryRequest>, AppError>,
) -> Result<(StatusCode, Json<ApiResponse<RepositoryView>>), AppError> {
    let repository = repository_service::create(
        app_state.store.as_ref(),
        &app_state.cipher,
        &auth_user,
        payload,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Repository connected successfully",
            RepositoryView::from(repository),
        )),
    ))
}

async fn get_repository(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> Result<Json<ApiResponse<RepositoryView>>, AppError> {
    let repository = repository_service::get(app_state.store.as_ref(), &auth_user, id).await?;
    Ok(Json(ApiResponse::data(RepositoryView::from(repository))))
}

async fn update_repository(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateRepositoryRequest>, AppError>,
) -> Result<Json<ApiResponse<RepositoryView>>, AppError> {
    let repository = repository_service::update(
        app_state.store.as_ref(),
        &app_state.cipher,
        &auth_user,
        id,
        payload,
    )
    .await?;
    Ok(Json(ApiResponse::with_message(
        "Repository updated successfully",
        RepositoryView::from(repository),
    )))
}

async fn delete_repository(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> Result<Json<Value>, AppError> {
    repository_service::delete(app_state.store.as_ref(), &auth_user, id).await?;
    Ok(Json(json!({ "message": "Repository deleted successfully" })))
}

async fn test_repository(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> Result<Json<ApiResponse<ConnectionTestResponse>>, AppError> {
    let result = repository_service::test_connection(
        app_state.store.as_ref(),
        &app_state.cipher,
        app_state.probe.as_ref(),
        &auth_user,
        id,
    )
    .await?;
    let message = if result.success {
        "Repository connection successful"
    } else {
        "Repository connection failed"
    };
    Ok(Json(ApiResponse::with_message(message, result)))
}
