use axum::{
    Json, Router,
    extract::{Extension, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_extra::extract::WithRejection;
use std::sync::Arc;

use crate::services::auth_service;
use crate::web::models::{
    ApiResponse, AuthResponse, AuthenticatedUser, LoginRequest, RegisterRequest,
    UpdateProfileRequest, UserResponse,
};
use crate::web::{AppError, AppState};

pub fn create_public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
}

pub fn create_protected_router() -> Router<Arc<AppState>> {
    Router::new().route("/profile", get(get_profile).put(update_profile))
}

async fn register_handler(
    State(app_state): State<Arc<AppState>>,
    WithRejection(Json(payload), _): WithRejection<Json<RegisterRequest>, AppError>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let response =
        auth_service::register_user(app_state.store.as_ref(), &app_state.config, payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn login_handler(
    State(app_state): State<Arc<AppState>>,
    WithRejection(Json(payload), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<Json<AuthResponse>, AppError> {
    let response =
        auth_service::login_user(app_state.store.as_ref(), &app_state.config, payload).await?;
    Ok(Json(response))
}

async fn get_profile(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let user = auth_service::profile(app_state.store.as_ref(), &auth_user).await?;
    Ok(Json(ApiResponse::data(UserResponse::from(&user))))
}

async fn update_profile(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateProfileRequest>, AppError>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let user = auth_service::update_profile(
        app_state.store.as_ref(),
        &app_state.config,
        &auth_user,
        payload,
    )
    .await?;
    Ok(Json(ApiResponse::with_message(
        "Profile updated successfully",
        UserResponse::from(&user),
    )))
}
