use axum::{
    body::Body as AxumBody,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::services::auth_service;
use crate::web::{AppState, error::AppError};

/// Resolves the bearer token to an [`AuthenticatedUser`](crate::web::models::AuthenticatedUser)
/// request extension.
pub async fn auth(
    State(state): State<Arc<AppState>>,
    mut req: Request<AxumBody>,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AppError::MissingToken)?
        .to_string();

    let authenticated_user =
        auth_service::authenticate(state.store.as_ref(), &state.config.jwt_secret, &token).await?;
    req.extensions_mut().insert(authenticated_user);
    Ok(next.run(req).await)
}
