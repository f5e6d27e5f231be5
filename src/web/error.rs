use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::db::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Access token required")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("User account no longer exists")]
    UserNotFound,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Access denied: {0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("User already exists: {0}")]
    UserAlreadyExists(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("AI service error: {0}")]
    AiService(String),
    #[error("Password hashing failed: {0}")]
    PasswordHashingError(String),
    #[error("JWT creation failed: {0}")]
    TokenCreationError(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::MissingToken | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::InvalidToken | AppError::UserNotFound | AppError::Forbidden(_) => {
                StatusCode::FORBIDDEN
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UserAlreadyExists(_) | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::AiService(_)
            | AppError::PasswordHashingError(_)
            | AppError::TokenCreationError(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The `{error, message}` pair sent to the client.
    fn envelope(&self) -> (String, String) {
        match self {
            AppError::Validation(msg) => ("Validation failed".into(), msg.clone()),
            AppError::MissingToken => (
                "Access token required".into(),
                "Please provide a valid authentication token".into(),
            ),
            AppError::InvalidToken => (
                "Invalid token".into(),
                "Your session has expired. Please login again.".into(),
            ),
            AppError::UserNotFound => (
                "User not found".into(),
                "User account no longer exists".into(),
            ),
            AppError::InvalidCredentials => (
                "Invalid credentials".into(),
                "Email or password is incorrect".into(),
            ),
            AppError::Forbidden(msg) => ("Access denied".into(), msg.clone()),
            AppError::NotFound(what) => (
                format!("{what} not found"),
                format!("{what} does not exist or you do not have access to it"),
            ),
            AppError::UserAlreadyExists(msg) => ("User already exists".into(), msg.clone()),
            AppError::Conflict(msg) => ("Conflict".into(), msg.clone()),
            AppError::AiService(msg) => ("AI service error".into(), msg.clone()),
            // Internal details stay in the logs.
            AppError::PasswordHashingError(_) | AppError::TokenCreationError(_) => {
                ("Server error".into(), "Failed to process credentials".into())
            }
            AppError::DatabaseError(_) => {
                ("Database error".into(), "The storage backend failed".into())
            }
            AppError::InternalServerError(_) => {
                ("Server error".into(), "An unexpected error occurred".into())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed.");
        }
        let (error, message) = self.envelope();
        (
            status,
            Json(serde_json::json!({ "error": error, "message": message })),
        )
            .into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AppError::NotFound(what),
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::Database(e) => AppError::DatabaseError(e.to_string()),
            StoreError::Corrupt(msg) => AppError::DatabaseError(msg),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}
