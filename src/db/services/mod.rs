//! The `services` module holds every sea-orm query used by [`crate::db::SqlStore`].
//!
//! Functions take a `&DatabaseConnection`, translate entity models into the
//! backend-independent records of `db::models` and report failures as
//! [`StoreError`]. They are re-exported here so the store can reach them as
//! `db::services::*`.

use sea_orm::{DbErr, SqlErr};

use super::StoreError;

pub mod ai_fix_service;
pub mod monitor_service;
pub mod repository_service;
pub mod user_service;

pub use ai_fix_service::*;
pub use monitor_service::*;
pub use repository_service::*;
pub use user_service::*;

/// Maps a unique-constraint violation onto `Conflict`, anything else onto `Database`.
pub(crate) fn conflict_on_unique(err: DbErr, what: &str) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => StoreError::Conflict(what.to_string()),
        _ => StoreError::Database(err),
    }
}
