use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use thiserror::Error;

use super::enums::{MonitorStatus, SyncStatus};
use super::models::{
    AiFix, ExecutionRecord, Monitor, MonitorChanges, MonitorLog, MonitorStats, NewAiFix,
    NewMonitor, NewRepository, NewUser, Repository, RepositoryChanges, ScraperSource,
    StorageCounts, User, UserChanges,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

/// The storage contract shared by every backend.
///
/// Methods taking an `owner_id` only ever see rows belonging to that user;
/// a row owned by someone else is reported exactly like a missing one.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Cheap round trip used by the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
    async fn counts(&self) -> Result<StorageCounts, StoreError>;
    /// Releases connections. The store must not be used afterwards.
    async fn close(&self) -> Result<(), StoreError>;

    /// Fails with `Conflict` when the email is already registered.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;
    async fn find_user(&self, id: i32) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn update_user(&self, id: i32, changes: UserChanges) -> Result<User, StoreError>;

    /// Inserts with status `Pending`.
    async fn create_monitor(&self, monitor: NewMonitor) -> Result<Monitor, StoreError>;
    async fn list_monitors(
        &self,
        owner_id: i32,
        status: Option<MonitorStatus>,
    ) -> Result<Vec<Monitor>, StoreError>;
    async fn find_monitor(&self, owner_id: i32, id: i32) -> Result<Option<Monitor>, StoreError>;
    /// Owner of a monitor regardless of who is asking.
    async fn monitor_owner(&self, id: i32) -> Result<Option<i32>, StoreError>;
    async fn update_monitor(
        &self,
        owner_id: i32,
        id: i32,
        changes: MonitorChanges,
    ) -> Result<Monitor, StoreError>;
    /// Hard delete. The monitor's logs and fixes go with it.
    async fn delete_monitor(&self, owner_id: i32, id: i32) -> Result<(), StoreError>;
    async fn monitor_stats(&self, owner_id: i32) -> Result<MonitorStats, StoreError>;
    /// Writes the execution result onto the monitor and appends one log row.
    async fn record_execution(
        &self,
        owner_id: i32,
        id: i32,
        record: ExecutionRecord,
    ) -> Result<(Monitor, MonitorLog), StoreError>;
    /// Newest first.
    async fn list_logs(&self, monitor_id: i32, limit: u64) -> Result<Vec<MonitorLog>, StoreError>;

    async fn create_fix(&self, fix: NewAiFix) -> Result<AiFix, StoreError>;
    async fn find_fix(&self, id: i32) -> Result<Option<AiFix>, StoreError>;
    /// Newest first.
    async fn list_fixes(&self, monitor_id: i32) -> Result<Vec<AiFix>, StoreError>;
    async fn set_monitor_source(
        &self,
        monitor_id: i32,
        source: ScraperSource,
    ) -> Result<Monitor, StoreError>;
    async fn mark_fix_applied(&self, id: i32, at: DateTime<Utc>) -> Result<AiFix, StoreError>;

    async fn create_repository(&self, repository: NewRepository)
    -> Result<Repository, StoreError>;
    async fn list_repositories(&self, owner_id: i32) -> Result<Vec<Repository>, StoreError>;
    async fn find_repository(
        &self,
        owner_id: i32,
        id: i32,
    ) -> Result<Option<Repository>, StoreError>;
    async fn update_repository(
        &self,
        owner_id: i32,
        id: i32,
        changes: RepositoryChanges,
    ) -> Result<Repository, StoreError>;
    async fn delete_repository(&self, owner_id: i32, id: i32) -> Result<(), StoreError>;
    async fn record_repository_sync(
        &self,
        id: i32,
        status: SyncStatus,
        error_message: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Repository, StoreError>;
}
