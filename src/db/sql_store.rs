use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use tracing::info;

use super::enums::{MonitorStatus, SyncStatus};
use super::models::{
    AiFix, ExecutionRecord, Monitor, MonitorChanges, MonitorLog, MonitorStats, NewAiFix,
    NewMonitor, NewRepository, NewUser, Repository, RepositoryChanges, ScraperSource,
    StorageCounts, User, UserChanges,
};
use super::services as db_services;
use super::{Storage, StoreError, schema};

/// sea-orm backed storage for SQLite and PostgreSQL.
#[derive(Clone)]
pub struct SqlStore {
    db: DatabaseConnection,
}

impl SqlStore {
    /// Opens a pool for `database_url` and creates missing tables.
    ///
    /// In-memory SQLite only lives as long as its connection, so such urls get
    /// a pool pinned to exactly one connection.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let mut opt = ConnectOptions::new(database_url.to_owned());
        if database_url.contains(":memory:") {
            opt.max_connections(1).min_connections(1);
        } else {
            opt.max_connections(max_connections);
        }
        opt.connect_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        let db = Database::connect(opt).await?;
        schema::create_tables(&db).await?;
        info!(backend = ?db.get_database_backend(), "Connected to database.");
        Ok(Self { db })
    }
}

#[async_trait]
impl Storage for SqlStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(self.db.ping().await?)
    }

    async fn counts(&self) -> Result<StorageCounts, StoreError> {
        Ok(StorageCounts {
            users: db_services::count_users(&self.db).await?,
            monitors: db_services::count_monitors(&self.db).await?,
        })
    }

    async fn close(&self) -> Result<(), StoreError> {
        Ok(self.db.clone().close().await?)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        db_services::create_user(&self.db, user).await
    }

    async fn find_user(&self, id: i32) -> Result<Option<User>, StoreError> {
        db_services::find_user(&self.db, id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        db_services::find_user_by_email(&self.db, email).await
    }

    async fn update_user(&self, id: i32, changes: UserChanges) -> Result<User, StoreError> {
        db_services::update_user(&self.db, id, changes).await
    }

    async fn create_monitor(&self, monitor: NewMonitor) -> Result<Monitor, StoreError> {
        db_services::create_monitor(&self.db, monitor).await
    }

    async fn list_monitors(
        &self,
        owner_id: i32,
        status: Option<MonitorStatus>,
    ) -> Result<Vec<Monitor>, StoreError> {
        db_services::list_monitors(&self.db, owner_id, status).await
    }

    async fn find_monitor(&self, owner_id: i32, id: i32) -> Result<Option<Monitor>, StoreError> {
        db_services::find_monitor(&self.db, owner_id, id).await
    }

    async fn monitor_owner(&self, id: i32) -> Result<Option<i32>, StoreError> {
        db_services::monitor_owner(&self.db, id).await
    }

    async fn update_monitor(
        &self,
        owner_id: i32,
        id: i32,
        changes: MonitorChanges,
    ) -> Result<Monitor, StoreError> {
        db_services::update_monitor(&self.db, owner_id, id, changes).await
    }

    async fn delete_monitor(&self, owner_id: i32, id: i32) -> Result<(), StoreError> {
        db_services::delete_monitor(&self.db, owner_id, id).await
    }

    async fn monitor_stats(&self, owner_id: i32) -> Result<MonitorStats, StoreError> {
        db_services::monitor_stats(&self.db, owner_id).await
    }

    async fn record_execution(
        &self,
        owner_id: i32,
        id: i32,
        record: ExecutionRecord,
    ) -> Result<(Monitor, MonitorLog), StoreError> {
        db_services::record_execution(&self.db, owner_id, id, record).await
    }

    async fn list_logs(&self, monitor_id: i32, limit: u64) -> Result<Vec<MonitorLog>, StoreError> {
        db_services::list_logs(&self.db, monitor_id, limit).await
    }

    async fn create_fix(&self, fix: NewAiFix) -> Result<AiFix, StoreError> {
        db_services::create_fix(&self.db, fix).await
    }

    async fn find_fix(&self, id: i32) -> Result<Option<AiFix>, StoreError> {
        db_services::find_fix(&self.db, id).await
    }

    async fn list_fixes(&self, monitor_id: i32) -> Result<Vec<AiFix>, StoreError> {
        db_services::list_fixes(&self.db, monitor_id).await
    }

    async fn set_monitor_source(
        &self,
        monitor_id: i32,
        source: ScraperSource,
    ) -> Result<Monitor, StoreError> {
        db_services::set_monitor_source(&self.db, monitor_id, source).await
    }

    async fn mark_fix_applied(&self, id: i32, at: DateTime<Utc>) -> Result<AiFix, StoreError> {
        db_services::mark_fix_applied(&self.db, id, at).await
    }

    async fn create_repository(
        &self,
        repository: NewRepository,
    ) -> Result<Repository, StoreError> {
        db_services::create_repository(&self.db, repository).await
    }

    async fn list_repositories(&self, owner_id: i32) -> Result<Vec<Repository>, StoreError> {
        db_services::list_repositories(&self.db, owner_id).await
    }

    async fn find_repository(
        &self,
        owner_id: i32,
        id: i32,
    ) -> Result<Option<Repository>, StoreError> {
        db_services::find_repository(&self.db, owner_id, id).await
    }

    async fn update_repository(
        &self,
        owner_id: i32,
        id: i32,
        changes: RepositoryChanges,
    ) -> Result<Repository, StoreError> {
        db_services::update_repository(&self.db, owner_id, id, changes).await
    }

    async fn delete_repository(&self, owner_id: i32, id: i32) -> Result<(), StoreError> {
        db_services::delete_repository(&self.db, owner_id, id).await
    }

    async fn record_repository_sync(
        &self,
        id: i32,
        status: SyncStatus,
        error_message: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Repository, StoreError> {
        db_services::record_repository_sync(&self.db, id, status, error_message, at).await
    }
}
