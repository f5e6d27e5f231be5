use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::enums::{FixStatus, MonitorStatus, SyncStatus};
use super::models::{
    AiFix, ExecutionRecord, Monitor, MonitorChanges, MonitorLog, MonitorStats, NewAiFix,
    NewMonitor, NewRepository, NewUser, Repository, RepositoryChanges, ScraperSource,
    StorageCounts, User, UserChanges,
};
use super::{Storage, StoreError};

#[derive(Default)]
struct Tables {
    next_id: i32,
    users: BTreeMap<i32, User>,
    monitors: BTreeMap<i32, Monitor>,
    logs: BTreeMap<i32, MonitorLog>,
    fixes: BTreeMap<i32, AiFix>,
    repositories: BTreeMap<i32, Repository>,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn owned_monitor_mut(&mut self, owner_id: i32, id: i32) -> Result<&mut Monitor, StoreError> {
        self.monitors
            .get_mut(&id)
            .filter(|m| m.owner_id == owner_id)
            .ok_or(StoreError::NotFound("Monitor"))
    }

    fn owned_repository_mut(
        &mut self,
        owner_id: i32,
        id: i32,
    ) -> Result<&mut Repository, StoreError> {
        self.repositories
            .get_mut(&id)
            .filter(|r| r.owner_id == owner_id)
            .ok_or(StoreError::NotFound("Repository"))
    }
}

/// Process-local storage. Ids are shared across tables and strictly increasing.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

// Newest first, ties broken by id like the SQL ordering.
fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, i32)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl Storage for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn counts(&self) -> Result<StorageCounts, StoreError> {
        let tables = self.tables.read().await;
        Ok(StorageCounts {
            users: tables.users.len() as u64,
            monitors: tables.monitors.len() as u64,
        })
    }

    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!(
                "An account with email {} already exists",
                user.email
            )));
        }
        let now = Utc::now();
        let id = tables.next_id();
        let user = User {
            id,
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: i32) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, id: i32, changes: UserChanges) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        let user = tables.users.get_mut(&id).ok_or(StoreError::NotFound("User"))?;
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(password_hash) = changes.password_hash {
            user.password_hash = password_hash;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn create_monitor(&self, monitor: NewMonitor) -> Result<Monitor, StoreError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let id = tables.next_id();
        let monitor = Monitor {
            id,
            owner_id: monitor.owner_id,
            name: monitor.name,
            target_url: monitor.target_url,
            scraper_source: monitor.scraper_source,
            status: MonitorStatus::Pending,
            config: monitor.config,
            last_checked: None,
            last_action: None,
            error_summary: None,
            repository_id: monitor.repository_id,
            created_at: now,
            updated_at: now,
        };
        tables.monitors.insert(id, monitor.clone());
        Ok(monitor)
    }

    async fn list_monitors(
        &self,
        owner_id: i32,
        status: Option<MonitorStatus>,
    ) -> Result<Vec<Monitor>, StoreError> {
        let tables = self.tables.read().await;
        let mut monitors: Vec<Monitor> = tables
            .monitors
            .values()
            .filter(|m| m.owner_id == owner_id)
            .filter(|m| status.is_none_or(|s| m.status == s))
            .cloned()
            .collect();
        newest_first(&mut monitors, |m| (m.created_at, m.id));
        Ok(monitors)
    }

    async fn find_monitor(&self, owner_id: i32, id: i32) -> Result<Option<Monitor>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .monitors
            .get(&id)
            .filter(|m| m.owner_id == owner_id)
            .cloned())
    }

    async fn monitor_owner(&self, id: i32) -> Result<Option<i32>, StoreError> {
        Ok(self.tables.read().await.monitors.get(&id).map(|m| m.owner_id))
    }

    async fn update_monitor(
        &self,
        owner_id: i32,
        id: i32,
        changes: MonitorChanges,
    ) -> Result<Monitor, StoreError> {
        let mut tables = self.tables.write().await;
        let monitor = tables.owned_monitor_mut(owner_id, id)?;
        if let Some(name) = changes.name {
            monitor.name = name;
        }
        if let Some(target_url) = changes.target_url {
            monitor.target_url = target_url;
        }
        if let Some(source) = changes.scraper_source {
            monitor.scraper_source = source;
        }
        if let Some(status) = changes.status {
            monitor.status = status;
        }
        if let Some(config) = changes.config {
            monitor.config = config;
        }
        if let Some(repository_id) = changes.repository_id {
            monitor.repository_id = repository_id;
        }
        monitor.updated_at = Utc::now();
        Ok(monitor.clone())
    }

    async fn delete_monitor(&self, owner_id: i32, id: i32) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.owned_monitor_mut(owner_id, id)?;
        tables.monitors.remove(&id);
        tables.logs.retain(|_, log| log.monitor_id != id);
        tables.fixes.retain(|_, fix| fix.monitor_id != id);
        Ok(())
    }

    async fn monitor_stats(&self, owner_id: i32) -> Result<MonitorStats, StoreError> {
        let tables = self.tables.read().await;
        Ok(MonitorStats::tally(
            tables
                .monitors
                .values()
                .filter(|m| m.owner_id == owner_id)
                .map(|m| &m.status),
        ))
    }

    async fn record_execution(
        &self,
        owner_id: i32,
        id: i32,
        record: ExecutionRecord,
    ) -> Result<(Monitor, MonitorLog), StoreError> {
        let mut tables = self.tables.write().await;
        let monitor = tables.owned_monitor_mut(owner_id, id)?;
        monitor.status = record.status;
        monitor.last_action = Some(record.last_action.clone());
        monitor.last_checked = Some(record.checked_at);
        monitor.error_summary = record.error_summary;
        let monitor = monitor.clone();

        let log_id = tables.next_id();
        let log = MonitorLog {
            id: log_id,
            monitor_id: id,
            status: record.status,
            message: record.last_action,
            execution_time_ms: record.execution_time_ms,
            created_at: record.checked_at,
        };
        tables.logs.insert(log_id, log.clone());
        Ok((monitor, log))
    }

    async fn list_logs(&self, monitor_id: i32, limit: u64) -> Result<Vec<MonitorLog>, StoreError> {
        let tables = self.tables.read().await;
        let mut logs: Vec<MonitorLog> = tables
            .logs
            .values()
            .filter(|l| l.monitor_id == monitor_id)
            .cloned()
            .collect();
        newest_first(&mut logs, |l| (l.created_at, l.id));
        logs.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(logs)
    }

    async fn create_fix(&self, fix: NewAiFix) -> Result<AiFix, StoreError> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let fix = AiFix {
            id,
            monitor_id: fix.monitor_id,
            original_code: fix.original_code,
            fixed_code: fix.fixed_code,
            explanation: fix.explanation,
            analysis: fix.analysis,
            status: FixStatus::Pending,
            created_at: Utc::now(),
            applied_at: None,
        };
        tables.fixes.insert(id, fix.clone());
        Ok(fix)
    }

    async fn find_fix(&self, id: i32) -> Result<Option<AiFix>, StoreError> {
        Ok(self.tables.read().await.fixes.get(&id).cloned())
    }

    async fn list_fixes(&self, monitor_id: i32) -> Result<Vec<AiFix>, StoreError> {
        let tables = self.tables.read().await;
        let mut fixes: Vec<AiFix> = tables
            .fixes
            .values()
            .filter(|f| f.monitor_id == monitor_id)
            .cloned()
            .collect();
        newest_first(&mut fixes, |f| (f.created_at, f.id));
        Ok(fixes)
    }

    async fn set_monitor_source(
        &self,
        monitor_id: i32,
        source: ScraperSource,
    ) -> Result<Monitor, StoreError> {
        let mut tables = self.tables.write().await;
        let monitor = tables
            .monitors
            .get_mut(&monitor_id)
            .ok_or(StoreError::NotFound("Monitor"))?;
        monitor.scraper_source = Some(source);
        monitor.updated_at = Utc::now();
        Ok(monitor.clone())
    }

    async fn mark_fix_applied(&self, id: i32, at: DateTime<Utc>) -> Result<AiFix, StoreError> {
        let mut tables = self.tables.write().await;
        let fix = tables.fixes.get_mut(&id).ok_or(StoreError::NotFound("AI fix"))?;
        fix.status = FixStatus::Applied;
        fix.applied_at = Some(at);
        Ok(fix.clone())
    }

    async fn create_repository(
        &self,
        repository: NewRepository,
    ) -> Result<Repository, StoreError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let id = tables.next_id();
        let repository = Repository {
            id,
            owner_id: repository.owner_id,
            name: repository.name,
            provider: repository.provider,
            owner: repository.owner,
            repo: repository.repo,
            default_branch: repository.default_branch,
            access_token: repository.access_token,
            deployment: repository.deployment,
            last_sync: None,
            sync_status: SyncStatus::Pending,
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        tables.repositories.insert(id, repository.clone());
        Ok(repository)
    }

    async fn list_repositories(&self, owner_id: i32) -> Result<Vec<Repository>, StoreError> {
        let tables = self.tables.read().await;
        let mut repositories: Vec<Repository> = tables
            .repositories
            .values()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect();
        newest_first(&mut repositories, |r| (r.created_at, r.id));
        Ok(repositories)
    }

    async fn find_repository(
        &self,
        owner_id: i32,
        id: i32,
    ) -> Result<Option<Repository>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .repositories
            .get(&id)
            .filter(|r| r.owner_id == owner_id)
            .cloned())
    }

    async fn update_repository(
        &self,
        owner_id: i32,
        id: i32,
        changes: RepositoryChanges,
    ) -> Result<Repository, StoreError> {
        let mut tables = self.tables.write().await;
        let repository = tables.owned_repository_mut(owner_id, id)?;
        if let Some(name) = changes.name {
            repository.name = name;
        }
        if let Some(owner) = changes.owner {
            repository.owner = owner;
        }
        if let Some(repo) = changes.repo {
            repository.repo = repo;
        }
        if let Some(branch) = changes.default_branch {
            repository.default_branch = branch;
        }
        if let Some(token) = changes.access_token {
            repository.access_token = token;
        }
        if let Some(deployment) = changes.deployment {
            repository.deployment = deployment;
        }
        repository.updated_at = Utc::now();
        Ok(repository.clone())
    }

    async fn delete_repository(&self, owner_id: i32, id: i32) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.owned_repository_mut(owner_id, id)?;
        tables.repositories.remove(&id);
        for monitor in tables.monitors.values_mut() {
            if monitor.repository_id == Some(id) {
                monitor.repository_id = None;
            }
        }
        Ok(())
    }

    async fn record_repository_sync(
        &self,
        id: i32,
        status: SyncStatus,
        error_message: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Repository, StoreError> {
        let mut tables = self.tables.write().await;
        let repository = tables
            .repositories
            .get_mut(&id)
            .ok_or(StoreError::NotFound("Repository"))?;
        repository.sync_status = status;
        repository.last_sync = Some(at);
        repository.error_message = error_message;
        repository.updated_at = at;
        Ok(repository.clone())
    }
}
