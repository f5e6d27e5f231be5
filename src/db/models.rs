//! Backend-independent records handed out by [`crate::db::Storage`].
//!
//! The sea-orm entities in `db::entities` are the SQL shape of these types;
//! the memory backend stores them directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{FixStatus, MonitorStatus, RepositoryProvider, SyncStatus};

// --- Users ---

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub password_hash: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.password_hash.is_none()
    }
}

// --- Monitors ---

/// Where a monitor's scraper lives: pasted inline or referenced by path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScraperSource {
    Inline { code: String },
    File { path: String },
}

impl ScraperSource {
    pub fn inline_code(&self) -> Option<&str> {
        match self {
            ScraperSource::Inline { code } => Some(code),
            ScraperSource::File { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MonitorType {
    #[default]
    WebScraping,
    ApiMonitoring,
    PriceTracking,
    ContentMonitoring,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Selectors {
    pub css: Vec<String>,
    pub xpath: Vec<String>,
}

impl Selectors {
    pub fn is_empty(&self) -> bool {
        self.css.iter().chain(self.xpath.iter()).all(|s| s.trim().is_empty())
    }
}

pub const MAX_TIMEOUT_MS: u64 = 120_000;
pub const MAX_RETRY_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub monitor_type: MonitorType,
    pub frequency_minutes: u32,
    pub timeout_ms: u64,
    pub retry_attempts: u32,
    pub selectors: Selectors,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            monitor_type: MonitorType::WebScraping,
            frequency_minutes: 30,
            timeout_ms: 30_000,
            retry_attempts: 3,
            selectors: Selectors::default(),
        }
    }
}

impl MonitorConfig {
    /// Checks the numeric bounds. Returns a human readable reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        if self.frequency_minutes == 0 {
            return Err("Frequency must be a positive integer".to_string());
        }
        if self.timeout_ms == 0 || self.timeout_ms > MAX_TIMEOUT_MS {
            return Err(format!("Timeout must be between 1 and {MAX_TIMEOUT_MS} ms"));
        }
        if self.retry_attempts > MAX_RETRY_ATTEMPTS {
            return Err(format!("Retry attempts must be at most {MAX_RETRY_ATTEMPTS}"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Monitor {
    pub id: i32,
    pub owner_id: i32,
    pub name: String,
    pub target_url: String,
    pub scraper_source: Option<ScraperSource>,
    pub status: MonitorStatus,
    pub config: MonitorConfig,
    pub last_checked: Option<DateTime<Utc>>,
    pub last_action: Option<String>,
    pub error_summary: Option<String>,
    pub repository_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMonitor {
    pub owner_id: i32,
    pub name: String,
    pub target_url: String,
    pub scraper_source: Option<ScraperSource>,
    pub config: MonitorConfig,
    pub repository_id: Option<i32>,
}

/// Partial monitor update. For the nullable columns `Some(None)` clears the value.
#[derive(Debug, Clone, Default)]
pub struct MonitorChanges {
    pub name: Option<String>,
    pub target_url: Option<String>,
    pub scraper_source: Option<Option<ScraperSource>>,
    pub status: Option<MonitorStatus>,
    pub config: Option<MonitorConfig>,
    pub repository_id: Option<Option<i32>>,
}

impl MonitorChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.target_url.is_none()
            && self.scraper_source.is_none()
            && self.status.is_none()
            && self.config.is_none()
            && self.repository_id.is_none()
    }
}

/// Everything one `execute` call writes back.
#[derive(Debug, Clone)]
pub struct ExecutionRecord {
    pub status: MonitorStatus,
    pub last_action: String,
    pub error_summary: Option<String>,
    pub checked_at: DateTime<Utc>,
    pub execution_time_ms: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitorLog {
    pub id: i32,
    pub monitor_id: i32,
    pub status: MonitorStatus,
    pub message: String,
    pub execution_time_ms: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonitorStats {
    pub total: u64,
    pub pending: u64,
    pub working: u64,
    pub broken: u64,
    pub active: u64,
    pub inactive: u64,
    pub maintenance: u64,
}

impl MonitorStats {
    pub fn tally<'a>(statuses: impl IntoIterator<Item = &'a MonitorStatus>) -> Self {
        let mut stats = MonitorStats::default();
        for status in statuses {
            stats.total += 1;
            match status {
                MonitorStatus::Pending => stats.pending += 1,
                MonitorStatus::Working => stats.working += 1,
                MonitorStatus::Broken => stats.broken += 1,
                MonitorStatus::Active => stats.active += 1,
                MonitorStatus::Inactive => stats.inactive += 1,
                MonitorStatus::Maintenance => stats.maintenance += 1,
            }
        }
        stats
    }
}

// --- AI fixes ---

#[derive(Debug, Clone, Serialize)]
pub struct AiFix {
    pub id: i32,
    pub monitor_id: i32,
    pub original_code: String,
    pub fixed_code: String,
    pub explanation: String,
    /// Verdict reported by the generator ("fixed", "working", "analyzed", ...).
    pub analysis: String,
    pub status: FixStatus,
    pub created_at: DateTime<Utc>,
    pub applied_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewAiFix {
    pub monitor_id: i32,
    pub original_code: String,
    pub fixed_code: String,
    pub explanation: String,
    pub analysis: String,
}

// --- Repositories ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentSettings {
    pub auto_deploy: bool,
    pub require_approval: bool,
    pub deployment_branch: String,
    pub deployment_path: String,
    pub rollback_enabled: bool,
}

impl Default for DeploymentSettings {
    fn default() -> Self {
        Self {
            auto_deploy: false,
            require_approval: true,
            deployment_branch: "main".to_string(),
            deployment_path: "/monitors".to_string(),
            rollback_enabled: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Repository {
    pub id: i32,
    pub owner_id: i32,
    pub name: String,
    pub provider: RepositoryProvider,
    pub owner: String,
    pub repo: String,
    pub default_branch: String,
    /// Hex AES-GCM ciphertext; never leaves the service layer in clear.
    pub access_token: String,
    pub deployment: DeploymentSettings,
    pub last_sync: Option<DateTime<Utc>>,
    pub sync_status: SyncStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Repository {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

#[derive(Debug, Clone)]
pub struct NewRepository {
    pub owner_id: i32,
    pub name: String,
    pub provider: RepositoryProvider,
    pub owner: String,
    pub repo: String,
    pub default_branch: String,
    pub access_token: String,
    pub deployment: DeploymentSettings,
}

#[derive(Debug, Clone, Default)]
pub struct RepositoryChanges {
    pub name: Option<String>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub default_branch: Option<String>,
    pub access_token: Option<String>,
    pub deployment: Option<DeploymentSettings>,
}

impl RepositoryChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.owner.is_none()
            && self.repo.is_none()
            && self.default_branch.is_none()
            && self.access_token.is_none()
            && self.deployment.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StorageCounts {
    pub users: u64,
    pub monitors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: MonitorConfig =
            serde_json::from_value(serde_json::json!({ "timeout_ms": 5000 })).unwrap();
        assert_eq!(config.timeout_ms, 5000);
        assert_eq!(config.frequency_minutes, 30);
        assert_eq!(config.monitor_type, MonitorType::WebScraping);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_rejects_out_of_range_values() {
        let mut config = MonitorConfig::default();
        config.timeout_ms = MAX_TIMEOUT_MS + 1;
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config.frequency_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn scraper_source_is_tagged() {
        let source = ScraperSource::Inline { code: "print(1)".into() };
        let value = serde_json::to_value(&source).unwrap();
        assert_eq!(value, serde_json::json!({ "type": "inline", "code": "print(1)" }));
        assert_eq!(source.inline_code(), Some("print(1)"));
    }

    #[test]
    fn stats_tally_counts_each_status() {
        let stats = MonitorStats::tally(&[
            MonitorStatus::Working,
            MonitorStatus::Broken,
            MonitorStatus::Broken,
            MonitorStatus::Pending,
        ]);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.broken, 2);
        assert_eq!(stats.working, 1);
        assert_eq!(stats.pending, 1);
    }
}
