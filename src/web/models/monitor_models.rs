use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::db::enums::MonitorStatus;
use crate::db::models::{MonitorConfig, ScraperSource};

/// Body of `POST /api/monitors`.
///
/// `scraper_code` is a shorthand for an inline scraper source; when both are
/// given `scraper_source` wins.
#[derive(Debug, Deserialize)]
pub struct CreateMonitorRequest {
    pub name: String,
    #[serde(alias = "targetUrl")]
    pub target_url: String,
    #[serde(default, alias = "scraperSource")]
    pub scraper_source: Option<ScraperSource>,
    #[serde(default, alias = "scraperCode")]
    pub scraper_code: Option<String>,
    #[serde(default)]
    pub config: Option<MonitorConfig>,
    #[serde(default, alias = "repositoryId")]
    pub repository_id: Option<i32>,
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Body of `PUT /api/monitors/{id}`. `null` for `scraper_source` or
/// `repository_id` detaches the value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateMonitorRequest {
    pub name: Option<String>,
    #[serde(alias = "targetUrl")]
    pub target_url: Option<String>,
    #[serde(default, alias = "scraperSource", deserialize_with = "nullable")]
    pub scraper_source: Option<Option<ScraperSource>>,
    #[serde(alias = "scraperCode")]
    pub scraper_code: Option<String>,
    pub status: Option<MonitorStatus>,
    pub config: Option<MonitorConfig>,
    #[serde(default, alias = "repositoryId", deserialize_with = "nullable")]
    pub repository_id: Option<Option<i32>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MonitorListQuery {
    pub status: Option<MonitorStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecuteResponse {
    pub id: i32,
    pub status: MonitorStatus,
    pub last_checked: DateTime<Utc>,
    pub last_action: String,
    /// Milliseconds spent in the checker.
    pub execution_time: i64,
}

#[derive(Debug, Deserialize)]
pub struct TestMonitorRequest {
    #[serde(alias = "targetUrl")]
    pub target_url: String,
    #[serde(default)]
    pub config: Option<MonitorConfig>,
}

#[derive(Debug, Serialize)]
pub struct TestMonitorResponse {
    pub success: bool,
    pub detail: String,
    pub execution_time: i64,
}
