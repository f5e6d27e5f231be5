use chrono::Utc;
use std::time::Instant;
use tracing::info;
use url::Url;

use crate::db::Storage;
use crate::db::enums::MonitorStatus;
use crate::db::models::{
    ExecutionRecord, Monitor, MonitorChanges, MonitorConfig, MonitorLog, MonitorStats, NewMonitor,
    ScraperSource,
};
use crate::services::checker::{CheckTarget, Checker};
use crate::web::error::AppError;
use crate::web::models::AuthenticatedUser;
use crate::web::models::monitor_models::{
    CreateMonitorRequest, ExecuteResponse, TestMonitorRequest, TestMonitorResponse,
    UpdateMonitorRequest,
};

pub const MAX_NAME_LEN: usize = 100;
pub const DEFAULT_LOG_LIMIT: u64 = 50;
pub const MAX_LOG_LIMIT: u64 = 200;

const ACTION_SUCCEEDED: &str = "Executed successfully";
const ACTION_FAILED: &str = "Execution failed";

fn validate_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    let len = name.chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        return Err(AppError::Validation(format!(
            "Name must be between 1 and {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

/// Accepts absolute http(s) URLs with a host.
pub fn validate_http_url(raw: &str) -> Result<String, AppError> {
    let raw = raw.trim();
    let invalid = || AppError::Validation(format!("'{raw}' is not a valid http(s) URL"));
    let url = Url::parse(raw).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none_or(str::is_empty) {
        return Err(invalid());
    }
    Ok(raw.to_string())
}

fn validate_config(config: MonitorConfig) -> Result<MonitorConfig, AppError> {
    config.validate().map_err(AppError::Validation)?;
    Ok(config)
}

fn pick_source(source: Option<ScraperSource>, code: Option<String>) -> Option<ScraperSource> {
    source.or_else(|| code.map(|code| ScraperSource::Inline { code }))
}

async fn check_repository(
    store: &dyn Storage,
    owner_id: i32,
    repository_id: Option<i32>,
) -> Result<(), AppError> {
    if let Some(id) = repository_id {
        store
            .find_repository(owner_id, id)
            .await?
            .ok_or(AppError::NotFound("Repository"))?;
    }
    Ok(())
}

pub async fn create(
    store: &dyn Storage,
    user: &AuthenticatedUser,
    req: CreateMonitorRequest,
) -> Result<Monitor, AppError> {
    let name = validate_name(&req.name)?;
    let target_url = validate_http_url(&req.target_url)?;
    let config = validate_config(req.config.unwrap_or_default())?;
    check_repository(store, user.id, req.repository_id).await?;

    let monitor = store
        .create_monitor(NewMonitor {
            owner_id: user.id,
            name,
            target_url,
            scraper_source: pick_source(req.scraper_source, req.scraper_code),
            config,
            repository_id: req.repository_id,
        })
        .await?;
    info!(monitor_id = monitor.id, user_id = user.id, "Monitor created.");
    Ok(monitor)
}

pub async fn get(
    store: &dyn Storage,
    user: &AuthenticatedUser,
    id: i32,
) -> Result<Monitor, AppError> {
    store
        .find_monitor(user.id, id)
        .await?
        .ok_or(AppError::NotFound("Monitor"))
}

pub async fn list(
    store: &dyn Storage,
    user: &AuthenticatedUser,
    status: Option<MonitorStatus>,
) -> Result<Vec<Monitor>, AppError> {
    Ok(store.list_monitors(user.id, status).await?)
}

/// Broken monitors, most recently checked first.
pub async fn broken(store: &dyn Storage, user: &AuthenticatedUser) -> Result<Vec<Monitor>, AppError> {
    let mut monitors = store
        .list_monitors(user.id, Some(MonitorStatus::Broken))
        .await?;
    monitors.sort_by(|a, b| b.last_checked.cmp(&a.last_checked));
    Ok(monitors)
}

pub async fn stats(store: &dyn Storage, user: &AuthenticatedUser) -> Result<MonitorStats, AppError> {
    Ok(store.monitor_stats(user.id).await?)
}

pub async fn update(
    store: &dyn Storage,
    user: &AuthenticatedUser,
    id: i32,
    req: UpdateMonitorRequest,
) -> Result<Monitor, AppError> {
    let changes = MonitorChanges {
        name: req.name.as_deref().map(validate_name).transpose()?,
        target_url: req.target_url.as_deref().map(validate_http_url).transpose()?,
        scraper_source: req.scraper_source.or_else(|| {
            req.scraper_code.map(|code| Some(ScraperSource::Inline { code }))
        }),
        status: req.status,
        config: req.config.map(validate_config).transpose()?,
        repository_id: req.repository_id,
    };
    if changes.is_empty() {
        return Err(AppError::Validation("No fields to update".to_string()));
    }
    check_repository(store, user.id, changes.repository_id.flatten()).await?;

    let monitor = store.update_monitor(user.id, id, changes).await?;
    info!(monitor_id = id, user_id = user.id, "Monitor updated.");
    Ok(monitor)
}

pub async fn delete(store: &dyn Storage, user: &AuthenticatedUser, id: i32) -> Result<(), AppError> {
    store.delete_monitor(user.id, id).await?;
    info!(monitor_id = id, user_id = user.id, "Monitor deleted.");
    Ok(())
}

/// Runs the checker once and records the result.
///
/// A missing or foreign monitor fails before the checker runs, so nothing is written.
pub async fn execute(
    store: &dyn Storage,
    checker: &dyn Checker,
    user: &AuthenticatedUser,
    id: i32,
) -> Result<ExecuteResponse, AppError> {
    let monitor = get(store, user, id).await?;

    let started = Instant::now();
    let outcome = checker.check(&CheckTarget::from(&monitor)).await;
    let execution_time = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);

    let (status, last_action, error_summary) = if outcome.success {
        (MonitorStatus::Working, ACTION_SUCCEEDED, None)
    } else {
        (MonitorStatus::Broken, ACTION_FAILED, Some(outcome.detail))
    };

    // last_checked never moves backwards, even if the wall clock does.
    let now = Utc::now();
    let checked_at = monitor.last_checked.map_or(now, |previous| previous.max(now));

    let (updated, log) = store
        .record_execution(
            user.id,
            id,
            ExecutionRecord {
                status,
                last_action: last_action.to_string(),
                error_summary,
                checked_at,
                execution_time_ms: execution_time,
            },
        )
        .await?;

    info!(
        monitor_id = id,
        user_id = user.id,
        status = %updated.status,
        log_id = log.id,
        execution_time_ms = execution_time,
        "Monitor executed."
    );

    Ok(ExecuteResponse {
        id: updated.id,
        status: updated.status,
        last_checked: checked_at,
        last_action: last_action.to_string(),
        execution_time,
    })
}

pub async fn logs(
    store: &dyn Storage,
    user: &AuthenticatedUser,
    id: i32,
    limit: Option<u64>,
) -> Result<Vec<MonitorLog>, AppError> {
    get(store, user, id).await?;
    let limit = limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT);
    Ok(store.list_logs(id, limit).await?)
}

/// Checks a prospective configuration without persisting anything.
pub async fn test_config(
    checker: &dyn Checker,
    req: TestMonitorRequest,
) -> Result<TestMonitorResponse, AppError> {
    let target_url = validate_http_url(&req.target_url)?;
    let config = validate_config(req.config.unwrap_or_default())?;

    let started = Instant::now();
    let outcome = checker.check(&CheckTarget::new(target_url, &config)).await;
    let execution_time = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);

    Ok(TestMonitorResponse {
        success: outcome.success,
        detail: outcome.detail,
        execution_time,
    })
}
