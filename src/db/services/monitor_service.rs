//! Queries for monitors and their execution log.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::db::StoreError;
use crate::db::entities::{
    ai_fix, monitor, monitor_log,
    prelude::{AiFix as AiFixEntity, Monitor as MonitorEntity, MonitorLog as MonitorLogEntity},
};
use crate::db::enums::MonitorStatus;
use crate::db::models::{
    ExecutionRecord, Monitor, MonitorChanges, MonitorLog, MonitorStats, NewMonitor, ScraperSource,
};

impl TryFrom<monitor::Model> for Monitor {
    type Error = StoreError;

    fn try_from(model: monitor::Model) -> Result<Self, Self::Error> {
        let scraper_source = model
            .scraper_source
            .map(serde_json::from_value::<ScraperSource>)
            .transpose()?;
        let config = serde_json::from_value(model.config)?;

        Ok(Monitor {
            id: model.id,
            owner_id: model.owner_id,
            name: model.name,
            target_url: model.target_url,
            scraper_source,
            status: model.status,
            config,
            last_checked: model.last_checked,
            last_action: model.last_action,
            error_summary: model.error_summary,
            repository_id: model.repository_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl From<monitor_log::Model> for MonitorLog {
    fn from(model: monitor_log::Model) -> Self {
        MonitorLog {
            id: model.id,
            monitor_id: model.monitor_id,
            status: model.status,
            message: model.message,
            execution_time_ms: model.execution_time_ms,
            created_at: model.created_at,
        }
    }
}

fn source_to_json(source: &ScraperSource) -> Result<serde_json::Value, StoreError> {
    Ok(serde_json::to_value(source)?)
}

async fn find_owned_model(
    db: &impl sea_orm::ConnectionTrait,
    owner_id: i32,
    monitor_id: i32,
) -> Result<monitor::Model, StoreError> {
    MonitorEntity::find_by_id(monitor_id)
        .filter(monitor::Column::OwnerId.eq(owner_id))
        .one(db)
        .await?
        .ok_or(StoreError::NotFound("Monitor"))
}

pub async fn create_monitor(
    db: &DatabaseConnection,
    new_monitor: NewMonitor,
) -> Result<Monitor, StoreError> {
    let now = Utc::now();
    let scraper_source = new_monitor
        .scraper_source
        .as_ref()
        .map(source_to_json)
        .transpose()?;

    let model = monitor::ActiveModel {
        owner_id: Set(new_monitor.owner_id),
        name: Set(new_monitor.name),
        target_url: Set(new_monitor.target_url),
        scraper_source: Set(scraper_source),
        status: Set(MonitorStatus::Pending),
        config: Set(serde_json::to_value(&new_monitor.config)?),
        last_checked: Set(None),
        last_action: Set(None),
        error_summary: Set(None),
        repository_id: Set(new_monitor.repository_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    Monitor::try_from(model.insert(db).await?)
}

/// All monitors of one owner, newest first, optionally narrowed to one status.
pub async fn list_monitors(
    db: &DatabaseConnection,
    owner_id: i32,
    status: Option<MonitorStatus>,
) -> Result<Vec<Monitor>, StoreError> {
    let mut query = MonitorEntity::find().filter(monitor::Column::OwnerId.eq(owner_id));
    if let Some(status) = status {
        query = query.filter(monitor::Column::Status.eq(status));
    }

    query
        .order_by_desc(monitor::Column::CreatedAt)
        .order_by_desc(monitor::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(Monitor::try_from)
        .collect()
}

pub async fn find_monitor(
    db: &DatabaseConnection,
    owner_id: i32,
    monitor_id: i32,
) -> Result<Option<Monitor>, StoreError> {
    MonitorEntity::find_by_id(monitor_id)
        .filter(monitor::Column::OwnerId.eq(owner_id))
        .one(db)
        .await?
        .map(Monitor::try_from)
        .transpose()
}

pub async fn monitor_owner(
    db: &DatabaseConnection,
    monitor_id: i32,
) -> Result<Option<i32>, StoreError> {
    Ok(MonitorEntity::find_by_id(monitor_id)
        .one(db)
        .await?
        .map(|m| m.owner_id))
}

pub async fn update_monitor(
    db: &DatabaseConnection,
    owner_id: i32,
    monitor_id: i32,
    changes: MonitorChanges,
) -> Result<Monitor, StoreError> {
    let existing = find_owned_model(db, owner_id, monitor_id).await?;
    let mut active: monitor::ActiveModel = existing.into();

    if let Some(name) = changes.name {
        active.name = Set(name);
    }
    if let Some(target_url) = changes.target_url {
        active.target_url = Set(target_url);
    }
    if let Some(source) = changes.scraper_source {
        active.scraper_source = Set(source.as_ref().map(source_to_json).transpose()?);
    }
    if let Some(status) = changes.status {
        active.status = Set(status);
    }
    if let Some(config) = changes.config {
        active.config = Set(serde_json::to_value(&config)?);
    }
    if let Some(repository_id) = changes.repository_id {
        active.repository_id = Set(repository_id);
    }
    active.updated_at = Set(Utc::now());

    Monitor::try_from(active.update(db).await?)
}

/// Removes the monitor together with its logs and AI fixes.
pub async fn delete_monitor(
    db: &DatabaseConnection,
    owner_id: i32,
    monitor_id: i32,
) -> Result<(), StoreError> {
    let txn = db.begin().await?;

    let existing = find_owned_model(&txn, owner_id, monitor_id).await?;

    MonitorLogEntity::delete_many()
        .filter(monitor_log::Column::MonitorId.eq(monitor_id))
        .exec(&txn)
        .await?;
    AiFixEntity::delete_many()
        .filter(ai_fix::Column::MonitorId.eq(monitor_id))
        .exec(&txn)
        .await?;
    existing.delete(&txn).await?;

    txn.commit().await?;
    Ok(())
}

pub async fn monitor_stats(
    db: &DatabaseConnection,
    owner_id: i32,
) -> Result<MonitorStats, StoreError> {
    let monitors = MonitorEntity::find()
        .filter(monitor::Column::OwnerId.eq(owner_id))
        .all(db)
        .await?;
    Ok(MonitorStats::tally(monitors.iter().map(|m| &m.status)))
}

/// Status update and log append run in one transaction.
pub async fn record_execution(
    db: &DatabaseConnection,
    owner_id: i32,
    monitor_id: i32,
    record: ExecutionRecord,
) -> Result<(Monitor, MonitorLog), StoreError> {
    let txn = db.begin().await?;

    let existing = find_owned_model(&txn, owner_id, monitor_id).await?;
    let mut active: monitor::ActiveModel = existing.into();
    active.status = Set(record.status);
    active.last_action = Set(Some(record.last_action.clone()));
    active.last_checked = Set(Some(record.checked_at));
    active.error_summary = Set(record.error_summary.clone());
    let updated = active.update(&txn).await?;

    let log = monitor_log::ActiveModel {
        monitor_id: Set(monitor_id),
        status: Set(record.status),
        message: Set(record.last_action),
        execution_time_ms: Set(record.execution_time_ms),
        created_at: Set(record.checked_at),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    Ok((Monitor::try_from(updated)?, log.into()))
}

pub async fn list_logs(
    db: &DatabaseConnection,
    monitor_id: i32,
    limit: u64,
) -> Result<Vec<MonitorLog>, StoreError> {
    Ok(MonitorLogEntity::find()
        .filter(monitor_log::Column::MonitorId.eq(monitor_id))
        .order_by_desc(monitor_log::Column::CreatedAt)
        .order_by_desc(monitor_log::Column::Id)
        .limit(limit)
        .all(db)
        .await?
        .into_iter()
        .map(MonitorLog::from)
        .collect())
}

/// Replaces the scraper source without an owner check; callers authorize first.
pub async fn set_monitor_source(
    db: &DatabaseConnection,
    monitor_id: i32,
    source: ScraperSource,
) -> Result<Monitor, StoreError> {
    let existing = MonitorEntity::find_by_id(monitor_id)
        .one(db)
        .await?
        .ok_or(StoreError::NotFound("Monitor"))?;

    let mut active: monitor::ActiveModel = existing.into();
    active.scraper_source = Set(Some(source_to_json(&source)?));
    active.updated_at = Set(Utc::now());

    Monitor::try_from(active.update(db).await?)
}

pub async fn count_monitors(db: &DatabaseConnection) -> Result<u64, StoreError> {
    Ok(MonitorEntity::find().count(db).await?)
}
