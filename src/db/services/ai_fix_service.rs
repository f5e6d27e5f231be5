use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::db::StoreError;
use crate::db::entities::{ai_fix, prelude::AiFix as AiFixEntity};
use crate::db::enums::FixStatus;
use crate::db::models::{AiFix, NewAiFix};

impl From<ai_fix::Model> for AiFix {
    fn from(model: ai_fix::Model) -> Self {
        AiFix {
            id: model.id,
            monitor_id: model.monitor_id,
            original_code: model.original_code,
            fixed_code: model.fixed_code,
            explanation: model.explanation,
            analysis: model.analysis,
            status: model.status,
            created_at: model.created_at,
            applied_at: model.applied_at,
        }
    }
}

pub async fn create_fix(db: &DatabaseConnection, fix: NewAiFix) -> Result<AiFix, StoreError> {
    let model = ai_fix::ActiveModel {
        monitor_id: Set(fix.monitor_id),
        original_code: Set(fix.original_code),
        fixed_code: Set(fix.fixed_code),
        explanation: Set(fix.explanation),
        analysis: Set(fix.analysis),
        status: Set(FixStatus::Pending),
        created_at: Set(Utc::now()),
        applied_at: Set(None),
        ..Default::default()
    };

    Ok(model.insert(db).await?.into())
}

pub async fn find_fix(db: &DatabaseConnection, fix_id: i32) -> Result<Option<AiFix>, StoreError> {
    Ok(AiFixEntity::find_by_id(fix_id).one(db).await?.map(AiFix::from))
}

pub async fn list_fixes(db: &DatabaseConnection, monitor_id: i32) -> Result<Vec<AiFix>, StoreError> {
    Ok(AiFixEntity::find()
        .filter(ai_fix::Column::MonitorId.eq(monitor_id))
        .order_by_desc(ai_fix::Column::CreatedAt)
        .order_by_desc(ai_fix::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(AiFix::from)
        .collect())
}

/// Marks a fix as applied. An already applied fix keeps its status.
pub async fn mark_fix_applied(
    db: &DatabaseConnection,
    fix_id: i32,
    at: DateTime<Utc>,
) -> Result<AiFix, StoreError> {
    let existing = AiFixEntity::find_by_id(fix_id)
        .one(db)
        .await?
        .ok_or(StoreError::NotFound("AI fix"))?;

    let mut active: ai_fix::ActiveModel = existing.into();
    active.status = Set(FixStatus::Applied);
    active.applied_at = Set(Some(at));

    Ok(active.update(db).await?.into())
}
