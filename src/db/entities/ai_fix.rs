use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::enums::FixStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ai_fixes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub monitor_id: i32,
    #[sea_orm(column_type = "Text")]
    pub original_code: String,
    #[sea_orm(column_type = "Text")]
    pub fixed_code: String,
    #[sea_orm(column_type = "Text")]
    pub explanation: String,
    pub analysis: String,
    pub status: FixStatus,
    pub created_at: ChronoDateTimeUtc,
    pub applied_at: Option<ChronoDateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::monitor::Entity",
        from = "Column::MonitorId",
        to = "super::monitor::Column::Id"
    )]
    Monitor,
}

impl Related<super::monitor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Monitor.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
