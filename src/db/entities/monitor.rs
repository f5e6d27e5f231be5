use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::enums::MonitorStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "monitors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub owner_id: i32,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub target_url: String,
    // Tagged `ScraperSource` document.
    #[sea_orm(column_type = "Json", nullable)]
    pub scraper_source: Option<Json>,
    pub status: MonitorStatus,
    // `MonitorConfig` document.
    #[sea_orm(column_type = "Json")]
    pub config: Json,
    pub last_checked: Option<ChronoDateTimeUtc>,
    pub last_action: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub error_summary: Option<String>,
    pub repository_id: Option<i32>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,

    #[sea_orm(
        belongs_to = "super::repository::Entity",
        from = "Column::RepositoryId",
        to = "super::repository::Column::Id",
        on_delete = "SetNull"
    )]
    Repository,

    #[sea_orm(has_many = "super::monitor_log::Entity")]
    MonitorLogs,

    #[sea_orm(has_many = "super::ai_fix::Entity")]
    AiFixes,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::repository::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Repository.def()
    }
}

impl Related<super::monitor_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MonitorLogs.def()
    }
}

impl Related<super::ai_fix::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AiFixes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
