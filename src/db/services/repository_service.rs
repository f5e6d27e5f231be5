//! Queries for repository descriptors.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};

use crate::db::StoreError;
use crate::db::entities::{
    monitor,
    prelude::{Monitor as MonitorEntity, Repository as RepositoryEntity},
    repository,
};
use crate::db::enums::SyncStatus;
use crate::db::models::{NewRepository, Repository, RepositoryChanges};

impl TryFrom<repository::Model> for Repository {
    type Error = StoreError;

    fn try_from(model: repository::Model) -> Result<Self, Self::Error> {
        Ok(Repository {
            id: model.id,
            owner_id: model.owner_id,
            name: model.name,
            provider: model.provider,
            owner: model.owner,
            repo: model.repo,
            default_branch: model.default_branch,
            access_token: model.access_token,
            deployment: serde_json::from_value(model.deployment_settings)?,
            last_sync: model.last_sync,
            sync_status: model.sync_status,
            error_message: model.error_message,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

pub async fn create_repository(
    db: &DatabaseConnection,
    new_repository: NewRepository,
) -> Result<Repository, StoreError> {
    let now = Utc::now();
    let model = repository::ActiveModel {
        owner_id: Set(new_repository.owner_id),
        name: Set(new_repository.name),
        provider: Set(new_repository.provider),
        owner: Set(new_repository.owner),
        repo: Set(new_repository.repo),
        default_branch: Set(new_repository.default_branch),
        access_token: Set(new_repository.access_token),
        deployment_settings: Set(serde_json::to_value(&new_repository.deployment)?),
        last_sync: Set(None),
        sync_status: Set(SyncStatus::Pending),
        error_message: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    Repository::try_from(model.insert(db).await?)
}

pub async fn list_repositories(
    db: &DatabaseConnection,
    owner_id: i32,
) -> Result<Vec<Repository>, StoreError> {
    RepositoryEntity::find()
        .filter(repository::Column::OwnerId.eq(owner_id))
        .order_by_desc(repository::Column::CreatedAt)
        .order_by_desc(repository::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(Repository::try_from)
        .collect()
}

pub async fn find_repository(
    db: &DatabaseConnection,
    owner_id: i32,
    repository_id: i32,
) -> Result<Option<Repository>, StoreError> {
    RepositoryEntity::find_by_id(repository_id)
        .filter(repository::Column::OwnerId.eq(owner_id))
        .one(db)
        .await?
        .map(Repository::try_from)
        .transpose()
}

pub async fn update_repository(
    db: &DatabaseConnection,
    owner_id: i32,
    repository_id: i32,
    changes: RepositoryChanges,
) -> Result<Repository, StoreError> {
    let existing = RepositoryEntity::find_by_id(repository_id)
        .filter(repository::Column::OwnerId.eq(owner_id))
        .one(db)
        .await?
        .ok_or(StoreError::NotFound("Repository"))?;

    let mut active: repository::ActiveModel = existing.into();
    if let Some(name) = changes.name {
        active.name = Set(name);
    }
    if let Some(owner) = changes.owner {
        active.owner = Set(owner);
    }
    if let Some(repo) = changes.repo {
        active.repo = Set(repo);
    }
    if let Some(branch) = changes.default_branch {
        active.default_branch = Set(branch);
    }
    if let Some(token) = changes.access_token {
        active.access_token = Set(token);
    }
    if let Some(deployment) = changes.deployment {
        active.deployment_settings = Set(serde_json::to_value(&deployment)?);
    }
    active.updated_at = Set(Utc::now());

    Repository::try_from(active.update(db).await?)
}

/// Deletes the repository and detaches any monitor that referenced it.
pub async fn delete_repository(
    db: &DatabaseConnection,
    owner_id: i32,
    repository_id: i32,
) -> Result<(), StoreError> {
    let txn = db.begin().await?;

    let existing = RepositoryEntity::find_by_id(repository_id)
        .filter(repository::Column::OwnerId.eq(owner_id))
        .one(&txn)
        .await?
        .ok_or(StoreError::NotFound("Repository"))?;

    MonitorEntity::update_many()
        .col_expr(monitor::Column::RepositoryId, Expr::value(Option::<i32>::None))
        .filter(monitor::Column::RepositoryId.eq(repository_id))
        .exec(&txn)
        .await?;
    existing.delete(&txn).await?;

    txn.commit().await?;
    Ok(())
}

pub async fn record_repository_sync(
    db: &DatabaseConnection,
    repository_id: i32,
    status: SyncStatus,
    error_message: Option<String>,
    at: DateTime<Utc>,
) -> Result<Repository, StoreError> {
    let existing = RepositoryEntity::find_by_id(repository_id)
        .one(db)
        .await?
        .ok_or(StoreError::NotFound("Repository"))?;

    let mut active: repository::ActiveModel = existing.into();
    active.sync_status = Set(status);
    active.last_sync = Set(Some(at));
    active.error_message = Set(error_message);
    active.updated_at = Set(at);

    Repository::try_from(active.update(db).await?)
}
