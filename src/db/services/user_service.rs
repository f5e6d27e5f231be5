use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};

use super::conflict_on_unique;
use crate::db::StoreError;
use crate::db::entities::{prelude::User as UserEntity, user};
use crate::db::models::{NewUser, User, UserChanges};

impl From<user::Model> for User {
    fn from(model: user::Model) -> Self {
        User {
            id: model.id,
            email: model.email,
            name: model.name,
            password_hash: model.password_hash,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Creates a new user. The email column is unique.
pub async fn create_user(db: &DatabaseConnection, new_user: NewUser) -> Result<User, StoreError> {
    if find_user_by_email(db, &new_user.email).await?.is_some() {
        return Err(StoreError::Conflict(format!(
            "An account with email {} already exists",
            new_user.email
        )));
    }

    let now = Utc::now();
    let model = user::ActiveModel {
        email: Set(new_user.email.clone()),
        password_hash: Set(new_user.password_hash),
        name: Set(new_user.name),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let saved = model.insert(db).await.map_err(|e| {
        conflict_on_unique(e, &format!("An account with email {} already exists", new_user.email))
    })?;
    Ok(saved.into())
}

/// Retrieves a user by id.
pub async fn find_user(db: &DatabaseConnection, user_id: i32) -> Result<Option<User>, StoreError> {
    Ok(UserEntity::find_by_id(user_id).one(db).await?.map(User::from))
}

/// Retrieves a user by (already normalized) email.
pub async fn find_user_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<User>, StoreError> {
    Ok(UserEntity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?
        .map(User::from))
}

pub async fn update_user(
    db: &DatabaseConnection,
    user_id: i32,
    changes: UserChanges,
) -> Result<User, StoreError> {
    let existing = UserEntity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(StoreError::NotFound("User"))?;

    let mut active: user::ActiveModel = existing.into();
    if let Some(name) = changes.name {
        active.name = Set(name);
    }
    if let Some(password_hash) = changes.password_hash {
        active.password_hash = Set(password_hash);
    }
    active.updated_at = Set(Utc::now());

    Ok(active.update(db).await?.into())
}

pub async fn count_users(db: &DatabaseConnection) -> Result<u64, StoreError> {
    Ok(UserEntity::find().count(db).await?)
}
