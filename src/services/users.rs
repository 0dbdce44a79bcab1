use crate::{
    auth::{default_permissions, hash_password, normalize_permissions},
    db::DbPool,
    entities::user,
    errors::ServiceError,
    services::uploads::{UploadStore, IMAGE_EXTENSIONS},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

pub const DEFAULT_PROFILE_PICTURE: &str = "placeholder_user.jpg";
pub const PROFILE_PICTURE_AREA: &str = "profile_pictures";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterUser {
    #[validate(length(min = 1, max = 80))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
    #[serde(default = "default_role")]
    pub role: String,
    pub permissions: Option<Value>,
}

fn default_role() -> String {
    "user".to_string()
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProfile {
    #[validate(length(min = 1, max = 80))]
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Public view of a user; never carries the password hash
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: i32,
    pub username: String,
    pub role: String,
    pub permissions: Value,
    pub profile_picture: String,
}

impl From<user::Model> for UserProfile {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            username: u.username,
            role: u.role,
            permissions: u.permissions,
            profile_picture: u.profile_picture,
        }
    }
}

#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
    uploads: UploadStore,
}

impl UserService {
    pub fn new(db_pool: Arc<DbPool>, uploads: UploadStore) -> Self {
        Self { db_pool, uploads }
    }

    async fn find(&self, id: i32) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", id))
    }

    async fn username_taken(&self, username: &str, except: Option<i32>) -> Result<bool, ServiceError> {
        let mut query = user::Entity::find().filter(user::Column::Username.eq(username));
        if let Some(id) = except {
            query = query.filter(user::Column::Id.ne(id));
        }
        Ok(query.one(&*self.db_pool).await?.is_some())
    }

    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn register(&self, input: RegisterUser) -> Result<UserProfile, ServiceError> {
        input.validate()?;
        if self.username_taken(&input.username, None).await? {
            return Err(ServiceError::Conflict(format!(
                "Username {} is already taken",
                input.username
            )));
        }

        let permissions = match input.permissions {
            Some(p) => normalize_permissions(&p)?,
            None => default_permissions(),
        };

        let model = user::ActiveModel {
            username: Set(input.username),
            password_hash: Set(hash_password(&input.password)?),
            role: Set(input.role),
            permissions: Set(permissions),
            profile_picture: Set(DEFAULT_PROFILE_PICTURE.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        let created = model.insert(&*self.db_pool).await?;
        info!(user_id = created.id, "user registered");
        Ok(created.into())
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<UserProfile>, ServiceError> {
        let users = user::Entity::find()
            .order_by_asc(user::Column::Id)
            .all(&*self.db_pool)
            .await?;
        Ok(users.into_iter().map(UserProfile::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn me(&self, user_id: i32) -> Result<UserProfile, ServiceError> {
        Ok(self.find(user_id).await?.into())
    }

    #[instrument(skip(self, changes))]
    pub async fn update_profile(
        &self,
        user_id: i32,
        changes: UpdateProfile,
    ) -> Result<UserProfile, ServiceError> {
        changes.validate()?;
        let existing = self.find(user_id).await?;
        let mut active = existing.into_active_model();

        if let Some(username) = changes.username {
            if self.username_taken(&username, Some(user_id)).await? {
                return Err(ServiceError::Conflict(format!(
                    "Username {} is already taken",
                    username
                )));
            }
            active.username = Set(username);
        }
        if let Some(password) = changes.password.filter(|p| !p.is_empty()) {
            active.password_hash = Set(hash_password(&password)?);
        }

        Ok(active.update(&*self.db_pool).await?.into())
    }

    #[instrument(skip(self, bytes))]
    pub async fn upload_profile_picture(
        &self,
        user_id: i32,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<UserProfile, ServiceError> {
        let existing = self.find(user_id).await?;
        let stored = self
            .uploads
            .save(PROFILE_PICTURE_AREA, original_name, bytes, IMAGE_EXTENSIONS)
            .await?;

        let mut active = existing.into_active_model();
        active.profile_picture = Set(stored.clone());
        match active.update(&*self.db_pool).await {
            Ok(updated) => Ok(updated.into()),
            Err(e) => {
                self.uploads.discard(PROFILE_PICTURE_AREA, &stored).await;
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self, permissions))]
    pub async fn update_permissions(
        &self,
        user_id: i32,
        permissions: Value,
    ) -> Result<UserProfile, ServiceError> {
        let normalized = normalize_permissions(&permissions)?;
        let mut active = self.find(user_id).await?.into_active_model();
        active.permissions = Set(normalized);
        let updated = active.update(&*self.db_pool).await?;
        info!(user_id, "permissions updated");
        Ok(updated.into())
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, acting_user_id: i32, user_id: i32) -> Result<(), ServiceError> {
        if acting_user_id == user_id {
            return Err(ServiceError::InvalidOperation(
                "You cannot delete your own account".into(),
            ));
        }
        let result = user::Entity::delete_by_id(user_id)
            .exec(&*self.db_pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("User", user_id));
        }
        info!(user_id, "user deleted");
        Ok(())
    }
}
