use crate::{
    db::DbPool,
    entities::resource,
    errors::ServiceError,
    services::uploads::{content_type_for, is_stored_name, UploadStore, RESOURCE_EXTENSIONS},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;
use tracing::{info, instrument};

pub const RESOURCE_AREA: &str = "resources";
pub const RESOURCE_CATEGORIES: [&str; 4] = ["sops", "guidelines", "rules", "howto"];

#[derive(Debug, Clone)]
pub struct NewResource {
    pub title: String,
    pub category: String,
    pub original_name: String,
    pub bytes: Vec<u8>,
}

/// A stored resource file ready to serve
#[derive(Debug, Clone)]
pub struct ResourceFile {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

fn check_category(category: &str) -> Result<(), ServiceError> {
    if RESOURCE_CATEGORIES.contains(&category) {
        Ok(())
    } else {
        Err(ServiceError::ValidationError(format!(
            "Category must be one of: {}",
            RESOURCE_CATEGORIES.join(", ")
        )))
    }
}

#[derive(Clone)]
pub struct ResourceService {
    db_pool: Arc<DbPool>,
    uploads: UploadStore,
}

impl ResourceService {
    pub fn new(db_pool: Arc<DbPool>, uploads: UploadStore) -> Self {
        Self { db_pool, uploads }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, category: Option<&str>) -> Result<Vec<resource::Model>, ServiceError> {
        let mut query = resource::Entity::find();
        if let Some(category) = category.filter(|c| !c.is_empty()) {
            check_category(category)?;
            query = query.filter(resource::Column::Category.eq(category));
        }
        Ok(query
            .order_by_desc(resource::Column::Id)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self, input), fields(title = %input.title, category = %input.category))]
    pub async fn upload(&self, input: NewResource, uploaded_by: i32) -> Result<resource::Model, ServiceError> {
        if input.title.trim().is_empty() {
            return Err(ServiceError::ValidationError("Title is required".into()));
        }
        check_category(&input.category)?;
        let stored = self
            .uploads
            .save(RESOURCE_AREA, &input.original_name, &input.bytes, RESOURCE_EXTENSIONS)
            .await?;
        let row = resource::ActiveModel {
            title: Set(input.title.trim().to_string()),
            category: Set(input.category),
            filename: Set(stored.clone()),
            uploaded_by: Set(Some(uploaded_by)),
            uploaded_at: Set(Utc::now()),
            ..Default::default()
        };
        let created = match row.insert(&*self.db_pool).await {
            Ok(created) => created,
            Err(e) => {
                self.uploads.discard(RESOURCE_AREA, &stored).await;
                return Err(e.into());
            }
        };
        info!(resource_id = created.id, file = %created.filename, "resource uploaded");
        Ok(created)
    }

    /// Only names recorded in the resource table are served
    #[instrument(skip(self))]
    pub async fn download(&self, filename: &str) -> Result<ResourceFile, ServiceError> {
        if !is_stored_name(filename) {
            return Err(ServiceError::NotFound(format!("Resource {} not found", filename)));
        }
        resource::Entity::find()
            .filter(resource::Column::Filename.eq(filename))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Resource {} not found", filename)))?;
        let bytes = self.uploads.read(RESOURCE_AREA, filename).await?;
        Ok(ResourceFile {
            filename: filename.to_string(),
            content_type: content_type_for(filename),
            bytes,
        })
    }
}
