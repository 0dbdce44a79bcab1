use crate::{db::DbPool, entities::notification, errors::ServiceError};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, QuerySelect, Set};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Persists and logs business notifications
#[derive(Clone)]
pub struct NotificationService {
    db_pool: Arc<DbPool>,
}

impl NotificationService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn send(&self, message: &str, module: &str) -> Result<notification::Model, ServiceError> {
        info!(module, "notification: {}", message);
        let model = notification::ActiveModel {
            message: Set(message.to_string()),
            module: Set(module.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        Ok(model.insert(&*self.db_pool).await?)
    }

    /// Fire-and-forget variant for work that has already been committed
    pub async fn notify(&self, message: &str, module: &str) {
        if let Err(e) = self.send(message, module).await {
            warn!(module, error = %e, "notification not stored: {}", message);
        }
    }

    /// Latest 50 notifications, newest first
    #[instrument(skip(self))]
    pub async fn latest(&self) -> Result<Vec<notification::Model>, ServiceError> {
        Ok(notification::Entity::find()
            .order_by_desc(notification::Column::Id)
            .limit(50)
            .all(&*self.db_pool)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::ConnectionTrait;

    async fn service() -> NotificationService {
        let pool = crate::db::connect_url("sqlite::memory:").await.unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        NotificationService::new(Arc::new(pool))
    }

    #[tokio::test]
    async fn notifications_are_listed_newest_first() {
        let notes = service().await;
        notes.send("first", "purchasing").await.unwrap();
        notes.notify("second", "purchasing").await;

        let latest = notes.latest().await.unwrap();
        let messages: Vec<&str> = latest.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn notify_swallows_storage_failures() {
        let notes = service().await;
        notes
            .db_pool
            .execute_unprepared("DROP TABLE notifications")
            .await
            .unwrap();

        assert!(notes.send("lost", "purchasing").await.is_err());
        // Must return without surfacing the error
        notes.notify("lost", "purchasing").await;
    }
}
