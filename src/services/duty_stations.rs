use crate::{
    db::DbPool,
    entities::{duty_station, employee, machine, procurement_order, stock_item},
    errors::ServiceError,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set, SqlErr,
};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct DutyStationService {
    db_pool: Arc<DbPool>,
}

impl DutyStationService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<duty_station::Model>, ServiceError> {
        Ok(duty_station::Entity::find()
            .order_by_asc(duty_station::Column::Name)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<duty_station::Model, ServiceError> {
        duty_station::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Duty station", id))
    }

    async fn ensure_unique(&self, name: &str, except: Option<i32>) -> Result<(), ServiceError> {
        let mut query = duty_station::Entity::find().filter(duty_station::Column::Name.eq(name));
        if let Some(id) = except {
            query = query.filter(duty_station::Column::Id.ne(id));
        }
        if query.one(&*self.db_pool).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Duty station {} already exists",
                name
            )));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn create(&self, name: &str) -> Result<duty_station::Model, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::ValidationError("Name is required".into()));
        }
        self.ensure_unique(name, None).await?;
        let created = duty_station::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await?;
        info!(station_id = created.id, "duty station created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn rename(&self, id: i32, name: &str) -> Result<duty_station::Model, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::ValidationError("Name is required".into()));
        }
        let existing = self.get(id).await?;
        self.ensure_unique(name, Some(id)).await?;
        let mut active = existing.into_active_model();
        active.name = Set(name.to_string());
        Ok(active.update(&*self.db_pool).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        self.get(id).await?;
        let db = &*self.db_pool;
        let in_use = employee::Entity::find()
            .filter(employee::Column::DutyStationId.eq(id))
            .count(db)
            .await?
            + machine::Entity::find()
                .filter(machine::Column::DutyStationId.eq(id))
                .count(db)
                .await?
            + stock_item::Entity::find()
                .filter(stock_item::Column::DutyStationId.eq(id))
                .count(db)
                .await?
            + procurement_order::Entity::find()
                .filter(procurement_order::Column::DutyStationId.eq(id))
                .count(db)
                .await?;
        if in_use > 0 {
            return Err(ServiceError::Conflict(
                "Duty station is still referenced by employees, machines, stock or purchases".into(),
            ));
        }
        // Plans, ledgers and admin records also hold the station with RESTRICT
        duty_station::Entity::delete_by_id(id)
            .exec(db)
            .await
            .map_err(|e| match e.sql_err() {
                Some(SqlErr::ForeignKeyConstraintViolation(_)) => ServiceError::Conflict(
                    "Duty station is still referenced by other records".into(),
                ),
                _ => ServiceError::DatabaseError(e),
            })?;
        info!(station_id = id, "duty station deleted");
        Ok(())
    }
}

/// Find a station by name, creating it when missing.
pub async fn find_or_create_station<C: ConnectionTrait>(
    db: &C,
    name: &str,
) -> Result<duty_station::Model, ServiceError> {
    if let Some(found) = duty_station::Entity::find()
        .filter(duty_station::Column::Name.eq(name))
        .one(db)
        .await?
    {
        return Ok(found);
    }
    Ok(duty_station::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// Station names keyed by id, for display columns
pub async fn station_names<C: ConnectionTrait>(
    db: &C,
) -> Result<std::collections::HashMap<i32, String>, ServiceError> {
    Ok(duty_station::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect())
}
