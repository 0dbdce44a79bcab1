use crate::{
    db::DbPool,
    entities::{order, product, product_config, product_price, sale},
    errors::ServiceError,
    services::{periods::round2, products::price_on},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{info, instrument};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Deserialize)]
pub enum SaleType {
    Direct,
    Service,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewSale {
    pub product_id: i32,
    pub order_id: Option<i32>,
    pub sale_date: Option<NaiveDate>,
    #[validate(range(min = 0.0))]
    pub quantity: f64,
    pub sale_type: SaleType,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaleFilter {
    pub product_id: Option<i32>,
    pub sale_type: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Clone)]
pub struct SaleService {
    db_pool: Arc<DbPool>,
}

impl SaleService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Price the sale from the product's price history and store it
    #[instrument(skip(self, input), fields(product_id = input.product_id))]
    pub async fn record(&self, input: NewSale) -> Result<sale::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;

        product::Entity::find_by_id(input.product_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", input.product_id))?;
        let config = product_config::Entity::find()
            .filter(product_config::Column::ProductId.eq(input.product_id))
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Product {} has no sales configuration",
                    input.product_id
                ))
            })?;

        let supported = match input.sale_type {
            SaleType::Direct => config.supports_direct_sales,
            SaleType::Service => config.supports_service_sales,
        };
        if !supported {
            return Err(ServiceError::InvalidOperation(format!(
                "Product {} does not support {} sales",
                input.product_id, input.sale_type
            )));
        }

        if let Some(order_id) = input.order_id {
            order::Entity::find_by_id(order_id)
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::not_found("Order", order_id))?;
        }

        let sale_date = input.sale_date.unwrap_or_else(|| Utc::now().date_naive());
        let prices = product_price::Entity::find()
            .filter(product_price::Column::ProductId.eq(input.product_id))
            .all(db)
            .await?;
        let total = round2(input.quantity * price_on(&prices, sale_date));

        let created = sale::ActiveModel {
            product_id: Set(input.product_id),
            order_id: Set(input.order_id),
            sale_date: Set(sale_date),
            quantity: Set(input.quantity),
            total_price: Set(total),
            sale_type: Set(input.sale_type.to_string()),
            amount: Set(total),
            ..Default::default()
        }
        .insert(db)
        .await?;
        info!(sale_id = created.id, total, "sale recorded");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filter: SaleFilter) -> Result<Vec<sale::Model>, ServiceError> {
        let mut query = sale::Entity::find();
        if let Some(product_id) = filter.product_id {
            query = query.filter(sale::Column::ProductId.eq(product_id));
        }
        if let Some(sale_type) = filter.sale_type.filter(|s| !s.is_empty()) {
            query = query.filter(sale::Column::SaleType.eq(sale_type));
        }
        if let Some(from) = filter.from {
            query = query.filter(sale::Column::SaleDate.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(sale::Column::SaleDate.lte(to));
        }
        Ok(query
            .order_by_desc(sale::Column::SaleDate)
            .order_by_desc(sale::Column::Id)
            .all(&*self.db_pool)
            .await?)
    }
}
