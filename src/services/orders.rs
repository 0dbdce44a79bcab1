use crate::{
    db::DbPool,
    entities::{customer, order, product},
    errors::ServiceError,
    services::exports::{money, CsvExport},
    services::periods::round2,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{info, instrument};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum OrderStatus {
    Placed,
    Packed,
    Shipped,
    Delivered,
}

/// Prefix of order numbers for a product type: its first three letters, uppercased
pub fn order_prefix(product_type: &str) -> String {
    product_type.chars().take(3).collect::<String>().to_uppercase()
}

/// Next `{PFX}-{seq:03}` after the highest sequence already used with `prefix`
pub fn order_number_for<'a>(prefix: &str, existing: impl IntoIterator<Item = &'a str>) -> String {
    let marker = format!("{}-", prefix);
    let max = existing
        .into_iter()
        .filter_map(|number| number.strip_prefix(marker.as_str()))
        .filter_map(|seq| seq.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("{}-{:03}", prefix, max + 1)
}

/// `(tax, total)` for `quantity` units at `unit_price`
pub fn order_amounts(unit_price: f64, quantity: i32, tax_rate: f64) -> (f64, f64) {
    let subtotal = unit_price * quantity as f64;
    let tax = round2(subtotal * tax_rate);
    (tax, round2(subtotal + tax))
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewOrder {
    pub customer_id: i32,
    pub product_id: i32,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[serde(default = "pending")]
    pub payment_status: String,
    pub delivery_info: Option<String>,
    pub order_placed_date: Option<NaiveDate>,
    pub required_delivery_date: Option<NaiveDate>,
}

fn pending() -> String {
    "Pending".to_string()
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct OrderChanges {
    #[validate(range(min = 1))]
    pub quantity: Option<i32>,
    pub payment_status: Option<String>,
    pub delivery_info: Option<String>,
    pub order_placed_date: Option<NaiveDate>,
    pub required_delivery_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub customer_id: Option<i32>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: order::Model,
    pub customer_name: String,
    pub product_name: String,
}

#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    tax_rate: f64,
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, tax_rate: f64) -> Self {
        Self { db_pool, tax_rate }
    }

    async fn find<C: ConnectionTrait>(db: &C, id: i32) -> Result<order::Model, ServiceError> {
        order::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order", id))
    }

    async fn product<C: ConnectionTrait>(db: &C, id: i32) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", id))
    }

    #[instrument(skip(self, input))]
    pub async fn add(&self, input: NewOrder) -> Result<OrderDetails, ServiceError> {
        input.validate()?;
        let txn = self.db_pool.begin().await?;

        let customer = customer::Entity::find_by_id(input.customer_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Customer", input.customer_id))?;
        let product = Self::product(&txn, input.product_id).await?;

        let prefix = order_prefix(&product.product_type);
        let existing: Vec<String> = order::Entity::find()
            .filter(order::Column::OrderNumber.starts_with(format!("{}-", prefix)))
            .all(&txn)
            .await?
            .into_iter()
            .map(|o| o.order_number)
            .collect();
        let order_number = order_number_for(&prefix, existing.iter().map(String::as_str));

        let (tax, total) = order_amounts(product.selling_price, input.quantity, self.tax_rate);
        let created = order::ActiveModel {
            order_number: Set(order_number),
            customer_id: Set(customer.id),
            product_id: Set(product.id),
            quantity: Set(input.quantity),
            order_date: Set(Utc::now()),
            payment_status: Set(input.payment_status),
            order_status: Set(OrderStatus::Placed.to_string()),
            tax: Set(tax),
            total: Set(total),
            delivery_info: Set(input.delivery_info),
            order_placed_date: Set(input.order_placed_date),
            required_delivery_date: Set(input.required_delivery_date),
            total_value: Set(Some(total)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(order_id = created.id, number = %created.order_number, "order placed");
        Ok(OrderDetails {
            order: created,
            customer_name: customer.name,
            product_name: product.name,
        })
    }

    #[instrument(skip(self))]
    pub async fn update_status(&self, id: i32, status: &str) -> Result<order::Model, ServiceError> {
        let status: OrderStatus = status.parse().map_err(|_| {
            ServiceError::ValidationError(format!(
                "Invalid order status: {}. Allowed: Placed, Packed, Shipped, Delivered",
                status
            ))
        })?;
        let existing = Self::find(&*self.db_pool, id).await?;
        let mut active = existing.into_active_model();
        active.order_status = Set(status.to_string());
        let updated = active.update(&*self.db_pool).await?;
        info!(order_id = id, status = %status, "order status changed");
        Ok(updated)
    }

    #[instrument(skip(self, changes))]
    pub async fn edit(&self, id: i32, changes: OrderChanges) -> Result<OrderDetails, ServiceError> {
        changes.validate()?;
        let txn = self.db_pool.begin().await?;
        let existing = Self::find(&txn, id).await?;
        let product = Self::product(&txn, existing.product_id).await?;

        let quantity = changes.quantity.unwrap_or(existing.quantity);
        let (tax, total) = order_amounts(product.selling_price, quantity, self.tax_rate);

        let mut active = existing.into_active_model();
        active.quantity = Set(quantity);
        active.tax = Set(tax);
        active.total = Set(total);
        active.total_value = Set(Some(total));
        if let Some(status) = changes.payment_status {
            active.payment_status = Set(status);
        }
        if changes.delivery_info.is_some() {
            active.delivery_info = Set(changes.delivery_info);
        }
        if changes.order_placed_date.is_some() {
            active.order_placed_date = Set(changes.order_placed_date);
        }
        if changes.required_delivery_date.is_some() {
            active.required_delivery_date = Set(changes.required_delivery_date);
        }
        active.update(&txn).await?;
        txn.commit().await?;

        self.details(id).await
    }

    #[instrument(skip(self))]
    pub async fn details(&self, id: i32) -> Result<OrderDetails, ServiceError> {
        let db = &*self.db_pool;
        let order = Self::find(db, id).await?;
        let customer_name = customer::Entity::find_by_id(order.customer_id)
            .one(db)
            .await?
            .map(|c| c.name)
            .unwrap_or_default();
        let product_name = product::Entity::find_by_id(order.product_id)
            .one(db)
            .await?
            .map(|p| p.name)
            .unwrap_or_default();
        Ok(OrderDetails {
            order,
            customer_name,
            product_name,
        })
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filter: OrderFilter) -> Result<Vec<OrderDetails>, ServiceError> {
        let db = &*self.db_pool;
        let mut query = order::Entity::find();
        if let Some(status) = filter.status.filter(|s| !s.is_empty()) {
            query = query.filter(order::Column::OrderStatus.eq(status));
        }
        if let Some(status) = filter.payment_status.filter(|s| !s.is_empty()) {
            query = query.filter(order::Column::PaymentStatus.eq(status));
        }
        if let Some(customer_id) = filter.customer_id {
            query = query.filter(order::Column::CustomerId.eq(customer_id));
        }
        if let Some(from) = filter.from {
            query = query.filter(order::Column::OrderDate.gte(day_start(from)));
        }
        if let Some(to) = filter.to.and_then(|d| d.succ_opt()) {
            query = query.filter(order::Column::OrderDate.lt(day_start(to)));
        }
        let orders = query.order_by_desc(order::Column::OrderDate).all(db).await?;

        let customers: HashMap<i32, String> = customer::Entity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();
        let products: HashMap<i32, String> = product::Entity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        Ok(orders
            .into_iter()
            .map(|order| OrderDetails {
                customer_name: customers.get(&order.customer_id).cloned().unwrap_or_default(),
                product_name: products.get(&order.product_id).cloned().unwrap_or_default(),
                order,
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn export(&self, filter: OrderFilter) -> Result<CsvExport, ServiceError> {
        let rows = self.list(filter).await?.into_iter().map(|d| {
            vec![
                d.order.order_number,
                d.customer_name,
                d.product_name,
                d.order.quantity.to_string(),
                d.order.order_date.format("%Y-%m-%d").to_string(),
                d.order.payment_status,
                d.order.order_status,
                money(d.order.tax),
                money(d.order.total),
            ]
        });
        CsvExport::build(
            "orders.csv",
            &[
                "Order Number",
                "Customer",
                "Product",
                "Quantity",
                "Order Date",
                "Payment Status",
                "Order Status",
                "Tax",
                "Total",
            ],
            rows,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbering_continues_from_highest_sequence() {
        assert_eq!(order_number_for("GAR", []), "GAR-001");
        assert_eq!(
            order_number_for("GAR", ["GAR-001", "GAR-007", "GAR-003"]),
            "GAR-008"
        );
        assert_eq!(order_number_for("KNI", ["GAR-009", "KNI-x"]), "KNI-001");
    }

    #[test]
    fn prefix_uses_first_three_letters() {
        assert_eq!(order_prefix("Garment"), "GAR");
        assert_eq!(order_prefix("yarn"), "YAR");
    }

    #[test]
    fn tax_is_added_to_total() {
        let (tax, total) = order_amounts(100.0, 3, 0.15);
        assert_eq!(tax, 45.0);
        assert_eq!(total, 345.0);
    }

    #[test]
    fn unknown_status_does_not_parse() {
        assert!("Shipped".parse::<OrderStatus>().is_ok());
        assert!("Lost".parse::<OrderStatus>().is_err());
    }
}
