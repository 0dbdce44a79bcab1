use crate::{
    db::DbPool,
    entities::{duty_station, product, stock_balance, stock_category, stock_item, stock_transaction},
    errors::ServiceError,
    services::duty_stations::{find_or_create_station, station_names},
    services::exports::{money, CsvExport, CsvTable},
    services::periods::{month_period, quarter_months, round2},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{info, instrument, warn};
use validator::Validate;

pub const DEFAULT_CATEGORIES: [&str; 3] = ["Raw Material", "Finished Goods", "Consumables"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    In,
    Out,
    Adjust,
}

/// Closing figures of a balance row
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Figures {
    pub quantity: f64,
    pub value: f64,
}

/// Apply a movement to the running ending figures.
///
/// OUT may not take the quantity below zero; ADJUST is a signed delta.
pub fn apply_movement(
    ending: Figures,
    kind: TransactionType,
    quantity: f64,
    unit_price: f64,
) -> Result<Figures, ServiceError> {
    let value = quantity * unit_price;
    match kind {
        TransactionType::In => Ok(Figures {
            quantity: ending.quantity + quantity,
            value: round2(ending.value + value),
        }),
        TransactionType::Out => {
            if ending.quantity - quantity < 0.0 {
                return Err(ServiceError::InvalidOperation(format!(
                    "Insufficient stock: {} on hand, {} requested",
                    ending.quantity, quantity
                )));
            }
            Ok(Figures {
                quantity: ending.quantity - quantity,
                value: round2(ending.value - value),
            })
        }
        TransactionType::Adjust => Ok(Figures {
            quantity: ending.quantity + quantity,
            value: round2(ending.value + value),
        }),
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewCategory {
    #[validate(length(min = 1))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewItem {
    #[validate(length(min = 1))]
    pub name: String,
    pub category_id: i32,
    pub description: Option<String>,
    #[serde(default = "default_uom")]
    pub unit_of_measure: String,
    pub product_id: Option<i32>,
    pub duty_station_id: i32,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub min_stock_level: f64,
}

fn default_uom() -> String {
    "unit".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTransaction {
    pub item_id: i32,
    pub transaction_type: TransactionType,
    pub quantity: f64,
    pub unit_price: Option<f64>,
    pub duty_station_id: Option<i32>,
    pub transaction_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StockFilter {
    #[serde(default = "default_filter_type")]
    pub filter_type: String,
    pub value: Option<String>,
    pub duty_station_id: Option<i32>,
}

fn default_filter_type() -> String {
    "month".to_string()
}

impl Default for StockFilter {
    fn default() -> Self {
        Self {
            filter_type: default_filter_type(),
            value: None,
            duty_station_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StockOverview {
    pub categories: Vec<stock_category::Model>,
    pub items: Vec<stock_item::Model>,
    pub transactions: Vec<stock_transaction::Model>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockReportRow {
    pub item: String,
    pub duty_station: String,
    pub period: String,
    pub beginning_quantity: f64,
    pub beginning_value: f64,
    pub ending_quantity: f64,
    pub ending_value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadSummary {
    pub transactions: usize,
}

/// Create the standard categories if they are missing
pub async fn ensure_default_categories<C: ConnectionTrait>(db: &C) -> Result<(), ServiceError> {
    for name in DEFAULT_CATEGORIES {
        find_or_create_category(db, name).await?;
    }
    Ok(())
}

async fn find_or_create_category<C: ConnectionTrait>(
    db: &C,
    name: &str,
) -> Result<stock_category::Model, ServiceError> {
    if let Some(found) = stock_category::Entity::find()
        .filter(stock_category::Column::Name.eq(name))
        .one(db)
        .await?
    {
        return Ok(found);
    }
    Ok(stock_category::ActiveModel {
        name: Set(name.to_string()),
        description: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

struct Movement {
    station_id: i32,
    kind: TransactionType,
    quantity: f64,
    unit_price: f64,
    date: NaiveDate,
    recorded_by: Option<i32>,
}

/// Record one movement and roll it into the (item, station, month) balance
async fn post_transaction<C: ConnectionTrait>(
    db: &C,
    item: &stock_item::Model,
    movement: Movement,
) -> Result<stock_transaction::Model, ServiceError> {
    let Movement {
        station_id,
        kind,
        quantity,
        unit_price,
        date,
        recorded_by,
    } = movement;
    if quantity <= 0.0 && kind != TransactionType::Adjust {
        return Err(ServiceError::ValidationError(
            "Quantity must be greater than zero".into(),
        ));
    }
    if unit_price < 0.0 {
        return Err(ServiceError::ValidationError(
            "Unit price must not be negative".into(),
        ));
    }

    let period = month_period(date);
    let existing = stock_balance::Entity::find()
        .filter(stock_balance::Column::ItemId.eq(item.id))
        .filter(stock_balance::Column::DutyStationId.eq(station_id))
        .filter(stock_balance::Column::Period.eq(period.as_str()))
        .one(db)
        .await?;

    let balance = match existing {
        Some(balance) => balance,
        None => {
            // Idle months have no row, so carry the latest earlier month forward
            let previous = stock_balance::Entity::find()
                .filter(stock_balance::Column::ItemId.eq(item.id))
                .filter(stock_balance::Column::DutyStationId.eq(station_id))
                .filter(stock_balance::Column::Period.lt(period.as_str()))
                .order_by_desc(stock_balance::Column::Period)
                .one(db)
                .await?;
            let (quantity, value) = previous
                .map(|p| (p.ending_quantity, p.ending_value))
                .unwrap_or((0.0, 0.0));
            stock_balance::ActiveModel {
                item_id: Set(item.id),
                duty_station_id: Set(station_id),
                period: Set(period.clone()),
                beginning_quantity: Set(quantity),
                beginning_value: Set(value),
                ending_quantity: Set(quantity),
                ending_value: Set(value),
                ..Default::default()
            }
            .insert(db)
            .await?
        }
    };

    let next = apply_movement(
        Figures {
            quantity: balance.ending_quantity,
            value: balance.ending_value,
        },
        kind,
        quantity,
        unit_price,
    )?;
    let mut active = balance.into_active_model();
    active.ending_quantity = Set(next.quantity);
    active.ending_value = Set(next.value);
    active.update(db).await?;

    Ok(stock_transaction::ActiveModel {
        item_id: Set(item.id),
        transaction_type: Set(kind.to_string()),
        quantity: Set(quantity),
        unit_price: Set(unit_price),
        total_value: Set(round2(quantity * unit_price)),
        duty_station_id: Set(station_id),
        transaction_date: Set(date),
        recorded_by_id: Set(recorded_by),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

#[derive(Clone)]
pub struct StockService {
    db_pool: Arc<DbPool>,
}

impl StockService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn overview(&self) -> Result<StockOverview, ServiceError> {
        let db = &*self.db_pool;
        Ok(StockOverview {
            categories: stock_category::Entity::find()
                .order_by_asc(stock_category::Column::Name)
                .all(db)
                .await?,
            items: stock_item::Entity::find()
                .order_by_asc(stock_item::Column::Name)
                .all(db)
                .await?,
            transactions: stock_transaction::Entity::find()
                .order_by_desc(stock_transaction::Column::Id)
                .limit(50)
                .all(db)
                .await?,
        })
    }

    #[instrument(skip(self, input))]
    pub async fn add_category(&self, input: NewCategory) -> Result<stock_category::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        let name = input.name.trim();
        if stock_category::Entity::find()
            .filter(stock_category::Column::Name.eq(name))
            .one(db)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!("Category {} already exists", name)));
        }
        Ok(stock_category::ActiveModel {
            name: Set(name.to_string()),
            description: Set(input.description),
            ..Default::default()
        }
        .insert(db)
        .await?)
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn add_item(&self, input: NewItem) -> Result<stock_item::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        stock_category::Entity::find_by_id(input.category_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Stock category", input.category_id))?;
        duty_station::Entity::find_by_id(input.duty_station_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Duty station", input.duty_station_id))?;
        if let Some(product_id) = input.product_id {
            product::Entity::find_by_id(product_id)
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::not_found("Product", product_id))?;
        }

        let created = stock_item::ActiveModel {
            category_id: Set(input.category_id),
            name: Set(input.name.trim().to_string()),
            description: Set(input.description),
            unit_of_measure: Set(input.unit_of_measure),
            product_id: Set(input.product_id),
            duty_station_id: Set(input.duty_station_id),
            min_stock_level: Set(input.min_stock_level),
            ..Default::default()
        }
        .insert(db)
        .await?;
        info!(item_id = created.id, "stock item added");
        Ok(created)
    }

    #[instrument(skip(self, input), fields(item_id = input.item_id))]
    pub async fn record_transaction(
        &self,
        input: NewTransaction,
        user_id: i32,
    ) -> Result<stock_transaction::Model, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let item = stock_item::Entity::find_by_id(input.item_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Stock item", input.item_id))?;
        let station_id = input.duty_station_id.unwrap_or(item.duty_station_id);
        duty_station::Entity::find_by_id(station_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Duty station", station_id))?;

        let recorded = post_transaction(
            &txn,
            &item,
            Movement {
                station_id,
                kind: input.transaction_type,
                quantity: input.quantity,
                unit_price: input.unit_price.unwrap_or(0.0),
                date: input.transaction_date.unwrap_or_else(|| Utc::now().date_naive()),
                recorded_by: Some(user_id),
            },
        )
        .await?;
        txn.commit().await?;

        if recorded.transaction_type == TransactionType::Out.to_string() {
            self.warn_below_minimum(&item, station_id).await?;
        }
        info!(transaction_id = recorded.id, kind = %recorded.transaction_type, "stock movement recorded");
        Ok(recorded)
    }

    async fn warn_below_minimum(&self, item: &stock_item::Model, station_id: i32) -> Result<(), ServiceError> {
        if item.min_stock_level <= 0.0 {
            return Ok(());
        }
        let latest = stock_balance::Entity::find()
            .filter(stock_balance::Column::ItemId.eq(item.id))
            .filter(stock_balance::Column::DutyStationId.eq(station_id))
            .order_by_desc(stock_balance::Column::Period)
            .one(&*self.db_pool)
            .await?;
        if let Some(balance) = latest.filter(|b| b.ending_quantity < item.min_stock_level) {
            warn!(
                item = %item.name,
                on_hand = balance.ending_quantity,
                minimum = item.min_stock_level,
                "stock below minimum level"
            );
        }
        Ok(())
    }

    /// Post every row of a stock sheet in one transaction, creating stations, categories and items
    #[instrument(skip(self, bytes))]
    pub async fn upload(&self, bytes: &[u8], user_id: i32) -> Result<UploadSummary, ServiceError> {
        let table = CsvTable::parse(bytes, &["Item", "Duty Station", "Transaction Type", "Quantity"])?;
        let txn = self.db_pool.begin().await?;
        let mut transactions = 0;

        for row in table.rows() {
            let line = row.line;
            let at_row = |e: ServiceError| match e {
                ServiceError::ValidationError(msg)
                | ServiceError::InvalidOperation(msg)
                | ServiceError::NotFound(msg)
                    if !msg.starts_with("Row ") =>
                {
                    ServiceError::ValidationError(format!("Row {}: {}", line, msg))
                }
                other => other,
            };

            let item_name = row.require("Item")?;
            let station = find_or_create_station(&txn, row.require("Duty Station")?).await?;
            let category =
                find_or_create_category(&txn, row.get("Category").unwrap_or("Uncategorized")).await?;
            let kind: TransactionType = row.require("Transaction Type")?.parse().map_err(|_| {
                ServiceError::ValidationError(format!(
                    "Row {}: Transaction Type must be IN, OUT or ADJUST",
                    line
                ))
            })?;
            let quantity = row.number("Quantity")?.unwrap_or(0.0);
            let unit_price = row.number("Unit Price")?.unwrap_or(0.0);
            let date = match row.get("Date") {
                Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                    ServiceError::ValidationError(format!(
                        "Row {}: Date must be YYYY-MM-DD, got {:?}",
                        line, raw
                    ))
                })?,
                None => Utc::now().date_naive(),
            };

            let item = match stock_item::Entity::find()
                .filter(stock_item::Column::Name.eq(item_name))
                .filter(stock_item::Column::DutyStationId.eq(station.id))
                .one(&txn)
                .await?
            {
                Some(item) => item,
                None => stock_item::ActiveModel {
                    category_id: Set(category.id),
                    name: Set(item_name.to_string()),
                    description: Set(None),
                    unit_of_measure: Set(default_uom()),
                    product_id: Set(None),
                    duty_station_id: Set(station.id),
                    min_stock_level: Set(0.0),
                    ..Default::default()
                }
                .insert(&txn)
                .await?,
            };

            let movement = Movement {
                station_id: station.id,
                kind,
                quantity,
                unit_price,
                date,
                recorded_by: Some(user_id),
            };
            post_transaction(&txn, &item, movement).await.map_err(at_row)?;
            transactions += 1;
        }

        txn.commit().await?;
        info!(transactions, "stock sheet uploaded");
        Ok(UploadSummary { transactions })
    }

    async fn filtered_balances(&self, filter: &StockFilter) -> Result<Vec<stock_balance::Model>, ServiceError> {
        let db = &*self.db_pool;
        let mut query = stock_balance::Entity::find();
        if let Some(station) = filter.duty_station_id {
            query = query.filter(stock_balance::Column::DutyStationId.eq(station));
        }
        let value = filter.value.as_deref().map(str::trim).filter(|v| !v.is_empty());

        query = match filter.filter_type.as_str() {
            "month" => {
                let period = value
                    .map(str::to_string)
                    .unwrap_or_else(|| month_period(Utc::now().date_naive()));
                query.filter(stock_balance::Column::Period.eq(period))
            }
            "year" => {
                let year = value.ok_or_else(|| {
                    ServiceError::ValidationError("A year value is required".into())
                })?;
                query.filter(stock_balance::Column::Period.starts_with(format!("{}-", year)))
            }
            "quarter" => {
                let months = value.and_then(quarter_months).ok_or_else(|| {
                    ServiceError::ValidationError("Quarter must look like YYYY-Qn".into())
                })?;
                query.filter(stock_balance::Column::Period.is_in(months))
            }
            "daily" => {
                let date = value
                    .and_then(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d").ok())
                    .ok_or_else(|| ServiceError::ValidationError("Date must be YYYY-MM-DD".into()))?;
                let mut moved = stock_transaction::Entity::find()
                    .filter(stock_transaction::Column::TransactionDate.eq(date));
                if let Some(station) = filter.duty_station_id {
                    moved = moved.filter(stock_transaction::Column::DutyStationId.eq(station));
                }
                let item_ids: HashSet<i32> = moved.all(db).await?.into_iter().map(|t| t.item_id).collect();
                query
                    .filter(stock_balance::Column::Period.eq(month_period(date)))
                    .filter(stock_balance::Column::ItemId.is_in(item_ids))
            }
            other => {
                return Err(ServiceError::ValidationError(format!(
                    "Unknown filter type: {}",
                    other
                )))
            }
        };

        Ok(query
            .order_by_asc(stock_balance::Column::Period)
            .order_by_asc(stock_balance::Column::ItemId)
            .all(db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn report(&self, filter: StockFilter) -> Result<Vec<StockReportRow>, ServiceError> {
        let balances = self.filtered_balances(&filter).await?;
        let db = &*self.db_pool;
        let items: HashMap<i32, String> = stock_item::Entity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|i| (i.id, i.name))
            .collect();
        let stations = station_names(db).await?;

        Ok(balances
            .into_iter()
            .map(|b| StockReportRow {
                item: items.get(&b.item_id).cloned().unwrap_or_default(),
                duty_station: stations.get(&b.duty_station_id).cloned().unwrap_or_default(),
                period: b.period,
                beginning_quantity: b.beginning_quantity,
                beginning_value: b.beginning_value,
                ending_quantity: b.ending_quantity,
                ending_value: b.ending_value,
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn export(&self, filter: StockFilter) -> Result<CsvExport, ServiceError> {
        let rows = self.report(filter).await?.into_iter().map(|r| {
            vec![
                r.item,
                r.duty_station,
                r.period,
                r.beginning_quantity.to_string(),
                money(r.beginning_value),
                r.ending_quantity.to_string(),
                money(r.ending_value),
            ]
        });
        CsvExport::build(
            "stock_report.csv",
            &[
                "Item",
                "Duty Station",
                "Period",
                "Beginning Qty",
                "Beginning Value",
                "Ending Qty",
                "Ending Value",
            ],
            rows,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const START: Figures = Figures {
        quantity: 10.0,
        value: 100.0,
    };

    #[test]
    fn movements_update_ending_figures() {
        let after_in = apply_movement(START, TransactionType::In, 5.0, 10.0).unwrap();
        assert_eq!(after_in, Figures { quantity: 15.0, value: 150.0 });

        let after_out = apply_movement(after_in, TransactionType::Out, 15.0, 10.0).unwrap();
        assert_eq!(after_out, Figures { quantity: 0.0, value: 0.0 });

        let adjusted = apply_movement(START, TransactionType::Adjust, -2.0, 10.0).unwrap();
        assert_eq!(adjusted, Figures { quantity: 8.0, value: 80.0 });
    }

    #[test]
    fn out_cannot_go_negative() {
        assert_matches!(
            apply_movement(START, TransactionType::Out, 11.0, 1.0),
            Err(ServiceError::InvalidOperation(_))
        );
    }

    #[test]
    fn transaction_types_parse_case_insensitively() {
        assert_eq!("in".parse::<TransactionType>().unwrap(), TransactionType::In);
        assert_eq!("ADJUST".parse::<TransactionType>().unwrap(), TransactionType::Adjust);
        assert_eq!(TransactionType::Out.to_string(), "OUT");
        assert!("MOVE".parse::<TransactionType>().is_err());
    }
}
