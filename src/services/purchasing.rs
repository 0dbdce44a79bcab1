use crate::{
    db::DbPool,
    entities::{
        duty_station, notification, procurement_order, purchase_request, supplier,
        yearly_purchase_plan,
    },
    errors::ServiceError,
    services::duty_stations::station_names,
    services::exports::{money, opt_string, CsvExport, CsvTable},
    services::notifications::NotificationService,
    services::periods::{percentage, round2},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

pub const COST_CATEGORIES: [&str; 11] = [
    "Construction",
    "Customs Service Payment",
    "Machine Accessories",
    "Project Raw Material",
    "Project Service Payment",
    "Raw Material",
    "Salts and Chemicals",
    "Service Payment",
    "Spare Parts",
    "Vehicle Service Payment",
    "Wood",
];

const PAYABLE_STATUSES: [&str; 3] = ["Unpaid", "Partially Paid", "Credit"];
const MODULE: &str = "Purchasing";

fn check_category(category: &str) -> Result<(), ServiceError> {
    if COST_CATEGORIES.contains(&category) {
        Ok(())
    } else {
        Err(ServiceError::ValidationError(format!(
            "Unknown cost category: {}",
            category
        )))
    }
}

/// Payment status after paying `amount` towards `total`
pub fn payment_status_for(amount: f64, total: f64, requested: &str) -> String {
    if amount >= total {
        "Paid".to_string()
    } else if amount > 0.0 {
        "Partially Paid".to_string()
    } else {
        requested.to_string()
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewRequest {
    pub request_code: Option<String>,
    #[validate(length(min = 1))]
    pub dept_name: String,
    pub duty_station_id: i32,
    #[validate(length(min = 1))]
    pub item_name: String,
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1))]
    pub unit_of_measure: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub expected_delivery_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FulfillRequest {
    pub order_number: Option<String>,
    #[validate(length(min = 1))]
    pub supplier_name: String,
    #[validate(range(min = 0.0))]
    pub total_price: f64,
    pub payment_status: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewPurchase {
    pub order_number: Option<String>,
    #[validate(length(min = 1))]
    pub description: String,
    pub cost_category: String,
    #[validate(length(min = 1))]
    pub supplier_name: String,
    pub duty_station_id: i32,
    pub total_price: f64,
    pub unit_price: Option<f64>,
    #[validate(length(min = 1))]
    pub unit_of_measure: String,
    #[validate(range(min = 1))]
    pub quantity: Option<i32>,
    pub payment_status: Option<String>,
    pub payment_amount: Option<f64>,
    pub payment_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentUpdate {
    pub amount: f64,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SupplierInput {
    #[validate(length(min = 1))]
    pub name: String,
    pub contact_info: Option<String>,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub location: Option<String>,
    pub supplied_items: Option<String>,
    #[validate(range(min = 0.0, max = 5.0))]
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PurchaseFilter {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub duty_station_id: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewYearlyPlan {
    #[validate(range(min = 2000, max = 2100))]
    pub year: i32,
    pub duty_station_id: i32,
    pub cost_category: String,
    #[validate(range(min = 0.0))]
    pub planned_cost: f64,
    #[serde(default)]
    pub q1_cost: f64,
    #[serde(default)]
    pub q2_cost: f64,
    #[serde(default)]
    pub q3_cost: f64,
    #[serde(default)]
    pub q4_cost: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SupplierHit {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Payable {
    #[serde(flatten)]
    pub order: procurement_order::Model,
    pub supplier_name: String,
    pub duty_station: String,
    pub remaining: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchasingOverview {
    pub pending_requests: u64,
    pub requests: Vec<purchase_request::Model>,
    pub orders: Vec<procurement_order::Model>,
    pub payables: Vec<Payable>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StationExpense {
    pub duty_station: String,
    pub amount: f64,
    pub pct: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TopItem {
    pub duty_station: String,
    pub description: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrendPoint {
    pub month: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PurchaseReport {
    pub total_expense: f64,
    pub stations: Vec<StationExpense>,
    pub top_items: Vec<TopItem>,
    pub trend: Vec<TrendPoint>,
}

/// Spend totals, station shares, top five descriptions per station and the monthly trend
pub fn build_report(orders: &[procurement_order::Model], stations: &HashMap<i32, String>) -> PurchaseReport {
    if orders.is_empty() {
        return PurchaseReport::default();
    }
    let station_of = |o: &procurement_order::Model| {
        o.duty_station_id
            .and_then(|id| stations.get(&id).cloned())
            .unwrap_or_else(|| "Unassigned".to_string())
    };

    let total_expense: f64 = orders.iter().map(|o| o.total_price).sum();

    let mut per_station: BTreeMap<String, f64> = BTreeMap::new();
    let mut per_item: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    let mut trend: BTreeMap<String, f64> = BTreeMap::new();
    for order in orders {
        let station = station_of(order);
        *per_station.entry(station.clone()).or_default() += order.total_price;
        *per_item
            .entry(station)
            .or_default()
            .entry(order.description.clone())
            .or_default() += order.total_price;
        *trend
            .entry(order.registered_date.format("%Y-%m").to_string())
            .or_default() += order.total_price;
    }

    let stations = per_station
        .into_iter()
        .map(|(duty_station, amount)| StationExpense {
            duty_station,
            amount: round2(amount),
            pct: round2(percentage(amount, total_expense)),
        })
        .collect();

    let top_items = per_item
        .into_iter()
        .flat_map(|(duty_station, items)| {
            let mut items: Vec<(String, f64)> = items.into_iter().collect();
            items.sort_by(|a, b| b.1.total_cmp(&a.1));
            items
                .into_iter()
                .take(5)
                .map(move |(description, amount)| TopItem {
                    duty_station: duty_station.clone(),
                    description,
                    amount: round2(amount),
                })
        })
        .collect();

    PurchaseReport {
        total_expense: round2(total_expense),
        stations,
        top_items,
        trend: trend
            .into_iter()
            .map(|(month, amount)| TrendPoint {
                month,
                amount: round2(amount),
            })
            .collect(),
    }
}

#[derive(Clone)]
pub struct PurchasingService {
    db_pool: Arc<DbPool>,
    notifications: NotificationService,
}

impl PurchasingService {
    pub fn new(db_pool: Arc<DbPool>, notifications: NotificationService) -> Self {
        Self {
            db_pool,
            notifications,
        }
    }

    pub fn cost_categories(&self) -> &'static [&'static str] {
        &COST_CATEGORIES
    }

    async fn ensure_station<C: ConnectionTrait>(db: &C, id: i32) -> Result<(), ServiceError> {
        duty_station::Entity::find_by_id(id)
            .one(db)
            .await?
            .map(|_| ())
            .ok_or_else(|| ServiceError::not_found("Duty station", id))
    }

    async fn find_or_create_supplier<C: ConnectionTrait>(
        db: &C,
        name: &str,
    ) -> Result<supplier::Model, ServiceError> {
        if let Some(found) = supplier::Entity::find()
            .filter(supplier::Column::Name.eq(name))
            .one(db)
            .await?
        {
            return Ok(found);
        }
        info!(supplier = name, "registering supplier on first purchase");
        Ok(supplier::ActiveModel {
            name: Set(name.to_string()),
            contact_info: Set("N/A".to_string()),
            ..Default::default()
        }
        .insert(db)
        .await?)
    }

    async fn next_order_number<C: ConnectionTrait>(
        db: &C,
        requested: Option<String>,
    ) -> Result<String, ServiceError> {
        let number = match requested.filter(|n| !n.trim().is_empty()) {
            Some(n) => n.trim().to_string(),
            None => {
                let count = procurement_order::Entity::find().count(db).await?;
                format!("PO-{:04}", count + 1)
            }
        };
        let taken = procurement_order::Entity::find()
            .filter(procurement_order::Column::OrderNumber.eq(number.as_str()))
            .one(db)
            .await?;
        if taken.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Procurement order {} already exists",
                number
            )));
        }
        Ok(number)
    }

    async fn find_order(&self, id: i32) -> Result<procurement_order::Model, ServiceError> {
        procurement_order::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Procurement order", id))
    }

    #[instrument(skip(self))]
    pub async fn overview(&self) -> Result<PurchasingOverview, ServiceError> {
        let db = &*self.db_pool;
        let pending_requests = purchase_request::Entity::find()
            .filter(purchase_request::Column::Status.eq("Pending"))
            .count(db)
            .await?;
        let requests = purchase_request::Entity::find()
            .order_by_desc(purchase_request::Column::CreatedAt)
            .all(db)
            .await?;
        let orders = procurement_order::Entity::find()
            .order_by_desc(procurement_order::Column::RegisteredDate)
            .order_by_desc(procurement_order::Column::Id)
            .all(db)
            .await?;
        Ok(PurchasingOverview {
            pending_requests,
            requests,
            orders,
            payables: self.payables().await?,
        })
    }

    #[instrument(skip(self, input))]
    pub async fn create_request(
        &self,
        input: NewRequest,
        user_id: i32,
        username: &str,
    ) -> Result<purchase_request::Model, ServiceError> {
        input.validate()?;
        let txn = self.db_pool.begin().await?;
        Self::ensure_station(&txn, input.duty_station_id).await?;

        let request_code = match input.request_code.filter(|c| !c.trim().is_empty()) {
            Some(code) => code.trim().to_string(),
            None => {
                let count = purchase_request::Entity::find().count(&txn).await?;
                format!("PUR-{:04}", count + 1)
            }
        };
        if purchase_request::Entity::find()
            .filter(purchase_request::Column::RequestCode.eq(request_code.as_str()))
            .one(&txn)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "Purchase request {} already exists",
                request_code
            )));
        }

        let created = purchase_request::ActiveModel {
            request_code: Set(request_code),
            dept_name: Set(input.dept_name),
            duty_station_id: Set(input.duty_station_id),
            requested_by_id: Set(Some(user_id)),
            item_name: Set(input.item_name),
            description: Set(input.description),
            unit_of_measure: Set(input.unit_of_measure),
            quantity: Set(input.quantity),
            expected_delivery_date: Set(input.expected_delivery_date),
            status: Set("Pending".to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        self.notifications
            .notify(
                &format!(
                    "New purchase request {} submitted by {}",
                    created.request_code, username
                ),
                MODULE,
            )
            .await;
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn fulfill_request(
        &self,
        id: i32,
        input: FulfillRequest,
        user_id: i32,
    ) -> Result<procurement_order::Model, ServiceError> {
        input.validate()?;
        let txn = self.db_pool.begin().await?;
        let request = purchase_request::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Purchase request", id))?;
        if request.status != "Pending" {
            return Err(ServiceError::InvalidOperation(format!(
                "Purchase request {} is already {}",
                request.request_code, request.status
            )));
        }

        let order_number = Self::next_order_number(&txn, input.order_number).await?;
        let supplier = Self::find_or_create_supplier(&txn, input.supplier_name.trim()).await?;

        let order = procurement_order::ActiveModel {
            order_number: Set(order_number),
            request_id: Set(Some(request.id)),
            description: Set(request.description.clone()),
            quantity: Set(request.quantity),
            unit_of_measure: Set(request.unit_of_measure.clone()),
            unit_price: Set(None),
            total_price: Set(input.total_price),
            status: Set("Fulfilled".to_string()),
            cost_category: Set(request.dept_name.clone()),
            duty_station_id: Set(Some(request.duty_station_id)),
            supplier_id: Set(Some(supplier.id)),
            payment_status: Set(input.payment_status.unwrap_or_else(|| "Unpaid".to_string())),
            payment_amount: Set(0.0),
            payment_date: Set(None),
            registered_by_id: Set(Some(user_id)),
            registered_date: Set(Utc::now().date_naive()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let request_code = request.request_code.clone();
        let mut active = request.into_active_model();
        active.status = Set("Fulfilled".to_string());
        active.update(&txn).await?;
        txn.commit().await?;

        self.notifications
            .notify(
                &format!(
                    "Purchase request {} fulfilled with order {}",
                    request_code, order.order_number
                ),
                MODULE,
            )
            .await;
        Ok(order)
    }

    #[instrument(skip(self, input))]
    pub async fn register_purchase(
        &self,
        input: NewPurchase,
        user_id: i32,
        username: &str,
    ) -> Result<procurement_order::Model, ServiceError> {
        input.validate()?;
        check_category(&input.cost_category)?;
        if input.total_price <= 0.0 {
            return Err(ServiceError::ValidationError(
                "Total price must be greater than zero".into(),
            ));
        }

        let txn = self.db_pool.begin().await?;
        Self::ensure_station(&txn, input.duty_station_id).await?;
        let order_number = Self::next_order_number(&txn, input.order_number).await?;
        let supplier = Self::find_or_create_supplier(&txn, input.supplier_name.trim()).await?;

        let order = procurement_order::ActiveModel {
            order_number: Set(order_number),
            request_id: Set(None),
            description: Set(input.description),
            quantity: Set(input.quantity.unwrap_or(1)),
            unit_of_measure: Set(input.unit_of_measure),
            unit_price: Set(input.unit_price),
            total_price: Set(input.total_price),
            status: Set("Pending".to_string()),
            cost_category: Set(input.cost_category),
            duty_station_id: Set(Some(input.duty_station_id)),
            supplier_id: Set(Some(supplier.id)),
            payment_status: Set(input.payment_status.unwrap_or_else(|| "Unpaid".to_string())),
            payment_amount: Set(input.payment_amount.unwrap_or(0.0)),
            payment_date: Set(input.payment_date),
            registered_by_id: Set(Some(user_id)),
            registered_date: Set(Utc::now().date_naive()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        self.notifications
            .notify(
                &format!(
                    "New purchase {} registered by {}",
                    order.order_number, username
                ),
                MODULE,
            )
            .await;
        Ok(order)
    }

    #[instrument(skip(self, update))]
    pub async fn update_payment(
        &self,
        id: i32,
        update: PaymentUpdate,
    ) -> Result<procurement_order::Model, ServiceError> {
        if update.amount < 0.0 {
            return Err(ServiceError::ValidationError(
                "Payment amount must not be negative".into(),
            ));
        }
        let order = self.find_order(id).await?;
        let status = payment_status_for(update.amount, order.total_price, &update.status);

        let mut active = order.into_active_model();
        active.payment_amount = Set(update.amount);
        active.payment_status = Set(status);
        active.payment_date = Set(Some(Utc::now().date_naive()));
        let updated = active.update(&*self.db_pool).await?;

        self.notifications
            .notify(
                &format!("Payment updated for order {}", updated.order_number),
                MODULE,
            )
            .await;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn payables(&self) -> Result<Vec<Payable>, ServiceError> {
        let db = &*self.db_pool;
        let orders = procurement_order::Entity::find()
            .filter(procurement_order::Column::PaymentStatus.is_in(PAYABLE_STATUSES))
            .order_by_asc(procurement_order::Column::RegisteredDate)
            .all(db)
            .await?;
        let suppliers = self.supplier_names().await?;
        let stations = station_names(db).await?;

        Ok(orders
            .into_iter()
            .map(|order| Payable {
                supplier_name: order
                    .supplier_id
                    .and_then(|id| suppliers.get(&id).cloned())
                    .unwrap_or_default(),
                duty_station: order
                    .duty_station_id
                    .and_then(|id| stations.get(&id).cloned())
                    .unwrap_or_default(),
                remaining: round2(order.remaining()),
                order,
            })
            .collect())
    }

    async fn supplier_names(&self) -> Result<HashMap<i32, String>, ServiceError> {
        Ok(supplier::Entity::find()
            .all(&*self.db_pool)
            .await?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn search_suppliers(&self, q: &str) -> Result<Vec<SupplierHit>, ServiceError> {
        let needle = q.trim().to_lowercase();
        let hits = supplier::Entity::find()
            .order_by_asc(supplier::Column::Name)
            .all(&*self.db_pool)
            .await?
            .into_iter()
            .filter(|s| s.name.to_lowercase().contains(&needle))
            .take(10)
            .map(|s| SupplierHit {
                id: s.id,
                name: s.name,
            })
            .collect();
        Ok(hits)
    }

    #[instrument(skip(self))]
    pub async fn list_suppliers(&self) -> Result<Vec<supplier::Model>, ServiceError> {
        Ok(supplier::Entity::find()
            .order_by_asc(supplier::Column::Name)
            .all(&*self.db_pool)
            .await?)
    }

    async fn ensure_unique_supplier(&self, name: &str, except: Option<i32>) -> Result<(), ServiceError> {
        let mut query = supplier::Entity::find().filter(supplier::Column::Name.eq(name));
        if let Some(id) = except {
            query = query.filter(supplier::Column::Id.ne(id));
        }
        if query.one(&*self.db_pool).await?.is_some() {
            return Err(ServiceError::Conflict(format!("Supplier {} already exists", name)));
        }
        Ok(())
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn register_supplier(&self, input: SupplierInput) -> Result<supplier::Model, ServiceError> {
        input.validate()?;
        let name = input.name.trim().to_string();
        self.ensure_unique_supplier(&name, None).await?;
        let created = supplier::ActiveModel {
            name: Set(name),
            contact_info: Set(input.contact_info.unwrap_or_else(|| "N/A".to_string())),
            contact_name: Set(input.contact_name),
            phone: Set(input.phone),
            email: Set(input.email),
            location: Set(input.location),
            supplied_items: Set(input.supplied_items),
            rating: Set(input.rating),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await?;
        info!(supplier_id = created.id, "supplier registered");
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn modify_supplier(&self, id: i32, input: SupplierInput) -> Result<supplier::Model, ServiceError> {
        input.validate()?;
        let existing = supplier::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Supplier", id))?;
        let name = input.name.trim().to_string();
        self.ensure_unique_supplier(&name, Some(id)).await?;

        let mut active = existing.into_active_model();
        active.name = Set(name);
        if let Some(contact_info) = input.contact_info {
            active.contact_info = Set(contact_info);
        }
        active.contact_name = Set(input.contact_name);
        active.phone = Set(input.phone);
        active.email = Set(input.email);
        active.location = Set(input.location);
        active.supplied_items = Set(input.supplied_items);
        active.rating = Set(input.rating);
        Ok(active.update(&*self.db_pool).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_supplier(&self, id: i32) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        supplier::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Supplier", id))?;
        let orders = procurement_order::Entity::find()
            .filter(procurement_order::Column::SupplierId.eq(id))
            .count(db)
            .await?;
        if orders > 0 {
            return Err(ServiceError::Conflict(format!(
                "Supplier is referenced by {} procurement orders",
                orders
            )));
        }
        supplier::Entity::delete_by_id(id).exec(db).await?;
        info!(supplier_id = id, "supplier deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn export_suppliers(&self) -> Result<CsvExport, ServiceError> {
        let rows = self.list_suppliers().await?.into_iter().map(|s| {
            vec![
                s.name,
                opt_string(s.contact_name.as_deref()),
                opt_string(s.phone.as_deref()),
                opt_string(s.email.as_deref()),
                opt_string(s.location.as_deref()),
                opt_string(s.supplied_items.as_deref()),
                s.rating.map(|r| r.to_string()).unwrap_or_default(),
            ]
        });
        CsvExport::build(
            "suppliers.csv",
            &["Name", "Contact Name", "Phone", "Email", "Location", "Supplied Items", "Rating"],
            rows,
        )
    }

    async fn filtered_orders(&self, filter: &PurchaseFilter) -> Result<Vec<procurement_order::Model>, ServiceError> {
        let mut query = procurement_order::Entity::find();
        if let Some(start) = filter.start {
            query = query.filter(procurement_order::Column::RegisteredDate.gte(start));
        }
        if let Some(end) = filter.end {
            query = query.filter(procurement_order::Column::RegisteredDate.lte(end));
        }
        if let Some(station) = filter.duty_station_id {
            query = query.filter(procurement_order::Column::DutyStationId.eq(station));
        }
        Ok(query
            .order_by_desc(procurement_order::Column::RegisteredDate)
            .order_by_desc(procurement_order::Column::Id)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn report(&self, filter: PurchaseFilter) -> Result<PurchaseReport, ServiceError> {
        let orders = self.filtered_orders(&filter).await?;
        let stations = station_names(&*self.db_pool).await?;
        Ok(build_report(&orders, &stations))
    }

    async fn purchases_csv(
        &self,
        filename: &str,
        orders: Vec<procurement_order::Model>,
    ) -> Result<CsvExport, ServiceError> {
        let suppliers = self.supplier_names().await?;
        let stations = station_names(&*self.db_pool).await?;
        let rows = orders.into_iter().map(|o| {
            vec![
                o.order_number,
                o.description,
                o.cost_category,
                o.supplier_id
                    .and_then(|id| suppliers.get(&id).cloned())
                    .unwrap_or_default(),
                o.duty_station_id
                    .and_then(|id| stations.get(&id).cloned())
                    .unwrap_or_default(),
                o.quantity.to_string(),
                o.unit_of_measure,
                money(o.total_price),
                o.payment_status,
                money(o.payment_amount),
                o.payment_date.map(|d| d.to_string()).unwrap_or_default(),
                o.registered_date.to_string(),
            ]
        });
        CsvExport::build(
            filename,
            &[
                "Order Number",
                "Description",
                "Cost Category",
                "Supplier",
                "Duty Station",
                "Quantity",
                "Unit",
                "Total Price",
                "Payment Status",
                "Payment Amount",
                "Payment Date",
                "Registered Date",
            ],
            rows,
        )
    }

    #[instrument(skip(self))]
    pub async fn export_purchases(&self) -> Result<CsvExport, ServiceError> {
        let orders = self.filtered_orders(&PurchaseFilter::default()).await?;
        self.purchases_csv("purchases.csv", orders).await
    }

    #[instrument(skip(self))]
    pub async fn export_report(&self, filter: PurchaseFilter) -> Result<CsvExport, ServiceError> {
        let orders = self.filtered_orders(&filter).await?;
        self.purchases_csv("purchase_report.csv", orders).await
    }

    #[instrument(skip(self))]
    pub async fn export_payables(&self) -> Result<CsvExport, ServiceError> {
        let rows = self.payables().await?.into_iter().map(|p| {
            vec![
                p.order.order_number,
                p.order.description,
                p.supplier_name,
                p.duty_station,
                money(p.order.total_price),
                p.order.payment_status,
                money(p.order.payment_amount),
                money(p.remaining),
            ]
        });
        CsvExport::build(
            "payables.csv",
            &[
                "Order Number",
                "Description",
                "Supplier",
                "Duty Station",
                "Total Price",
                "Payment Status",
                "Payment Amount",
                "Remaining",
            ],
            rows,
        )
    }

    #[instrument(skip(self))]
    pub async fn list_yearly_plans(&self) -> Result<Vec<yearly_purchase_plan::Model>, ServiceError> {
        Ok(yearly_purchase_plan::Entity::find()
            .order_by_desc(yearly_purchase_plan::Column::Year)
            .order_by_asc(yearly_purchase_plan::Column::DutyStationId)
            .all(&*self.db_pool)
            .await?)
    }

    async fn insert_plan<C: ConnectionTrait>(
        db: &C,
        plan: NewYearlyPlan,
    ) -> Result<yearly_purchase_plan::Model, ServiceError> {
        plan.validate()?;
        check_category(&plan.cost_category)?;
        Self::ensure_station(db, plan.duty_station_id).await?;
        Ok(yearly_purchase_plan::ActiveModel {
            year: Set(plan.year),
            duty_station_id: Set(plan.duty_station_id),
            cost_category: Set(plan.cost_category),
            planned_cost: Set(plan.planned_cost),
            q1_cost: Set(plan.q1_cost),
            q2_cost: Set(plan.q2_cost),
            q3_cost: Set(plan.q3_cost),
            q4_cost: Set(plan.q4_cost),
            ..Default::default()
        }
        .insert(db)
        .await?)
    }

    #[instrument(skip(self, plan))]
    pub async fn register_yearly_plan(
        &self,
        plan: NewYearlyPlan,
    ) -> Result<yearly_purchase_plan::Model, ServiceError> {
        let created = Self::insert_plan(&*self.db_pool, plan).await?;
        info!(plan_id = created.id, year = created.year, "yearly purchase plan registered");
        Ok(created)
    }

    /// Insert every row of an uploaded plan sheet, or none of them
    #[instrument(skip(self, bytes))]
    pub async fn upload_yearly_plans(&self, bytes: &[u8]) -> Result<usize, ServiceError> {
        let table = CsvTable::parse(
            bytes,
            &[
                "year",
                "duty_station_id",
                "cost_category",
                "planned_cost",
                "q1_cost",
                "q2_cost",
                "q3_cost",
                "q4_cost",
            ],
        )?;

        let txn = self.db_pool.begin().await?;
        let mut inserted = 0;
        for row in table.rows() {
            let line = row.line;
            let int = |column: &str| -> Result<i32, ServiceError> {
                row.require(column)?.parse::<i32>().map_err(|_| {
                    ServiceError::ValidationError(format!("Row {}: {} must be an integer", line, column))
                })
            };
            let plan = NewYearlyPlan {
                year: int("year")?,
                duty_station_id: int("duty_station_id")?,
                cost_category: row.require("cost_category")?.to_string(),
                planned_cost: row.number("planned_cost")?.unwrap_or(0.0),
                q1_cost: row.number("q1_cost")?.unwrap_or(0.0),
                q2_cost: row.number("q2_cost")?.unwrap_or(0.0),
                q3_cost: row.number("q3_cost")?.unwrap_or(0.0),
                q4_cost: row.number("q4_cost")?.unwrap_or(0.0),
            };
            Self::insert_plan(&txn, plan).await.map_err(|e| match e {
                ServiceError::ValidationError(msg) | ServiceError::NotFound(msg) => {
                    ServiceError::ValidationError(format!("Row {}: {}", line, msg))
                }
                other => other,
            })?;
            inserted += 1;
        }
        txn.commit().await?;
        info!(inserted, "yearly purchase plans uploaded");
        Ok(inserted)
    }

    #[instrument(skip(self))]
    pub async fn export_yearly_plans(&self) -> Result<CsvExport, ServiceError> {
        let stations = station_names(&*self.db_pool).await?;
        let rows = self.list_yearly_plans().await?.into_iter().map(|p| {
            vec![
                p.year.to_string(),
                stations.get(&p.duty_station_id).cloned().unwrap_or_default(),
                p.cost_category,
                money(p.planned_cost),
                money(p.q1_cost),
                money(p.q2_cost),
                money(p.q3_cost),
                money(p.q4_cost),
            ]
        });
        CsvExport::build(
            "yearly_purchase_plans.csv",
            &[
                "Year",
                "Duty Station",
                "Cost Category",
                "Planned Cost",
                "Q1 Cost",
                "Q2 Cost",
                "Q3 Cost",
                "Q4 Cost",
            ],
            rows,
        )
    }

    /// Recent purchasing notifications
    #[instrument(skip(self))]
    pub async fn notifications(&self, limit: u64) -> Result<Vec<notification::Model>, ServiceError> {
        Ok(notification::Entity::find()
            .filter(notification::Column::Module.eq(MODULE))
            .order_by_desc(notification::Column::Id)
            .limit(limit)
            .all(&*self.db_pool)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: i32, station: i32, description: &str, total: f64, month: u32) -> procurement_order::Model {
        procurement_order::Model {
            id,
            order_number: format!("PO-{:04}", id),
            request_id: None,
            description: description.into(),
            quantity: 1,
            unit_of_measure: "pcs".into(),
            unit_price: None,
            total_price: total,
            status: "Pending".into(),
            cost_category: "Wood".into(),
            duty_station_id: Some(station),
            supplier_id: None,
            payment_status: "Unpaid".into(),
            payment_amount: 0.0,
            payment_date: None,
            registered_by_id: None,
            registered_date: NaiveDate::from_ymd_opt(2024, month, 10).unwrap(),
        }
    }

    #[test]
    fn payment_status_follows_amount() {
        assert_eq!(payment_status_for(100.0, 100.0, "Credit"), "Paid");
        assert_eq!(payment_status_for(40.0, 100.0, "Credit"), "Partially Paid");
        assert_eq!(payment_status_for(0.0, 100.0, "Credit"), "Credit");
    }

    #[test]
    fn report_groups_by_station_and_month() {
        let stations = HashMap::from([(1, "Addis".to_string()), (2, "Hawassa".to_string())]);
        let mut orders = vec![
            order(1, 1, "Bolts", 100.0, 1),
            order(2, 1, "Timber", 200.0, 2),
            order(3, 2, "Dye", 100.0, 2),
        ];
        for i in 0..6 {
            orders.push(order(10 + i, 2, &format!("Part {}", i), 1.0 + i as f64, 3));
        }

        let report = build_report(&orders, &stations);
        assert_eq!(report.total_expense, 421.0);
        assert_eq!(report.stations[0].duty_station, "Addis");
        assert_eq!(report.stations[0].pct, round2(300.0 / 421.0 * 100.0));
        assert_eq!(
            report.trend.iter().map(|t| t.month.as_str()).collect::<Vec<_>>(),
            vec!["2024-01", "2024-02", "2024-03"]
        );

        let hawassa: Vec<&TopItem> = report
            .top_items
            .iter()
            .filter(|t| t.duty_station == "Hawassa")
            .collect();
        assert_eq!(hawassa.len(), 5);
        assert_eq!(hawassa[0].description, "Dye");
    }

    #[test]
    fn empty_selection_gives_empty_report() {
        let report = build_report(&[], &HashMap::new());
        assert_eq!(report.total_expense, 0.0);
        assert!(report.stations.is_empty());
    }

    #[test]
    fn categories_are_checked() {
        assert!(check_category("Spare Parts").is_ok());
        assert!(check_category("Snacks").is_err());
    }
}
