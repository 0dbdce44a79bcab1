use crate::{
    db::DbPool,
    entities::{customer, plan_change_log, product, product_config, product_plan, sale, sales_record},
    errors::ServiceError,
    services::exports::{money, CsvExport},
    services::periods::{percentage, period_key, round2, PeriodKind},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use strum::IntoEnumIterator;
use tracing::{info, instrument};

/// Product facts the planning views need
#[derive(Debug, Clone, Serialize)]
pub struct PlanningProduct {
    pub id: i32,
    pub name: String,
    pub product_type: String,
    pub customer_name: String,
    pub selling_price: f64,
    pub supports_direct_sales: bool,
    pub supports_service_sales: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct PlanTotals {
    pub planned_quantity: f64,
    pub actual_quantity: f64,
    pub planned_value: f64,
    pub actual_value: f64,
    pub quantity_pct: f64,
    pub value_pct: f64,
}

impl PlanTotals {
    fn add(&mut self, planned_quantity: f64, planned_value: f64, actual_quantity: f64, actual_value: f64) {
        self.planned_quantity += planned_quantity;
        self.planned_value += planned_value;
        self.actual_quantity += actual_quantity;
        self.actual_value += actual_value;
    }

    fn finish(mut self) -> Self {
        self.quantity_pct = round2(percentage(self.actual_quantity, self.planned_quantity));
        self.value_pct = round2(percentage(self.actual_value, self.planned_value));
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanRow {
    pub id: i32,
    pub product_id: i32,
    pub plan_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub planned_quantity: f64,
    pub planned_value: f64,
    pub customer_name: String,
    pub product_name: String,
    pub actual_quantity: f64,
    pub actual_value: f64,
    pub quantity_pct: f64,
    pub value_pct: f64,
    pub product_share: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanGroup {
    pub plans: Vec<PlanRow>,
    pub totals: PlanTotals,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanChart {
    pub labels: Vec<String>,
    pub sales: BTreeMap<String, Vec<f64>>,
    pub quantities: BTreeMap<String, Vec<f64>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PeriodOverview {
    pub groups: BTreeMap<String, PlanGroup>,
    pub totals: PlanTotals,
    pub chart: PlanChart,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanningSummary {
    pub direct: PlanTotals,
    pub service: PlanTotals,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ParetoEntry {
    pub product: String,
    pub value: f64,
    pub cumulative_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanningOverview {
    pub periods: BTreeMap<String, PeriodOverview>,
    pub summary: PlanningSummary,
    pub pareto: Vec<ParetoEntry>,
}

/// Everything the overview, summary and pareto views are computed from
#[derive(Debug, Clone, Default)]
pub struct PlanningData {
    pub plans: Vec<product_plan::Model>,
    pub products: HashMap<i32, PlanningProduct>,
    pub sales: Vec<sale::Model>,
}

impl PlanningData {
    fn is_direct(&self, product_id: i32) -> bool {
        self.products
            .get(&product_id)
            .map_or(true, |p| p.supports_direct_sales)
    }

    fn is_service(&self, product_id: i32) -> bool {
        self.products
            .get(&product_id)
            .map_or(false, |p| p.supports_service_sales)
    }

    fn product_sales(&self, product_id: i32) -> impl Iterator<Item = &sale::Model> {
        self.sales.iter().filter(move |s| s.product_id == product_id)
    }

    fn actuals_between(&self, product_id: i32, start: NaiveDate, end: NaiveDate) -> (f64, f64) {
        self.product_sales(product_id)
            .filter(|s| s.sale_date >= start && s.sale_date <= end)
            .fold((0.0, 0.0), |(q, v), s| (q + s.quantity, v + s.total_price))
    }

    fn all_actuals(&self, product_id: i32) -> (f64, f64) {
        self.product_sales(product_id)
            .fold((0.0, 0.0), |(q, v), s| (q + s.quantity, v + s.total_price))
    }

    fn plan_row(&self, plan: &product_plan::Model) -> PlanRow {
        let (actual_quantity, actual_value) =
            self.actuals_between(plan.product_id, plan.start_date, plan.end_date);
        let product = self.products.get(&plan.product_id);
        PlanRow {
            id: plan.id,
            product_id: plan.product_id,
            plan_type: plan.plan_type.clone(),
            start_date: plan.start_date,
            end_date: plan.end_date,
            planned_quantity: plan.planned_quantity,
            planned_value: plan.planned_value,
            customer_name: product.map_or_else(|| "N/A".to_string(), |p| p.customer_name.clone()),
            product_name: product.map_or_else(String::new, |p| p.name.clone()),
            actual_quantity,
            actual_value,
            quantity_pct: round2(percentage(actual_quantity, plan.planned_quantity)),
            value_pct: round2(percentage(actual_value, plan.planned_value)),
            product_share: 0.0,
        }
    }

    /// Group plans by period key. `service` selects service-sales plans keyed annually.
    pub fn aggregate(&self, kind: PeriodKind, service: bool) -> PeriodOverview {
        let mut overview = PeriodOverview::default();
        let mut totals = PlanTotals::default();

        for plan in &self.plans {
            let included = if service {
                self.is_service(plan.product_id)
            } else {
                self.is_direct(plan.product_id)
            };
            if !included {
                continue;
            }
            let row = self.plan_row(plan);
            let group = overview
                .groups
                .entry(period_key(kind, plan.start_date))
                .or_default();
            group.totals.add(
                row.planned_quantity,
                row.planned_value,
                row.actual_quantity,
                row.actual_value,
            );
            totals.add(
                row.planned_quantity,
                row.planned_value,
                row.actual_quantity,
                row.actual_value,
            );
            group.plans.push(row);
        }

        let labels: Vec<String> = overview.groups.keys().cloned().collect();
        for (index, group) in overview.groups.values_mut().enumerate() {
            let group_value = group.totals.actual_value;
            for row in &mut group.plans {
                row.product_share = round2(percentage(row.actual_value, group_value));
                overview
                    .chart
                    .sales
                    .entry(row.product_name.clone())
                    .or_insert_with(|| vec![0.0; labels.len()])[index] += row.actual_value;
                overview
                    .chart
                    .quantities
                    .entry(row.product_name.clone())
                    .or_insert_with(|| vec![0.0; labels.len()])[index] += row.actual_quantity;
            }
            group.totals = group.totals.finish();
        }
        overview.chart.labels = labels;
        overview.totals = totals.finish();
        overview
    }

    pub fn periods(&self) -> BTreeMap<String, PeriodOverview> {
        let mut periods: BTreeMap<String, PeriodOverview> = PeriodKind::iter()
            .map(|kind| (kind.to_string(), self.aggregate(kind, false)))
            .collect();
        periods.insert("service".into(), self.aggregate(PeriodKind::Annual, true));
        periods
    }

    /// Planned figures of each category's plans against all sales of their products.
    /// A product with several plans contributes its sales once per plan.
    pub fn summary(&self) -> PlanningSummary {
        let category = |in_category: &dyn Fn(i32) -> bool| {
            let mut totals = PlanTotals::default();
            for plan in self.plans.iter().filter(|p| in_category(p.product_id)) {
                let (aq, av) = self.all_actuals(plan.product_id);
                totals.add(plan.planned_quantity, plan.planned_value, aq, av);
            }
            totals.finish()
        };
        PlanningSummary {
            direct: category(&|id| self.is_direct(id)),
            service: category(&|id| self.is_service(id)),
        }
    }

    pub fn pareto(&self) -> Vec<ParetoEntry> {
        let mut entries: Vec<(String, f64)> = self
            .plans
            .iter()
            .map(|plan| {
                let name = self
                    .products
                    .get(&plan.product_id)
                    .map_or_else(String::new, |p| p.name.clone());
                (name, self.all_actuals(plan.product_id).1)
            })
            .collect();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1));

        let grand_total: f64 = entries.iter().map(|(_, v)| v).sum();
        let mut running = 0.0;
        entries
            .into_iter()
            .map(|(product, value)| {
                running += value;
                ParetoEntry {
                    product,
                    value,
                    cumulative_pct: round2(percentage(running, grand_total)),
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanRowInput {
    pub product_id: i32,
    pub plan_type: Option<String>,
    #[serde(default)]
    pub daily: BTreeMap<NaiveDate, f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPlans {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rows: Vec<PlanRowInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanUpdate {
    pub planned_quantity: f64,
    pub planned_value: f64,
}

/// Sum of the daily quantities falling inside `[start, end]`
pub fn planned_quantity(daily: &BTreeMap<NaiveDate, f64>, start: NaiveDate, end: NaiveDate) -> f64 {
    daily.range(start..=end).map(|(_, qty)| qty).sum()
}

#[derive(Clone)]
pub struct PlanningService {
    db_pool: Arc<DbPool>,
}

impl PlanningService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn products(&self) -> Result<Vec<PlanningProduct>, ServiceError> {
        let db = &*self.db_pool;
        let products = product::Entity::find()
            .order_by_asc(product::Column::Name)
            .all(db)
            .await?;
        let configs: HashMap<i32, product_config::Model> = product_config::Entity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|c| (c.product_id, c))
            .collect();
        let customers: HashMap<i32, String> = customer::Entity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();

        Ok(products
            .into_iter()
            .map(|p| {
                let config = configs.get(&p.id);
                let customer_name = p
                    .customer_id
                    .and_then(|id| customers.get(&id).cloned())
                    .or(p.customer_name)
                    .unwrap_or_else(|| "N/A".to_string());
                PlanningProduct {
                    id: p.id,
                    name: p.name,
                    product_type: p.product_type,
                    customer_name,
                    selling_price: p.selling_price,
                    supports_direct_sales: config.map_or(true, |c| c.supports_direct_sales),
                    supports_service_sales: config.map_or(false, |c| c.supports_service_sales),
                }
            })
            .collect())
    }

    async fn load(&self) -> Result<PlanningData, ServiceError> {
        let db = &*self.db_pool;
        let plans = product_plan::Entity::find()
            .order_by_asc(product_plan::Column::StartDate)
            .order_by_asc(product_plan::Column::Id)
            .all(db)
            .await?;
        let sales = sale::Entity::find().all(db).await?;
        let products = self
            .products()
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        Ok(PlanningData {
            plans,
            products,
            sales,
        })
    }

    #[instrument(skip(self))]
    pub async fn overview(&self) -> Result<PlanningOverview, ServiceError> {
        let data = self.load().await?;
        Ok(PlanningOverview {
            periods: data.periods(),
            summary: data.summary(),
            pareto: data.pareto(),
        })
    }

    #[instrument(skip(self))]
    pub async fn summary(&self) -> Result<PlanningSummary, ServiceError> {
        Ok(self.load().await?.summary())
    }

    #[instrument(skip(self))]
    pub async fn pareto(&self) -> Result<Vec<ParetoEntry>, ServiceError> {
        Ok(self.load().await?.pareto())
    }

    #[instrument(skip(self, input), fields(rows = input.rows.len()))]
    pub async fn create_plan(&self, input: NewPlans) -> Result<Vec<product_plan::Model>, ServiceError> {
        if input.start_date > input.end_date {
            return Err(ServiceError::ValidationError(
                "Start date must not be after end date".into(),
            ));
        }

        let txn = self.db_pool.begin().await?;
        let now = Utc::now();
        let mut created = Vec::new();

        for row in input.rows {
            let product = product::Entity::find_by_id(row.product_id)
                .one(&txn)
                .await?
                .ok_or_else(|| ServiceError::not_found("Product", row.product_id))?;
            let quantity = planned_quantity(&row.daily, input.start_date, input.end_date);
            if quantity <= 0.0 {
                continue;
            }
            let value = round2(quantity * product.selling_price);

            let plan = product_plan::ActiveModel {
                product_id: Set(product.id),
                plan_type: Set(row.plan_type.unwrap_or_else(|| "production".to_string())),
                start_date: Set(input.start_date),
                end_date: Set(input.end_date),
                planned_quantity: Set(quantity),
                planned_value: Set(value),
                actual_quantity: Set(0.0),
                actual_value: Set(0.0),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            sales_record::ActiveModel {
                product_id: Set(product.id),
                quantity: Set(quantity),
                value: Set(value),
                sale_date: Set(input.start_date),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            created.push(plan);
        }

        if created.is_empty() {
            return Err(ServiceError::ValidationError(
                "No plan rows with a positive quantity".into(),
            ));
        }
        txn.commit().await?;
        info!(count = created.len(), "plans created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn update_plan(
        &self,
        id: i32,
        update: PlanUpdate,
        user_id: i32,
    ) -> Result<product_plan::Model, ServiceError> {
        if update.planned_quantity < 0.0 || update.planned_value < 0.0 {
            return Err(ServiceError::ValidationError(
                "Planned figures must not be negative".into(),
            ));
        }
        let txn = self.db_pool.begin().await?;
        let plan = product_plan::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Plan", id))?;

        let description = format!(
            "Planned quantity {} -> {}, planned value {} -> {}",
            plan.planned_quantity, update.planned_quantity, plan.planned_value, update.planned_value
        );
        let old_value = plan.planned_value;

        let mut active = plan.into_active_model();
        active.planned_quantity = Set(update.planned_quantity);
        active.planned_value = Set(update.planned_value);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        plan_change_log::ActiveModel {
            plan_id: Set(id),
            user_id: Set(Some(user_id)),
            old_value: Set(old_value),
            new_value: Set(update.planned_value),
            change_description: Set(description),
            change_date: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        info!(plan_id = id, user_id, "plan updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_plan(&self, id: i32) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        product_plan::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Plan", id))?;
        plan_change_log::Entity::delete_many()
            .filter(plan_change_log::Column::PlanId.eq(id))
            .exec(&txn)
            .await?;
        product_plan::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        info!(plan_id = id, "plan deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn change_log(&self, id: i32) -> Result<Vec<plan_change_log::Model>, ServiceError> {
        let db = &*self.db_pool;
        product_plan::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Plan", id))?;
        Ok(plan_change_log::Entity::find()
            .filter(plan_change_log::Column::PlanId.eq(id))
            .order_by_desc(plan_change_log::Column::ChangeDate)
            .order_by_desc(plan_change_log::Column::Id)
            .all(db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn export(&self, period: &str) -> Result<CsvExport, ServiceError> {
        let data = self.load().await?;

        if period == "summary" {
            let summary = data.summary();
            let row = |label: &str, t: PlanTotals| {
                vec![
                    label.to_string(),
                    t.planned_quantity.to_string(),
                    t.actual_quantity.to_string(),
                    money(t.quantity_pct),
                    money(t.planned_value),
                    money(t.actual_value),
                    money(t.value_pct),
                ]
            };
            return CsvExport::build(
                "planning_summary.csv",
                &[
                    "Category",
                    "Planned Quantity",
                    "Actual Quantity",
                    "Quantity %",
                    "Planned Value",
                    "Actual Value",
                    "Value %",
                ],
                vec![
                    row("Direct Sales", summary.direct),
                    row("Service Sales", summary.service),
                ],
            );
        }

        let overview = if period == "service" {
            data.aggregate(PeriodKind::Annual, true)
        } else {
            let kind: PeriodKind = period
                .parse()
                .map_err(|_| ServiceError::ValidationError(format!("Unknown period: {}", period)))?;
            data.aggregate(kind, false)
        };

        let mut rows = Vec::new();
        for (key, group) in overview.groups {
            for p in group.plans {
                rows.push(vec![
                    p.customer_name,
                    p.product_name,
                    p.start_date.to_string(),
                    p.end_date.to_string(),
                    p.planned_quantity.to_string(),
                    p.actual_quantity.to_string(),
                    money(p.quantity_pct),
                    money(p.planned_value),
                    money(p.actual_value),
                    money(p.value_pct),
                    money(p.product_share),
                ]);
            }
            let t = group.totals;
            rows.push(vec![
                "Total".to_string(),
                key,
                String::new(),
                String::new(),
                t.planned_quantity.to_string(),
                t.actual_quantity.to_string(),
                money(t.quantity_pct),
                money(t.planned_value),
                money(t.actual_value),
                money(t.value_pct),
                money(100.0),
            ]);
        }

        CsvExport::build(
            format!("planning_{}.csv", period),
            &[
                "Customer",
                "Product",
                "Start Date",
                "End Date",
                "Planned Quantity",
                "Actual Quantity",
                "Quantity %",
                "Planned Value",
                "Actual Value",
                "Value %",
                "Product Share %",
            ],
            rows,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn product(id: i32, name: &str, direct: bool, service: bool) -> (i32, PlanningProduct) {
        (
            id,
            PlanningProduct {
                id,
                name: name.into(),
                product_type: "Garment".into(),
                customer_name: "N/A".into(),
                selling_price: 10.0,
                supports_direct_sales: direct,
                supports_service_sales: service,
            },
        )
    }

    fn plan(id: i32, product_id: i32, start: NaiveDate, end: NaiveDate, qty: f64) -> product_plan::Model {
        let now = Utc::now();
        product_plan::Model {
            id,
            product_id,
            plan_type: "production".into(),
            start_date: start,
            end_date: end,
            planned_quantity: qty,
            planned_value: qty * 10.0,
            actual_quantity: 0.0,
            actual_value: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    fn sale(id: i32, product_id: i32, date: NaiveDate, qty: f64) -> sale::Model {
        sale::Model {
            id,
            product_id,
            order_id: None,
            sale_date: date,
            quantity: qty,
            total_price: qty * 10.0,
            sale_type: "Direct".into(),
            amount: qty * 10.0,
        }
    }

    fn data() -> PlanningData {
        PlanningData {
            plans: vec![
                plan(1, 1, d(1, 1), d(1, 31), 100.0),
                plan(2, 2, d(1, 10), d(1, 20), 50.0),
                plan(3, 3, d(4, 1), d(4, 30), 10.0),
            ],
            products: HashMap::from([
                product(1, "Shirt", true, false),
                product(2, "Yarn", true, true),
                product(3, "Dyeing", false, true),
            ]),
            sales: vec![
                sale(1, 1, d(1, 5), 30.0),
                sale(2, 1, d(2, 5), 5.0),
                sale(3, 2, d(1, 12), 10.0),
                sale(4, 3, d(4, 2), 10.0),
            ],
        }
    }

    #[test]
    fn monthly_groups_split_share_within_group() {
        let overview = data().aggregate(PeriodKind::Monthly, false);
        assert_eq!(overview.chart.labels, vec!["2024-01"]);

        let jan = &overview.groups["2024-01"];
        assert_eq!(jan.plans.len(), 2);
        let shirt = jan.plans.iter().find(|p| p.product_id == 1).unwrap();
        assert_eq!(shirt.actual_quantity, 30.0);
        assert_eq!(shirt.quantity_pct, 30.0);
        assert_eq!(shirt.product_share, 75.0);
        assert_eq!(jan.totals.planned_quantity, 150.0);
        assert_eq!(overview.chart.sales["Shirt"], vec![300.0]);
    }

    #[test]
    fn service_period_only_keeps_service_products() {
        let overview = data().aggregate(PeriodKind::Annual, true);
        let plans = &overview.groups["2024"].plans;
        let ids: Vec<i32> = plans.iter().map(|p| p.product_id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn summary_counts_all_sales_of_plan_products() {
        let summary = data().summary();
        assert_eq!(summary.direct.planned_quantity, 150.0);
        assert_eq!(summary.direct.actual_quantity, 45.0);
        assert_eq!(summary.service.actual_quantity, 20.0);
        assert_eq!(summary.service.quantity_pct, round2(20.0 / 60.0 * 100.0));
    }

    #[test]
    fn repeated_plans_count_their_product_sales_each_time() {
        let data = PlanningData {
            plans: vec![
                plan(1, 1, d(1, 1), d(1, 31), 10.0),
                plan(2, 1, d(2, 1), d(2, 29), 10.0),
            ],
            products: HashMap::from([product(1, "Shirt", true, false)]),
            sales: vec![sale(1, 1, d(1, 5), 4.0)],
        };
        let summary = data.summary();
        assert_eq!(summary.direct.planned_quantity, 20.0);
        assert_eq!(summary.direct.actual_quantity, 8.0);
        assert_eq!(summary.direct.actual_value, 80.0);
    }

    #[test]
    fn pareto_is_descending_with_cumulative_share() {
        let pareto = data().pareto();
        assert_eq!(pareto[0].product, "Shirt");
        assert_eq!(pareto[0].value, 350.0);
        assert_eq!(pareto.last().unwrap().cumulative_pct, 100.0);

        let empty = PlanningData {
            plans: vec![plan(1, 9, d(1, 1), d(1, 2), 1.0)],
            ..Default::default()
        };
        assert_eq!(empty.pareto()[0].cumulative_pct, 0.0);
    }

    #[test]
    fn daily_entries_outside_range_are_ignored() {
        let daily = BTreeMap::from([(d(1, 1), 5.0), (d(1, 3), 2.5), (d(2, 1), 100.0)]);
        assert_eq!(planned_quantity(&daily, d(1, 1), d(1, 31)), 7.5);
    }
}
