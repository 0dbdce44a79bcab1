//! Actual-versus-planned sales per period bucket.

use crate::{
    db::DbPool,
    entities::{product, product_plan, sale},
    errors::ServiceError,
    services::exports::{money, CsvExport},
    services::periods::{percentage, report_bucket_key, report_buckets, round2, PeriodKind},
};
use chrono::{Datelike, NaiveDate, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use strum::IntoEnumIterator;
use tracing::instrument;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReportRow {
    pub product: String,
    pub sale_type: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub actual_quantity: f64,
    pub actual_value: f64,
    pub planned_quantity: f64,
    pub planned_value: f64,
    pub quantity_pct: f64,
    pub value_pct: f64,
    pub product_share: f64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct BucketTotals {
    pub actual_quantity: f64,
    pub actual_value: f64,
    pub planned_quantity: f64,
    pub planned_value: f64,
    pub quantity_pct: f64,
    pub value_pct: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Chart {
    pub labels: Vec<String>,
    /// `{product}_{sale type}` to one value per label
    pub actual_sales: BTreeMap<String, Vec<f64>>,
    /// Same keys as `actual_sales`
    pub planned_sales: BTreeMap<String, Vec<f64>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PeriodReport {
    pub rows: Vec<ReportRow>,
    pub totals: BTreeMap<String, BucketTotals>,
    pub chart: Chart,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub periods: BTreeMap<String, PeriodReport>,
}

/// Resolve the optional range, defaulting to 1 January of this year through today
pub fn report_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(NaiveDate, NaiveDate), ServiceError> {
    let today = Utc::now().date_naive();
    let start = start.unwrap_or_else(|| {
        NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today)
    });
    let end = end.unwrap_or(today);
    if end < start {
        return Err(ServiceError::ValidationError(
            "End date must not be before start date".into(),
        ));
    }
    Ok((start, end))
}

/// Build one period's rows, totals and chart from the loaded sales and plans
pub fn build_period(
    kind: PeriodKind,
    start: NaiveDate,
    end: NaiveDate,
    sales: &[sale::Model],
    plans: &[product_plan::Model],
    product_names: &HashMap<i32, String>,
) -> PeriodReport {
    let mut report = PeriodReport::default();
    let buckets = report_buckets(kind, start, end);

    for (index, &(bucket_start, bucket_end)) in buckets.iter().enumerate() {
        report
            .chart
            .labels
            .push(bucket_start.format("%Y-%m-%d").to_string());

        let mut groups: BTreeMap<(i32, &str), (f64, f64)> = BTreeMap::new();
        for s in sales
            .iter()
            .filter(|s| s.sale_date >= bucket_start && s.sale_date <= bucket_end)
        {
            let entry = groups
                .entry((s.product_id, s.sale_type.as_str()))
                .or_default();
            entry.0 += s.quantity;
            entry.1 += s.total_price;
        }
        // Buckets without sales still get a zeroed totals entry
        let bucket_value: f64 = groups.values().map(|(_, v)| v).sum();
        let totals = report
            .totals
            .entry(report_bucket_key(kind, bucket_start))
            .or_default();

        for ((product_id, sale_type), (quantity, value)) in groups {
            let product = product_names
                .get(&product_id)
                .cloned()
                .unwrap_or_else(|| format!("Product {}", product_id));
            let plan = plans
                .iter()
                .find(|p| p.product_id == product_id && p.overlaps(bucket_start, bucket_end));
            let (planned_quantity, planned_value) = plan
                .map(|p| (p.planned_quantity, p.planned_value))
                .unwrap_or_default();

            totals.actual_quantity += quantity;
            totals.actual_value += value;
            totals.planned_quantity += planned_quantity;
            totals.planned_value += planned_value;

            let key = format!("{}_{}", product, sale_type);
            report
                .chart
                .actual_sales
                .entry(key.clone())
                .or_insert_with(|| vec![0.0; buckets.len()])[index] += round2(value);
            report
                .chart
                .planned_sales
                .entry(key)
                .or_insert_with(|| vec![0.0; buckets.len()])[index] += planned_value;

            report.rows.push(ReportRow {
                product,
                sale_type: sale_type.to_string(),
                start: bucket_start,
                end: bucket_end,
                actual_quantity: quantity,
                actual_value: round2(value),
                planned_quantity,
                planned_value,
                quantity_pct: round2(percentage(quantity, planned_quantity)),
                value_pct: round2(percentage(value, planned_value)),
                product_share: round2(percentage(value, bucket_value)),
            });
        }
    }

    for totals in report.totals.values_mut() {
        totals.quantity_pct = round2(percentage(totals.actual_quantity, totals.planned_quantity));
        totals.value_pct = round2(percentage(totals.actual_value, totals.planned_value));
    }
    report
}

#[derive(Clone)]
pub struct SalesReportService {
    db_pool: Arc<DbPool>,
}

impl SalesReportService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    async fn load(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(Vec<sale::Model>, Vec<product_plan::Model>, HashMap<i32, String>), ServiceError> {
        let db = &*self.db_pool;
        let sales = sale::Entity::find()
            .filter(sale::Column::SaleDate.gte(start))
            .filter(sale::Column::SaleDate.lte(end))
            .order_by_asc(sale::Column::SaleDate)
            .all(db)
            .await?;
        let plans = product_plan::Entity::find()
            .filter(product_plan::Column::StartDate.lte(end))
            .filter(product_plan::Column::EndDate.gte(start))
            .order_by_asc(product_plan::Column::StartDate)
            .order_by_asc(product_plan::Column::Id)
            .all(db)
            .await?;
        let names = product::Entity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();
        Ok((sales, plans, names))
    }

    #[instrument(skip(self))]
    pub async fn report(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<SalesReport, ServiceError> {
        let (start, end) = report_range(start, end)?;
        let (sales, plans, names) = self.load(start, end).await?;
        let periods = PeriodKind::iter()
            .map(|kind| {
                (
                    kind.to_string(),
                    build_period(kind, start, end, &sales, &plans, &names),
                )
            })
            .collect();
        Ok(SalesReport {
            start,
            end,
            periods,
        })
    }

    #[instrument(skip(self))]
    pub async fn export(
        &self,
        period: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<CsvExport, ServiceError> {
        let kind: PeriodKind = period
            .parse()
            .map_err(|_| ServiceError::ValidationError(format!("Unknown period: {}", period)))?;
        let (start, end) = report_range(start, end)?;
        let (sales, plans, names) = self.load(start, end).await?;
        let report = build_period(kind, start, end, &sales, &plans, &names);

        let rows = report.rows.into_iter().map(|r| {
            vec![
                r.product,
                r.sale_type,
                r.start.to_string(),
                r.end.to_string(),
                r.actual_quantity.to_string(),
                money(r.actual_value),
                r.planned_quantity.to_string(),
                money(r.planned_value),
                money(r.quantity_pct),
                money(r.value_pct),
                money(r.product_share),
            ]
        });
        CsvExport::build(
            format!("sales_report_{}.csv", kind),
            &[
                "Product",
                "Sale Type",
                "Start Date",
                "End Date",
                "Actual Quantity",
                "Actual Value",
                "Planned Quantity",
                "Planned Value",
                "Quantity %",
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

    fn sale(id: i32, product_id: i32, date: NaiveDate, qty: f64, value: f64, kind: &str) -> sale::Model {
        sale::Model {
            id,
            product_id,
            order_id: None,
            sale_date: date,
            quantity: qty,
            total_price: value,
            sale_type: kind.to_string(),
            amount: value,
        }
    }

    #[test]
    fn monthly_rows_share_and_zero_filled_series() {
        let names = HashMap::from([(1, "Shirt".to_string()), (2, "Yarn".to_string())]);
        let sales = vec![
            sale(1, 1, d(1, 5), 10.0, 300.0, "Direct"),
            sale(2, 2, d(1, 20), 5.0, 100.0, "Service"),
            sale(3, 1, d(2, 2), 4.0, 120.0, "Direct"),
        ];
        let now = Utc::now();
        let plans = vec![product_plan::Model {
            id: 1,
            product_id: 1,
            plan_type: "production".into(),
            start_date: d(1, 1),
            end_date: d(1, 31),
            planned_quantity: 20.0,
            planned_value: 600.0,
            actual_quantity: 0.0,
            actual_value: 0.0,
            created_at: now,
            updated_at: now,
        }];

        let report = build_period(PeriodKind::Monthly, d(1, 1), d(2, 15), &sales, &plans, &names);

        assert_eq!(report.chart.labels, vec!["2024-01-01", "2024-02-01"]);
        assert_eq!(report.chart.actual_sales["Shirt_Direct"], vec![300.0, 120.0]);
        assert_eq!(report.chart.actual_sales["Yarn_Service"], vec![100.0, 0.0]);
        assert_eq!(report.chart.planned_sales["Shirt_Direct"], vec![600.0, 0.0]);
        assert_eq!(report.chart.planned_sales["Yarn_Service"], vec![0.0, 0.0]);

        let shirt_jan = report
            .rows
            .iter()
            .find(|r| r.product == "Shirt" && r.start == d(1, 1))
            .unwrap();
        assert_eq!(shirt_jan.value_pct, 50.0);
        assert_eq!(shirt_jan.product_share, 75.0);

        let feb = &report.totals["2024-02"];
        assert_eq!(feb.planned_value, 0.0);
        assert_eq!(feb.value_pct, 0.0);
        assert_eq!(report.rows.iter().find(|r| r.start == d(2, 1)).unwrap().end, d(2, 15));
    }

    #[test]
    fn quiet_buckets_still_report_zero_totals() {
        let names = HashMap::from([(1, "Shirt".to_string())]);
        let sales = vec![sale(1, 1, d(3, 4), 2.0, 60.0, "Direct")];

        let report = build_period(PeriodKind::Monthly, d(1, 1), d(3, 31), &sales, &[], &names);

        assert_eq!(report.chart.labels.len(), 3);
        assert_eq!(report.totals.len(), 3);
        assert_eq!(report.totals["2024-01"], BucketTotals::default());
        assert_eq!(report.totals["2024-02"], BucketTotals::default());
        assert_eq!(report.totals["2024-03"].actual_value, 60.0);
        assert_eq!(report.chart.actual_sales["Shirt_Direct"], vec![0.0, 0.0, 60.0]);
        assert_eq!(report.chart.planned_sales["Shirt_Direct"], vec![0.0, 0.0, 0.0]);
        assert_eq!(report.rows.len(), 1);
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(report_range(Some(d(3, 1)), Some(d(2, 1))).is_err());
        assert!(report_range(Some(d(1, 1)), Some(d(1, 1))).is_ok());
    }
}
