use crate::{
    db::DbPool,
    entities::{customer, employee, order, product, sale},
    errors::ServiceError,
    services::duty_stations::station_names,
    services::periods::{previous_month, round2},
};
use chrono::{Datelike, NaiveDate, Utc};
use futures::{try_join, TryFutureExt};
use sea_orm::{EntityTrait, PaginatorTrait};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct RevenueWindows {
    pub current_month: f64,
    pub previous_month: f64,
    pub current_year: f64,
    pub previous_year: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TopProduct {
    pub product_id: i32,
    pub name: String,
    pub total_revenue: f64,
    pub total_quantity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub customer_count: u64,
    pub order_count: u64,
    pub revenue: RevenueWindows,
    pub formatted_revenue: BTreeMap<String, String>,
    pub top_product: Option<TopProduct>,
    pub employees_per_station: BTreeMap<String, u64>,
}

/// `ETB 1,234.50`
pub fn format_money(currency: &str, amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{} {}{}.{}", currency, sign, grouped, cents)
}

pub fn revenue_windows(today: NaiveDate, sales: &[sale::Model]) -> RevenueWindows {
    let (year, month) = (today.year(), today.month());
    let (prev_year, prev_month) = previous_month(year, month);
    let mut windows = RevenueWindows::default();
    for s in sales {
        let (y, m) = (s.sale_date.year(), s.sale_date.month());
        if y == year {
            windows.current_year += s.amount;
            if m == month {
                windows.current_month += s.amount;
            }
        } else if y == year - 1 {
            windows.previous_year += s.amount;
        }
        if y == prev_year && m == prev_month {
            windows.previous_month += s.amount;
        }
    }
    windows.current_month = round2(windows.current_month);
    windows.previous_month = round2(windows.previous_month);
    windows.current_year = round2(windows.current_year);
    windows.previous_year = round2(windows.previous_year);
    windows
}

/// Product with the highest sale amount; ties resolve to the lower id
pub fn top_product(sales: &[sale::Model], names: &HashMap<i32, String>) -> Option<TopProduct> {
    let mut totals: BTreeMap<i32, (f64, f64)> = BTreeMap::new();
    for s in sales {
        let entry = totals.entry(s.product_id).or_default();
        entry.0 += s.amount;
        entry.1 += s.quantity;
    }
    totals
        .into_iter()
        .fold(None, |best: Option<(i32, f64, f64)>, (id, (revenue, qty))| match best {
            Some((_, top, _)) if top >= revenue => best,
            _ => Some((id, revenue, qty)),
        })
        .map(|(product_id, revenue, quantity)| TopProduct {
            product_id,
            name: names
                .get(&product_id)
                .cloned()
                .unwrap_or_else(|| "N/A".to_string()),
            total_revenue: round2(revenue),
            total_quantity: quantity,
        })
}

#[derive(Clone)]
pub struct DashboardService {
    db_pool: Arc<DbPool>,
    currency: String,
}

impl DashboardService {
    pub fn new(db_pool: Arc<DbPool>, currency: impl Into<String>) -> Self {
        Self {
            db_pool,
            currency: currency.into(),
        }
    }

    #[instrument(skip(self))]
    pub async fn summary(&self) -> Result<Dashboard, ServiceError> {
        let db = &*self.db_pool;
        let (customer_count, order_count, sales, products, employees, stations) = try_join!(
            customer::Entity::find().count(db).err_into::<ServiceError>(),
            order::Entity::find().count(db).err_into::<ServiceError>(),
            sale::Entity::find().all(db).err_into::<ServiceError>(),
            product::Entity::find().all(db).err_into::<ServiceError>(),
            employee::Entity::find().all(db).err_into::<ServiceError>(),
            station_names(db),
        )?;
        let names: HashMap<i32, String> = products.into_iter().map(|p| (p.id, p.name)).collect();

        let revenue = revenue_windows(Utc::now().date_naive(), &sales);
        let formatted_revenue = BTreeMap::from([
            ("current_month".to_string(), format_money(&self.currency, revenue.current_month)),
            ("previous_month".to_string(), format_money(&self.currency, revenue.previous_month)),
            ("current_year".to_string(), format_money(&self.currency, revenue.current_year)),
            ("previous_year".to_string(), format_money(&self.currency, revenue.previous_year)),
        ]);

        let mut employees_per_station: BTreeMap<String, u64> = BTreeMap::new();
        for e in employees {
            if let Some(name) = stations.get(&e.duty_station_id) {
                *employees_per_station.entry(name.clone()).or_default() += 1;
            }
        }

        Ok(Dashboard {
            customer_count,
            order_count,
            top_product: top_product(&sales, &names),
            revenue,
            formatted_revenue,
            employees_per_station,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sale(id: i32, product_id: i32, date: NaiveDate, amount: f64) -> sale::Model {
        sale::Model {
            id,
            product_id,
            order_id: None,
            sale_date: date,
            quantity: 2.0,
            total_price: amount,
            sale_type: "direct".into(),
            amount,
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[rstest]
    #[case(1234.5, "ETB 1,234.50")]
    #[case(0.0, "ETB 0.00")]
    #[case(999.999, "ETB 1,000.00")]
    #[case(1234567.891, "ETB 1,234,567.89")]
    #[case(-2500.0, "ETB -2,500.00")]
    fn money_formatting(#[case] amount: f64, #[case] expected: &str) {
        assert_eq!(format_money("ETB", amount), expected);
    }

    #[test]
    fn january_compares_against_december() {
        let sales = vec![
            sale(1, 1, d(2024, 1, 10), 100.0),
            sale(2, 1, d(2023, 12, 5), 40.0),
            sale(3, 1, d(2023, 6, 5), 60.0),
        ];
        let windows = revenue_windows(d(2024, 1, 20), &sales);
        assert_eq!(windows.current_month, 100.0);
        assert_eq!(windows.previous_month, 40.0);
        assert_eq!(windows.current_year, 100.0);
        assert_eq!(windows.previous_year, 100.0);
    }

    #[test]
    fn top_product_by_revenue() {
        let names = HashMap::from([(1, "Polo".to_string()), (2, "Denim".to_string())]);
        let sales = vec![
            sale(1, 1, d(2024, 1, 1), 100.0),
            sale(2, 2, d(2024, 1, 1), 80.0),
            sale(3, 2, d(2024, 1, 2), 80.0),
        ];
        let top = top_product(&sales, &names).unwrap();
        assert_eq!(top.name, "Denim");
        assert_eq!(top.total_revenue, 160.0);
        assert_eq!(top.total_quantity, 4.0);
        assert!(top_product(&[], &names).is_none());
    }
}
