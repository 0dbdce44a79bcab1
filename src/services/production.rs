use crate::{
    db::DbPool,
    entities::{duty_station, machine, production_config, production_record},
    errors::ServiceError,
    services::duty_stations::station_names,
    services::exports::CsvExport,
    services::periods::{percentage, round2},
};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

pub const PROCESS_TYPES: [&str; 7] = [
    "Spinning", "Knitting", "Dyeing", "Weaving", "Printing", "Garment", "Denim",
];
pub const PERIOD_TYPES: [&str; 5] = ["Daily", "Weekly", "Monthly", "Quarterly", "Semi-Annual"];
pub const UNITS: [&str; 2] = ["Kg", "Pcs"];

/// Planned output of a machine for one period.
///
/// A non-zero manual capacity overrides installed × efficiency × hours × days.
pub fn capacity(machine: &machine::Model, config: &production_config::Model) -> f64 {
    match machine.manual_capacity {
        Some(manual) if manual != 0.0 => manual,
        _ => {
            machine.installed_capacity
                * machine.efficiency_factor
                * config.working_hours
                * config.working_days
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MachineSetup {
    #[validate(length(min = 1))]
    pub name: String,
    pub duty_station_id: i32,
    pub process_type: String,
    #[validate(range(min = 0.0))]
    pub installed_capacity: f64,
    #[serde(default = "default_efficiency")]
    pub efficiency_factor: f64,
    pub manual_capacity: Option<f64>,
    #[serde(default = "default_hours")]
    pub working_hours: f64,
    #[serde(default = "default_days")]
    pub working_days: f64,
}

fn default_efficiency() -> f64 {
    0.8
}

fn default_hours() -> f64 {
    8.0
}

fn default_days() -> f64 {
    25.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProductionRecord {
    pub machine_id: i32,
    pub period_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub actual_quantity: f64,
    pub uom: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductionFilter {
    #[serde(default = "default_period")]
    pub period_type: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

fn default_period() -> String {
    "Monthly".to_string()
}

impl Default for ProductionFilter {
    fn default() -> Self {
        Self {
            period_type: default_period(),
            start: None,
            end: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProcessPerformance {
    pub process_type: String,
    pub plan: f64,
    pub actual: f64,
    pub perf: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PerformanceRow {
    pub factory: String,
    pub cost_center: String,
    pub uom: String,
    pub plan: f64,
    pub actual: f64,
    pub perf: f64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct StationSummary {
    pub plan: f64,
    pub actual: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProductionReport {
    pub period_type: String,
    pub processes: Vec<ProcessPerformance>,
    pub average_performance: f64,
    pub rows: Vec<PerformanceRow>,
    pub factory_contributions: BTreeMap<String, f64>,
    pub stations: BTreeMap<String, StationSummary>,
}

/// Aggregate filtered records against machine capacities
pub fn build_report(
    period_type: &str,
    machines: &[machine::Model],
    configs: &HashMap<i32, production_config::Model>,
    records: &[production_record::Model],
    stations: &HashMap<i32, String>,
) -> ProductionReport {
    let machine_by_id: HashMap<i32, &machine::Model> = machines.iter().map(|m| (m.id, m)).collect();
    let capacity_of = |m: &machine::Model| configs.get(&m.duty_station_id).map(|c| capacity(m, c));
    let station_of = |m: Option<&&machine::Model>| {
        m.and_then(|m| stations.get(&m.duty_station_id).cloned())
            .unwrap_or_else(|| "Unknown".to_string())
    };

    let mut per_process: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    for m in machines {
        let Some(cap) = capacity_of(m) else {
            continue;
        };
        let actual: f64 = records
            .iter()
            .filter(|r| r.machine_id == m.id)
            .map(|r| r.actual_quantity)
            .sum();
        let entry = per_process.entry(m.process_type.as_str()).or_default();
        entry.0 += cap;
        entry.1 += actual;
    }
    for m in machines {
        per_process.entry(m.process_type.as_str()).or_default();
    }
    let processes: Vec<ProcessPerformance> = per_process
        .into_iter()
        .map(|(process_type, (plan, actual))| ProcessPerformance {
            process_type: process_type.to_string(),
            plan: round2(plan),
            actual,
            perf: round2(percentage(actual, plan)),
        })
        .collect();
    let average_performance = if processes.is_empty() {
        0.0
    } else {
        round2(processes.iter().map(|p| p.perf).sum::<f64>() / processes.len() as f64)
    };

    let total_actual: f64 = records.iter().map(|r| r.actual_quantity).sum();
    let mut rows = Vec::with_capacity(records.len());
    let mut contributions: BTreeMap<String, f64> = BTreeMap::new();
    let mut station_summary: BTreeMap<String, StationSummary> = BTreeMap::new();
    for record in records {
        let m = machine_by_id.get(&record.machine_id);
        let factory = station_of(m);
        let plan = m.and_then(|m| capacity_of(*m)).unwrap_or(0.0);
        rows.push(PerformanceRow {
            factory: factory.clone(),
            cost_center: m
                .map(|m| m.process_type.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            uom: record.uom.clone(),
            plan: round2(plan),
            actual: record.actual_quantity,
            perf: (percentage(record.actual_quantity, plan) * 10.0).round() / 10.0,
        });
        *contributions.entry(factory.clone()).or_default() += record.actual_quantity;
        let summary = station_summary.entry(factory).or_default();
        summary.plan += plan;
        summary.actual += record.actual_quantity;
    }
    for share in contributions.values_mut() {
        *share = round2(percentage(*share, total_actual));
    }

    ProductionReport {
        period_type: period_type.to_string(),
        processes,
        average_performance,
        rows,
        factory_contributions: contributions,
        stations: station_summary,
    }
}

#[derive(Clone)]
pub struct ProductionService {
    db_pool: Arc<DbPool>,
}

impl ProductionService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn machines(&self) -> Result<Vec<machine::Model>, ServiceError> {
        Ok(machine::Entity::find()
            .order_by_asc(machine::Column::Name)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn setup_machine(&self, input: MachineSetup) -> Result<machine::Model, ServiceError> {
        input.validate()?;
        if !PROCESS_TYPES.contains(&input.process_type.as_str()) {
            return Err(ServiceError::ValidationError(format!(
                "Unknown process type: {}",
                input.process_type
            )));
        }
        if !(input.efficiency_factor > 0.0 && input.efficiency_factor <= 1.0) {
            return Err(ServiceError::ValidationError(
                "Efficiency factor must be in (0, 1]".into(),
            ));
        }

        let txn = self.db_pool.begin().await?;
        duty_station::Entity::find_by_id(input.duty_station_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Duty station", input.duty_station_id))?;

        let created = machine::ActiveModel {
            name: Set(input.name),
            duty_station_id: Set(input.duty_station_id),
            process_type: Set(input.process_type),
            installed_capacity: Set(input.installed_capacity),
            efficiency_factor: Set(input.efficiency_factor),
            manual_capacity: Set(input.manual_capacity),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let has_config = production_config::Entity::find()
            .filter(production_config::Column::DutyStationId.eq(input.duty_station_id))
            .one(&txn)
            .await?
            .is_some();
        if !has_config {
            production_config::ActiveModel {
                duty_station_id: Set(input.duty_station_id),
                working_hours: Set(input.working_hours),
                working_days: Set(input.working_days),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            info!(station_id = input.duty_station_id, "production config created");
        }

        txn.commit().await?;
        info!(machine_id = created.id, "machine set up");
        Ok(created)
    }

    #[instrument(skip(self, input), fields(machine_id = input.machine_id))]
    pub async fn record_production(
        &self,
        input: NewProductionRecord,
    ) -> Result<production_record::Model, ServiceError> {
        if !PERIOD_TYPES.contains(&input.period_type.as_str()) {
            return Err(ServiceError::ValidationError(format!(
                "Unknown period type: {}",
                input.period_type
            )));
        }
        if !UNITS.contains(&input.uom.as_str()) {
            return Err(ServiceError::ValidationError(format!(
                "Unit must be Kg or Pcs, got {}",
                input.uom
            )));
        }
        if input.start_date > input.end_date {
            return Err(ServiceError::ValidationError(
                "Start date must not be after end date".into(),
            ));
        }
        if input.actual_quantity < 0.0 {
            return Err(ServiceError::ValidationError(
                "Actual quantity must not be negative".into(),
            ));
        }

        let db = &*self.db_pool;
        let machine = machine::Entity::find_by_id(input.machine_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Machine", input.machine_id))?;
        let config = production_config::Entity::find()
            .filter(production_config::Column::DutyStationId.eq(machine.duty_station_id))
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidOperation(
                    "Production configuration not found for the machine's duty station".into(),
                )
            })?;
        let cap = capacity(&machine, &config);
        if cap == 0.0 {
            return Err(ServiceError::InvalidOperation(
                "Machine capacity is zero; check its configuration".into(),
            ));
        }

        let created = production_record::ActiveModel {
            machine_id: Set(machine.id),
            period_type: Set(input.period_type),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            actual_quantity: Set(input.actual_quantity),
            uom: Set(input.uom),
            utilized_capacity: Set(round2(input.actual_quantity / cap * 100.0)),
            ..Default::default()
        }
        .insert(db)
        .await?;
        info!(record_id = created.id, utilized = created.utilized_capacity, "production recorded");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn report(&self, filter: ProductionFilter) -> Result<ProductionReport, ServiceError> {
        let db = &*self.db_pool;
        let mut query = production_record::Entity::find()
            .filter(production_record::Column::PeriodType.eq(filter.period_type.as_str()));
        if let Some(start) = filter.start {
            query = query.filter(production_record::Column::StartDate.gte(start));
        }
        if let Some(end) = filter.end {
            query = query.filter(production_record::Column::EndDate.lte(end));
        }
        let records = query
            .order_by_asc(production_record::Column::StartDate)
            .all(db)
            .await?;
        let machines = self.machines().await?;
        let configs: HashMap<i32, production_config::Model> = production_config::Entity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|c| (c.duty_station_id, c))
            .collect();
        let stations = station_names(db).await?;

        Ok(build_report(
            &filter.period_type,
            &machines,
            &configs,
            &records,
            &stations,
        ))
    }

    #[instrument(skip(self))]
    pub async fn export(&self, filter: ProductionFilter) -> Result<CsvExport, ServiceError> {
        let rows = self.report(filter).await?.rows.into_iter().map(|r| {
            vec![
                r.factory,
                r.cost_center,
                r.uom,
                r.plan.to_string(),
                r.actual.to_string(),
                format!("{:.1}", r.perf),
            ]
        });
        CsvExport::build(
            "production_report.csv",
            &["Factory", "Cost Center", "UoM", "Plan", "Actual", "% Perf"],
            rows,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(id: i32, station: i32, process: &str, manual: Option<f64>) -> machine::Model {
        machine::Model {
            id,
            name: format!("M{}", id),
            duty_station_id: station,
            process_type: process.into(),
            installed_capacity: 10.0,
            efficiency_factor: 0.8,
            manual_capacity: manual,
        }
    }

    fn config(station: i32) -> production_config::Model {
        production_config::Model {
            id: station,
            duty_station_id: station,
            working_hours: 8.0,
            working_days: 25.0,
        }
    }

    fn record(id: i32, machine_id: i32, actual: f64) -> production_record::Model {
        let d = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        production_record::Model {
            id,
            machine_id,
            period_type: "Monthly".into(),
            start_date: d,
            end_date: d,
            actual_quantity: actual,
            uom: "Kg".into(),
            utilized_capacity: 0.0,
        }
    }

    #[test]
    fn manual_capacity_wins_unless_zero() {
        assert_eq!(capacity(&machine(1, 1, "Knitting", None), &config(1)), 1600.0);
        assert_eq!(capacity(&machine(1, 1, "Knitting", Some(500.0)), &config(1)), 500.0);
        assert_eq!(capacity(&machine(1, 1, "Knitting", Some(0.0)), &config(1)), 1600.0);
    }

    #[test]
    fn report_splits_by_process_and_station() {
        let machines = vec![
            machine(1, 1, "Knitting", None),
            machine(2, 2, "Dyeing", Some(1000.0)),
            machine(3, 3, "Weaving", None),
        ];
        let configs = HashMap::from([(1, config(1)), (2, config(2))]);
        let stations = HashMap::from([(1, "Addis".to_string()), (2, "Bahir Dar".to_string())]);
        let records = vec![record(1, 1, 800.0), record(2, 2, 250.0), record(3, 2, 250.0)];

        let report = build_report("Monthly", &machines, &configs, &records, &stations);

        let knitting = report.processes.iter().find(|p| p.process_type == "Knitting").unwrap();
        assert_eq!(knitting.plan, 1600.0);
        assert_eq!(knitting.perf, 50.0);
        let weaving = report.processes.iter().find(|p| p.process_type == "Weaving").unwrap();
        assert_eq!(weaving.plan, 0.0);
        assert_eq!(report.average_performance, round2((50.0 + 50.0 + 0.0) / 3.0));

        assert_eq!(report.rows.len(), 3);
        assert_eq!(report.rows[1].perf, 25.0);
        assert_eq!(report.factory_contributions["Addis"], round2(800.0 / 1300.0 * 100.0));
        assert_eq!(
            report.stations["Bahir Dar"],
            StationSummary {
                plan: 2000.0,
                actual: 500.0
            }
        );
    }
}
