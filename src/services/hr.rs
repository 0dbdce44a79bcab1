use crate::{
    db::DbPool,
    entities::{duty_station, employee, employee_period},
    errors::ServiceError,
    services::duty_stations::station_names,
    services::exports::{money, opt_string, CsvExport},
    services::periods::{month_start, previous_month, round2},
    services::uploads::{UploadStore, CV_EXTENSIONS, IMAGE_EXTENSIONS},
};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{info, instrument};
use validator::Validate;

pub const EMPLOYEE_PHOTO_AREA: &str = "employee_photos";
pub const EMPLOYEE_CV_AREA: &str = "employee_cvs";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Photo,
    Cv,
}

/// Fields shared by hiring and partial updates
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct EmployeeFields {
    pub address_woreda: Option<String>,
    pub address_kifle_ketema: Option<String>,
    pub phone_number: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub location: Option<String>,
    pub internal_notes: Option<String>,
    pub manager_id: Option<i32>,
    pub gender: Option<String>,
    pub department: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub contract_end_date: Option<NaiveDate>,
    pub seniority: Option<String>,
    pub management_status: Option<String>,
    pub job_grade: Option<String>,
    pub step: Option<String>,
    #[validate(range(min = 0.0))]
    pub basic_salary: Option<f64>,
    #[validate(range(min = 0.0))]
    pub monthly_salary: Option<f64>,
    pub additional_benefits: Option<f64>,
    pub travel_allowance: Option<f64>,
    pub other_allowance: Option<f64>,
    pub non_taxable_allowance: Option<f64>,
    pub other_deduction: Option<f64>,
    pub lunch_deduction_employee: Option<f64>,
    pub lunch_deduction_court: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewEmployee {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub title: String,
    pub duty_station_id: i32,
    pub hire_date: NaiveDate,
    #[serde(flatten)]
    #[validate]
    pub fields: EmployeeFields,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct EmployeeChanges {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub title: Option<String>,
    pub duty_station_id: Option<i32>,
    pub hire_date: Option<NaiveDate>,
    #[serde(flatten)]
    #[validate]
    pub fields: EmployeeFields,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployeeFilter {
    pub name: Option<String>,
    pub created_from: Option<NaiveDate>,
    pub created_to: Option<NaiveDate>,
    pub duty_station_id: Option<i32>,
    pub hire_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPeriod {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub worked_days: i32,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct StationCost {
    pub expense: f64,
    pub employee_count: u64,
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Default summary window: first day of the previous month through today
pub fn default_summary_range(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let (year, month) = previous_month(today.year(), today.month());
    let start = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_else(|| month_start(today));
    (start, today)
}

/// Overwrite the optional columns of `active` with whatever `fields` carries
fn apply_fields(active: &mut employee::ActiveModel, fields: EmployeeFields) {
    macro_rules! set_opt {
        ($($name:ident),*) => {
            $(if fields.$name.is_some() {
                active.$name = Set(fields.$name);
            })*
        };
    }
    macro_rules! set_num {
        ($($name:ident),*) => {
            $(if let Some(value) = fields.$name {
                active.$name = Set(value);
            })*
        };
    }
    set_opt!(
        address_woreda,
        address_kifle_ketema,
        phone_number,
        emergency_contact_name,
        emergency_contact_phone,
        location,
        internal_notes,
        manager_id,
        gender,
        department,
        birth_date,
        contract_end_date,
        seniority,
        management_status,
        job_grade,
        step
    );
    set_num!(
        basic_salary,
        monthly_salary,
        additional_benefits,
        travel_allowance,
        other_allowance,
        non_taxable_allowance,
        other_deduction,
        lunch_deduction_employee,
        lunch_deduction_court
    );
}

#[derive(Clone)]
pub struct HrService {
    db_pool: Arc<DbPool>,
    uploads: UploadStore,
}

impl HrService {
    pub fn new(db_pool: Arc<DbPool>, uploads: UploadStore) -> Self {
        Self { db_pool, uploads }
    }

    async fn find(&self, id: i32) -> Result<employee::Model, ServiceError> {
        employee::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Employee", id))
    }

    async fn ensure_station<C: ConnectionTrait>(db: &C, id: i32) -> Result<(), ServiceError> {
        duty_station::Entity::find_by_id(id)
            .one(db)
            .await?
            .map(|_| ())
            .ok_or_else(|| ServiceError::not_found("Duty station", id))
    }

    async fn ensure_manager<C: ConnectionTrait>(db: &C, id: Option<i32>) -> Result<(), ServiceError> {
        if let Some(id) = id {
            employee::Entity::find_by_id(id)
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::not_found("Manager", id))?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filter: EmployeeFilter) -> Result<Vec<employee::Model>, ServiceError> {
        let mut query = employee::Entity::find();
        if let Some(name) = filter.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
            query = query.filter(employee::Column::Name.contains(&name));
        }
        if let Some(from) = filter.created_from {
            query = query.filter(employee::Column::CreatedAt.gte(day_start(from)));
        }
        if let Some(to) = filter.created_to.and_then(|d| d.succ_opt()) {
            query = query.filter(employee::Column::CreatedAt.lt(day_start(to)));
        }
        if let Some(station) = filter.duty_station_id {
            query = query.filter(employee::Column::DutyStationId.eq(station));
        }
        if let Some(hired) = filter.hire_date {
            query = query.filter(employee::Column::HireDate.eq(hired));
        }
        Ok(query
            .order_by_desc(employee::Column::Id)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<employee::Model, ServiceError> {
        self.find(id).await
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn add(&self, input: NewEmployee) -> Result<employee::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        Self::ensure_station(db, input.duty_station_id).await?;
        Self::ensure_manager(db, input.fields.manager_id).await?;

        let mut active = employee::ActiveModel {
            name: Set(input.name.trim().to_string()),
            title: Set(input.title),
            duty_station_id: Set(input.duty_station_id),
            hire_date: Set(input.hire_date),
            photo_path: Set(None),
            cv_path: Set(None),
            basic_salary: Set(0.0),
            monthly_salary: Set(0.0),
            additional_benefits: Set(0.0),
            travel_allowance: Set(0.0),
            other_allowance: Set(0.0),
            non_taxable_allowance: Set(0.0),
            other_deduction: Set(0.0),
            lunch_deduction_employee: Set(0.0),
            lunch_deduction_court: Set(0.0),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        apply_fields(&mut active, input.fields);
        let created = active.insert(db).await?;
        info!(employee_id = created.id, "employee added");
        Ok(created)
    }

    #[instrument(skip(self, changes))]
    pub async fn modify(&self, id: i32, changes: EmployeeChanges) -> Result<employee::Model, ServiceError> {
        changes.validate()?;
        let db = &*self.db_pool;
        let existing = self.find(id).await?;
        if let Some(station) = changes.duty_station_id {
            Self::ensure_station(db, station).await?;
        }
        if changes.fields.manager_id == Some(id) {
            return Err(ServiceError::ValidationError(
                "An employee cannot be their own manager".into(),
            ));
        }
        Self::ensure_manager(db, changes.fields.manager_id).await?;

        let mut active = existing.into_active_model();
        if let Some(name) = changes.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(title) = changes.title {
            active.title = Set(title);
        }
        if let Some(station) = changes.duty_station_id {
            active.duty_station_id = Set(station);
        }
        if let Some(hired) = changes.hire_date {
            active.hire_date = Set(hired);
        }
        apply_fields(&mut active, changes.fields);
        Ok(active.update(db).await?)
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, id: i32) -> Result<(), ServiceError> {
        self.find(id).await?;
        employee::Entity::delete_by_id(id).exec(&*self.db_pool).await?;
        info!(employee_id = id, "employee removed");
        Ok(())
    }

    /// Salary expense of employees created in the range and headcount per station
    #[instrument(skip(self))]
    pub async fn station_summary(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<BTreeMap<String, StationCost>, ServiceError> {
        let (default_start, default_end) = default_summary_range(Utc::now().date_naive());
        let start = start.unwrap_or(default_start);
        let end = end.unwrap_or(default_end);
        if end < start {
            return Err(ServiceError::ValidationError(
                "End date must not be before start date".into(),
            ));
        }

        let db = &*self.db_pool;
        let stations = station_names(db).await?;
        let employees = employee::Entity::find().all(db).await?;
        let range_start = day_start(start);
        let range_end = end.succ_opt().map(day_start);

        let mut summary: BTreeMap<String, StationCost> = stations
            .values()
            .map(|name| (name.clone(), StationCost::default()))
            .collect();
        for e in employees {
            let Some(name) = stations.get(&e.duty_station_id) else {
                continue;
            };
            let entry = summary.entry(name.clone()).or_default();
            entry.employee_count += 1;
            let in_range = e.created_at >= range_start && range_end.map_or(true, |end| e.created_at < end);
            if in_range {
                entry.expense = round2(entry.expense + e.monthly_salary + e.additional_benefits);
            }
        }
        Ok(summary)
    }

    #[instrument(skip(self, bytes))]
    pub async fn upload_document(
        &self,
        id: i32,
        kind: DocumentKind,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<employee::Model, ServiceError> {
        let existing = self.find(id).await?;
        let (area, allowed) = match kind {
            DocumentKind::Photo => (EMPLOYEE_PHOTO_AREA, IMAGE_EXTENSIONS),
            DocumentKind::Cv => (EMPLOYEE_CV_AREA, CV_EXTENSIONS),
        };
        let stored = self.uploads.save(area, original_name, bytes, allowed).await?;

        let mut active = existing.into_active_model();
        match kind {
            DocumentKind::Photo => active.photo_path = Set(Some(stored.clone())),
            DocumentKind::Cv => active.cv_path = Set(Some(stored.clone())),
        }
        let updated = match active.update(&*self.db_pool).await {
            Ok(updated) => updated,
            Err(e) => {
                self.uploads.discard(area, &stored).await;
                return Err(e.into());
            }
        };
        info!(employee_id = id, kind = %kind, "employee document stored");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn add_period(&self, employee_id: i32, period: NewPeriod) -> Result<employee_period::Model, ServiceError> {
        if period.start_date > period.end_date {
            return Err(ServiceError::ValidationError(
                "Start date must not be after end date".into(),
            ));
        }
        if period.worked_days < 0 {
            return Err(ServiceError::ValidationError(
                "Worked days must not be negative".into(),
            ));
        }
        self.find(employee_id).await?;
        Ok(employee_period::ActiveModel {
            employee_id: Set(employee_id),
            start_date: Set(period.start_date),
            end_date: Set(period.end_date),
            worked_days: Set(period.worked_days),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await?)
    }

    #[instrument(skip(self))]
    pub async fn periods(&self, employee_id: i32) -> Result<Vec<employee_period::Model>, ServiceError> {
        self.find(employee_id).await?;
        Ok(employee_period::Entity::find()
            .filter(employee_period::Column::EmployeeId.eq(employee_id))
            .order_by_desc(employee_period::Column::StartDate)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn export(&self, filter: EmployeeFilter) -> Result<CsvExport, ServiceError> {
        let stations = station_names(&*self.db_pool).await?;
        let rows = self.list(filter).await?.into_iter().map(|e| {
            vec![
                e.name,
                e.title,
                opt_string(e.department.as_deref()),
                stations.get(&e.duty_station_id).cloned().unwrap_or_default(),
                opt_string(e.phone_number.as_deref()),
                e.hire_date.to_string(),
                money(e.monthly_salary),
                money(e.additional_benefits),
            ]
        });
        CsvExport::build(
            "employees.csv",
            &[
                "Name",
                "Title",
                "Department",
                "Duty Station",
                "Phone",
                "Hire Date",
                "Monthly Salary",
                "Additional Benefits",
            ],
            rows,
        )
    }
}
