use crate::{
    db::DbPool,
    entities::{
        admin_letter, bill, duty_station, employee, food_fuel_record, petty_cash, project,
        project_funding, property_item, security_incident,
    },
    errors::ServiceError,
    services::duty_stations::station_names,
    services::exports::{money, opt_string, CsvExport},
};
use chrono::{NaiveDate, NaiveTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use strum::{Display, EnumIter, EnumString};
use tracing::{info, instrument};
use validator::Validate;

const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AdminSection {
    Bills,
    FoodFuel,
    Security,
    PettyCash,
    ProjectFunding,
    PropertyItems,
    AdminLetters,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BillInput {
    #[validate(length(min = 1))]
    pub bill_number: String,
    pub receipt_number: Option<String>,
    #[validate(length(min = 1))]
    pub bill_type: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 0.0))]
    pub amount: f64,
    pub due_date: NaiveDate,
    pub duty_station_id: i32,
    pub status: Option<String>,
}

impl BillInput {
    /// Only "Other" bills carry a free-text description
    fn description(&self) -> String {
        if self.bill_type == "Other" {
            self.description.clone()
        } else {
            self.bill_type.clone()
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FoodFuelInput {
    #[validate(length(min = 1))]
    pub record_type: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 0.0))]
    pub quantity: f64,
    #[validate(range(min = 0.0))]
    pub cost: f64,
    pub date: NaiveDate,
    pub duty_station_id: i32,
    pub payee_id: Option<i32>,
    pub payee_name: Option<String>,
}

impl FoodFuelInput {
    fn payee_name(&self) -> Option<String> {
        if self.payee_id.is_some() {
            None
        } else {
            self.payee_name.clone()
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SecurityInput {
    #[validate(length(min = 1))]
    pub incident_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub reported_date: NaiveDate,
    pub duty_station_id: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PettyCashInput {
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 0.0))]
    pub amount: f64,
    pub request_date: NaiveDate,
    pub employee_id: i32,
    pub reason: Option<String>,
    pub duty_station_id: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FundingInput {
    pub project_id: Option<i32>,
    pub new_project_name: Option<String>,
    #[validate(range(min = 0.0))]
    pub amount: f64,
    pub funding_date: NaiveDate,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub source: Option<String>,
    pub duty_station_id: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PropertyInput {
    #[validate(length(min = 1))]
    pub item_code: String,
    #[validate(length(min = 1))]
    pub item_type: String,
    pub description: Option<String>,
    pub assigned_date: Option<NaiveDate>,
    pub employee_id: Option<i32>,
    pub duty_station_id: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LetterInput {
    pub letter_type: String,
    #[validate(length(min = 1))]
    pub recipient: String,
    #[validate(length(min = 1))]
    pub subject: String,
    #[serde(default)]
    pub content: String,
    pub duty_station_id: i32,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct OverviewRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl OverviewRange {
    /// Both bounds must be present for the range to apply
    fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.start.zip(self.end)
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct LetterCounts {
    #[serde(rename = "Internal")]
    pub internal: u64,
    #[serde(rename = "External")]
    pub external: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminRecords {
    pub bills: Vec<bill::Model>,
    pub food_fuel: Vec<food_fuel_record::Model>,
    pub security: Vec<security_incident::Model>,
    pub petty_cash: Vec<petty_cash::Model>,
    pub project_funding: Vec<project_funding::Model>,
    pub property_items: Vec<property_item::Model>,
    pub admin_letters: Vec<admin_letter::Model>,
}

/// Fold rows into a per-station map, seeding every known station with the default
fn per_station<T, V: Default>(
    stations: &HashMap<i32, String>,
    rows: impl IntoIterator<Item = T>,
    station_of: impl Fn(&T) -> i32,
    mut fold: impl FnMut(&mut V, T),
) -> BTreeMap<String, V> {
    let mut out: BTreeMap<String, V> = stations
        .values()
        .map(|name| (name.clone(), V::default()))
        .collect();
    for row in rows {
        if let Some(name) = stations.get(&station_of(&row)) {
            fold(out.entry(name.clone()).or_default(), row);
        }
    }
    out
}

async fn ensure_station<C: ConnectionTrait>(db: &C, id: i32) -> Result<(), ServiceError> {
    duty_station::Entity::find_by_id(id)
        .one(db)
        .await?
        .map(|_| ())
        .ok_or_else(|| ServiceError::not_found("Duty station", id))
}

#[derive(Clone)]
pub struct AdminActivityService {
    db_pool: Arc<DbPool>,
}

impl AdminActivityService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<AdminRecords, ServiceError> {
        let db = &*self.db_pool;
        Ok(AdminRecords {
            bills: bill::Entity::find().order_by_desc(bill::Column::Id).all(db).await?,
            food_fuel: food_fuel_record::Entity::find()
                .order_by_desc(food_fuel_record::Column::Id)
                .all(db)
                .await?,
            security: security_incident::Entity::find()
                .order_by_desc(security_incident::Column::Id)
                .all(db)
                .await?,
            petty_cash: petty_cash::Entity::find()
                .order_by_desc(petty_cash::Column::Id)
                .all(db)
                .await?,
            project_funding: project_funding::Entity::find()
                .order_by_desc(project_funding::Column::Id)
                .all(db)
                .await?,
            property_items: property_item::Entity::find()
                .order_by_desc(property_item::Column::Id)
                .all(db)
                .await?,
            admin_letters: admin_letter::Entity::find()
                .order_by_desc(admin_letter::Column::Id)
                .all(db)
                .await?,
        })
    }

    #[instrument(skip(self, input), fields(bill_number = %input.bill_number))]
    pub async fn add_bill(&self, input: BillInput) -> Result<bill::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        ensure_station(db, input.duty_station_id).await?;
        let description = input.description();
        let created = bill::ActiveModel {
            bill_number: Set(input.bill_number),
            receipt_number: Set(input.receipt_number),
            description: Set(description),
            bill_type: Set(input.bill_type),
            amount: Set(input.amount),
            due_date: Set(input.due_date),
            status: Set("Pending".to_string()),
            duty_station_id: Set(input.duty_station_id),
            ..Default::default()
        }
        .insert(db)
        .await?;
        info!(bill_id = created.id, "bill added");
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn edit_bill(&self, id: i32, input: BillInput) -> Result<bill::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        let existing = bill::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Bill", id))?;
        ensure_station(db, input.duty_station_id).await?;
        let description = input.description();
        let mut active = existing.into_active_model();
        active.bill_number = Set(input.bill_number);
        active.receipt_number = Set(input.receipt_number);
        active.bill_type = Set(input.bill_type);
        active.description = Set(description);
        active.amount = Set(input.amount);
        active.due_date = Set(input.due_date);
        active.duty_station_id = Set(input.duty_station_id);
        if let Some(status) = input.status {
            active.status = Set(status);
        }
        Ok(active.update(db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_bill(&self, id: i32) -> Result<(), ServiceError> {
        let result = bill::Entity::delete_by_id(id).exec(&*self.db_pool).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Bill", id));
        }
        info!(bill_id = id, "bill deleted");
        Ok(())
    }

    #[instrument(skip(self, input), fields(record_type = %input.record_type))]
    pub async fn add_food_fuel(&self, input: FoodFuelInput) -> Result<food_fuel_record::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        ensure_station(db, input.duty_station_id).await?;
        Ok(food_fuel_record::ActiveModel {
            payee_name: Set(input.payee_name()),
            record_type: Set(input.record_type),
            description: Set(input.description),
            quantity: Set(input.quantity),
            cost: Set(input.cost),
            date: Set(input.date),
            payee_id: Set(input.payee_id),
            duty_station_id: Set(input.duty_station_id),
            ..Default::default()
        }
        .insert(db)
        .await?)
    }

    #[instrument(skip(self, input))]
    pub async fn edit_food_fuel(
        &self,
        id: i32,
        input: FoodFuelInput,
    ) -> Result<food_fuel_record::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        let existing = food_fuel_record::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Food/fuel record", id))?;
        ensure_station(db, input.duty_station_id).await?;
        let mut active = existing.into_active_model();
        active.payee_name = Set(input.payee_name());
        active.record_type = Set(input.record_type);
        active.description = Set(input.description);
        active.quantity = Set(input.quantity);
        active.cost = Set(input.cost);
        active.date = Set(input.date);
        active.payee_id = Set(input.payee_id);
        active.duty_station_id = Set(input.duty_station_id);
        Ok(active.update(db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_food_fuel(&self, id: i32) -> Result<(), ServiceError> {
        let result = food_fuel_record::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Food/fuel record", id));
        }
        Ok(())
    }

    #[instrument(skip(self, input))]
    pub async fn add_security_incident(
        &self,
        input: SecurityInput,
    ) -> Result<security_incident::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        ensure_station(db, input.duty_station_id).await?;
        let created = security_incident::ActiveModel {
            incident_type: Set(input.incident_type),
            description: Set(input.description),
            location: Set(input.location),
            reported_date: Set(input.reported_date),
            status: Set("Open".to_string()),
            duty_station_id: Set(input.duty_station_id),
            ..Default::default()
        }
        .insert(db)
        .await?;
        info!(incident_id = created.id, "security incident reported");
        Ok(created)
    }

    #[instrument(skip(self, input), fields(employee_id = input.employee_id))]
    pub async fn add_petty_cash(&self, input: PettyCashInput) -> Result<petty_cash::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        ensure_station(db, input.duty_station_id).await?;
        let requester = employee::Entity::find_by_id(input.employee_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Employee", input.employee_id))?;
        Ok(petty_cash::ActiveModel {
            description: Set(input.description),
            amount: Set(input.amount),
            request_date: Set(input.request_date),
            employee_id: Set(Some(requester.id)),
            employee_title: Set(Some(requester.title)),
            reason: Set(input.reason),
            status: Set("Pending".to_string()),
            duty_station_id: Set(input.duty_station_id),
            ..Default::default()
        }
        .insert(db)
        .await?)
    }

    /// Record funding, creating the named project first when one is given
    #[instrument(skip(self, input))]
    pub async fn add_funding(&self, input: FundingInput) -> Result<project_funding::Model, ServiceError> {
        input.validate()?;
        let txn = self.db_pool.begin().await?;
        ensure_station(&txn, input.duty_station_id).await?;

        let new_name = input
            .new_project_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());
        let project_id = match (new_name, input.project_id) {
            (Some(name), _) => {
                let created = project::ActiveModel {
                    name: Set(name.to_string()),
                    description: Set(None),
                    start_date: Set(Some(input.start_date.unwrap_or_else(|| Utc::now().date_naive()))),
                    end_date: Set(input.end_date),
                    status: Set("Active".to_string()),
                    created_at: Set(Utc::now()),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
                info!(project_id = created.id, "project created for funding");
                created.id
            }
            (None, Some(id)) => {
                project::Entity::find_by_id(id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("Project", id))?;
                id
            }
            (None, None) => {
                return Err(ServiceError::ValidationError(
                    "Either project_id or new_project_name is required".into(),
                ))
            }
        };

        let created = project_funding::ActiveModel {
            project_id: Set(project_id),
            amount: Set(input.amount),
            funding_date: Set(input.funding_date),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            source: Set(input.source),
            duty_station_id: Set(input.duty_station_id),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        info!(funding_id = created.id, amount = created.amount, "funding added");
        Ok(created)
    }

    #[instrument(skip(self, input), fields(item_code = %input.item_code))]
    pub async fn add_property_item(&self, input: PropertyInput) -> Result<property_item::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        ensure_station(db, input.duty_station_id).await?;
        if let Some(id) = input.employee_id {
            employee::Entity::find_by_id(id)
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::not_found("Employee", id))?;
        }
        Ok(property_item::ActiveModel {
            item_code: Set(input.item_code),
            item_type: Set(input.item_type),
            description: Set(input.description),
            assigned_date: Set(input.assigned_date),
            employee_id: Set(input.employee_id),
            status: Set("In Use".to_string()),
            duty_station_id: Set(input.duty_station_id),
            ..Default::default()
        }
        .insert(db)
        .await?)
    }

    #[instrument(skip(self, input))]
    pub async fn add_letter(&self, input: LetterInput) -> Result<admin_letter::Model, ServiceError> {
        input.validate()?;
        if input.letter_type != "Internal" && input.letter_type != "External" {
            return Err(ServiceError::ValidationError(
                "Letter type must be Internal or External".into(),
            ));
        }
        let db = &*self.db_pool;
        ensure_station(db, input.duty_station_id).await?;
        Ok(admin_letter::ActiveModel {
            letter_type: Set(input.letter_type),
            recipient: Set(input.recipient),
            subject: Set(input.subject),
            content: Set(input.content),
            created_at: Set(Utc::now()),
            duty_station_id: Set(input.duty_station_id),
            ..Default::default()
        }
        .insert(db)
        .await?)
    }

    #[instrument(skip(self))]
    pub async fn bills_overview(&self, range: OverviewRange) -> Result<BTreeMap<String, f64>, ServiceError> {
        let db = &*self.db_pool;
        let mut query = bill::Entity::find();
        if let Some((start, end)) = range.bounds() {
            query = query.filter(bill::Column::DueDate.between(start, end));
        }
        let stations = station_names(db).await?;
        Ok(per_station(
            &stations,
            query.all(db).await?,
            |b| b.duty_station_id,
            |total: &mut f64, b| *total += b.amount,
        ))
    }

    #[instrument(skip(self))]
    pub async fn petty_cash_overview(&self, range: OverviewRange) -> Result<BTreeMap<String, f64>, ServiceError> {
        let db = &*self.db_pool;
        let mut query = petty_cash::Entity::find().filter(petty_cash::Column::Status.eq("Approved"));
        if let Some((start, end)) = range.bounds() {
            query = query.filter(petty_cash::Column::RequestDate.between(start, end));
        }
        let stations = station_names(db).await?;
        Ok(per_station(
            &stations,
            query.all(db).await?,
            |p| p.duty_station_id,
            |total: &mut f64, p| *total += p.amount,
        ))
    }

    #[instrument(skip(self))]
    pub async fn funding_overview(
        &self,
        range: OverviewRange,
    ) -> Result<BTreeMap<String, BTreeMap<String, f64>>, ServiceError> {
        let db = &*self.db_pool;
        let mut query = project_funding::Entity::find();
        if let Some((start, end)) = range.bounds() {
            query = query.filter(project_funding::Column::FundingDate.between(start, end));
        }
        let stations = station_names(db).await?;
        let projects = self.project_names().await?;
        Ok(per_station(
            &stations,
            query.all(db).await?,
            |f| f.duty_station_id,
            |funds: &mut BTreeMap<String, f64>, f| {
                let name = projects
                    .get(&f.project_id)
                    .cloned()
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string());
                *funds.entry(name).or_default() += f.amount;
            },
        ))
    }

    #[instrument(skip(self))]
    pub async fn property_overview(&self) -> Result<BTreeMap<String, BTreeMap<String, u64>>, ServiceError> {
        let db = &*self.db_pool;
        let stations = station_names(db).await?;
        Ok(per_station(
            &stations,
            property_item::Entity::find().all(db).await?,
            |p| p.duty_station_id,
            |counts: &mut BTreeMap<String, u64>, p| *counts.entry(p.item_type).or_default() += 1,
        ))
    }

    #[instrument(skip(self))]
    pub async fn letters_overview(&self, range: OverviewRange) -> Result<BTreeMap<String, LetterCounts>, ServiceError> {
        let db = &*self.db_pool;
        let mut query = admin_letter::Entity::find();
        if let Some((start, end)) = range.bounds() {
            query = query
                .filter(admin_letter::Column::CreatedAt.gte(start.and_time(NaiveTime::MIN).and_utc()))
                .filter(
                    admin_letter::Column::CreatedAt.lte(
                        end.and_hms_opt(23, 59, 59)
                            .unwrap_or_else(|| end.and_time(NaiveTime::MIN))
                            .and_utc(),
                    ),
                );
        }
        let stations = station_names(db).await?;
        Ok(per_station(
            &stations,
            query.all(db).await?,
            |l| l.duty_station_id,
            |counts: &mut LetterCounts, l| match l.letter_type.as_str() {
                "Internal" => counts.internal += 1,
                "External" => counts.external += 1,
                _ => {}
            },
        ))
    }

    async fn project_names(&self) -> Result<HashMap<i32, String>, ServiceError> {
        Ok(project::Entity::find()
            .all(&*self.db_pool)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn export(&self, section: AdminSection) -> Result<CsvExport, ServiceError> {
        let records = self.list_all().await?;
        let stations = station_names(&*self.db_pool).await?;
        let station = |id: i32| stations.get(&id).cloned().unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let filename = format!("{}.csv", section);

        match section {
            AdminSection::Bills => CsvExport::build(
                filename,
                &["Bill #", "Receipt #", "Type", "Amount", "Due Date", "Duty Station", "Status"],
                records.bills.into_iter().map(|b| {
                    vec![
                        b.bill_number,
                        opt_string(b.receipt_number.as_deref()),
                        b.bill_type,
                        money(b.amount),
                        b.due_date.to_string(),
                        station(b.duty_station_id),
                        b.status,
                    ]
                }),
            ),
            AdminSection::FoodFuel => CsvExport::build(
                filename,
                &["Type", "Description", "Quantity", "Cost", "Date", "Payee", "Duty Station"],
                records.food_fuel.into_iter().map(|r| {
                    let payee = match (r.payee_id, r.payee_name.as_deref()) {
                        (Some(id), _) => format!("Employee #{}", id),
                        (None, name) => opt_string(name),
                    };
                    vec![
                        r.record_type,
                        r.description,
                        r.quantity.to_string(),
                        money(r.cost),
                        r.date.to_string(),
                        payee,
                        station(r.duty_station_id),
                    ]
                }),
            ),
            AdminSection::Security => CsvExport::build(
                filename,
                &["Type", "Description", "Location", "Reported Date", "Status", "Duty Station"],
                records.security.into_iter().map(|s| {
                    vec![
                        s.incident_type,
                        s.description,
                        s.location,
                        s.reported_date.to_string(),
                        s.status,
                        station(s.duty_station_id),
                    ]
                }),
            ),
            AdminSection::PettyCash => CsvExport::build(
                filename,
                &["Description", "Amount", "Request Date", "Employee Title", "Reason", "Status", "Duty Station"],
                records.petty_cash.into_iter().map(|p| {
                    vec![
                        p.description,
                        money(p.amount),
                        p.request_date.to_string(),
                        opt_string(p.employee_title.as_deref()),
                        opt_string(p.reason.as_deref()),
                        p.status,
                        station(p.duty_station_id),
                    ]
                }),
            ),
            AdminSection::ProjectFunding => {
                let projects = self.project_names().await?;
                CsvExport::build(
                    filename,
                    &["Project", "Amount", "Funding Date", "Source", "Duty Station"],
                    records.project_funding.into_iter().map(|f| {
                        vec![
                            projects
                                .get(&f.project_id)
                                .cloned()
                                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                            money(f.amount),
                            f.funding_date.to_string(),
                            opt_string(f.source.as_deref()),
                            station(f.duty_station_id),
                        ]
                    }),
                )
            }
            AdminSection::PropertyItems => CsvExport::build(
                filename,
                &["Item Code", "Type", "Description", "Assigned Date", "Status", "Duty Station"],
                records.property_items.into_iter().map(|p| {
                    vec![
                        p.item_code,
                        p.item_type,
                        opt_string(p.description.as_deref()),
                        p.assigned_date.map(|d| d.to_string()).unwrap_or_default(),
                        p.status,
                        station(p.duty_station_id),
                    ]
                }),
            ),
            AdminSection::AdminLetters => CsvExport::build(
                filename,
                &["Type", "Recipient", "Subject", "Created At", "Duty Station"],
                records.admin_letters.into_iter().map(|l| {
                    vec![
                        l.letter_type,
                        l.recipient,
                        l.subject,
                        l.created_at.format("%Y-%m-%d %H:%M").to_string(),
                        station(l.duty_station_id),
                    ]
                }),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bill_input(bill_type: &str) -> BillInput {
        BillInput {
            bill_number: "B-1".into(),
            receipt_number: None,
            bill_type: bill_type.into(),
            description: "Generator repair".into(),
            amount: 100.0,
            due_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            duty_station_id: 1,
            status: None,
        }
    }

    #[test]
    fn bill_description_follows_type() {
        assert_eq!(bill_input("Electricity").description(), "Electricity");
        assert_eq!(bill_input("Other").description(), "Generator repair");
    }

    #[test]
    fn payee_name_dropped_when_employee_given() {
        let mut input = FoodFuelInput {
            record_type: "Fuel".into(),
            description: String::new(),
            quantity: 10.0,
            cost: 500.0,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            duty_station_id: 1,
            payee_id: Some(3),
            payee_name: Some("Abebe".into()),
        };
        assert_eq!(input.payee_name(), None);
        input.payee_id = None;
        assert_eq!(input.payee_name().as_deref(), Some("Abebe"));
    }

    #[test]
    fn per_station_seeds_every_station() {
        let stations = HashMap::from([(1, "Addis".to_string()), (2, "Adama".to_string())]);
        let totals: BTreeMap<String, f64> = per_station(
            &stations,
            vec![(1, 10.0), (1, 5.0), (9, 100.0)],
            |row| row.0,
            |total: &mut f64, row| *total += row.1,
        );
        assert_eq!(totals["Addis"], 15.0);
        assert_eq!(totals["Adama"], 0.0);
        assert_eq!(totals.len(), 2);
    }

    #[test]
    fn sections_parse_from_path() {
        assert_eq!("food_fuel".parse::<AdminSection>().unwrap(), AdminSection::FoodFuel);
        assert_eq!(AdminSection::PettyCash.to_string(), "petty_cash");
    }
}
