use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Employee master record, including pay components and document paths
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "employees")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub address_woreda: Option<String>,
    pub address_kifle_ketema: Option<String>,
    pub phone_number: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub location: Option<String>,
    pub photo_path: Option<String>,
    pub cv_path: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub internal_notes: Option<String>,
    pub manager_id: Option<i32>,
    pub duty_station_id: i32,
    pub title: String,
    pub gender: Option<String>,
    pub department: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub hire_date: NaiveDate,
    pub contract_end_date: Option<NaiveDate>,
    pub seniority: Option<String>,
    pub management_status: Option<String>,
    pub job_grade: Option<String>,
    pub step: Option<String>,
    pub basic_salary: f64,
    pub monthly_salary: f64,
    pub additional_benefits: f64,
    pub travel_allowance: f64,
    pub other_allowance: f64,
    pub non_taxable_allowance: f64,
    pub other_deduction: f64,
    pub lunch_deduction_employee: f64,
    pub lunch_deduction_court: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ManagerId",
        to = "Column::Id",
        on_delete = "SetNull"
    )]
    Manager,
    #[sea_orm(
        belongs_to = "super::duty_station::Entity",
        from = "Column::DutyStationId",
        to = "super::duty_station::Column::Id",
        on_delete = "Restrict"
    )]
    DutyStation,
}

impl Related<super::duty_station::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DutyStation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
