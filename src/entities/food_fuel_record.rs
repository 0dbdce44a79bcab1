use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "food_fuel_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// `Food` or `Fuel`
    pub record_type: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub quantity: f64,
    pub cost: f64,
    pub date: NaiveDate,
    pub payee_id: Option<i32>,
    pub payee_name: Option<String>,
    pub duty_station_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
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
