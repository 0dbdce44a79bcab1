use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Utility or service bill payable by a station
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bills")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub bill_number: String,
    pub receipt_number: Option<String>,
    pub bill_type: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub status: String,
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
