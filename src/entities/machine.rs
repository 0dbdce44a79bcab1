use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "machines")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub duty_station_id: i32,
    pub process_type: String,
    pub installed_capacity: f64,
    pub efficiency_factor: f64,
    /// Overrides the computed capacity when set and non-zero
    pub manual_capacity: Option<f64>,
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
    #[sea_orm(has_many = "super::production_record::Entity")]
    Records,
}

impl Related<super::duty_station::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DutyStation.def()
    }
}

impl Related<super::production_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Records.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
