use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "admin_letters")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// `Internal` or `External`
    pub letter_type: String,
    pub recipient: String,
    pub subject: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub created_at: DateTime<Utc>,
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
