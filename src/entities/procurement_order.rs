use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A registered purchase and its payment state
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "procurement_orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub order_number: String,
    pub request_id: Option<i32>,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub quantity: i32,
    pub unit_of_measure: String,
    pub unit_price: Option<f64>,
    pub total_price: f64,
    pub status: String,
    pub cost_category: String,
    pub duty_station_id: Option<i32>,
    pub supplier_id: Option<i32>,
    pub payment_status: String,
    pub payment_amount: f64,
    pub payment_date: Option<NaiveDate>,
    pub registered_by_id: Option<i32>,
    pub registered_date: NaiveDate,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::purchase_request::Entity",
        from = "Column::RequestId",
        to = "super::purchase_request::Column::Id",
        on_delete = "SetNull"
    )]
    Request,
    #[sea_orm(
        belongs_to = "super::duty_station::Entity",
        from = "Column::DutyStationId",
        to = "super::duty_station::Column::Id",
        on_delete = "Restrict"
    )]
    DutyStation,
    #[sea_orm(
        belongs_to = "super::supplier::Entity",
        from = "Column::SupplierId",
        to = "super::supplier::Column::Id",
        on_delete = "Restrict"
    )]
    Supplier,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::RegisteredById",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    RegisteredBy,
}

impl Related<super::supplier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supplier.def()
    }
}

impl Related<super::duty_station::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DutyStation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Amount still owed to the supplier
    pub fn remaining(&self) -> f64 {
        self.total_price - self.payment_amount
    }
}
