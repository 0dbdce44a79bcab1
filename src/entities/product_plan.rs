use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Planned quantity and value of a product over a date range
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_plans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub product_id: i32,
    pub plan_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub planned_quantity: f64,
    pub planned_value: f64,
    pub actual_quantity: f64,
    pub actual_value: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id",
        on_delete = "Cascade"
    )]
    Product,
    #[sea_orm(has_many = "super::plan_change_log::Entity")]
    ChangeLogs,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::plan_change_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChangeLogs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether the plan's date range intersects `[start, end]`
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && self.end_date >= start
    }
}
