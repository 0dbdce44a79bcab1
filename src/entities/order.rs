use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// `{PREFIX}-{seq:03}` where the prefix comes from the product type
    #[sea_orm(unique)]
    pub order_number: String,
    pub customer_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub order_date: DateTime<Utc>,
    pub payment_status: String,
    pub order_status: String,
    pub tax: f64,
    pub total: f64,
    #[sea_orm(column_type = "Text", nullable)]
    pub delivery_info: Option<String>,
    pub order_placed_date: Option<NaiveDate>,
    pub required_delivery_date: Option<NaiveDate>,
    pub total_value: Option<f64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id",
        on_delete = "Restrict"
    )]
    Customer,
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id",
        on_delete = "Restrict"
    )]
    Product,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
