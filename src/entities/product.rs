use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Textile product (garment, fabric or yarn)
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// Sequential code of the form `PROD-000001`
    #[sea_orm(unique)]
    pub product_code: String,

    /// One of the product types with a parameter template
    pub product_type: String,

    pub is_processed: bool,

    pub selling_price: f64,

    pub cost: f64,

    pub customer_id: Option<i32>,

    /// Denormalised customer name, kept when the product is made to order
    pub customer_name: Option<String>,

    pub supplier: Option<String>,

    pub batch_number: Option<String>,

    pub sku: String,

    pub stock_quantity: i32,

    pub image_path: Option<String>,

    /// Type-specific parameters normalised against the product type template
    #[sea_orm(column_type = "Json", nullable)]
    pub parameters: Option<Json>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id",
        on_delete = "SetNull"
    )]
    Customer,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
