//! Seeds the database with an administrator and, optionally, demo records
//!
//! Run with: cargo run --bin seed-data -- --password <admin-password> [--demo]
//!
//! Safe to run repeatedly: existing records are left alone.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use tracing::info;

use asbm_erp::{
    auth::all_permissions,
    config, db,
    entities::{customer, duty_station, product, user},
    services::{
        customers::{CustomerService, NewCustomer},
        duty_stations::DutyStationService,
        products::{NewPrice, NewProduct, ProductService},
        stock::ensure_default_categories,
        uploads::UploadStore,
        users::{RegisterUser, UserService},
    },
};

#[derive(Debug, Parser)]
#[command(name = "seed-data", about = "Seed the ASBM ERP database")]
struct Args {
    /// Administrator username
    #[arg(long, default_value = "admin")]
    username: String,

    /// Administrator password
    #[arg(long, env = "ASBM_ADMIN_PASSWORD")]
    password: String,

    /// Also create a demo duty station, customer and product
    #[arg(long)]
    demo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cfg = config::load_config().context("failed to load configuration")?;
    asbm_erp::tracing::init_subscriber(&cfg.logging);

    info!("=== ASBM ERP Seed Data ===");
    let pool = db::connect(&cfg.database).await?;
    db::run_migrations(&pool).await?;
    let pool = Arc::new(pool);
    let uploads = UploadStore::new(&cfg.uploads.dir, cfg.uploads.max_bytes);

    ensure_default_categories(&*pool).await?;
    info!("Stock categories ready");

    let users = UserService::new(pool.clone(), uploads.clone());
    let existing = user::Entity::find()
        .filter(user::Column::Username.eq(args.username.as_str()))
        .one(&*pool)
        .await?;
    match existing {
        Some(admin) => info!(user_id = admin.id, "Administrator already present"),
        None => {
            let admin = users
                .register(RegisterUser {
                    username: args.username.clone(),
                    password: args.password.clone(),
                    role: "admin".to_string(),
                    permissions: Some(all_permissions()),
                })
                .await?;
            info!(user_id = admin.id, "Administrator created");
        }
    }

    if args.demo {
        seed_demo(pool.clone(), uploads).await?;
    }

    info!("=== Seed Data Complete ===");
    info!("Log in with POST /auth/login and explore at /swagger-ui");
    Ok(())
}

async fn seed_demo(pool: Arc<db::DbPool>, uploads: UploadStore) -> anyhow::Result<()> {
    if duty_station::Entity::find().count(&*pool).await? == 0 {
        let station = DutyStationService::new(pool.clone())
            .create("Addis Ababa")
            .await?;
        info!(station_id = station.id, "Created duty station");
    }

    let customer_id = match customer::Entity::find().one(&*pool).await? {
        Some(existing) => existing.id,
        None => {
            let created = CustomerService::new(pool.clone())
                .add(NewCustomer {
                    name: "Habesha Garments".to_string(),
                    email: "orders@habesha-garments.example".to_string(),
                    phone_number: Some("+251 11 000 0000".to_string()),
                    location_address: Some("Bole, Addis Ababa".to_string()),
                    product_types: Some("Woven".to_string()),
                    contact_details: None,
                })
                .await?;
            info!(customer_id = created.id, "Created customer");
            created.id
        }
    };

    if product::Entity::find().count(&*pool).await? == 0 {
        let details = ProductService::new(pool, uploads)
            .add(NewProduct {
                name: "Cotton Poplin".to_string(),
                description: Some("Plain weave shirting fabric".to_string()),
                product_type: "Woven".to_string(),
                is_processed: false,
                selling_price: 420.0,
                cost: 310.0,
                customer_id: Some(customer_id),
                supplier: None,
                batch_number: Some("B-0001".to_string()),
                sku: "WOV-POP-001".to_string(),
                stock_quantity: 500,
                parameters: json!({
                    "fabric_type": "Poplin",
                    "fabric_gsm": 120,
                    "fabric_width": 150,
                    "colors": "White, Sky Blue",
                }),
                supports_direct_sales: true,
                supports_service_sales: false,
                uom: Some("meter".to_string()),
                initial_price: Some(NewPrice {
                    price: 420.0,
                    start_date: chrono::Utc::now().date_naive(),
                    end_date: None,
                }),
            })
            .await?;
        info!(product_code = %details.product.product_code, "Created product");
    }

    Ok(())
}
