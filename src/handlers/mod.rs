pub mod admin_activities;
pub mod common;
pub mod customers;
pub mod dashboard;
pub mod duty_stations;
pub mod hr;
pub mod notifications;
pub mod orders;
pub mod planning;
pub mod production;
pub mod products;
pub mod projects;
pub mod purchasing;
pub mod resources;
pub mod sales;
pub mod stock;
pub mod users;

use crate::{
    config::AppConfig,
    db::DbPool,
    services::{
        admin_activities::AdminActivityService, customers::CustomerService,
        dashboard::DashboardService, duty_stations::DutyStationService, hr::HrService,
        notifications::NotificationService, orders::OrderService, planning::PlanningService,
        production::ProductionService, products::ProductService, projects::ProjectService,
        purchasing::PurchasingService, resources::ResourceService, sales::SaleService,
        sales_report::SalesReportService, stock::StockService, uploads::UploadStore,
        users::UserService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<UserService>,
    pub duty_stations: Arc<DutyStationService>,
    pub customers: Arc<CustomerService>,
    pub products: Arc<ProductService>,
    pub orders: Arc<OrderService>,
    pub sales: Arc<SaleService>,
    pub sales_report: Arc<SalesReportService>,
    pub planning: Arc<PlanningService>,
    pub purchasing: Arc<PurchasingService>,
    pub stock: Arc<StockService>,
    pub production: Arc<ProductionService>,
    pub hr: Arc<HrService>,
    pub projects: Arc<ProjectService>,
    pub admin_activities: Arc<AdminActivityService>,
    pub notifications: Arc<NotificationService>,
    pub dashboard: Arc<DashboardService>,
    pub resources: Arc<ResourceService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, config: &AppConfig) -> Self {
        let uploads = UploadStore::new(&config.uploads.dir, config.uploads.max_bytes);
        let notifications = NotificationService::new(db_pool.clone());

        Self {
            users: Arc::new(UserService::new(db_pool.clone(), uploads.clone())),
            duty_stations: Arc::new(DutyStationService::new(db_pool.clone())),
            customers: Arc::new(CustomerService::new(db_pool.clone())),
            products: Arc::new(ProductService::new(db_pool.clone(), uploads.clone())),
            orders: Arc::new(OrderService::new(db_pool.clone(), config.business.tax_rate)),
            sales: Arc::new(SaleService::new(db_pool.clone())),
            sales_report: Arc::new(SalesReportService::new(db_pool.clone())),
            planning: Arc::new(PlanningService::new(db_pool.clone())),
            purchasing: Arc::new(PurchasingService::new(
                db_pool.clone(),
                notifications.clone(),
            )),
            stock: Arc::new(StockService::new(db_pool.clone())),
            production: Arc::new(ProductionService::new(db_pool.clone())),
            hr: Arc::new(HrService::new(db_pool.clone(), uploads.clone())),
            projects: Arc::new(ProjectService::new(db_pool.clone())),
            admin_activities: Arc::new(AdminActivityService::new(db_pool.clone())),
            notifications: Arc::new(notifications),
            dashboard: Arc::new(DashboardService::new(db_pool.clone(), config.business.currency.clone())),
            resources: Arc::new(ResourceService::new(db_pool, uploads)),
        }
    }
}
