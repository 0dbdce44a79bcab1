// Shared building blocks
pub mod exports;
pub mod notifications;
pub mod periods;
pub mod uploads;

// Administration
pub mod duty_stations;
pub mod users;

// Sales side
pub mod customers;
pub mod dashboard;
pub mod orders;
pub mod planning;
pub mod products;
pub mod sales;
pub mod sales_report;

// Operations
pub mod production;
pub mod purchasing;
pub mod stock;

// People and office
pub mod admin_activities;
pub mod hr;
pub mod projects;
pub mod resources;
