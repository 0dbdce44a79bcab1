//! SeaORM entities. One module per table.

pub mod activity;
pub mod activity_followup;
pub mod admin_letter;
pub mod bill;
pub mod customer;
pub mod department;
pub mod duty_station;
pub mod employee;
pub mod employee_period;
pub mod food_fuel_record;
pub mod machine;
pub mod notification;
pub mod order;
pub mod petty_cash;
pub mod plan_change_log;
pub mod procurement_order;
pub mod product;
pub mod product_config;
pub mod product_plan;
pub mod product_price;
pub mod production_config;
pub mod production_record;
pub mod project;
pub mod project_funding;
pub mod project_report;
pub mod property_item;
pub mod purchase_request;
pub mod resource;
pub mod sale;
pub mod sales_record;
pub mod security_incident;
pub mod stock_balance;
pub mod stock_category;
pub mod stock_item;
pub mod stock_transaction;
pub mod supplier;
pub mod user;
pub mod yearly_purchase_plan;
