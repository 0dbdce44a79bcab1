use sea_orm::{EntityTrait, Schema};
use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_core_tables::Migration),
            Box::new(m20240101_000002_create_product_tables::Migration),
            Box::new(m20240101_000003_create_planning_tables::Migration),
            Box::new(m20240101_000004_create_purchasing_tables::Migration),
            Box::new(m20240101_000005_create_stock_tables::Migration),
            Box::new(m20240101_000006_create_production_tables::Migration),
            Box::new(m20240101_000007_create_hr_tables::Migration),
            Box::new(m20240101_000008_create_project_tables::Migration),
            Box::new(m20240101_000009_create_admin_activity_tables::Migration),
        ]
    }
}

/// Creates the table described by `entity`, including its unique columns and foreign keys.
async fn create_entity_table<E: EntityTrait>(
    manager: &SchemaManager<'_>,
    entity: E,
) -> Result<(), DbErr> {
    let schema = Schema::new(manager.get_database_backend());
    manager
        .create_table(schema.create_table_from_entity(entity).if_not_exists().to_owned())
        .await
}

async fn drop_entity_table<E: EntityTrait>(
    manager: &SchemaManager<'_>,
    entity: E,
) -> Result<(), DbErr> {
    manager
        .drop_table(Table::drop().table(entity).if_exists().to_owned())
        .await
}

// Migration implementations. Tables are listed in foreign-key order; `down` drops in reverse.

mod m20240101_000001_create_core_tables {
    use super::{create_entity_table, drop_entity_table};
    use crate::entities::{customer, duty_station, notification, resource, user};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_core_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            create_entity_table(manager, user::Entity).await?;
            create_entity_table(manager, duty_station::Entity).await?;
            create_entity_table(manager, customer::Entity).await?;
            create_entity_table(manager, notification::Entity).await?;
            create_entity_table(manager, resource::Entity).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            drop_entity_table(manager, resource::Entity).await?;
            drop_entity_table(manager, notification::Entity).await?;
            drop_entity_table(manager, customer::Entity).await?;
            drop_entity_table(manager, duty_station::Entity).await?;
            drop_entity_table(manager, user::Entity).await
        }
    }
}

mod m20240101_000002_create_product_tables {
    use super::{create_entity_table, drop_entity_table};
    use crate::entities::{order, product, product_config, product_price, sale};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_product_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            create_entity_table(manager, product::Entity).await?;
            create_entity_table(manager, product_config::Entity).await?;
            create_entity_table(manager, product_price::Entity).await?;
            create_entity_table(manager, order::Entity).await?;
            create_entity_table(manager, sale::Entity).await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_sales_product_date")
                        .table(sale::Entity)
                        .col(sale::Column::ProductId)
                        .col(sale::Column::SaleDate)
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            drop_entity_table(manager, sale::Entity).await?;
            drop_entity_table(manager, order::Entity).await?;
            drop_entity_table(manager, product_price::Entity).await?;
            drop_entity_table(manager, product_config::Entity).await?;
            drop_entity_table(manager, product::Entity).await
        }
    }
}

mod m20240101_000003_create_planning_tables {
    use super::{create_entity_table, drop_entity_table};
    use crate::entities::{plan_change_log, product_plan, sales_record};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_planning_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            create_entity_table(manager, product_plan::Entity).await?;
            create_entity_table(manager, sales_record::Entity).await?;
            create_entity_table(manager, plan_change_log::Entity).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            drop_entity_table(manager, plan_change_log::Entity).await?;
            drop_entity_table(manager, sales_record::Entity).await?;
            drop_entity_table(manager, product_plan::Entity).await
        }
    }
}

mod m20240101_000004_create_purchasing_tables {
    use super::{create_entity_table, drop_entity_table};
    use crate::entities::{procurement_order, purchase_request, supplier, yearly_purchase_plan};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_purchasing_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            create_entity_table(manager, supplier::Entity).await?;
            create_entity_table(manager, purchase_request::Entity).await?;
            create_entity_table(manager, procurement_order::Entity).await?;
            create_entity_table(manager, yearly_purchase_plan::Entity).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            drop_entity_table(manager, yearly_purchase_plan::Entity).await?;
            drop_entity_table(manager, procurement_order::Entity).await?;
            drop_entity_table(manager, purchase_request::Entity).await?;
            drop_entity_table(manager, supplier::Entity).await
        }
    }
}

mod m20240101_000005_create_stock_tables {
    use super::{create_entity_table, drop_entity_table};
    use crate::entities::{stock_balance, stock_category, stock_item, stock_transaction};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_stock_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            create_entity_table(manager, stock_category::Entity).await?;
            create_entity_table(manager, stock_item::Entity).await?;
            create_entity_table(manager, stock_transaction::Entity).await?;
            create_entity_table(manager, stock_balance::Entity).await?;

            // One balance row per item, station and month
            manager
                .create_index(
                    Index::create()
                        .name("idx_stock_balances_item_station_period")
                        .table(stock_balance::Entity)
                        .col(stock_balance::Column::ItemId)
                        .col(stock_balance::Column::DutyStationId)
                        .col(stock_balance::Column::Period)
                        .unique()
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            drop_entity_table(manager, stock_balance::Entity).await?;
            drop_entity_table(manager, stock_transaction::Entity).await?;
            drop_entity_table(manager, stock_item::Entity).await?;
            drop_entity_table(manager, stock_category::Entity).await
        }
    }
}

mod m20240101_000006_create_production_tables {
    use super::{create_entity_table, drop_entity_table};
    use crate::entities::{machine, production_config, production_record};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_production_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            create_entity_table(manager, production_config::Entity).await?;
            create_entity_table(manager, machine::Entity).await?;
            create_entity_table(manager, production_record::Entity).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            drop_entity_table(manager, production_record::Entity).await?;
            drop_entity_table(manager, machine::Entity).await?;
            drop_entity_table(manager, production_config::Entity).await
        }
    }
}

mod m20240101_000007_create_hr_tables {
    use super::{create_entity_table, drop_entity_table};
    use crate::entities::{employee, employee_period};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000007_create_hr_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            create_entity_table(manager, employee::Entity).await?;
            create_entity_table(manager, employee_period::Entity).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            drop_entity_table(manager, employee_period::Entity).await?;
            drop_entity_table(manager, employee::Entity).await
        }
    }
}

mod m20240101_000008_create_project_tables {
    use super::{create_entity_table, drop_entity_table};
    use crate::entities::{activity, activity_followup, department, project, project_report};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000008_create_project_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            create_entity_table(manager, department::Entity).await?;
            create_entity_table(manager, project::Entity).await?;
            create_entity_table(manager, activity::Entity).await?;
            create_entity_table(manager, activity_followup::Entity).await?;
            create_entity_table(manager, project_report::Entity).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            drop_entity_table(manager, project_report::Entity).await?;
            drop_entity_table(manager, activity_followup::Entity).await?;
            drop_entity_table(manager, activity::Entity).await?;
            drop_entity_table(manager, project::Entity).await?;
            drop_entity_table(manager, department::Entity).await
        }
    }
}

mod m20240101_000009_create_admin_activity_tables {
    use super::{create_entity_table, drop_entity_table};
    use crate::entities::{
        admin_letter, bill, food_fuel_record, petty_cash, project_funding, property_item,
        security_incident,
    };
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000009_create_admin_activity_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            create_entity_table(manager, bill::Entity).await?;
            create_entity_table(manager, food_fuel_record::Entity).await?;
            create_entity_table(manager, security_incident::Entity).await?;
            create_entity_table(manager, petty_cash::Entity).await?;
            create_entity_table(manager, project_funding::Entity).await?;
            create_entity_table(manager, property_item::Entity).await?;
            create_entity_table(manager, admin_letter::Entity).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            drop_entity_table(manager, admin_letter::Entity).await?;
            drop_entity_table(manager, property_item::Entity).await?;
            drop_entity_table(manager, project_funding::Entity).await?;
            drop_entity_table(manager, petty_cash::Entity).await?;
            drop_entity_table(manager, security_incident::Entity).await?;
            drop_entity_table(manager, food_fuel_record::Entity).await?;
            drop_entity_table(manager, bill::Entity).await
        }
    }
}
