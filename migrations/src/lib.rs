pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_customers_table;
mod m20250301_000002_create_admin_users_table;
mod m20250301_000003_create_catalog_tables;
mod m20250301_000004_create_addresses_table;
mod m20250301_000005_create_cart_items_table;
mod m20250301_000006_create_orders_tables;
mod m20250301_000007_create_stock_movements_table;
mod m20250301_000008_create_store_settings_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_customers_table::Migration),
            Box::new(m20250301_000002_create_admin_users_table::Migration),
            Box::new(m20250301_000003_create_catalog_tables::Migration),
            Box::new(m20250301_000004_create_addresses_table::Migration),
            Box::new(m20250301_000005_create_cart_items_table::Migration),
            Box::new(m20250301_000006_create_orders_tables::Migration),
            Box::new(m20250301_000007_create_stock_movements_table::Migration),
            Box::new(m20250301_000008_create_store_settings_table::Migration),
        ]
    }
}
