use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StoreSettings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StoreSettings::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(StoreSettings::StoreName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(StoreSettings::Address).string_len(500).null())
                    .col(ColumnDef::new(StoreSettings::Latitude).double().null())
                    .col(ColumnDef::new(StoreSettings::Longitude).double().null())
                    .col(
                        ColumnDef::new(StoreSettings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Seed the single settings row so the admin surface always has
        // something to update.
        let seed = Query::insert()
            .into_table(StoreSettings::Table)
            .columns([
                StoreSettings::Id,
                StoreSettings::StoreName,
                StoreSettings::UpdatedAt,
            ])
            .values_panic([
                1.into(),
                "PharmaHub Wholesale".into(),
                Expr::current_timestamp().into(),
            ])
            .to_owned();
        manager.exec_stmt(seed).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StoreSettings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum StoreSettings {
    Table,
    Id,
    StoreName,
    Address,
    Latitude,
    Longitude,
    UpdatedAt,
}
