use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AccessCodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccessCodes::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AccessCodes::Code)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(AccessCodes::MaxUsage).integer().not_null())
                    .col(
                        ColumnDef::new(AccessCodes::UsageCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(AccessCodes::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(AccessCodes::ExpiresAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(AccessCodes::Description).text())
                    .col(ColumnDef::new(AccessCodes::CreatedBy).string_len(100))
                    .col(
                        ColumnDef::new(AccessCodes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AccessCodes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    // Last line of defence for the ledger invariant.
                    .check(Expr::col(AccessCodes::UsageCount).lte(Expr::col(AccessCodes::MaxUsage)))
                    .check(Expr::col(AccessCodes::UsageCount).gte(0))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(AccessCodes::Table)
                    .col(AccessCodes::IsActive)
                    .name("idx_access_codes_is_active")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AccessCodes::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AccessCodes {
    Table,
    Id,
    Code,
    MaxUsage,
    UsageCount,
    IsActive,
    ExpiresAt,
    Description,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}
