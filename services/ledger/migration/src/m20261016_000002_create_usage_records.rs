use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UsageRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UsageRecords::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UsageRecords::AccessCodeId).uuid().not_null())
                    .col(ColumnDef::new(UsageRecords::Success).boolean().not_null())
                    .col(ColumnDef::new(UsageRecords::IpAddress).string_len(45))
                    .col(ColumnDef::new(UsageRecords::UserAgent).text())
                    .col(ColumnDef::new(UsageRecords::RequesterInfo).text())
                    .col(ColumnDef::new(UsageRecords::ArtifactRef).string_len(255))
                    .col(ColumnDef::new(UsageRecords::ArtifactKind).string_len(50))
                    .col(ColumnDef::new(UsageRecords::ErrorMessage).text())
                    .col(
                        ColumnDef::new(UsageRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(UsageRecords::Table, UsageRecords::AccessCodeId)
                            .to(AccessCodes::Table, AccessCodes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Listing per code, newest first.
        manager
            .create_index(
                Index::create()
                    .table(UsageRecords::Table)
                    .col(UsageRecords::AccessCodeId)
                    .col(UsageRecords::CreatedAt)
                    .name("idx_usage_records_access_code_created")
                    .to_owned(),
            )
            .await?;

        // Period statistics.
        manager
            .create_index(
                Index::create()
                    .table(UsageRecords::Table)
                    .col(UsageRecords::Success)
                    .col(UsageRecords::CreatedAt)
                    .name("idx_usage_records_success_created")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UsageRecords::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum UsageRecords {
    Table,
    Id,
    AccessCodeId,
    Success,
    IpAddress,
    UserAgent,
    RequesterInfo,
    ArtifactRef,
    ArtifactKind,
    ErrorMessage,
    CreatedAt,
}

#[derive(Iden)]
enum AccessCodes {
    Table,
    Id,
}
