use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    cli::run_cli(quota_ledger_migration::Migrator).await;
}
