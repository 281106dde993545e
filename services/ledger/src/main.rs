use sea_orm::{ConnectOptions, Database};
use tracing::info;

use quota_core::tracing::init_tracing;
use quota_ledger::config::LedgerConfig;
use quota_ledger::router::build_router;
use quota_ledger::state::AppState;

#[tokio::main]
async fn main() {
    let config = LedgerConfig::from_env();
    init_tracing(config.log_format);

    let mut options = ConnectOptions::new(config.database_url.clone());
    options
        .max_connections(config.db_max_connections)
        .acquire_timeout(config.db_acquire_timeout)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("failed to connect to database");

    let state = AppState {
        db,
        limits: config.limits,
        retry: config.retry,
    };

    let router = build_router(state, &config.cors_allowed_origins);
    let addr = format!("0.0.0.0:{}", config.ledger_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!(
        max_attempts = config.retry.max_attempts,
        lock_timeout_ms = config.limits.lock_timeout.as_millis() as u64,
        "ledger service listening on {addr}"
    );
    axum::serve(listener, router).await.expect("server error");
}
