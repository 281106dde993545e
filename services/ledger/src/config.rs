use std::time::Duration;

use quota_core::tracing::LogFormat;

use crate::infra::db::LedgerLimits;
use crate::usecase::ledger::RetryPolicy;

const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:5173", "http://localhost:3000"];

/// Ledger service configuration loaded from environment variables.
#[derive(Debug)]
pub struct LedgerConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// TCP port to listen on (default 3114). Env var: `LEDGER_PORT`.
    pub ledger_port: u16,
    /// Pool size (default 10). Env var: `DB_MAX_CONNECTIONS`.
    pub db_max_connections: u32,
    /// How long to wait for a pooled connection (default 3000 ms).
    /// Env var: `DB_ACQUIRE_TIMEOUT_MS`.
    pub db_acquire_timeout: Duration,
    /// Lock wait and consume deadline.
    /// Env vars: `LEDGER_LOCK_TIMEOUT_MS` (2000), `LEDGER_CONSUME_TIMEOUT_MS` (5000).
    pub limits: LedgerLimits,
    /// Env vars: `LEDGER_CONSUME_MAX_ATTEMPTS` (3), `LEDGER_RETRY_BACKOFF_MS` (25).
    pub retry: RetryPolicy,
    /// `json` (default) or `pretty`. Env var: `LOG_FORMAT`.
    pub log_format: LogFormat,
    /// Comma-separated browser origins allowed by CORS; `*` allows any.
    /// Env var: `CORS_ALLOWED_ORIGINS` (the local dev servers).
    pub cors_allowed_origins: Vec<String>,
}

impl LedgerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unparsable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let number = |key: &str, default: u64| -> u64 {
            lookup(key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        };
        let millis = |key: &str, default: u64| Duration::from_millis(number(key, default));

        Self {
            database_url: lookup("DATABASE_URL").expect("DATABASE_URL"),
            ledger_port: lookup("LEDGER_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(3114),
            db_max_connections: lookup("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            db_acquire_timeout: millis("DB_ACQUIRE_TIMEOUT_MS", 3000),
            limits: LedgerLimits {
                lock_timeout: millis("LEDGER_LOCK_TIMEOUT_MS", 2000),
                consume_timeout: millis("LEDGER_CONSUME_TIMEOUT_MS", 5000),
            },
            retry: RetryPolicy {
                max_attempts: lookup("LEDGER_CONSUME_MAX_ATTEMPTS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(3),
                backoff: millis("LEDGER_RETRY_BACKOFF_MS", 25),
            },
            log_format: LogFormat::from_env_value(lookup("LOG_FORMAT").as_deref()),
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty())
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_else(|| {
                    DEFAULT_CORS_ORIGINS
                        .iter()
                        .map(|origin| origin.to_string())
                        .collect()
                }),
        }
    }
}
