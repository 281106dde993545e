use sea_orm::DatabaseConnection;

use crate::infra::db::{
    DbAccessCodeLedger, DbAccessCodeRepository, DbUsageRecordRepository, LedgerLimits,
};
use crate::usecase::ledger::RetryPolicy;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub limits: LedgerLimits,
    pub retry: RetryPolicy,
}

impl AppState {
    pub fn ledger(&self) -> DbAccessCodeLedger {
        DbAccessCodeLedger {
            db: self.db.clone(),
            limits: self.limits,
        }
    }

    pub fn access_code_repo(&self) -> DbAccessCodeRepository {
        DbAccessCodeRepository {
            db: self.db.clone(),
        }
    }

    pub fn usage_repo(&self) -> DbUsageRecordRepository {
        DbUsageRecordRepository {
            db: self.db.clone(),
        }
    }
}
