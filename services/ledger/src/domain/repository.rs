#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};
use uuid::Uuid;

use quota_domain::pagination::{PageRequest, Sort};

use crate::domain::types::{
    AccessCode, AccessCodeChanges, AccessCodeStatistics, ConsumeContext, ConsumeOutcome,
    NewAccessCode, UpdateOutcome, UsageRecord, UsageStatistics,
};
use crate::error::LedgerServiceError;

/// The quota ledger: read-only lookup plus the atomic consume step.
pub trait AccessCodeLedger: Send + Sync {
    /// Find a code by its (normalized) string. Never mutates.
    async fn lookup(&self, code: &str) -> Result<Option<AccessCode>, LedgerServiceError>;

    /// Consume one use of `code` in a single atomic step.
    ///
    /// The capacity check and the increment are one indivisible operation,
    /// committed together with the usage record. Business rejections come
    /// back as `Ok` outcomes; `Err` is reserved for contention
    /// (`LedgerBusy`) and storage failures, both of which leave no trace.
    async fn consume(
        &self,
        code: &str,
        context: &ConsumeContext,
    ) -> Result<ConsumeOutcome, LedgerServiceError>;
}

/// Administrative access to codes. Never writes `usage_count`.
pub trait AccessCodeRepository: Send + Sync {
    /// Insert a new, active code with zero usage and return it as stored.
    /// Fails with `AccessCodeAlreadyExists` on a duplicate.
    async fn create(&self, new: &NewAccessCode) -> Result<AccessCode, LedgerServiceError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AccessCode>, LedgerServiceError>;

    /// Page through codes, optionally only active (or only deactivated) ones.
    async fn list(
        &self,
        is_active: Option<bool>,
        sort: Sort,
        page: PageRequest,
    ) -> Result<(Vec<AccessCode>, u64), LedgerServiceError>;

    async fn update(
        &self,
        id: Uuid,
        changes: &AccessCodeChanges,
    ) -> Result<UpdateOutcome, LedgerServiceError>;

    /// Delete a code together with its usage records. Returns `false` if absent.
    async fn delete(&self, id: Uuid) -> Result<bool, LedgerServiceError>;

    async fn statistics(&self) -> Result<AccessCodeStatistics, LedgerServiceError>;
}

/// Read access to the usage log.
pub trait UsageRecordRepository: Send + Sync {
    /// Records of one code, newest first.
    async fn list_by_code(
        &self,
        access_code_id: Uuid,
        page: PageRequest,
    ) -> Result<(Vec<UsageRecord>, u64), LedgerServiceError>;

    async fn statistics(
        &self,
        since: DateTime<Utc>,
        period_days: u32,
    ) -> Result<UsageStatistics, LedgerServiceError>;
}
