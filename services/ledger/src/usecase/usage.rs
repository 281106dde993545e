use chrono::{Duration, Utc};
use uuid::Uuid;

use quota_domain::pagination::PageRequest;

use crate::domain::repository::{AccessCodeRepository, UsageRecordRepository};
use crate::domain::types::{DEFAULT_STATS_DAYS, UsageRecord, UsageStatistics};
use crate::error::LedgerServiceError;

/// Longest statistics window a caller may ask for.
const MAX_STATS_DAYS: u32 = 365;

// ── ListUsageRecords ─────────────────────────────────────────────────────────

pub struct ListUsageRecordsUseCase<C: AccessCodeRepository, U: UsageRecordRepository> {
    pub codes: C,
    pub usage: U,
}

impl<C: AccessCodeRepository, U: UsageRecordRepository> ListUsageRecordsUseCase<C, U> {
    pub async fn execute(
        &self,
        access_code_id: Uuid,
        page: PageRequest,
    ) -> Result<(Vec<UsageRecord>, u64), LedgerServiceError> {
        if self.codes.find_by_id(access_code_id).await?.is_none() {
            return Err(LedgerServiceError::AccessCodeNotFound);
        }
        self.usage.list_by_code(access_code_id, page.clamped()).await
    }
}

// ── UsageStatistics ──────────────────────────────────────────────────────────

pub struct UsageStatisticsUseCase<U: UsageRecordRepository> {
    pub usage: U,
}

impl<U: UsageRecordRepository> UsageStatisticsUseCase<U> {
    /// Statistics over the last `days` days (default 30, clamped to 1..=365).
    pub async fn execute(&self, days: Option<u32>) -> Result<UsageStatistics, LedgerServiceError> {
        let days = days.unwrap_or(DEFAULT_STATS_DAYS).clamp(1, MAX_STATS_DAYS);
        let since = Utc::now() - Duration::days(i64::from(days));
        self.usage.statistics(since, days).await
    }
}
