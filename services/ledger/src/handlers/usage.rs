use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quota_domain::pagination::{Page, PageRequest};

use crate::domain::types::{UsageRecord, UsageStatistics};
use crate::error::LedgerServiceError;
use crate::state::AppState;
use crate::usecase::usage::{ListUsageRecordsUseCase, UsageStatisticsUseCase};

#[derive(Serialize)]
pub struct UsageRecordResponse {
    pub id: Uuid,
    pub access_code_id: Uuid,
    pub success: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub requester_info: Option<String>,
    pub artifact_ref: Option<String>,
    pub artifact_kind: Option<String>,
    pub error_message: Option<String>,
    #[serde(serialize_with = "quota_core::serde::to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
}

impl From<UsageRecord> for UsageRecordResponse {
    fn from(record: UsageRecord) -> Self {
        Self {
            id: record.id,
            access_code_id: record.access_code_id,
            success: record.success,
            ip_address: record.context.ip_address,
            user_agent: record.context.user_agent,
            requester_info: record.context.requester_info,
            artifact_ref: record.context.artifact_ref,
            artifact_kind: record.context.artifact_kind,
            error_message: record.error_message,
            created_at: record.created_at,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct UsageRecordListQuery {
    pub per_page: Option<u32>,
    pub page: Option<u32>,
}

#[derive(Deserialize, Default)]
pub struct UsageStatisticsQuery {
    pub days: Option<u32>,
}

// ── GET /access-codes/{id}/usage-records ─────────────────────────────────────

pub async fn list_usage_records(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UsageRecordListQuery>,
) -> Result<Json<Page<UsageRecordResponse>>, LedgerServiceError> {
    let page = PageRequest::new(query.per_page, query.page);
    let usecase = ListUsageRecordsUseCase {
        codes: state.access_code_repo(),
        usage: state.usage_repo(),
    };
    let (records, total) = usecase.execute(id, page).await?;
    Ok(Json(
        Page::new(records, page, total).map(UsageRecordResponse::from),
    ))
}

// ── GET /usage-records/statistics ────────────────────────────────────────────

pub async fn usage_statistics(
    State(state): State<AppState>,
    Query(query): Query<UsageStatisticsQuery>,
) -> Result<Json<UsageStatistics>, LedgerServiceError> {
    let usecase = UsageStatisticsUseCase {
        usage: state.usage_repo(),
    };
    Ok(Json(usecase.execute(query.days).await?))
}
