use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quota_domain::pagination::{Page, PageRequest, Sort};

use crate::domain::types::{AccessCode, AccessCodeChanges, AccessCodeStatistics, AccessCodeStatus};
use crate::error::LedgerServiceError;
use crate::state::AppState;
use crate::usecase::access_code::{
    AccessCodeStatisticsUseCase, CreateAccessCodeInput, CreateAccessCodeUseCase,
    DeleteAccessCodeUseCase, GetAccessCodeUseCase, ListAccessCodesUseCase,
    UpdateAccessCodeUseCase,
};

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct AccessCodeResponse {
    pub id: Uuid,
    pub code: String,
    pub max_usage: u32,
    pub usage_count: u32,
    pub remaining_usage: u32,
    pub status: AccessCodeStatus,
    pub is_active: bool,
    #[serde(serialize_with = "quota_core::serde::to_rfc3339_ms_opt")]
    pub expires_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub created_by: Option<String>,
    #[serde(serialize_with = "quota_core::serde::to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "quota_core::serde::to_rfc3339_ms")]
    pub updated_at: DateTime<Utc>,
}

impl From<AccessCode> for AccessCodeResponse {
    fn from(code: AccessCode) -> Self {
        Self {
            remaining_usage: code.remaining_usage(),
            status: code.status(),
            id: code.id,
            code: code.code,
            max_usage: code.max_usage,
            usage_count: code.usage_count,
            is_active: code.is_active,
            expires_at: code.expires_at,
            description: code.description,
            created_by: code.created_by,
            created_at: code.created_at,
            updated_at: code.updated_at,
        }
    }
}

// ── Query params ─────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct AccessCodeListQuery {
    pub per_page: Option<u32>,
    pub page: Option<u32>,
    pub is_active: Option<bool>,
    pub sort: Option<Sort>,
}

// ── POST /access-codes ───────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateAccessCodeRequest {
    pub code: Option<String>,
    pub max_usage: u32,
    pub expires_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub created_by: Option<String>,
}

pub async fn create_access_code(
    State(state): State<AppState>,
    Json(body): Json<CreateAccessCodeRequest>,
) -> Result<(StatusCode, Json<AccessCodeResponse>), LedgerServiceError> {
    let usecase = CreateAccessCodeUseCase {
        repo: state.access_code_repo(),
    };
    let code = usecase
        .execute(CreateAccessCodeInput {
            code: body.code,
            max_usage: body.max_usage,
            expires_at: body.expires_at,
            description: body.description,
            created_by: body.created_by,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(code.into())))
}

// ── GET /access-codes ────────────────────────────────────────────────────────

pub async fn list_access_codes(
    State(state): State<AppState>,
    Query(query): Query<AccessCodeListQuery>,
) -> Result<Json<Page<AccessCodeResponse>>, LedgerServiceError> {
    let page = PageRequest::new(query.per_page, query.page);
    let usecase = ListAccessCodesUseCase {
        repo: state.access_code_repo(),
    };
    let (codes, total) = usecase
        .execute(query.is_active, query.sort.unwrap_or_default(), page)
        .await?;
    Ok(Json(
        Page::new(codes, page, total).map(AccessCodeResponse::from),
    ))
}

// ── GET /access-codes/statistics ─────────────────────────────────────────────

pub async fn access_code_statistics(
    State(state): State<AppState>,
) -> Result<Json<AccessCodeStatistics>, LedgerServiceError> {
    let usecase = AccessCodeStatisticsUseCase {
        repo: state.access_code_repo(),
    };
    Ok(Json(usecase.execute().await?))
}

// ── GET /access-codes/{id} ───────────────────────────────────────────────────

pub async fn get_access_code(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AccessCodeResponse>, LedgerServiceError> {
    let usecase = GetAccessCodeUseCase {
        repo: state.access_code_repo(),
    };
    Ok(Json(usecase.execute(id).await?.into()))
}

// ── PATCH /access-codes/{id} ─────────────────────────────────────────────────

/// Absent fields are left alone; `null` clears `expires_at` / `description`.
#[derive(Deserialize, Default)]
pub struct UpdateAccessCodeRequest {
    pub max_usage: Option<u32>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "quota_core::serde::double_option")]
    pub expires_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "quota_core::serde::double_option")]
    pub description: Option<Option<String>>,
}

pub async fn update_access_code(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateAccessCodeRequest>,
) -> Result<Json<AccessCodeResponse>, LedgerServiceError> {
    let usecase = UpdateAccessCodeUseCase {
        repo: state.access_code_repo(),
    };
    let changes = AccessCodeChanges {
        max_usage: body.max_usage,
        is_active: body.is_active,
        expires_at: body.expires_at,
        description: body.description,
    };
    Ok(Json(usecase.execute(id, changes).await?.into()))
}

// ── DELETE /access-codes/{id} ────────────────────────────────────────────────

pub async fn delete_access_code(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, LedgerServiceError> {
    let usecase = DeleteAccessCodeUseCase {
        repo: state.access_code_repo(),
    };
    usecase.execute(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
