use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header},
};
use serde::{Deserialize, Serialize};

use crate::domain::types::{ConsumeContext, ConsumeOutcome, Reason, Validation};
use crate::error::LedgerServiceError;
use crate::state::AppState;
use crate::usecase::ledger::{ConsumeAccessCodeUseCase, ValidateAccessCodeUseCase};

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

// ── POST /access-codes/validate ──────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ValidateRequest {
    pub code: String,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub reason: Reason,
    pub message: &'static str,
    pub remaining_usage: Option<u32>,
}

impl From<Validation> for ValidateResponse {
    fn from(v: Validation) -> Self {
        Self {
            valid: v.valid,
            reason: v.reason,
            message: v.reason.message(),
            remaining_usage: v.remaining_usage,
        }
    }
}

/// Business outcomes are always `200`; only faults map to error statuses.
pub async fn validate_access_code(
    State(state): State<AppState>,
    Json(body): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>, LedgerServiceError> {
    let usecase = ValidateAccessCodeUseCase {
        ledger: state.ledger(),
    };
    Ok(Json(usecase.execute(&body.code).await?.into()))
}

// ── POST /access-codes/consume ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ConsumeRequest {
    pub code: String,
    pub requester_info: Option<String>,
    pub artifact_ref: Option<String>,
    pub artifact_kind: Option<String>,
}

#[derive(Serialize)]
pub struct ConsumeResponse {
    pub success: bool,
    pub reason: Reason,
    pub message: &'static str,
    pub remaining_usage: Option<u32>,
}

impl From<ConsumeOutcome> for ConsumeResponse {
    fn from(o: ConsumeOutcome) -> Self {
        Self {
            success: o.success,
            reason: o.reason,
            message: o.reason.message(),
            remaining_usage: o.remaining_usage,
        }
    }
}

pub async fn consume_access_code(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ConsumeRequest>,
) -> Result<Json<ConsumeResponse>, LedgerServiceError> {
    let context = ConsumeContext {
        ip_address: client_ip(&headers),
        user_agent: header_str(&headers, header::USER_AGENT.as_str()).map(str::to_owned),
        requester_info: body.requester_info,
        artifact_ref: body.artifact_ref,
        artifact_kind: body.artifact_kind,
    };
    let usecase = ConsumeAccessCodeUseCase {
        ledger: state.ledger(),
        retry: state.retry,
    };
    Ok(Json(usecase.execute(&body.code, context).await?.into()))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// First hop of `x-forwarded-for`, else `x-real-ip`.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    header_str(headers, X_FORWARDED_FOR)
        .and_then(|v| v.split(',').next())
        .or_else(|| header_str(headers, X_REAL_IP))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}
