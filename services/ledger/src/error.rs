use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::domain::types::Reason;

/// Ledger service error variants.
#[derive(Debug, thiserror::Error)]
pub enum LedgerServiceError {
    #[error("access code not found")]
    AccessCodeNotFound,
    #[error("access code is inactive")]
    AccessCodeInactive,
    #[error("access code has expired")]
    AccessCodeExpired,
    #[error("access code usage limit reached")]
    AccessCodeExhausted,
    #[error("access code already exists")]
    AccessCodeAlreadyExists,
    #[error("invalid access code")]
    InvalidAccessCode,
    #[error("invalid max usage")]
    InvalidMaxUsage,
    #[error("missing data")]
    MissingData,
    /// Lock wait or transaction deadline exceeded. Safe to retry.
    #[error("ledger busy, retry later")]
    LedgerBusy,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl LedgerServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AccessCodeNotFound => "ACCESS_CODE_NOT_FOUND",
            Self::AccessCodeInactive => "ACCESS_CODE_INACTIVE",
            Self::AccessCodeExpired => "ACCESS_CODE_EXPIRED",
            Self::AccessCodeExhausted => "ACCESS_CODE_EXHAUSTED",
            Self::AccessCodeAlreadyExists => "ACCESS_CODE_ALREADY_EXISTS",
            Self::InvalidAccessCode => "INVALID_ACCESS_CODE",
            Self::InvalidMaxUsage => "INVALID_MAX_USAGE",
            Self::MissingData => "MISSING_DATA",
            Self::LedgerBusy => "LEDGER_BUSY",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Error for a rejected validate/consume, or `None` when the reason is `Ok`.
    pub fn from_rejection(reason: Reason) -> Option<Self> {
        match reason {
            Reason::Ok => None,
            Reason::NotFound => Some(Self::AccessCodeNotFound),
            Reason::Inactive => Some(Self::AccessCodeInactive),
            Reason::Expired => Some(Self::AccessCodeExpired),
            Reason::Exhausted => Some(Self::AccessCodeExhausted),
        }
    }
}

impl IntoResponse for LedgerServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::AccessCodeNotFound => StatusCode::NOT_FOUND,
            Self::AccessCodeInactive => StatusCode::FORBIDDEN,
            Self::AccessCodeExpired => StatusCode::GONE,
            Self::AccessCodeExhausted => StatusCode::TOO_MANY_REQUESTS,
            Self::AccessCodeAlreadyExists => StatusCode::CONFLICT,
            Self::InvalidAccessCode | Self::InvalidMaxUsage | Self::MissingData => {
                StatusCode::BAD_REQUEST
            }
            Self::LedgerBusy => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // TraceLayer already records every status. Only internal failures carry
        // a cause chain worth logging here.
        if let Self::Internal(ref e) = self {
            tracing::error!(error = ?e, kind = "INTERNAL", "internal error");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
