use chrono::{DateTime, Utc};
use rand::RngExt;
use uuid::Uuid;

use quota_domain::pagination::{PageRequest, Sort};

use crate::domain::repository::AccessCodeRepository;
use crate::domain::types::{
    AccessCode, AccessCodeChanges, AccessCodeStatistics, GENERATED_CODE_LEN, NewAccessCode,
    UpdateOutcome, is_valid_max_usage, normalize_code,
};
use crate::error::LedgerServiceError;

/// Charset for generated access codes (uppercase alphanumeric).
const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Width of the `created_by` column.
const CREATED_BY_LEN: usize = 100;

/// Draws of a generated code before a collision is reported to the caller.
const GENERATE_ATTEMPTS: u32 = 5;

fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..GENERATED_CODE_LEN)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

// ── CreateAccessCode ─────────────────────────────────────────────────────────

pub struct CreateAccessCodeInput {
    /// Caller-chosen code; generated when `None`.
    pub code: Option<String>,
    pub max_usage: u32,
    pub expires_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub created_by: Option<String>,
}

pub struct CreateAccessCodeUseCase<R: AccessCodeRepository> {
    pub repo: R,
}

impl<R: AccessCodeRepository> CreateAccessCodeUseCase<R> {
    pub async fn execute(
        &self,
        input: CreateAccessCodeInput,
    ) -> Result<AccessCode, LedgerServiceError> {
        let generated = input.code.is_none();
        let code = match input.code {
            Some(raw) => normalize_code(&raw).ok_or(LedgerServiceError::InvalidAccessCode)?,
            None => generate_code(),
        };
        if !is_valid_max_usage(input.max_usage) {
            return Err(LedgerServiceError::InvalidMaxUsage);
        }
        let mut new = NewAccessCode {
            code,
            max_usage: input.max_usage,
            expires_at: input.expires_at,
            description: input.description,
            created_by: input
                .created_by
                .map(|by| by.chars().take(CREATED_BY_LEN).collect()),
        };

        // Only generated codes are redrawn on collision.
        let mut attempt = 1;
        let access_code = loop {
            match self.repo.create(&new).await {
                Err(LedgerServiceError::AccessCodeAlreadyExists)
                    if generated && attempt < GENERATE_ATTEMPTS =>
                {
                    tracing::warn!(attempt, "generated access code collided");
                    attempt += 1;
                    new.code = generate_code();
                }
                result => break result?,
            }
        };
        tracing::info!(
            access_code_id = %access_code.id,
            max_usage = access_code.max_usage,
            "access code created"
        );
        Ok(access_code)
    }
}

// ── GetAccessCode ────────────────────────────────────────────────────────────

pub struct GetAccessCodeUseCase<R: AccessCodeRepository> {
    pub repo: R,
}

impl<R: AccessCodeRepository> GetAccessCodeUseCase<R> {
    pub async fn execute(&self, id: Uuid) -> Result<AccessCode, LedgerServiceError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(LedgerServiceError::AccessCodeNotFound)
    }
}

// ── ListAccessCodes ──────────────────────────────────────────────────────────

pub struct ListAccessCodesUseCase<R: AccessCodeRepository> {
    pub repo: R,
}

impl<R: AccessCodeRepository> ListAccessCodesUseCase<R> {
    pub async fn execute(
        &self,
        is_active: Option<bool>,
        sort: Sort,
        page: PageRequest,
    ) -> Result<(Vec<AccessCode>, u64), LedgerServiceError> {
        self.repo.list(is_active, sort, page.clamped()).await
    }
}

// ── UpdateAccessCode ─────────────────────────────────────────────────────────

pub struct UpdateAccessCodeUseCase<R: AccessCodeRepository> {
    pub repo: R,
}

impl<R: AccessCodeRepository> UpdateAccessCodeUseCase<R> {
    pub async fn execute(
        &self,
        id: Uuid,
        changes: AccessCodeChanges,
    ) -> Result<AccessCode, LedgerServiceError> {
        if changes.is_empty() {
            return Err(LedgerServiceError::MissingData);
        }
        if changes.max_usage.is_some_and(|max| !is_valid_max_usage(max)) {
            return Err(LedgerServiceError::InvalidMaxUsage);
        }
        match self.repo.update(id, &changes).await? {
            UpdateOutcome::Updated(code) => {
                tracing::info!(access_code_id = %code.id, "access code updated");
                Ok(code)
            }
            UpdateOutcome::NotFound => Err(LedgerServiceError::AccessCodeNotFound),
            UpdateOutcome::BelowUsage { usage_count } => {
                tracing::info!(
                    access_code_id = %id,
                    usage_count,
                    "rejected max_usage below consumed uses"
                );
                Err(LedgerServiceError::InvalidMaxUsage)
            }
        }
    }
}

// ── DeleteAccessCode ─────────────────────────────────────────────────────────

pub struct DeleteAccessCodeUseCase<R: AccessCodeRepository> {
    pub repo: R,
}

impl<R: AccessCodeRepository> DeleteAccessCodeUseCase<R> {
    pub async fn execute(&self, id: Uuid) -> Result<(), LedgerServiceError> {
        let deleted = self.repo.delete(id).await?;
        if !deleted {
            return Err(LedgerServiceError::AccessCodeNotFound);
        }
        tracing::info!(access_code_id = %id, "access code deleted");
        Ok(())
    }
}

// ── AccessCodeStatistics ─────────────────────────────────────────────────────

pub struct AccessCodeStatisticsUseCase<R: AccessCodeRepository> {
    pub repo: R,
}

impl<R: AccessCodeRepository> AccessCodeStatisticsUseCase<R> {
    pub async fn execute(&self) -> Result<AccessCodeStatistics, LedgerServiceError> {
        self.repo.statistics().await
    }
}
