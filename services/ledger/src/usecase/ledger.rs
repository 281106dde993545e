use std::time::Duration;

use chrono::Utc;

use crate::domain::repository::AccessCodeLedger;
use crate::domain::types::{ConsumeContext, ConsumeOutcome, Reason, Validation, normalize_code};
use crate::error::LedgerServiceError;

/// How often a contended consume is retried before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Values below 1 act as 1.
    pub max_attempts: u32,
    /// Linear backoff step: attempt `n` waits `n * backoff` before the next.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(25),
        }
    }
}

/// Read-only check of a presented code.
pub(crate) async fn validate_code<L: AccessCodeLedger>(
    ledger: &L,
    raw_code: &str,
) -> Result<Validation, LedgerServiceError> {
    let Some(code) = normalize_code(raw_code) else {
        return Ok(Validation::evaluate(None, Utc::now()));
    };
    let found = ledger.lookup(&code).await?;
    Ok(Validation::evaluate(found.as_ref(), Utc::now()))
}

/// Consume one use, retrying `LedgerBusy` per `retry`. Exhausted retries
/// surface as `LedgerBusy`, never as a capacity rejection.
pub(crate) async fn consume_with_retry<L: AccessCodeLedger>(
    ledger: &L,
    raw_code: &str,
    context: ConsumeContext,
    retry: RetryPolicy,
) -> Result<ConsumeOutcome, LedgerServiceError> {
    let Some(code) = normalize_code(raw_code) else {
        return Ok(ConsumeOutcome::rejected(Reason::NotFound, None));
    };
    let context = context.clipped();
    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match ledger.consume(&code, &context).await {
            Err(LedgerServiceError::LedgerBusy) if attempt < max_attempts => {
                tracing::warn!(attempt, max_attempts, "ledger busy, retrying consume");
                tokio::time::sleep(retry.backoff * attempt).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

// ── ValidateAccessCode ───────────────────────────────────────────────────────

pub struct ValidateAccessCodeUseCase<L: AccessCodeLedger> {
    pub ledger: L,
}

impl<L: AccessCodeLedger> ValidateAccessCodeUseCase<L> {
    pub async fn execute(&self, code: &str) -> Result<Validation, LedgerServiceError> {
        validate_code(&self.ledger, code).await
    }
}

// ── ConsumeAccessCode ────────────────────────────────────────────────────────

pub struct ConsumeAccessCodeUseCase<L: AccessCodeLedger> {
    pub ledger: L,
    pub retry: RetryPolicy,
}

impl<L: AccessCodeLedger> ConsumeAccessCodeUseCase<L> {
    pub async fn execute(
        &self,
        code: &str,
        context: ConsumeContext,
    ) -> Result<ConsumeOutcome, LedgerServiceError> {
        consume_with_retry(&self.ledger, code, context, self.retry).await
    }
}
