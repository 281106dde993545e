//! Metering of expensive work against an access code.
//!
//! The code is validated before the work so obviously unusable codes fail
//! fast, and consumed exactly once after the work succeeds. Nothing is
//! reserved up front: two callers may both pass validation and race at
//! consume, in which case the loser's artifact is dropped. Quota is never
//! over-counted because consume alone is atomic.

use std::future::Future;

use crate::domain::repository::AccessCodeLedger;
use crate::domain::types::{ConsumeContext, Reason};
use crate::error::LedgerServiceError;
use crate::usecase::ledger::{RetryPolicy, consume_with_retry, validate_code};

/// An artifact that was paid for with one use of a code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metered<T> {
    pub artifact: T,
    pub remaining_usage: u32,
}

pub struct MeteredWorkUseCase<L: AccessCodeLedger> {
    pub ledger: L,
    pub retry: RetryPolicy,
}

impl<L: AccessCodeLedger> MeteredWorkUseCase<L> {
    pub async fn execute<T, F, Fut>(
        &self,
        code: &str,
        context: ConsumeContext,
        work: F,
    ) -> Result<Metered<T>, LedgerServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, LedgerServiceError>>,
    {
        let validation = validate_code(&self.ledger, code).await?;
        if !validation.valid {
            return Err(rejection(validation.reason));
        }

        // A failed work step never reaches the ledger.
        let artifact = work().await?;

        let outcome = consume_with_retry(&self.ledger, code, context, self.retry).await?;
        match outcome.remaining_usage {
            Some(remaining_usage) if outcome.success => Ok(Metered {
                artifact,
                remaining_usage,
            }),
            _ => {
                tracing::info!(reason = ?outcome.reason, "consume lost after work, artifact discarded");
                Err(rejection(outcome.reason))
            }
        }
    }
}

fn rejection(reason: Reason) -> LedgerServiceError {
    // An `Ok` reason never reaches here; fall back to the capacity error.
    LedgerServiceError::from_rejection(reason).unwrap_or(LedgerServiceError::AccessCodeExhausted)
}
