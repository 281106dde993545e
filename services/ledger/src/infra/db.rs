use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, Condition, ConnAcquireErr, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbBackend, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, SqlErr, TransactionError, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use quota_domain::pagination::{PageRequest, Sort};
use quota_ledger_schema::{access_codes, usage_records};

use crate::domain::repository::{AccessCodeLedger, AccessCodeRepository, UsageRecordRepository};
use crate::domain::types::{
    AccessCode, AccessCodeChanges, AccessCodeStatistics, ConsumeContext, ConsumeOutcome,
    NewAccessCode, Reason, UpdateOutcome, UsageRecord, UsageStatistics,
};
use crate::error::LedgerServiceError;

/// Substrings of driver errors that mean "lost a race for a lock", not "broken".
const CONTENTION_MARKERS: &[&str] = &[
    "lock timeout",
    "could not serialize access",
    "deadlock detected",
    "database is locked",
];

// ── Ledger ────────────────────────────────────────────────────────────────────

/// Bounds on how long a consume may wait for the code's row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerLimits {
    /// Per-statement lock wait (PostgreSQL `lock_timeout`).
    pub lock_timeout: Duration,
    /// Deadline for the whole consume transaction.
    pub consume_timeout: Duration,
}

impl Default for LedgerLimits {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(2000),
            consume_timeout: Duration::from_millis(5000),
        }
    }
}

#[derive(Clone)]
pub struct DbAccessCodeLedger {
    pub db: DatabaseConnection,
    pub limits: LedgerLimits,
}

/// What a single consume transaction ended with.
enum Attempt {
    Settled(ConsumeOutcome),
    /// The conditional update matched nothing yet the row reads as usable:
    /// an administrative edit landed in between. Nothing was written.
    Contended,
}

impl AccessCodeLedger for DbAccessCodeLedger {
    async fn lookup(&self, code: &str) -> Result<Option<AccessCode>, LedgerServiceError> {
        let model = access_codes::Entity::find()
            .filter(access_codes::Column::Code.eq(code))
            .one(&self.db)
            .await
            .context("look up access code")?;
        Ok(model.map(access_code_from_model))
    }

    async fn consume(
        &self,
        code: &str,
        context: &ConsumeContext,
    ) -> Result<ConsumeOutcome, LedgerServiceError> {
        let lock_timeout = self.limits.lock_timeout;
        let code = code.to_owned();
        let context = context.clone();

        // Dropped before commit means rolled back.
        let work = self.db.transaction::<_, Attempt, DbErr>(|txn| {
            Box::pin(async move {
                bound_lock_wait(txn, lock_timeout).await?;
                consume_in(txn, &code, &context, Utc::now()).await
            })
        });

        let Ok(result) = tokio::time::timeout(self.limits.consume_timeout, work).await else {
            tracing::warn!(
                timeout_ms = self.limits.consume_timeout.as_millis() as u64,
                "consume deadline exceeded"
            );
            return Err(LedgerServiceError::LedgerBusy);
        };

        match result {
            Ok(Attempt::Settled(outcome)) => Ok(outcome),
            Ok(Attempt::Contended) => {
                tracing::warn!("access code changed during consume");
                Err(LedgerServiceError::LedgerBusy)
            }
            Err(err) => Err(classify_transaction_error(err, "consume access code")),
        }
    }
}

async fn bound_lock_wait(txn: &DatabaseTransaction, lock_timeout: Duration) -> Result<(), DbErr> {
    if txn.get_database_backend() == DbBackend::Postgres {
        txn.execute_unprepared(&format!(
            "SET LOCAL lock_timeout = '{}ms'",
            lock_timeout.as_millis()
        ))
        .await?;
    }
    Ok(())
}

async fn consume_in(
    txn: &DatabaseTransaction,
    code: &str,
    context: &ConsumeContext,
    now: DateTime<Utc>,
) -> Result<Attempt, DbErr> {
    // Check and increment in one statement, issued before any read so the
    // write lock is taken up front. Concurrent consumers of the same code
    // queue on it instead of failing a lock upgrade.
    let updated = access_codes::Entity::update_many()
        .col_expr(
            access_codes::Column::UsageCount,
            Expr::col(access_codes::Column::UsageCount).add(1),
        )
        .col_expr(access_codes::Column::UpdatedAt, Expr::value(now))
        .filter(access_codes::Column::Code.eq(code))
        .filter(access_codes::Column::IsActive.eq(true))
        .filter(
            Expr::col(access_codes::Column::UsageCount)
                .lt(Expr::col(access_codes::Column::MaxUsage)),
        )
        .filter(
            Condition::any()
                .add(access_codes::Column::ExpiresAt.is_null())
                .add(access_codes::Column::ExpiresAt.gt(now)),
        )
        .exec(txn)
        .await?;

    let Some(current) = access_codes::Entity::find()
        .filter(access_codes::Column::Code.eq(code))
        .one(txn)
        .await?
    else {
        tracing::debug!("consume of unknown access code");
        return Ok(Attempt::Settled(ConsumeOutcome::rejected(
            Reason::NotFound,
            None,
        )));
    };
    let current = access_code_from_model(current);

    if updated.rows_affected == 1 {
        insert_usage_record(txn, current.id, true, context, None, now).await?;
        let remaining = current.remaining_usage();
        tracing::info!(access_code_id = %current.id, remaining, "access code consumed");
        return Ok(Attempt::Settled(ConsumeOutcome::consumed(remaining)));
    }

    let reason = Reason::from(current.status_at(now));
    if reason == Reason::Ok {
        return Ok(Attempt::Contended);
    }
    insert_usage_record(
        txn,
        current.id,
        false,
        context,
        Some(reason.message()),
        now,
    )
    .await?;
    tracing::info!(access_code_id = %current.id, ?reason, "access code consume rejected");
    Ok(Attempt::Settled(ConsumeOutcome::rejected(
        reason,
        Some(current.remaining_usage()),
    )))
}

async fn insert_usage_record(
    txn: &DatabaseTransaction,
    access_code_id: Uuid,
    success: bool,
    context: &ConsumeContext,
    error_message: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), DbErr> {
    let record = usage_records::ActiveModel {
        id: Set(Uuid::now_v7()),
        access_code_id: Set(access_code_id),
        success: Set(success),
        ip_address: Set(context.ip_address.clone()),
        user_agent: Set(context.user_agent.clone()),
        requester_info: Set(context.requester_info.clone()),
        artifact_ref: Set(context.artifact_ref.clone()),
        artifact_kind: Set(context.artifact_kind.clone()),
        error_message: Set(error_message.map(str::to_owned)),
        created_at: Set(now),
    };
    usage_records::Entity::insert(record)
        .exec_without_returning(txn)
        .await?;
    Ok(())
}

/// Whether a storage error is lock contention (retryable) rather than a fault.
pub fn is_contention(err: &DbErr) -> bool {
    if matches!(err, DbErr::ConnectionAcquire(ConnAcquireErr::Timeout)) {
        return true;
    }
    let message = err.to_string();
    CONTENTION_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

fn classify_transaction_error(
    err: TransactionError<DbErr>,
    action: &'static str,
) -> LedgerServiceError {
    let err = match err {
        TransactionError::Connection(e) | TransactionError::Transaction(e) => e,
    };
    if is_contention(&err) {
        tracing::warn!(error = %err, action, "ledger contention");
        LedgerServiceError::LedgerBusy
    } else {
        LedgerServiceError::Internal(anyhow::Error::new(err).context(action))
    }
}

// ── AccessCode repository ─────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbAccessCodeRepository {
    pub db: DatabaseConnection,
}

impl AccessCodeRepository for DbAccessCodeRepository {
    async fn create(&self, new: &NewAccessCode) -> Result<AccessCode, LedgerServiceError> {
        let now = Utc::now();
        let code = AccessCode {
            id: Uuid::now_v7(),
            code: new.code.clone(),
            max_usage: new.max_usage,
            usage_count: 0,
            is_active: true,
            expires_at: new.expires_at,
            description: new.description.clone(),
            created_by: new.created_by.clone(),
            created_at: now,
            updated_at: now,
        };
        let model = access_codes::ActiveModel {
            id: Set(code.id),
            code: Set(code.code.clone()),
            max_usage: Set(code.max_usage as i32),
            usage_count: Set(0),
            is_active: Set(code.is_active),
            expires_at: Set(code.expires_at),
            description: Set(code.description.clone()),
            created_by: Set(code.created_by.clone()),
            created_at: Set(code.created_at),
            updated_at: Set(code.updated_at),
        };
        match access_codes::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await
        {
            Ok(_) => Ok(code),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(LedgerServiceError::AccessCodeAlreadyExists)
            }
            Err(err) => Err(anyhow::Error::new(err).context("create access code").into()),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AccessCode>, LedgerServiceError> {
        let model = access_codes::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find access code by id")?;
        Ok(model.map(access_code_from_model))
    }

    async fn list(
        &self,
        is_active: Option<bool>,
        sort: Sort,
        page: PageRequest,
    ) -> Result<(Vec<AccessCode>, u64), LedgerServiceError> {
        let mut query = access_codes::Entity::find();
        if let Some(active) = is_active {
            query = query.filter(access_codes::Column::IsActive.eq(active));
        }
        query = match sort {
            Sort::Desc => query
                .order_by_desc(access_codes::Column::CreatedAt)
                .order_by_desc(access_codes::Column::Id),
            Sort::Asc => query
                .order_by_asc(access_codes::Column::CreatedAt)
                .order_by_asc(access_codes::Column::Id),
        };
        let total = query
            .clone()
            .count(&self.db)
            .await
            .context("count access codes")?;
        let models = query
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .context("list access codes")?;
        Ok((
            models.into_iter().map(access_code_from_model).collect(),
            total,
        ))
    }

    async fn update(
        &self,
        id: Uuid,
        changes: &AccessCodeChanges,
    ) -> Result<UpdateOutcome, LedgerServiceError> {
        let mut stmt = access_codes::Entity::update_many()
            .col_expr(access_codes::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(access_codes::Column::Id.eq(id));
        if let Some(max_usage) = changes.max_usage {
            // Guarded in the same statement so a concurrent consume cannot
            // slip past a lowered limit.
            stmt = stmt
                .col_expr(
                    access_codes::Column::MaxUsage,
                    Expr::value(max_usage as i32),
                )
                .filter(access_codes::Column::UsageCount.lte(max_usage as i32));
        }
        if let Some(is_active) = changes.is_active {
            stmt = stmt.col_expr(access_codes::Column::IsActive, Expr::value(is_active));
        }
        if let Some(expires_at) = changes.expires_at {
            stmt = stmt.col_expr(access_codes::Column::ExpiresAt, Expr::value(expires_at));
        }
        if let Some(description) = &changes.description {
            stmt = stmt.col_expr(
                access_codes::Column::Description,
                Expr::value(description.clone()),
            );
        }
        let result = stmt.exec(&self.db).await.context("update access code")?;

        match self.find_by_id(id).await? {
            None => Ok(UpdateOutcome::NotFound),
            Some(code) if result.rows_affected == 0 => Ok(UpdateOutcome::BelowUsage {
                usage_count: code.usage_count,
            }),
            Some(code) => Ok(UpdateOutcome::Updated(code)),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, LedgerServiceError> {
        let deleted = self
            .db
            .transaction::<_, bool, DbErr>(|txn| {
                Box::pin(async move {
                    usage_records::Entity::delete_many()
                        .filter(usage_records::Column::AccessCodeId.eq(id))
                        .exec(txn)
                        .await?;
                    let result = access_codes::Entity::delete_by_id(id).exec(txn).await?;
                    Ok(result.rows_affected > 0)
                })
            })
            .await
            .context("delete access code")?;
        Ok(deleted)
    }

    async fn statistics(&self) -> Result<AccessCodeStatistics, LedgerServiceError> {
        let total_codes = access_codes::Entity::find()
            .count(&self.db)
            .await
            .context("count access codes")?;
        let active_codes = access_codes::Entity::find()
            .filter(access_codes::Column::IsActive.eq(true))
            .count(&self.db)
            .await
            .context("count active access codes")?;
        let total_usage: Option<i64> = access_codes::Entity::find()
            .select_only()
            .column_as(
                Expr::col(access_codes::Column::UsageCount).sum(),
                "total_usage",
            )
            .into_tuple()
            .one(&self.db)
            .await
            .context("sum access code usage")?
            .flatten();
        let remaining_usage: Option<i64> = access_codes::Entity::find()
            .select_only()
            .column_as(
                Expr::expr(
                    Expr::col(access_codes::Column::MaxUsage)
                        .sub(Expr::col(access_codes::Column::UsageCount)),
                )
                .sum(),
                "remaining_usage",
            )
            .filter(access_codes::Column::IsActive.eq(true))
            .into_tuple()
            .one(&self.db)
            .await
            .context("sum remaining access code usage")?
            .flatten();
        Ok(AccessCodeStatistics::new(
            total_codes,
            active_codes,
            non_negative(total_usage.unwrap_or(0)),
            non_negative(remaining_usage.unwrap_or(0)),
        ))
    }
}

fn access_code_from_model(model: access_codes::Model) -> AccessCode {
    AccessCode {
        id: model.id,
        code: model.code,
        max_usage: u32::try_from(model.max_usage).unwrap_or(0),
        usage_count: u32::try_from(model.usage_count).unwrap_or(0),
        is_active: model.is_active,
        expires_at: model.expires_at,
        description: model.description,
        created_by: model.created_by,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

fn non_negative(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

// ── UsageRecord repository ────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbUsageRecordRepository {
    pub db: DatabaseConnection,
}

impl UsageRecordRepository for DbUsageRecordRepository {
    async fn list_by_code(
        &self,
        access_code_id: Uuid,
        page: PageRequest,
    ) -> Result<(Vec<UsageRecord>, u64), LedgerServiceError> {
        let query = usage_records::Entity::find()
            .filter(usage_records::Column::AccessCodeId.eq(access_code_id))
            .order_by_desc(usage_records::Column::CreatedAt)
            .order_by_desc(usage_records::Column::Id);
        let total = query
            .clone()
            .count(&self.db)
            .await
            .context("count usage records")?;
        let models = query
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .context("list usage records")?;
        Ok((
            models.into_iter().map(usage_record_from_model).collect(),
            total,
        ))
    }

    async fn statistics(
        &self,
        since: DateTime<Utc>,
        period_days: u32,
    ) -> Result<UsageStatistics, LedgerServiceError> {
        let recent =
            usage_records::Entity::find().filter(usage_records::Column::CreatedAt.gte(since));
        let total_attempts = recent
            .clone()
            .count(&self.db)
            .await
            .context("count usage attempts")?;
        let successful_attempts = recent
            .clone()
            .filter(usage_records::Column::Success.eq(true))
            .count(&self.db)
            .await
            .context("count successful usage attempts")?;
        let per_kind: Vec<(String, i64)> = recent
            .select_only()
            .column(usage_records::Column::ArtifactKind)
            .column_as(Expr::col(usage_records::Column::Id).count(), "attempts")
            .filter(usage_records::Column::ArtifactKind.is_not_null())
            .group_by(usage_records::Column::ArtifactKind)
            .into_tuple()
            .all(&self.db)
            .await
            .context("count usage attempts per artifact kind")?;
        let artifact_kinds: BTreeMap<String, u64> = per_kind
            .into_iter()
            .map(|(kind, attempts)| (kind, non_negative(attempts)))
            .collect();
        Ok(UsageStatistics::new(
            total_attempts,
            successful_attempts,
            artifact_kinds,
            period_days,
        ))
    }
}

fn usage_record_from_model(model: usage_records::Model) -> UsageRecord {
    UsageRecord {
        id: model.id,
        access_code_id: model.access_code_id,
        success: model.success,
        context: ConsumeContext {
            ip_address: model.ip_address,
            user_agent: model.user_agent,
            requester_info: model.requester_info,
            artifact_ref: model.artifact_ref,
            artifact_kind: model.artifact_kind,
        },
        error_message: model.error_message,
        created_at: model.created_at,
    }
}
