use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest code a caller may register or present.
pub const MAX_CODE_LEN: usize = 50;

/// Upper bound for `max_usage` on a single code.
pub const MAX_USAGE_LIMIT: u32 = 1000;

/// Length of codes generated when the creator does not supply one.
pub const GENERATED_CODE_LEN: usize = 12;

/// Window for usage statistics when the caller does not pick one.
pub const DEFAULT_STATS_DAYS: u32 = 30;

// Column widths of the usage log.
const IP_ADDRESS_LEN: usize = 45;
const ARTIFACT_REF_LEN: usize = 255;
const ARTIFACT_KIND_LEN: usize = 50;
const FREE_TEXT_LEN: usize = 1024;

/// Prepaid access code with a usage limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCode {
    pub id: Uuid,
    pub code: String,
    pub max_usage: u32,
    pub usage_count: u32,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccessCode {
    /// Status as of `now`. Priority: inactive, exhausted, expired, active.
    pub fn status_at(&self, now: DateTime<Utc>) -> AccessCodeStatus {
        if !self.is_active {
            AccessCodeStatus::Inactive
        } else if self.usage_count >= self.max_usage {
            AccessCodeStatus::Exhausted
        } else if self.expires_at.is_some_and(|at| at <= now) {
            AccessCodeStatus::Expired
        } else {
            AccessCodeStatus::Active
        }
    }

    pub fn status(&self) -> AccessCodeStatus {
        self.status_at(Utc::now())
    }

    pub fn remaining_usage(&self) -> u32 {
        self.max_usage.saturating_sub(self.usage_count)
    }
}

/// Derived state of an access code. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessCodeStatus {
    Active,
    Inactive,
    Expired,
    Exhausted,
}

/// Why a code can or cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reason {
    Ok,
    NotFound,
    Inactive,
    Expired,
    Exhausted,
}

impl Reason {
    pub fn message(self) -> &'static str {
        match self {
            Self::Ok => "access code is valid",
            Self::NotFound => "access code not found",
            Self::Inactive => "access code is inactive",
            Self::Expired => "access code has expired",
            Self::Exhausted => "access code usage limit reached",
        }
    }
}

impl From<AccessCodeStatus> for Reason {
    fn from(status: AccessCodeStatus) -> Self {
        match status {
            AccessCodeStatus::Active => Self::Ok,
            AccessCodeStatus::Inactive => Self::Inactive,
            AccessCodeStatus::Expired => Self::Expired,
            AccessCodeStatus::Exhausted => Self::Exhausted,
        }
    }
}

/// Result of a read-only validity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    pub reason: Reason,
    /// `None` only when the code does not exist.
    pub remaining_usage: Option<u32>,
}

impl Validation {
    pub fn evaluate(code: Option<&AccessCode>, now: DateTime<Utc>) -> Self {
        match code {
            None => Self {
                valid: false,
                reason: Reason::NotFound,
                remaining_usage: None,
            },
            Some(code) => {
                let reason = Reason::from(code.status_at(now));
                Self {
                    valid: reason == Reason::Ok,
                    reason,
                    remaining_usage: Some(code.remaining_usage()),
                }
            }
        }
    }
}

/// Result of a consume attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeOutcome {
    pub success: bool,
    pub reason: Reason,
    pub remaining_usage: Option<u32>,
}

impl ConsumeOutcome {
    pub fn consumed(remaining_usage: u32) -> Self {
        Self {
            success: true,
            reason: Reason::Ok,
            remaining_usage: Some(remaining_usage),
        }
    }

    pub fn rejected(reason: Reason, remaining_usage: Option<u32>) -> Self {
        Self {
            success: false,
            reason,
            remaining_usage,
        }
    }
}

/// Caller-supplied details stored on the usage record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumeContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub requester_info: Option<String>,
    pub artifact_ref: Option<String>,
    pub artifact_kind: Option<String>,
}

impl ConsumeContext {
    /// Clip every field to what the usage log stores. Blank values become `None`.
    pub fn clipped(self) -> Self {
        Self {
            ip_address: clip(self.ip_address, IP_ADDRESS_LEN),
            user_agent: clip(self.user_agent, FREE_TEXT_LEN),
            requester_info: clip(self.requester_info, FREE_TEXT_LEN),
            artifact_ref: clip(self.artifact_ref, ARTIFACT_REF_LEN),
            artifact_kind: clip(self.artifact_kind, ARTIFACT_KIND_LEN),
        }
    }
}

fn clip(value: Option<String>, max: usize) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    Some(value.chars().take(max).collect())
}

/// Append-only log entry for one consume attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRecord {
    pub id: Uuid,
    pub access_code_id: Uuid,
    pub success: bool,
    pub context: ConsumeContext,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a code. `code` is already normalized.
#[derive(Debug, Clone)]
pub struct NewAccessCode {
    pub code: String,
    pub max_usage: u32,
    pub expires_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub created_by: Option<String>,
}

/// Administrative edit. Outer `None` leaves a field untouched; for nullable
/// fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessCodeChanges {
    pub max_usage: Option<u32>,
    pub is_active: Option<bool>,
    pub expires_at: Option<Option<DateTime<Utc>>>,
    pub description: Option<Option<String>>,
}

impl AccessCodeChanges {
    pub fn is_empty(&self) -> bool {
        self.max_usage.is_none()
            && self.is_active.is_none()
            && self.expires_at.is_none()
            && self.description.is_none()
    }
}

/// Outcome of an administrative update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated(AccessCode),
    NotFound,
    /// The new limit would fall below the uses already consumed.
    BelowUsage { usage_count: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AccessCodeStatistics {
    pub total_codes: u64,
    pub active_codes: u64,
    pub total_usage: u64,
    pub remaining_usage: u64,
    /// Consumed share of all capacity on active codes, in percent.
    pub usage_rate: f64,
}

impl AccessCodeStatistics {
    pub fn new(total_codes: u64, active_codes: u64, total_usage: u64, remaining_usage: u64) -> Self {
        let capacity = total_usage + remaining_usage;
        let usage_rate = if capacity > 0 {
            total_usage as f64 / capacity as f64 * 100.0
        } else {
            0.0
        };
        Self {
            total_codes,
            active_codes,
            total_usage,
            remaining_usage,
            usage_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageStatistics {
    pub total_attempts: u64,
    pub successful_attempts: u64,
    pub failed_attempts: u64,
    pub success_rate: f64,
    pub artifact_kinds: BTreeMap<String, u64>,
    pub period_days: u32,
}

impl UsageStatistics {
    pub fn new(
        total_attempts: u64,
        successful_attempts: u64,
        artifact_kinds: BTreeMap<String, u64>,
        period_days: u32,
    ) -> Self {
        let success_rate = if total_attempts > 0 {
            successful_attempts as f64 / total_attempts as f64 * 100.0
        } else {
            0.0
        };
        Self {
            total_attempts,
            successful_attempts,
            failed_attempts: total_attempts.saturating_sub(successful_attempts),
            success_rate,
            artifact_kinds,
            period_days,
        }
    }
}

/// Trim a presented code. Returns `None` for empty or over-long input.
pub fn normalize_code(raw: &str) -> Option<String> {
    let code = raw.trim();
    if code.is_empty() || code.chars().count() > MAX_CODE_LEN {
        None
    } else {
        Some(code.to_owned())
    }
}

pub fn is_valid_max_usage(max_usage: u32) -> bool {
    (1..=MAX_USAGE_LIMIT).contains(&max_usage)
}
