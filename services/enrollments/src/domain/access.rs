//! Access rules: who gets into the portal, for how long, and what the current
//! access state of an enrollment is. Every function takes `now` explicitly.

use chrono::{DateTime, Duration, Utc};

use crate::domain::types::{AccessType, AccessWindow, Enrollment, EnrollmentStatus};
use crate::error::EnrollmentsServiceError;

/// Why provisioning was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Blocked,
    Cancelled,
    AwaitingPayment,
}

impl DenyReason {
    pub fn message(self) -> &'static str {
        match self {
            Self::Blocked => "enrollment blocked",
            Self::Cancelled => "enrollment cancelled",
            Self::AwaitingPayment => "awaiting payment confirmation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Grant,
    Deny(DenyReason),
}

/// Provisioning decision table. First match wins.
pub fn decide_access(status: EnrollmentStatus, access_type: AccessType) -> AccessDecision {
    match (status, access_type) {
        (EnrollmentStatus::Blocked, _) => AccessDecision::Deny(DenyReason::Blocked),
        (EnrollmentStatus::Cancelled, _) => AccessDecision::Deny(DenyReason::Cancelled),
        (EnrollmentStatus::WaitingPayment, AccessType::AfterPaymentConfirmation) => {
            AccessDecision::Deny(DenyReason::AwaitingPayment)
        }
        _ => AccessDecision::Grant,
    }
}

/// Longest access period or block duration accepted, about a century.
pub const MAX_PERIOD_DAYS: u32 = 36_500;

/// Checks a day count for an access period or a block duration.
pub fn validate_period_days(days: u32) -> Result<u32, EnrollmentsServiceError> {
    match days {
        0 => Err(EnrollmentsServiceError::MissingData),
        d if d > MAX_PERIOD_DAYS => Err(EnrollmentsServiceError::InvalidAccessPeriod),
        d => Ok(d),
    }
}

/// `now` moved forward by `days`, or `InvalidAccessPeriod` when that leaves
/// the representable range.
pub fn days_after(
    now: DateTime<Utc>,
    days: u32,
) -> Result<DateTime<Utc>, EnrollmentsServiceError> {
    now.checked_add_signed(Duration::days(i64::from(days)))
        .ok_or(EnrollmentsServiceError::InvalidAccessPeriod)
}

/// Window starting at `now`, `access_period_days` long, or unlimited.
pub fn access_window(
    now: DateTime<Utc>,
    access_period_days: Option<u32>,
) -> Result<AccessWindow, EnrollmentsServiceError> {
    Ok(AccessWindow {
        granted_at: now,
        expires_at: access_period_days
            .map(|days| days_after(now, days))
            .transpose()?,
    })
}

/// An expiry may move anywhere at or after the grant; `None` is unlimited.
pub fn is_valid_expiry(granted_at: DateTime<Utc>, expires_at: Option<DateTime<Utc>>) -> bool {
    expires_at.is_none_or(|expires| expires >= granted_at)
}

/// Effective access state, recomputed on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessStatus {
    Blocked,
    Expired,
    NotGranted,
    Active,
}

impl AccessStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blocked => "blocked",
            Self::Expired => "expired",
            Self::NotGranted => "not_granted",
            Self::Active => "active",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Blocked => "Access is blocked",
            Self::Expired => "Access period has expired",
            Self::NotGranted => "Access has not been granted yet",
            Self::Active => "Access is active",
        }
    }
}

/// Precedence: blocked, expired, not granted, active.
///
/// A block whose `block_ends_at` has passed no longer counts even though the
/// stored status is still `blocked`.
pub fn derive_access_status(enrollment: &Enrollment, now: DateTime<Utc>) -> AccessStatus {
    let blocked = enrollment.status == EnrollmentStatus::Blocked
        && enrollment.block_ends_at.is_none_or(|ends| ends > now);
    if blocked {
        return AccessStatus::Blocked;
    }
    if enrollment.access_expires_at.is_some_and(|expires| expires < now) {
        return AccessStatus::Expired;
    }
    if enrollment.access_granted_at.is_none() {
        return AccessStatus::NotGranted;
    }
    AccessStatus::Active
}

/// Whole days left until `expires_at`, rounded up, never negative.
/// `None` for unlimited access.
pub fn days_remaining(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<i64> {
    expires_at.map(|expires| {
        let seconds = (expires - now).num_seconds();
        if seconds <= 0 {
            0
        } else {
            (seconds + 86_399) / 86_400
        }
    })
}
