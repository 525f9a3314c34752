use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use campus_domain::id::{EnrollmentId, InstitutionId, SimplifiedEnrollmentId};
use campus_domain::portal::PortalType;

// ── Enrollment status ────────────────────────────────────────────────────────

/// Lifecycle status of a full enrollment.
///
/// Wire/DB format: snake_case string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Pending,
    WaitingPayment,
    Active,
    Blocked,
    Cancelled,
}

impl EnrollmentStatus {
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::WaitingPayment,
        Self::Active,
        Self::Blocked,
        Self::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::WaitingPayment => "waiting_payment",
            Self::Active => "active",
            Self::Blocked => "blocked",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }

    /// Statuses reachable from `self` in one step.
    pub fn allowed_transitions(self) -> &'static [Self] {
        use EnrollmentStatus::*;
        match self {
            Pending => &[WaitingPayment, Active, Blocked, Cancelled],
            WaitingPayment => &[Active, Blocked, Cancelled],
            Active => &[Blocked, Cancelled],
            Blocked => &[Active, Cancelled],
            Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, to: Self) -> bool {
        self.allowed_transitions().contains(&to)
    }
}

// ── Simplified enrollment status ─────────────────────────────────────────────

/// Lifecycle status of a simplified (pre-)enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimplifiedStatus {
    Pending,
    WaitingPayment,
    PaymentConfirmed,
    Converted,
    Cancelled,
    Blocked,
    Failed,
}

impl SimplifiedStatus {
    pub const ALL: [Self; 7] = [
        Self::Pending,
        Self::WaitingPayment,
        Self::PaymentConfirmed,
        Self::Converted,
        Self::Cancelled,
        Self::Blocked,
        Self::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::WaitingPayment => "waiting_payment",
            Self::PaymentConfirmed => "payment_confirmed",
            Self::Converted => "converted",
            Self::Cancelled => "cancelled",
            Self::Blocked => "blocked",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }

    /// Statuses reachable from `self` in one step. `converted` is terminal;
    /// `cancelled` only moves on through conversion.
    pub fn allowed_transitions(self) -> &'static [Self] {
        use SimplifiedStatus::*;
        match self {
            Pending => &[
                WaitingPayment,
                PaymentConfirmed,
                Converted,
                Blocked,
                Cancelled,
                Failed,
            ],
            WaitingPayment => &[PaymentConfirmed, Converted, Blocked, Cancelled, Failed],
            PaymentConfirmed => &[Converted, Blocked, Cancelled],
            Failed => &[Pending, WaitingPayment, Cancelled],
            Blocked => &[Pending, Converted, Cancelled],
            Cancelled => &[Converted],
            Converted => &[],
        }
    }

    pub fn can_transition_to(self, to: Self) -> bool {
        self.allowed_transitions().contains(&to)
    }

    /// Status a full enrollment starts in when converted from this record,
    /// before the access decision is applied. `None` when conversion is not
    /// possible from this status.
    pub fn initial_enrollment_status(self) -> Option<EnrollmentStatus> {
        match self {
            Self::Pending => Some(EnrollmentStatus::Pending),
            Self::WaitingPayment => Some(EnrollmentStatus::WaitingPayment),
            Self::PaymentConfirmed => Some(EnrollmentStatus::Active),
            Self::Blocked => Some(EnrollmentStatus::Blocked),
            Self::Cancelled => Some(EnrollmentStatus::Cancelled),
            Self::Converted | Self::Failed => None,
        }
    }
}

// ── Institution ──────────────────────────────────────────────────────────────

/// When an institution lets students into the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    AfterLinkCompletion,
    AfterPaymentConfirmation,
}

impl AccessType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AfterLinkCompletion => "after_link_completion",
            Self::AfterPaymentConfirmation => "after_payment_confirmation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "after_link_completion" => Some(Self::AfterLinkCompletion),
            "after_payment_confirmation" => Some(Self::AfterPaymentConfirmation),
            _ => None,
        }
    }
}

/// Access policy configured per institution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPolicy {
    pub access_type: AccessType,
    /// `None` = unlimited access.
    pub access_period_days: Option<u32>,
    pub block_delay_days: u32,
    pub cancel_delay_days: u32,
}

#[derive(Debug, Clone)]
pub struct Institution {
    pub id: InstitutionId,
    pub name: String,
    pub policy: AccessPolicy,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewInstitution {
    pub name: String,
    pub policy: AccessPolicy,
    pub created_at: DateTime<Utc>,
}

// ── Enrollment ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub code: String,
    pub student_id: Uuid,
    pub course_id: i32,
    pub institution_id: InstitutionId,
    pub polo_id: Option<i32>,
    pub partner_id: Option<i32>,
    pub status: EnrollmentStatus,
    pub access_granted_at: Option<DateTime<Utc>>,
    pub access_expires_at: Option<DateTime<Utc>>,
    /// Last block, kept after unblocking. Current block state is `status`.
    pub block_reason: Option<String>,
    pub block_executed_at: Option<DateTime<Utc>>,
    pub block_ends_at: Option<DateTime<Utc>>,
    pub payment_gateway: Option<String>,
    pub payment_external_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `[granted_at, expires_at]`; `expires_at = None` is unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessWindow {
    pub granted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Enrollment row to insert; the database assigns the id.
#[derive(Debug, Clone)]
pub struct NewEnrollment {
    pub code: String,
    pub student_id: Uuid,
    pub course_id: i32,
    pub institution_id: InstitutionId,
    pub polo_id: Option<i32>,
    pub partner_id: Option<i32>,
    pub status: EnrollmentStatus,
    pub access: Option<AccessWindow>,
    /// Set when the enrollment starts out blocked.
    pub block_reason: Option<String>,
    pub block_executed_at: Option<DateTime<Utc>>,
    pub payment_gateway: Option<String>,
    pub payment_external_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Filter for enrollment listings. `None` fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct EnrollmentFilter {
    pub student_id: Option<Uuid>,
    pub institution_id: Option<InstitutionId>,
    pub polo_id: Option<i32>,
    pub partner_id: Option<i32>,
    pub status: Option<EnrollmentStatus>,
}

// ── Simplified enrollment ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SimplifiedEnrollment {
    pub id: SimplifiedEnrollmentId,
    pub student_name: String,
    pub student_email: String,
    pub student_cpf: Option<String>,
    pub student_phone: Option<String>,
    pub course_id: i32,
    pub institution_id: InstitutionId,
    pub polo_id: Option<i32>,
    pub partner_id: Option<i32>,
    pub amount_cents: i64,
    pub payment_gateway: Option<String>,
    pub payment_external_id: Option<String>,
    pub status: SimplifiedStatus,
    pub converted_enrollment_id: Option<EnrollmentId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSimplifiedEnrollment {
    pub student_name: String,
    pub student_email: String,
    pub student_cpf: Option<String>,
    pub student_phone: Option<String>,
    pub course_id: i32,
    pub institution_id: InstitutionId,
    pub polo_id: Option<i32>,
    pub partner_id: Option<i32>,
    pub amount_cents: i64,
    pub payment_gateway: Option<String>,
    pub payment_external_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ── Audit trail ──────────────────────────────────────────────────────────────

/// Append-only audit row. `subject_id` is the enrollment or simplified
/// enrollment the change applies to.
#[derive(Debug, Clone)]
pub struct StatusChange<S> {
    pub id: Uuid,
    pub subject_id: i32,
    pub previous_status: Option<S>,
    pub new_status: S,
    pub reason: Option<String>,
    pub actor_id: Option<Uuid>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

pub type EnrollmentHistoryEntry = StatusChange<EnrollmentStatus>;
pub type SimplifiedStatusLog = StatusChange<SimplifiedStatus>;

impl<S> StatusChange<S> {
    pub fn new(
        subject_id: i32,
        previous_status: Option<S>,
        new_status: S,
        reason: Option<String>,
        actor_id: Option<Uuid>,
        metadata: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            subject_id,
            previous_status,
            new_status,
            reason,
            actor_id,
            metadata,
            created_at,
        }
    }
}

/// Who made a write and why; recorded in the audit row written with it.
#[derive(Debug, Clone)]
pub struct AuditNote {
    pub reason: Option<String>,
    pub actor_id: Option<Uuid>,
    pub metadata: serde_json::Value,
}

impl AuditNote {
    pub fn new(reason: Option<String>, actor_id: Option<Uuid>) -> Self {
        Self {
            reason,
            actor_id,
            metadata: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// What a status write does to the block columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockChange {
    Keep,
    Start {
        reason: String,
        executed_at: DateTime<Utc>,
        ends_at: Option<DateTime<Utc>>,
    },
    /// Clears `block_ends_at`; reason and execution time stay as last-block info.
    Lift,
}

/// Guarded status write: applied only while the stored status is still `from`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate<S> {
    pub from: S,
    pub to: S,
    pub block: BlockChange,
}

// ── Accounts ─────────────────────────────────────────────────────────────────

/// Portal-specific data attached to an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Portal {
    Admin,
    Student {
        cpf: Option<String>,
        phone: Option<String>,
    },
    Polo {
        polo_id: i32,
    },
    Partner {
        partner_id: i32,
    },
}

impl Portal {
    pub fn portal_type(&self) -> PortalType {
        match self {
            Self::Admin => PortalType::Admin,
            Self::Student { .. } => PortalType::Student,
            Self::Polo { .. } => PortalType::Polo,
            Self::Partner { .. } => PortalType::Partner,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub name: String,
    pub password_hash: String,
    pub portal: Portal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Student account created on the fly during conversion.
#[derive(Debug, Clone)]
pub struct NewStudentAccount {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub name: String,
    pub password_hash: String,
    pub cpf: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Outbox event for the notification system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub kind: String,
    pub payload: serde_json::Value,
    pub idempotency_key: String,
}

/// Length of generated temporary passwords.
pub const TEMP_PASSWORD_LEN: usize = 12;
