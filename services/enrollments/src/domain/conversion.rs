//! Turning a simplified enrollment into a full one.

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use campus_domain::id::{EnrollmentId, SimplifiedEnrollmentId};

use crate::domain::access::{AccessDecision, DenyReason, access_window, decide_access};
use crate::domain::types::{
    AccessPolicy, AccessWindow, AuditNote, Enrollment, EnrollmentStatus, NewEnrollment,
    NewStudentAccount, OutboxEvent, SimplifiedEnrollment, SimplifiedStatus,
};
use crate::error::EnrollmentsServiceError;

/// Block reason stamped on enrollments converted from a blocked record.
pub const BLOCKED_AT_CONVERSION: &str = "blocked before conversion";

/// Initial state of the enrollment created by a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrollmentPlan {
    pub status: EnrollmentStatus,
    pub access: Option<AccessWindow>,
    pub decision: AccessDecision,
}

/// Map the simplified status, then run the provisioning decision on the
/// result. A grant activates the enrollment and stamps the access window;
/// a denial keeps the mapped status with no window.
pub fn plan_enrollment(
    status: SimplifiedStatus,
    policy: &AccessPolicy,
    now: DateTime<Utc>,
) -> Result<EnrollmentPlan, EnrollmentsServiceError> {
    let mapped = status
        .initial_enrollment_status()
        .ok_or(EnrollmentsServiceError::InvalidTransition {
            from: status.as_str(),
            to: SimplifiedStatus::Converted.as_str(),
        })?;
    let decision = decide_access(mapped, policy.access_type);
    let plan = match decision {
        AccessDecision::Grant => EnrollmentPlan {
            status: EnrollmentStatus::Active,
            access: Some(access_window(now, policy.access_period_days)?),
            decision,
        },
        AccessDecision::Deny(_) => EnrollmentPlan {
            status: mapped,
            access: None,
            decision,
        },
    };
    Ok(plan)
}

/// Everything a conversion writes that is generated outside the transaction.
#[derive(Debug, Clone)]
pub struct ConversionInput {
    pub simplified_id: SimplifiedEnrollmentId,
    /// Account to create when no user owns the captured email yet.
    pub new_account: Option<NewStudentAccount>,
    /// Credential hand-off written with `new_account`.
    pub credentials_event: Option<OutboxEvent>,
    pub enrollment_code: String,
    pub actor_id: Option<Uuid>,
    pub now: DateTime<Utc>,
}

/// Rows read while holding the lock on the simplified record.
#[derive(Debug, Clone)]
pub struct ConversionSnapshot {
    pub record: SimplifiedEnrollment,
    pub policy: AccessPolicy,
    /// Account already registered under the record's email.
    pub existing_student_id: Option<Uuid>,
}

/// Rows a conversion writes in one transaction.
#[derive(Debug, Clone)]
pub struct ConversionWrite {
    pub simplified_id: SimplifiedEnrollmentId,
    pub from: SimplifiedStatus,
    pub new_account: Option<NewStudentAccount>,
    pub credentials_event: Option<OutboxEvent>,
    pub enrollment: NewEnrollment,
    /// First history row of the new enrollment.
    pub history: AuditNote,
    pub actor_id: Option<Uuid>,
    pub now: DateTime<Utc>,
}

impl ConversionWrite {
    pub fn account_created(&self) -> bool {
        self.new_account.is_some()
    }

    /// Log row closing the simplified record, once the enrollment id exists.
    pub fn log_note(&self, enrollment_id: EnrollmentId) -> AuditNote {
        AuditNote::new(Some("converted".to_owned()), self.actor_id)
            .with_metadata(json!({ "enrollmentId": enrollment_id }))
    }
}

#[derive(Debug, Clone)]
pub enum ConversionStep {
    AlreadyConverted(EnrollmentId),
    Write(Box<ConversionWrite>),
}

/// Decide what a conversion writes from the locked snapshot. A record that
/// already points at an enrollment is not converted again.
pub fn prepare_conversion(
    snapshot: ConversionSnapshot,
    input: &ConversionInput,
) -> Result<ConversionStep, EnrollmentsServiceError> {
    let ConversionSnapshot {
        record,
        policy,
        existing_student_id,
    } = snapshot;
    if let Some(enrollment_id) = record.converted_enrollment_id {
        return Ok(ConversionStep::AlreadyConverted(enrollment_id));
    }

    let plan = plan_enrollment(record.status, &policy, input.now)?;

    let (student_id, new_account, credentials_event) =
        match (existing_student_id, &input.new_account) {
            (Some(id), _) => (id, None, None),
            (None, Some(account)) => (
                account.id,
                Some(account.clone()),
                input.credentials_event.clone(),
            ),
            (None, None) => {
                return Err(anyhow::anyhow!(
                    "no account prepared for {}",
                    record.student_email
                )
                .into());
            }
        };

    let blocked = plan.decision == AccessDecision::Deny(DenyReason::Blocked);
    let enrollment = NewEnrollment {
        code: input.enrollment_code.clone(),
        student_id,
        course_id: record.course_id,
        institution_id: record.institution_id,
        polo_id: record.polo_id,
        partner_id: record.partner_id,
        status: plan.status,
        access: plan.access,
        block_reason: blocked.then(|| BLOCKED_AT_CONVERSION.to_owned()),
        block_executed_at: blocked.then_some(input.now),
        payment_gateway: record.payment_gateway.clone(),
        payment_external_id: record.payment_external_id.clone(),
        created_at: input.now,
    };

    let access_decision = match plan.decision {
        AccessDecision::Grant => "granted",
        AccessDecision::Deny(reason) => reason.message(),
    };
    let history = AuditNote::new(
        Some("converted from simplified enrollment".to_owned()),
        input.actor_id,
    )
    .with_metadata(json!({
        "simplifiedEnrollmentId": record.id,
        "accessDecision": access_decision,
    }));

    Ok(ConversionStep::Write(Box::new(ConversionWrite {
        simplified_id: record.id,
        from: record.status,
        new_account,
        credentials_event,
        enrollment,
        history,
        actor_id: input.actor_id,
        now: input.now,
    })))
}

#[derive(Debug, Clone)]
pub enum ConversionOutcome {
    Converted {
        enrollment: Enrollment,
        account_created: bool,
    },
    AlreadyConverted(Enrollment),
}
