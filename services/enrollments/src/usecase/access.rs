use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use campus_core::serde::rfc3339_ms;
use campus_domain::id::EnrollmentId;

use crate::domain::access::{
    AccessDecision, AccessStatus, DenyReason, access_window, days_after, decide_access,
    derive_access_status, is_valid_expiry, validate_period_days,
};
use crate::domain::repository::{EnrollmentRepository, InstitutionRepository};
use crate::domain::types::{
    AuditNote, BlockChange, Enrollment, EnrollmentStatus, StatusUpdate,
};
use crate::error::EnrollmentsServiceError;

async fn load<E: EnrollmentRepository>(
    enrollments: &E,
    id: EnrollmentId,
) -> Result<Enrollment, EnrollmentsServiceError> {
    enrollments
        .find_by_id(id)
        .await?
        .ok_or(EnrollmentsServiceError::EnrollmentNotFound)
}

fn already_provisioned(enrollment: &Enrollment) -> EnrollmentsServiceError {
    EnrollmentsServiceError::AlreadyProvisioned {
        granted_at: enrollment.access_granted_at,
        expires_at: enrollment.access_expires_at,
    }
}

// ── ProvisionAccess ──────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ProvisionOutcome {
    Granted(Enrollment),
    Denied(DenyReason),
}

pub struct ProvisionAccessUseCase<E, I>
where
    E: EnrollmentRepository,
    I: InstitutionRepository,
{
    pub enrollments: E,
    pub institutions: I,
}

impl<E, I> ProvisionAccessUseCase<E, I>
where
    E: EnrollmentRepository,
    I: InstitutionRepository,
{
    pub async fn execute(
        &self,
        id: EnrollmentId,
        actor_id: Option<Uuid>,
    ) -> Result<ProvisionOutcome, EnrollmentsServiceError> {
        let enrollment = load(&self.enrollments, id).await?;
        if enrollment.access_granted_at.is_some() {
            return Err(already_provisioned(&enrollment));
        }

        let institution = self
            .institutions
            .find_by_id(enrollment.institution_id)
            .await?
            .ok_or(EnrollmentsServiceError::InstitutionNotFound)?;

        if let AccessDecision::Deny(reason) =
            decide_access(enrollment.status, institution.policy.access_type)
        {
            tracing::info!(
                enrollment_id = %id,
                status = enrollment.status.as_str(),
                reason = reason.message(),
                "access provisioning denied"
            );
            return Ok(ProvisionOutcome::Denied(reason));
        }

        let window = access_window(Utc::now(), institution.policy.access_period_days)?;
        let audit = AuditNote::new(Some("access provisioned".to_owned()), actor_id).with_metadata(
            json!({
                "accessGrantedAt": rfc3339_ms(&window.granted_at),
                "accessExpiresAt": window.expires_at.as_ref().map(rfc3339_ms),
            }),
        );

        match self.enrollments.grant_access(id, window, &audit).await? {
            Some(updated) => {
                tracing::info!(enrollment_id = %id, "access provisioned");
                Ok(ProvisionOutcome::Granted(updated))
            }
            // Lost the race to a concurrent grant: report the winner's window.
            None => {
                let current = load(&self.enrollments, id).await?;
                Err(already_provisioned(&current))
            }
        }
    }
}

// ── UpdateAccessPeriod ───────────────────────────────────────────────────────

pub struct UpdateAccessPeriodUseCase<E: EnrollmentRepository> {
    pub enrollments: E,
}

impl<E: EnrollmentRepository> UpdateAccessPeriodUseCase<E> {
    /// `expires_at = None` makes access unlimited.
    pub async fn execute(
        &self,
        id: EnrollmentId,
        expires_at: Option<DateTime<Utc>>,
        actor_id: Option<Uuid>,
    ) -> Result<Enrollment, EnrollmentsServiceError> {
        let enrollment = load(&self.enrollments, id).await?;
        let granted_at = enrollment
            .access_granted_at
            .ok_or(EnrollmentsServiceError::NotProvisioned)?;
        if !is_valid_expiry(granted_at, expires_at) {
            return Err(EnrollmentsServiceError::InvalidAccessPeriod);
        }

        let audit = AuditNote::new(Some("access period updated".to_owned()), actor_id)
            .with_metadata(json!({
                "previousExpiresAt": enrollment.access_expires_at.as_ref().map(rfc3339_ms),
                "newExpiresAt": expires_at.as_ref().map(rfc3339_ms),
            }));

        self.enrollments
            .set_access_expiry(id, expires_at, &audit)
            .await?
            .ok_or(EnrollmentsServiceError::NotProvisioned)
    }
}

// ── BlockAccess ──────────────────────────────────────────────────────────────

pub struct BlockAccessInput {
    pub reason: String,
    /// `None` blocks indefinitely.
    pub duration_days: Option<u32>,
}

#[derive(Debug)]
pub struct BlockAccessOutput {
    pub enrollment: Enrollment,
    pub previous_status: EnrollmentStatus,
    pub is_temporary: bool,
}

pub struct BlockAccessUseCase<E: EnrollmentRepository> {
    pub enrollments: E,
}

impl<E: EnrollmentRepository> BlockAccessUseCase<E> {
    pub async fn execute(
        &self,
        id: EnrollmentId,
        input: BlockAccessInput,
        actor_id: Option<Uuid>,
    ) -> Result<BlockAccessOutput, EnrollmentsServiceError> {
        let reason = input.reason.trim();
        if reason.is_empty() {
            return Err(EnrollmentsServiceError::MissingData);
        }
        let duration_days = input.duration_days.map(validate_period_days).transpose()?;

        let enrollment = load(&self.enrollments, id).await?;
        let from = enrollment.status;
        if !from.can_transition_to(EnrollmentStatus::Blocked) {
            return Err(EnrollmentsServiceError::InvalidTransition {
                from: from.as_str(),
                to: EnrollmentStatus::Blocked.as_str(),
            });
        }

        let now = Utc::now();
        let ends_at = duration_days
            .map(|days| days_after(now, days))
            .transpose()?;
        let update = StatusUpdate {
            from,
            to: EnrollmentStatus::Blocked,
            block: BlockChange::Start {
                reason: reason.to_owned(),
                executed_at: now,
                ends_at,
            },
        };
        let audit = AuditNote::new(Some(reason.to_owned()), actor_id).with_metadata(json!({
            "blockReason": reason,
            "blockEndsAt": ends_at.as_ref().map(rfc3339_ms),
            "isTemporary": ends_at.is_some(),
        }));

        let updated = self
            .enrollments
            .update_status(id, &update, &audit)
            .await?
            .ok_or(EnrollmentsServiceError::InvalidTransition {
                from: from.as_str(),
                to: EnrollmentStatus::Blocked.as_str(),
            })?;

        tracing::info!(enrollment_id = %id, temporary = ends_at.is_some(), "access blocked");
        Ok(BlockAccessOutput {
            enrollment: updated,
            previous_status: from,
            is_temporary: ends_at.is_some(),
        })
    }
}

// ── UnblockAccess ────────────────────────────────────────────────────────────

pub struct UnblockAccessUseCase<E: EnrollmentRepository> {
    pub enrollments: E,
}

impl<E: EnrollmentRepository> UnblockAccessUseCase<E> {
    pub async fn execute(
        &self,
        id: EnrollmentId,
        reason: String,
        actor_id: Option<Uuid>,
    ) -> Result<Enrollment, EnrollmentsServiceError> {
        let enrollment = load(&self.enrollments, id).await?;
        if enrollment.status != EnrollmentStatus::Blocked {
            return Err(EnrollmentsServiceError::NotBlocked);
        }

        let update = StatusUpdate {
            from: EnrollmentStatus::Blocked,
            to: EnrollmentStatus::Active,
            block: BlockChange::Lift,
        };
        let audit = AuditNote::new(Some(reason), actor_id).with_metadata(json!({
            "previousBlockReason": enrollment.block_reason,
        }));

        let updated = self
            .enrollments
            .update_status(id, &update, &audit)
            .await?
            .ok_or(EnrollmentsServiceError::NotBlocked)?;

        tracing::info!(enrollment_id = %id, "access unblocked");
        Ok(updated)
    }
}

// ── CheckAccessStatus ────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct AccessReport {
    pub status: AccessStatus,
    pub enrollment: Enrollment,
    pub checked_at: DateTime<Utc>,
}

pub struct CheckAccessStatusUseCase<E: EnrollmentRepository> {
    pub enrollments: E,
}

impl<E: EnrollmentRepository> CheckAccessStatusUseCase<E> {
    pub async fn execute(&self, id: EnrollmentId) -> Result<AccessReport, EnrollmentsServiceError> {
        let enrollment = load(&self.enrollments, id).await?;
        let now = Utc::now();
        Ok(AccessReport {
            status: derive_access_status(&enrollment, now),
            enrollment,
            checked_at: now,
        })
    }
}
