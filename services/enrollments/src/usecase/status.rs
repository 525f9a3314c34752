use chrono::Utc;
use uuid::Uuid;

use campus_domain::id::{EnrollmentId, SimplifiedEnrollmentId};

use crate::domain::repository::{EnrollmentRepository, SimplifiedEnrollmentRepository};
use crate::domain::types::{
    AuditNote, BlockChange, Enrollment, EnrollmentStatus, SimplifiedEnrollment, SimplifiedStatus,
    StatusUpdate,
};
use crate::error::EnrollmentsServiceError;

/// Reason recorded when a block is started through a plain status change.
const DEFAULT_BLOCK_REASON: &str = "blocked by status change";

pub struct StatusChangeInput<S> {
    pub status: S,
    pub reason: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

fn audit_for<S>(input: &StatusChangeInput<S>, actor_id: Option<Uuid>) -> AuditNote {
    let audit = AuditNote::new(input.reason.clone(), actor_id);
    match &input.metadata {
        Some(metadata) => audit.with_metadata(metadata.clone()),
        None => audit,
    }
}

// ── UpdateEnrollmentStatus ───────────────────────────────────────────────────

pub struct UpdateEnrollmentStatusUseCase<E: EnrollmentRepository> {
    pub enrollments: E,
}

impl<E: EnrollmentRepository> UpdateEnrollmentStatusUseCase<E> {
    pub async fn execute(
        &self,
        id: EnrollmentId,
        input: StatusChangeInput<EnrollmentStatus>,
        actor_id: Option<Uuid>,
    ) -> Result<Enrollment, EnrollmentsServiceError> {
        let enrollment = self
            .enrollments
            .find_by_id(id)
            .await?
            .ok_or(EnrollmentsServiceError::EnrollmentNotFound)?;
        let (from, to) = (enrollment.status, input.status);
        let invalid = EnrollmentsServiceError::InvalidTransition {
            from: from.as_str(),
            to: to.as_str(),
        };
        if !from.can_transition_to(to) {
            return Err(invalid);
        }

        let block = if to == EnrollmentStatus::Blocked {
            BlockChange::Start {
                reason: input
                    .reason
                    .clone()
                    .unwrap_or_else(|| DEFAULT_BLOCK_REASON.to_owned()),
                executed_at: Utc::now(),
                ends_at: None,
            }
        } else if from == EnrollmentStatus::Blocked {
            BlockChange::Lift
        } else {
            BlockChange::Keep
        };
        let update = StatusUpdate { from, to, block };

        let updated = self
            .enrollments
            .update_status(id, &update, &audit_for(&input, actor_id))
            .await?
            .ok_or(invalid)?;

        tracing::info!(
            enrollment_id = %id,
            from = from.as_str(),
            to = to.as_str(),
            "enrollment status changed"
        );
        Ok(updated)
    }
}

// ── UpdateSimplifiedStatus ───────────────────────────────────────────────────

pub struct UpdateSimplifiedStatusUseCase<S: SimplifiedEnrollmentRepository> {
    pub simplified: S,
}

impl<S: SimplifiedEnrollmentRepository> UpdateSimplifiedStatusUseCase<S> {
    /// `converted` is only reachable through conversion, which also creates
    /// the enrollment.
    pub async fn execute(
        &self,
        id: SimplifiedEnrollmentId,
        input: StatusChangeInput<SimplifiedStatus>,
        actor_id: Option<Uuid>,
    ) -> Result<SimplifiedEnrollment, EnrollmentsServiceError> {
        if input.status == SimplifiedStatus::Converted {
            return Err(EnrollmentsServiceError::InvalidStatus);
        }
        let record = self
            .simplified
            .find_by_id(id)
            .await?
            .ok_or(EnrollmentsServiceError::SimplifiedEnrollmentNotFound)?;
        let (from, to) = (record.status, input.status);
        let invalid = EnrollmentsServiceError::InvalidTransition {
            from: from.as_str(),
            to: to.as_str(),
        };
        if !from.can_transition_to(to) {
            return Err(invalid);
        }

        let update = StatusUpdate {
            from,
            to,
            block: BlockChange::Keep,
        };
        let updated = self
            .simplified
            .update_status(id, &update, &audit_for(&input, actor_id))
            .await?
            .ok_or(invalid)?;

        tracing::info!(
            simplified_enrollment_id = %id,
            from = from.as_str(),
            to = to.as_str(),
            "simplified enrollment status changed"
        );
        Ok(updated)
    }
}
