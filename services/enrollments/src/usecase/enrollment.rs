use chrono::Utc;
use uuid::Uuid;

use campus_domain::id::{EnrollmentId, InstitutionId};
use campus_domain::pagination::PageRequest;

use crate::domain::repository::{AccountRepository, EnrollmentRepository, InstitutionRepository};
use crate::domain::types::{
    AuditNote, Enrollment, EnrollmentFilter, EnrollmentHistoryEntry, EnrollmentStatus,
    NewEnrollment, Portal,
};
use crate::error::EnrollmentsServiceError;
use crate::usecase::credentials::generate_enrollment_code;

// ── CreateEnrollment ─────────────────────────────────────────────────────────

pub struct CreateEnrollmentInput {
    pub student_id: Uuid,
    pub course_id: i32,
    pub institution_id: InstitutionId,
    pub polo_id: Option<i32>,
    pub partner_id: Option<i32>,
    /// `pending` (default) or `waiting_payment`.
    pub status: Option<EnrollmentStatus>,
    pub payment_gateway: Option<String>,
    pub payment_external_id: Option<String>,
}

pub struct CreateEnrollmentUseCase<E, I, A>
where
    E: EnrollmentRepository,
    I: InstitutionRepository,
    A: AccountRepository,
{
    pub enrollments: E,
    pub institutions: I,
    pub accounts: A,
}

impl<E, I, A> CreateEnrollmentUseCase<E, I, A>
where
    E: EnrollmentRepository,
    I: InstitutionRepository,
    A: AccountRepository,
{
    pub async fn execute(
        &self,
        input: CreateEnrollmentInput,
        actor_id: Option<Uuid>,
    ) -> Result<Enrollment, EnrollmentsServiceError> {
        let status = input.status.unwrap_or(EnrollmentStatus::Pending);
        if !matches!(
            status,
            EnrollmentStatus::Pending | EnrollmentStatus::WaitingPayment
        ) {
            return Err(EnrollmentsServiceError::InvalidStatus);
        }

        let student = self
            .accounts
            .find_by_id(input.student_id)
            .await?
            .ok_or(EnrollmentsServiceError::StudentNotFound)?;
        if !matches!(student.portal, Portal::Student { .. }) {
            return Err(EnrollmentsServiceError::StudentNotFound);
        }
        self.institutions
            .find_by_id(input.institution_id)
            .await?
            .ok_or(EnrollmentsServiceError::InstitutionNotFound)?;

        let now = Utc::now();
        let new = NewEnrollment {
            code: generate_enrollment_code(now),
            student_id: student.id,
            course_id: input.course_id,
            institution_id: input.institution_id,
            polo_id: input.polo_id,
            partner_id: input.partner_id,
            status,
            access: None,
            block_reason: None,
            block_executed_at: None,
            payment_gateway: input.payment_gateway,
            payment_external_id: input.payment_external_id,
            created_at: now,
        };
        let audit = AuditNote::new(Some("created".to_owned()), actor_id);
        let enrollment = self.enrollments.create(&new, &audit).await?;

        tracing::info!(enrollment_id = %enrollment.id, code = %enrollment.code, "enrollment created");
        Ok(enrollment)
    }
}

// ── GetEnrollment ────────────────────────────────────────────────────────────

pub struct GetEnrollmentUseCase<E: EnrollmentRepository> {
    pub enrollments: E,
}

impl<E: EnrollmentRepository> GetEnrollmentUseCase<E> {
    pub async fn execute(&self, id: EnrollmentId) -> Result<Enrollment, EnrollmentsServiceError> {
        self.enrollments
            .find_by_id(id)
            .await?
            .ok_or(EnrollmentsServiceError::EnrollmentNotFound)
    }
}

// ── ListEnrollments ──────────────────────────────────────────────────────────

pub struct ListEnrollmentsUseCase<E: EnrollmentRepository> {
    pub enrollments: E,
}

impl<E: EnrollmentRepository> ListEnrollmentsUseCase<E> {
    pub async fn execute(
        &self,
        filter: EnrollmentFilter,
        page: PageRequest,
    ) -> Result<Vec<Enrollment>, EnrollmentsServiceError> {
        self.enrollments.list(&filter, page.clamped()).await
    }
}

// ── ListEnrollmentHistory ────────────────────────────────────────────────────

pub struct ListEnrollmentHistoryUseCase<E: EnrollmentRepository> {
    pub enrollments: E,
}

impl<E: EnrollmentRepository> ListEnrollmentHistoryUseCase<E> {
    pub async fn execute(
        &self,
        id: EnrollmentId,
    ) -> Result<Vec<EnrollmentHistoryEntry>, EnrollmentsServiceError> {
        self.enrollments
            .find_by_id(id)
            .await?
            .ok_or(EnrollmentsServiceError::EnrollmentNotFound)?;
        self.enrollments.history(id).await
    }
}
