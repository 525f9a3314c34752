use chrono::Utc;
use uuid::Uuid;

use campus_domain::id::{InstitutionId, SimplifiedEnrollmentId};

use crate::domain::repository::{InstitutionRepository, SimplifiedEnrollmentRepository};
use crate::domain::types::{
    AuditNote, NewSimplifiedEnrollment, SimplifiedEnrollment, SimplifiedStatusLog,
};
use crate::error::EnrollmentsServiceError;

// ── CreateSimplifiedEnrollment ───────────────────────────────────────────────

pub struct CreateSimplifiedInput {
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
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

pub struct CreateSimplifiedEnrollmentUseCase<S, I>
where
    S: SimplifiedEnrollmentRepository,
    I: InstitutionRepository,
{
    pub simplified: S,
    pub institutions: I,
}

impl<S, I> CreateSimplifiedEnrollmentUseCase<S, I>
where
    S: SimplifiedEnrollmentRepository,
    I: InstitutionRepository,
{
    pub async fn execute(
        &self,
        input: CreateSimplifiedInput,
        actor_id: Option<Uuid>,
    ) -> Result<SimplifiedEnrollment, EnrollmentsServiceError> {
        let name = input.student_name.trim();
        let email = input.student_email.trim().to_lowercase();
        if name.is_empty() || !email.contains('@') || input.amount_cents <= 0 {
            return Err(EnrollmentsServiceError::MissingData);
        }
        self.institutions
            .find_by_id(input.institution_id)
            .await?
            .ok_or(EnrollmentsServiceError::InstitutionNotFound)?;

        let new = NewSimplifiedEnrollment {
            student_name: name.to_owned(),
            student_email: email,
            student_cpf: non_empty(input.student_cpf),
            student_phone: non_empty(input.student_phone),
            course_id: input.course_id,
            institution_id: input.institution_id,
            polo_id: input.polo_id,
            partner_id: input.partner_id,
            amount_cents: input.amount_cents,
            payment_gateway: non_empty(input.payment_gateway),
            payment_external_id: non_empty(input.payment_external_id),
            created_at: Utc::now(),
        };
        let audit = AuditNote::new(Some("created".to_owned()), actor_id);
        let created = self.simplified.create(&new, &audit).await?;

        tracing::info!(simplified_enrollment_id = %created.id, "simplified enrollment created");
        Ok(created)
    }
}

// ── GetSimplifiedEnrollment ──────────────────────────────────────────────────

pub struct GetSimplifiedEnrollmentUseCase<S: SimplifiedEnrollmentRepository> {
    pub simplified: S,
}

impl<S: SimplifiedEnrollmentRepository> GetSimplifiedEnrollmentUseCase<S> {
    pub async fn execute(
        &self,
        id: SimplifiedEnrollmentId,
    ) -> Result<SimplifiedEnrollment, EnrollmentsServiceError> {
        self.simplified
            .find_by_id(id)
            .await?
            .ok_or(EnrollmentsServiceError::SimplifiedEnrollmentNotFound)
    }
}

// ── ListSimplifiedStatusLogs ─────────────────────────────────────────────────

pub struct ListSimplifiedStatusLogsUseCase<S: SimplifiedEnrollmentRepository> {
    pub simplified: S,
}

impl<S: SimplifiedEnrollmentRepository> ListSimplifiedStatusLogsUseCase<S> {
    pub async fn execute(
        &self,
        id: SimplifiedEnrollmentId,
    ) -> Result<Vec<SimplifiedStatusLog>, EnrollmentsServiceError> {
        self.simplified
            .find_by_id(id)
            .await?
            .ok_or(EnrollmentsServiceError::SimplifiedEnrollmentNotFound)?;
        self.simplified.logs(id).await
    }
}
