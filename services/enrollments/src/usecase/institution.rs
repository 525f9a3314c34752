use chrono::Utc;

use campus_domain::id::InstitutionId;

use crate::domain::access::{MAX_PERIOD_DAYS, validate_period_days};
use crate::domain::repository::InstitutionRepository;
use crate::domain::types::{AccessPolicy, Institution, NewInstitution};
use crate::error::EnrollmentsServiceError;

fn validate_policy(policy: &AccessPolicy) -> Result<(), EnrollmentsServiceError> {
    if let Some(days) = policy.access_period_days {
        validate_period_days(days)?;
    }
    if policy.block_delay_days > MAX_PERIOD_DAYS || policy.cancel_delay_days > MAX_PERIOD_DAYS {
        return Err(EnrollmentsServiceError::InvalidAccessPeriod);
    }
    Ok(())
}

// ── CreateInstitution ────────────────────────────────────────────────────────

pub struct CreateInstitutionUseCase<I: InstitutionRepository> {
    pub institutions: I,
}

impl<I: InstitutionRepository> CreateInstitutionUseCase<I> {
    pub async fn execute(
        &self,
        name: String,
        policy: AccessPolicy,
    ) -> Result<Institution, EnrollmentsServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EnrollmentsServiceError::MissingData);
        }
        validate_policy(&policy)?;
        let institution = self
            .institutions
            .create(&NewInstitution {
                name: name.to_owned(),
                policy,
                created_at: Utc::now(),
            })
            .await?;
        tracing::info!(institution_id = %institution.id, "institution created");
        Ok(institution)
    }
}

// ── GetInstitution ───────────────────────────────────────────────────────────

pub struct GetInstitutionUseCase<I: InstitutionRepository> {
    pub institutions: I,
}

impl<I: InstitutionRepository> GetInstitutionUseCase<I> {
    pub async fn execute(&self, id: InstitutionId) -> Result<Institution, EnrollmentsServiceError> {
        self.institutions
            .find_by_id(id)
            .await?
            .ok_or(EnrollmentsServiceError::InstitutionNotFound)
    }
}

// ── UpdateAccessPolicy ───────────────────────────────────────────────────────

pub struct UpdateAccessPolicyUseCase<I: InstitutionRepository> {
    pub institutions: I,
}

impl<I: InstitutionRepository> UpdateAccessPolicyUseCase<I> {
    pub async fn execute(
        &self,
        id: InstitutionId,
        policy: AccessPolicy,
    ) -> Result<Institution, EnrollmentsServiceError> {
        validate_policy(&policy)?;
        let updated = self
            .institutions
            .update_policy(id, &policy)
            .await?
            .ok_or(EnrollmentsServiceError::InstitutionNotFound)?;
        tracing::info!(
            institution_id = %id,
            access_type = policy.access_type.as_str(),
            "access policy updated"
        );
        Ok(updated)
    }
}
