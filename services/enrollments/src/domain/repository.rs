#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};
use uuid::Uuid;

use campus_domain::id::{EnrollmentId, InstitutionId, SimplifiedEnrollmentId};
use campus_domain::pagination::PageRequest;

use crate::domain::conversion::{ConversionInput, ConversionOutcome};
use crate::domain::types::{
    AccessPolicy, AccessWindow, Account, AuditNote, Enrollment, EnrollmentFilter,
    EnrollmentHistoryEntry, EnrollmentStatus, Institution, NewEnrollment, NewInstitution,
    NewSimplifiedEnrollment, SimplifiedEnrollment, SimplifiedStatus, SimplifiedStatusLog,
    StatusUpdate,
};
use crate::error::EnrollmentsServiceError;

/// Repository for full enrollments and their status history.
///
/// Every mutating method writes exactly one history row in the same
/// transaction as the change.
pub trait EnrollmentRepository: Send + Sync {
    async fn find_by_id(&self, id: EnrollmentId)
    -> Result<Option<Enrollment>, EnrollmentsServiceError>;

    async fn list(
        &self,
        filter: &EnrollmentFilter,
        page: PageRequest,
    ) -> Result<Vec<Enrollment>, EnrollmentsServiceError>;

    async fn create(
        &self,
        enrollment: &NewEnrollment,
        audit: &AuditNote,
    ) -> Result<Enrollment, EnrollmentsServiceError>;

    /// Stamp the access window only if none was granted yet.
    /// Returns `None` when a grant already exists (nothing written).
    async fn grant_access(
        &self,
        id: EnrollmentId,
        window: AccessWindow,
        audit: &AuditNote,
    ) -> Result<Option<Enrollment>, EnrollmentsServiceError>;

    /// Overwrite the expiry of a granted window.
    /// Returns `None` when the enrollment has no grant (nothing written).
    async fn set_access_expiry(
        &self,
        id: EnrollmentId,
        expires_at: Option<DateTime<Utc>>,
        audit: &AuditNote,
    ) -> Result<Option<Enrollment>, EnrollmentsServiceError>;

    /// Apply a guarded status write. Returns `None` when the stored status no
    /// longer equals `update.from` (nothing written).
    async fn update_status(
        &self,
        id: EnrollmentId,
        update: &StatusUpdate<EnrollmentStatus>,
        audit: &AuditNote,
    ) -> Result<Option<Enrollment>, EnrollmentsServiceError>;

    /// Newest first.
    async fn history(
        &self,
        id: EnrollmentId,
    ) -> Result<Vec<EnrollmentHistoryEntry>, EnrollmentsServiceError>;
}

/// Repository for simplified enrollments and their status log.
pub trait SimplifiedEnrollmentRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: SimplifiedEnrollmentId,
    ) -> Result<Option<SimplifiedEnrollment>, EnrollmentsServiceError>;

    async fn create(
        &self,
        enrollment: &NewSimplifiedEnrollment,
        audit: &AuditNote,
    ) -> Result<SimplifiedEnrollment, EnrollmentsServiceError>;

    /// Guarded status write, same contract as
    /// [`EnrollmentRepository::update_status`].
    async fn update_status(
        &self,
        id: SimplifiedEnrollmentId,
        update: &StatusUpdate<SimplifiedStatus>,
        audit: &AuditNote,
    ) -> Result<Option<SimplifiedEnrollment>, EnrollmentsServiceError>;

    /// Newest first.
    async fn logs(
        &self,
        id: SimplifiedEnrollmentId,
    ) -> Result<Vec<SimplifiedStatusLog>, EnrollmentsServiceError>;
}

/// Repository for institutions and their access policy.
pub trait InstitutionRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: InstitutionId,
    ) -> Result<Option<Institution>, EnrollmentsServiceError>;

    async fn create(
        &self,
        institution: &NewInstitution,
    ) -> Result<Institution, EnrollmentsServiceError>;

    /// Returns `None` when the institution does not exist.
    async fn update_policy(
        &self,
        id: InstitutionId,
        policy: &AccessPolicy,
    ) -> Result<Option<Institution>, EnrollmentsServiceError>;
}

/// Read access to user accounts.
pub trait AccountRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, EnrollmentsServiceError>;

    /// Match on email or username.
    async fn find_by_login(&self, login: &str)
    -> Result<Option<Account>, EnrollmentsServiceError>;
}

/// Atomically convert a simplified enrollment into a full one.
///
/// Implementations hold a row lock on the simplified record for the whole
/// transaction, so concurrent calls resolve to a single enrollment.
pub trait ConversionPort: Send + Sync {
    async fn convert(
        &self,
        input: &ConversionInput,
    ) -> Result<ConversionOutcome, EnrollmentsServiceError>;
}
