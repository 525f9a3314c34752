pub mod access;
pub mod auth;
pub mod enrollment;
pub mod health;
pub mod institution;
pub mod simplified;

use campus_auth_types::principal::Principal;
use campus_auth_types::token::Role;

use crate::domain::types::{Enrollment, SimplifiedEnrollment};
use crate::error::EnrollmentsServiceError;

pub(crate) fn require_admin(principal: &Principal) -> Result<(), EnrollmentsServiceError> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(EnrollmentsServiceError::Forbidden)
    }
}

/// Students see their own enrollments; polo and partner members see the
/// enrollments carrying their polo/partner id.
pub(crate) fn can_view_enrollment(principal: &Principal, enrollment: &Enrollment) -> bool {
    match principal.role {
        Role::Admin => true,
        Role::Student => enrollment.student_id == principal.user_id,
        Role::Polo(polo_id) => enrollment.polo_id == Some(polo_id),
        Role::Partner(partner_id) => enrollment.partner_id == Some(partner_id),
    }
}

pub(crate) fn can_view_simplified(principal: &Principal, record: &SimplifiedEnrollment) -> bool {
    match principal.role {
        Role::Admin => true,
        Role::Student => false,
        Role::Polo(polo_id) => record.polo_id == Some(polo_id),
        Role::Partner(partner_id) => record.partner_id == Some(partner_id),
    }
}

/// Records outside the caller's reach are reported as missing, so ids
/// belonging to others cannot be enumerated.
pub(crate) fn ensure_enrollment_visible(
    principal: &Principal,
    enrollment: &Enrollment,
) -> Result<(), EnrollmentsServiceError> {
    if can_view_enrollment(principal, enrollment) {
        Ok(())
    } else {
        Err(EnrollmentsServiceError::EnrollmentNotFound)
    }
}

pub(crate) fn ensure_simplified_visible(
    principal: &Principal,
    record: &SimplifiedEnrollment,
) -> Result<(), EnrollmentsServiceError> {
    if can_view_simplified(principal, record) {
        Ok(())
    } else {
        Err(EnrollmentsServiceError::SimplifiedEnrollmentNotFound)
    }
}
