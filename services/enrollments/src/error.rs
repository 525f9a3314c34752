use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};

use campus_core::serde::rfc3339_ms;

/// Enrollments service domain error variants.
#[derive(Debug, thiserror::Error)]
pub enum EnrollmentsServiceError {
    #[error("enrollment not found")]
    EnrollmentNotFound,
    #[error("simplified enrollment not found")]
    SimplifiedEnrollmentNotFound,
    #[error("institution not found")]
    InstitutionNotFound,
    #[error("student not found")]
    StudentNotFound,
    #[error("access already provisioned")]
    AlreadyProvisioned {
        granted_at: Option<DateTime<Utc>>,
        expires_at: Option<DateTime<Utc>>,
    },
    #[error("access not provisioned")]
    NotProvisioned,
    #[error("enrollment is not blocked")]
    NotBlocked,
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
    #[error("invalid status")]
    InvalidStatus,
    #[error("invalid access period")]
    InvalidAccessPeriod,
    #[error("missing data")]
    MissingData,
    #[error("forbidden")]
    Forbidden,
    #[error("unauthorized")]
    Unauthorized,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl EnrollmentsServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EnrollmentNotFound => "ENROLLMENT_NOT_FOUND",
            Self::SimplifiedEnrollmentNotFound => "SIMPLIFIED_ENROLLMENT_NOT_FOUND",
            Self::InstitutionNotFound => "INSTITUTION_NOT_FOUND",
            Self::StudentNotFound => "STUDENT_NOT_FOUND",
            Self::AlreadyProvisioned { .. } => "ALREADY_PROVISIONED",
            Self::NotProvisioned => "NOT_PROVISIONED",
            Self::NotBlocked => "NOT_BLOCKED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::InvalidStatus => "INVALID_STATUS",
            Self::InvalidAccessPeriod => "INVALID_ACCESS_PERIOD",
            Self::MissingData => "MISSING_DATA",
            Self::Forbidden => "FORBIDDEN",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for EnrollmentsServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::EnrollmentNotFound
            | Self::SimplifiedEnrollmentNotFound
            | Self::InstitutionNotFound
            | Self::StudentNotFound => StatusCode::NOT_FOUND,
            Self::AlreadyProvisioned { .. }
            | Self::NotProvisioned
            | Self::NotBlocked
            | Self::InvalidTransition { .. } => StatusCode::CONFLICT,
            Self::InvalidStatus | Self::InvalidAccessPeriod | Self::MissingData => {
                StatusCode::BAD_REQUEST
            }
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if let Self::Internal(ref e) = self {
            tracing::error!(error = ?e, kind = "INTERNAL", "internal error");
        }
        let mut body = serde_json::json!({
            "success": false,
            "kind": self.kind(),
            "message": self.to_string(),
        });
        if let Self::AlreadyProvisioned {
            granted_at,
            expires_at,
        } = &self
        {
            body["details"] = serde_json::json!({
                "accessGrantedAt": granted_at.as_ref().map(rfc3339_ms),
                "accessExpiresAt": expires_at.as_ref().map(rfc3339_ms),
            });
        }
        (status, axum::Json(body)).into_response()
    }
}
