use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use campus_auth_types::principal::Principal;
use campus_domain::id::EnrollmentId;

use crate::domain::access::days_remaining;
use crate::domain::types::EnrollmentStatus;
use crate::error::EnrollmentsServiceError;
use crate::handlers::enrollment::{EnrollmentEnvelope, EnrollmentResponse};
use crate::handlers::{ensure_enrollment_visible, require_admin};
use crate::state::AppState;
use crate::usecase::access::{
    AccessReport, BlockAccessInput, BlockAccessUseCase, CheckAccessStatusUseCase,
    ProvisionAccessUseCase, ProvisionOutcome, UnblockAccessUseCase, UpdateAccessPeriodUseCase,
};

// ── Request / response types ─────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProvisionResponse {
    success: bool,
    message: &'static str,
    enrollment: EnrollmentResponse,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeniedResponse {
    success: bool,
    reason: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccessPeriodRequest {
    /// `null` or absent: unlimited.
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockAccessRequest {
    pub reason: String,
    pub duration_days: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockAccessResponse {
    pub success: bool,
    pub enrollment: EnrollmentResponse,
    pub previous_status: EnrollmentStatus,
    pub is_temporary: bool,
}

#[derive(Deserialize)]
pub struct UnblockAccessRequest {
    pub reason: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnblockAccessResponse {
    pub success: bool,
    pub enrollment: EnrollmentResponse,
    #[serde(serialize_with = "campus_core::serde::to_rfc3339_ms")]
    pub unblocked_at: DateTime<Utc>,
    pub reason: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessDetails {
    pub enrollment_status: EnrollmentStatus,
    #[serde(serialize_with = "campus_core::serde::opt_to_rfc3339_ms")]
    pub access_granted_at: Option<DateTime<Utc>>,
    #[serde(serialize_with = "campus_core::serde::opt_to_rfc3339_ms")]
    pub access_expires_at: Option<DateTime<Utc>>,
    pub days_remaining: Option<i64>,
    pub is_unlimited: bool,
    pub block_reason: Option<String>,
    #[serde(serialize_with = "campus_core::serde::opt_to_rfc3339_ms")]
    pub block_executed_at: Option<DateTime<Utc>>,
    #[serde(serialize_with = "campus_core::serde::opt_to_rfc3339_ms")]
    pub block_ends_at: Option<DateTime<Utc>>,
    #[serde(serialize_with = "campus_core::serde::to_rfc3339_ms")]
    pub checked_at: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessInfo {
    pub access_status: &'static str,
    pub access_status_message: &'static str,
    pub details: AccessDetails,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAccessResponse {
    pub success: bool,
    pub access_info: AccessInfo,
}

impl From<AccessReport> for CheckAccessResponse {
    fn from(report: AccessReport) -> Self {
        let e = report.enrollment;
        let granted = e.access_granted_at.is_some();
        Self {
            success: true,
            access_info: AccessInfo {
                access_status: report.status.as_str(),
                access_status_message: report.status.message(),
                details: AccessDetails {
                    enrollment_status: e.status,
                    access_granted_at: e.access_granted_at,
                    access_expires_at: e.access_expires_at,
                    days_remaining: days_remaining(e.access_expires_at, report.checked_at),
                    is_unlimited: granted && e.access_expires_at.is_none(),
                    block_reason: e.block_reason,
                    block_executed_at: e.block_executed_at,
                    block_ends_at: e.block_ends_at,
                    checked_at: report.checked_at,
                },
            },
        }
    }
}

// ── POST /provision-access/{id} ──────────────────────────────────────────────

pub async fn provision_access(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, EnrollmentsServiceError> {
    require_admin(&principal)?;
    let uc = ProvisionAccessUseCase {
        enrollments: state.enrollment_repo(),
        institutions: state.institution_repo(),
    };
    let response = match uc
        .execute(EnrollmentId(id), Some(principal.user_id))
        .await?
    {
        ProvisionOutcome::Granted(enrollment) => Json(ProvisionResponse {
            success: true,
            message: "Access provisioned",
            enrollment: enrollment.into(),
        })
        .into_response(),
        ProvisionOutcome::Denied(reason) => (
            StatusCode::FORBIDDEN,
            Json(DeniedResponse {
                success: false,
                reason: reason.message(),
            }),
        )
            .into_response(),
    };
    Ok(response)
}

// ── PUT /update-access-period/{id} ───────────────────────────────────────────

pub async fn update_access_period(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateAccessPeriodRequest>,
) -> Result<Json<EnrollmentEnvelope>, EnrollmentsServiceError> {
    require_admin(&principal)?;
    let uc = UpdateAccessPeriodUseCase {
        enrollments: state.enrollment_repo(),
    };
    let enrollment = uc
        .execute(EnrollmentId(id), body.expires_at, Some(principal.user_id))
        .await?;
    Ok(Json(enrollment.into()))
}

// ── POST /block-access/{id} ──────────────────────────────────────────────────

pub async fn block_access(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<BlockAccessRequest>,
) -> Result<Json<BlockAccessResponse>, EnrollmentsServiceError> {
    require_admin(&principal)?;
    let uc = BlockAccessUseCase {
        enrollments: state.enrollment_repo(),
    };
    let output = uc
        .execute(
            EnrollmentId(id),
            BlockAccessInput {
                reason: body.reason,
                duration_days: body.duration_days,
            },
            Some(principal.user_id),
        )
        .await?;
    Ok(Json(BlockAccessResponse {
        success: true,
        enrollment: output.enrollment.into(),
        previous_status: output.previous_status,
        is_temporary: output.is_temporary,
    }))
}

// ── POST /unblock-access/{id} ────────────────────────────────────────────────

pub async fn unblock_access(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<UnblockAccessRequest>,
) -> Result<Json<UnblockAccessResponse>, EnrollmentsServiceError> {
    require_admin(&principal)?;
    let uc = UnblockAccessUseCase {
        enrollments: state.enrollment_repo(),
    };
    let enrollment = uc
        .execute(
            EnrollmentId(id),
            body.reason.clone(),
            Some(principal.user_id),
        )
        .await?;
    Ok(Json(UnblockAccessResponse {
        success: true,
        unblocked_at: enrollment.updated_at,
        enrollment: enrollment.into(),
        reason: body.reason,
    }))
}

// ── GET /check-access/{id} ───────────────────────────────────────────────────

pub async fn check_access(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<CheckAccessResponse>, EnrollmentsServiceError> {
    let uc = CheckAccessStatusUseCase {
        enrollments: state.enrollment_repo(),
    };
    let report = uc.execute(EnrollmentId(id)).await?;
    ensure_enrollment_visible(&principal, &report.enrollment)?;
    Ok(Json(report.into()))
}
