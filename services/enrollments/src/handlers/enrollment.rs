use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use campus_auth_types::principal::Principal;
use campus_domain::id::{EnrollmentId, InstitutionId};
use campus_domain::pagination::PageRequest;

use crate::domain::types::{
    Enrollment, EnrollmentFilter, EnrollmentHistoryEntry, EnrollmentStatus,
};
use crate::error::EnrollmentsServiceError;
use crate::handlers::{ensure_enrollment_visible, require_admin};
use crate::state::AppState;
use crate::usecase::enrollment::{
    CreateEnrollmentInput, CreateEnrollmentUseCase, GetEnrollmentUseCase,
    ListEnrollmentHistoryUseCase, ListEnrollmentsUseCase,
};
use crate::usecase::status::{StatusChangeInput, UpdateEnrollmentStatusUseCase};

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResponse {
    pub id: EnrollmentId,
    pub code: String,
    pub student_id: Uuid,
    pub course_id: i32,
    pub institution_id: InstitutionId,
    pub polo_id: Option<i32>,
    pub partner_id: Option<i32>,
    pub status: EnrollmentStatus,
    #[serde(serialize_with = "campus_core::serde::opt_to_rfc3339_ms")]
    pub access_granted_at: Option<DateTime<Utc>>,
    #[serde(serialize_with = "campus_core::serde::opt_to_rfc3339_ms")]
    pub access_expires_at: Option<DateTime<Utc>>,
    pub block_reason: Option<String>,
    #[serde(serialize_with = "campus_core::serde::opt_to_rfc3339_ms")]
    pub block_executed_at: Option<DateTime<Utc>>,
    #[serde(serialize_with = "campus_core::serde::opt_to_rfc3339_ms")]
    pub block_ends_at: Option<DateTime<Utc>>,
    pub payment_gateway: Option<String>,
    pub payment_external_id: Option<String>,
    #[serde(serialize_with = "campus_core::serde::to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "campus_core::serde::to_rfc3339_ms")]
    pub updated_at: DateTime<Utc>,
}

impl From<Enrollment> for EnrollmentResponse {
    fn from(e: Enrollment) -> Self {
        Self {
            id: e.id,
            code: e.code,
            student_id: e.student_id,
            course_id: e.course_id,
            institution_id: e.institution_id,
            polo_id: e.polo_id,
            partner_id: e.partner_id,
            status: e.status,
            access_granted_at: e.access_granted_at,
            access_expires_at: e.access_expires_at,
            block_reason: e.block_reason,
            block_executed_at: e.block_executed_at,
            block_ends_at: e.block_ends_at,
            payment_gateway: e.payment_gateway,
            payment_external_id: e.payment_external_id,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentEnvelope {
    pub success: bool,
    pub enrollment: EnrollmentResponse,
}

impl From<Enrollment> for EnrollmentEnvelope {
    fn from(e: Enrollment) -> Self {
        Self {
            success: true,
            enrollment: e.into(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntryResponse {
    pub id: Uuid,
    pub enrollment_id: i32,
    pub previous_status: Option<EnrollmentStatus>,
    pub new_status: EnrollmentStatus,
    pub reason: Option<String>,
    pub actor_id: Option<Uuid>,
    pub metadata: serde_json::Value,
    #[serde(serialize_with = "campus_core::serde::to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
}

impl From<EnrollmentHistoryEntry> for HistoryEntryResponse {
    fn from(h: EnrollmentHistoryEntry) -> Self {
        Self {
            id: h.id,
            enrollment_id: h.subject_id,
            previous_status: h.previous_status,
            new_status: h.new_status,
            reason: h.reason,
            actor_id: h.actor_id,
            metadata: h.metadata,
            created_at: h.created_at,
        }
    }
}

// ── Request types ────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct EnrollmentListQuery {
    pub per_page: Option<u32>,
    pub page: Option<u32>,
    pub student_id: Option<Uuid>,
    pub institution_id: Option<i32>,
    pub polo_id: Option<i32>,
    pub partner_id: Option<i32>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEnrollmentRequest {
    pub student_id: Uuid,
    pub course_id: i32,
    pub institution_id: i32,
    pub polo_id: Option<i32>,
    pub partner_id: Option<i32>,
    pub status: Option<String>,
    pub payment_gateway: Option<String>,
    pub payment_external_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: String,
    pub reason: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

fn parse_status(s: &str) -> Result<EnrollmentStatus, EnrollmentsServiceError> {
    EnrollmentStatus::parse(s).ok_or(EnrollmentsServiceError::InvalidStatus)
}

// ── GET /enrollments ─────────────────────────────────────────────────────────

pub async fn list_enrollments(
    principal: Principal,
    State(state): State<AppState>,
    Query(query): Query<EnrollmentListQuery>,
) -> Result<Json<Vec<EnrollmentResponse>>, EnrollmentsServiceError> {
    require_admin(&principal)?;
    let filter = EnrollmentFilter {
        student_id: query.student_id,
        institution_id: query.institution_id.map(InstitutionId),
        polo_id: query.polo_id,
        partner_id: query.partner_id,
        status: query.status.as_deref().map(parse_status).transpose()?,
    };
    let page = PageRequest {
        per_page: query.per_page.unwrap_or(25),
        page: query.page.unwrap_or(1),
    };
    let uc = ListEnrollmentsUseCase {
        enrollments: state.enrollment_repo(),
    };
    let items = uc.execute(filter, page).await?;
    Ok(Json(items.into_iter().map(EnrollmentResponse::from).collect()))
}

// ── POST /enrollments ────────────────────────────────────────────────────────

pub async fn create_enrollment(
    principal: Principal,
    State(state): State<AppState>,
    Json(body): Json<CreateEnrollmentRequest>,
) -> Result<(StatusCode, Json<EnrollmentEnvelope>), EnrollmentsServiceError> {
    require_admin(&principal)?;
    let uc = CreateEnrollmentUseCase {
        enrollments: state.enrollment_repo(),
        institutions: state.institution_repo(),
        accounts: state.account_repo(),
    };
    let enrollment = uc
        .execute(
            CreateEnrollmentInput {
                student_id: body.student_id,
                course_id: body.course_id,
                institution_id: InstitutionId(body.institution_id),
                polo_id: body.polo_id,
                partner_id: body.partner_id,
                status: body.status.as_deref().map(parse_status).transpose()?,
                payment_gateway: body.payment_gateway,
                payment_external_id: body.payment_external_id,
            },
            Some(principal.user_id),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(enrollment.into())))
}

// ── GET /enrollments/{id} ────────────────────────────────────────────────────

pub async fn get_enrollment(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<EnrollmentEnvelope>, EnrollmentsServiceError> {
    let uc = GetEnrollmentUseCase {
        enrollments: state.enrollment_repo(),
    };
    let enrollment = uc.execute(EnrollmentId(id)).await?;
    ensure_enrollment_visible(&principal, &enrollment)?;
    Ok(Json(enrollment.into()))
}

// ── PATCH /enrollments/{id}/status ───────────────────────────────────────────

pub async fn update_enrollment_status(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<EnrollmentEnvelope>, EnrollmentsServiceError> {
    require_admin(&principal)?;
    let uc = UpdateEnrollmentStatusUseCase {
        enrollments: state.enrollment_repo(),
    };
    let enrollment = uc
        .execute(
            EnrollmentId(id),
            StatusChangeInput {
                status: parse_status(&body.status)?,
                reason: body.reason,
                metadata: body.metadata,
            },
            Some(principal.user_id),
        )
        .await?;
    Ok(Json(enrollment.into()))
}

// ── GET /enrollments/{id}/history ────────────────────────────────────────────

pub async fn get_enrollment_history(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<HistoryEntryResponse>>, EnrollmentsServiceError> {
    require_admin(&principal)?;
    let uc = ListEnrollmentHistoryUseCase {
        enrollments: state.enrollment_repo(),
    };
    let entries = uc.execute(EnrollmentId(id)).await?;
    Ok(Json(
        entries.into_iter().map(HistoryEntryResponse::from).collect(),
    ))
}
