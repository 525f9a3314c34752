use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use campus_auth_types::principal::Principal;
use campus_auth_types::token::Role;
use campus_domain::id::{EnrollmentId, InstitutionId, SimplifiedEnrollmentId};

use crate::domain::conversion::ConversionOutcome;
use crate::domain::types::{SimplifiedEnrollment, SimplifiedStatus, SimplifiedStatusLog};
use crate::error::EnrollmentsServiceError;
use crate::handlers::enrollment::EnrollmentResponse;
use crate::handlers::{ensure_simplified_visible, require_admin};
use crate::state::AppState;
use crate::usecase::conversion::ConvertSimplifiedUseCase;
use crate::usecase::simplified::{
    CreateSimplifiedEnrollmentUseCase, CreateSimplifiedInput, GetSimplifiedEnrollmentUseCase,
    ListSimplifiedStatusLogsUseCase,
};
use crate::usecase::status::{StatusChangeInput, UpdateSimplifiedStatusUseCase};

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimplifiedEnrollmentResponse {
    pub id: SimplifiedEnrollmentId,
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
    pub status: SimplifiedStatus,
    pub converted_enrollment_id: Option<EnrollmentId>,
    #[serde(serialize_with = "campus_core::serde::to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "campus_core::serde::to_rfc3339_ms")]
    pub updated_at: DateTime<Utc>,
}

impl From<SimplifiedEnrollment> for SimplifiedEnrollmentResponse {
    fn from(s: SimplifiedEnrollment) -> Self {
        Self {
            id: s.id,
            student_name: s.student_name,
            student_email: s.student_email,
            student_cpf: s.student_cpf,
            student_phone: s.student_phone,
            course_id: s.course_id,
            institution_id: s.institution_id,
            polo_id: s.polo_id,
            partner_id: s.partner_id,
            amount_cents: s.amount_cents,
            payment_gateway: s.payment_gateway,
            payment_external_id: s.payment_external_id,
            status: s.status,
            converted_enrollment_id: s.converted_enrollment_id,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimplifiedEnvelope {
    pub success: bool,
    pub simplified_enrollment: SimplifiedEnrollmentResponse,
}

impl From<SimplifiedEnrollment> for SimplifiedEnvelope {
    fn from(s: SimplifiedEnrollment) -> Self {
        Self {
            success: true,
            simplified_enrollment: s.into(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusLogResponse {
    pub id: Uuid,
    pub simplified_enrollment_id: i32,
    pub previous_status: Option<SimplifiedStatus>,
    pub new_status: SimplifiedStatus,
    pub reason: Option<String>,
    pub actor_id: Option<Uuid>,
    pub metadata: serde_json::Value,
    #[serde(serialize_with = "campus_core::serde::to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
}

impl From<SimplifiedStatusLog> for StatusLogResponse {
    fn from(l: SimplifiedStatusLog) -> Self {
        Self {
            id: l.id,
            simplified_enrollment_id: l.subject_id,
            previous_status: l.previous_status,
            new_status: l.new_status,
            reason: l.reason,
            actor_id: l.actor_id,
            metadata: l.metadata,
            created_at: l.created_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConversionResponse {
    success: bool,
    message: &'static str,
    enrollment: EnrollmentResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    account_created: Option<bool>,
}

// ── Request types ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSimplifiedRequest {
    pub student_name: String,
    pub student_email: String,
    pub student_cpf: Option<String>,
    pub student_phone: Option<String>,
    pub course_id: i32,
    pub institution_id: i32,
    pub polo_id: Option<i32>,
    pub partner_id: Option<i32>,
    pub amount_cents: i64,
    pub payment_gateway: Option<String>,
    pub payment_external_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSimplifiedStatusRequest {
    pub status: String,
    pub reason: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

// ── POST /v2/simplified-enrollments ──────────────────────────────────────────

pub async fn create_simplified_enrollment(
    principal: Principal,
    State(state): State<AppState>,
    Json(body): Json<CreateSimplifiedRequest>,
) -> Result<(StatusCode, Json<SimplifiedEnvelope>), EnrollmentsServiceError> {
    // Polo and partner submissions are pinned to the caller's own scope.
    let (polo_id, partner_id) = match principal.role {
        Role::Admin => (body.polo_id, body.partner_id),
        Role::Polo(polo_id) => (Some(polo_id), body.partner_id),
        Role::Partner(partner_id) => (body.polo_id, Some(partner_id)),
        Role::Student => return Err(EnrollmentsServiceError::Forbidden),
    };
    let uc = CreateSimplifiedEnrollmentUseCase {
        simplified: state.simplified_repo(),
        institutions: state.institution_repo(),
    };
    let created = uc
        .execute(
            CreateSimplifiedInput {
                student_name: body.student_name,
                student_email: body.student_email,
                student_cpf: body.student_cpf,
                student_phone: body.student_phone,
                course_id: body.course_id,
                institution_id: InstitutionId(body.institution_id),
                polo_id,
                partner_id,
                amount_cents: body.amount_cents,
                payment_gateway: body.payment_gateway,
                payment_external_id: body.payment_external_id,
            },
            Some(principal.user_id),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

// ── GET /v2/simplified-enrollments/{id} ──────────────────────────────────────

pub async fn get_simplified_enrollment(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SimplifiedEnvelope>, EnrollmentsServiceError> {
    if matches!(principal.role, Role::Student) {
        return Err(EnrollmentsServiceError::Forbidden);
    }
    let uc = GetSimplifiedEnrollmentUseCase {
        simplified: state.simplified_repo(),
    };
    let record = uc.execute(SimplifiedEnrollmentId(id)).await?;
    ensure_simplified_visible(&principal, &record)?;
    Ok(Json(record.into()))
}

// ── PATCH /v2/simplified-enrollments/{id}/status ─────────────────────────────

pub async fn update_simplified_status(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateSimplifiedStatusRequest>,
) -> Result<Json<SimplifiedEnvelope>, EnrollmentsServiceError> {
    require_admin(&principal)?;
    let status =
        SimplifiedStatus::parse(&body.status).ok_or(EnrollmentsServiceError::InvalidStatus)?;
    let uc = UpdateSimplifiedStatusUseCase {
        simplified: state.simplified_repo(),
    };
    let record = uc
        .execute(
            SimplifiedEnrollmentId(id),
            StatusChangeInput {
                status,
                reason: body.reason,
                metadata: body.metadata,
            },
            Some(principal.user_id),
        )
        .await?;
    Ok(Json(record.into()))
}

// ── GET /v2/simplified-enrollments/{id}/logs ─────────────────────────────────

pub async fn get_simplified_status_logs(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<StatusLogResponse>>, EnrollmentsServiceError> {
    require_admin(&principal)?;
    let uc = ListSimplifiedStatusLogsUseCase {
        simplified: state.simplified_repo(),
    };
    let logs = uc.execute(SimplifiedEnrollmentId(id)).await?;
    Ok(Json(logs.into_iter().map(StatusLogResponse::from).collect()))
}

// ── POST /v2/simplified-enrollments/{id}/convert ─────────────────────────────

pub async fn convert_simplified_enrollment(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, EnrollmentsServiceError> {
    require_admin(&principal)?;
    let uc = ConvertSimplifiedUseCase {
        simplified: state.simplified_repo(),
        enrollments: state.enrollment_repo(),
        accounts: state.account_repo(),
        port: state.conversion_port(),
    };
    let response = match uc
        .execute(SimplifiedEnrollmentId(id), Some(principal.user_id))
        .await?
    {
        ConversionOutcome::Converted {
            enrollment,
            account_created,
        } => (
            StatusCode::CREATED,
            Json(ConversionResponse {
                success: true,
                message: "Simplified enrollment converted",
                enrollment: enrollment.into(),
                account_created: Some(account_created),
            }),
        ),
        ConversionOutcome::AlreadyConverted(enrollment) => (
            StatusCode::CONFLICT,
            Json(ConversionResponse {
                success: false,
                message: "Simplified enrollment already converted",
                enrollment: enrollment.into(),
                account_created: None,
            }),
        ),
    };
    Ok(response.into_response())
}
