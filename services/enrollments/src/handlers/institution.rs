use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use campus_auth_types::principal::Principal;
use campus_domain::id::InstitutionId;

use crate::domain::types::{AccessPolicy, AccessType, Institution};
use crate::error::EnrollmentsServiceError;
use crate::handlers::require_admin;
use crate::state::AppState;
use crate::usecase::institution::{
    CreateInstitutionUseCase, GetInstitutionUseCase, UpdateAccessPolicyUseCase,
};

// ── Request / response types ─────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPolicyBody {
    pub access_type: AccessType,
    pub access_period_days: Option<u32>,
    #[serde(default)]
    pub block_delay_days: u32,
    #[serde(default)]
    pub cancel_delay_days: u32,
}

impl From<AccessPolicyBody> for AccessPolicy {
    fn from(b: AccessPolicyBody) -> Self {
        Self {
            access_type: b.access_type,
            access_period_days: b.access_period_days,
            block_delay_days: b.block_delay_days,
            cancel_delay_days: b.cancel_delay_days,
        }
    }
}

#[derive(Deserialize)]
pub struct CreateInstitutionRequest {
    pub name: String,
    #[serde(flatten)]
    pub policy: AccessPolicyBody,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionResponse {
    pub id: InstitutionId,
    pub name: String,
    pub access_type: AccessType,
    pub access_period_days: Option<u32>,
    pub block_delay_days: u32,
    pub cancel_delay_days: u32,
    #[serde(serialize_with = "campus_core::serde::to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "campus_core::serde::to_rfc3339_ms")]
    pub updated_at: DateTime<Utc>,
}

impl From<Institution> for InstitutionResponse {
    fn from(i: Institution) -> Self {
        Self {
            id: i.id,
            name: i.name,
            access_type: i.policy.access_type,
            access_period_days: i.policy.access_period_days,
            block_delay_days: i.policy.block_delay_days,
            cancel_delay_days: i.policy.cancel_delay_days,
            created_at: i.created_at,
            updated_at: i.updated_at,
        }
    }
}

// ── POST /institutions ───────────────────────────────────────────────────────

pub async fn create_institution(
    principal: Principal,
    State(state): State<AppState>,
    Json(body): Json<CreateInstitutionRequest>,
) -> Result<(StatusCode, Json<InstitutionResponse>), EnrollmentsServiceError> {
    require_admin(&principal)?;
    let uc = CreateInstitutionUseCase {
        institutions: state.institution_repo(),
    };
    let institution = uc.execute(body.name, body.policy.into()).await?;
    Ok((StatusCode::CREATED, Json(institution.into())))
}

// ── GET /institutions/{id} ───────────────────────────────────────────────────

pub async fn get_institution(
    _principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<InstitutionResponse>, EnrollmentsServiceError> {
    let uc = GetInstitutionUseCase {
        institutions: state.institution_repo(),
    };
    let institution = uc.execute(InstitutionId(id)).await?;
    Ok(Json(institution.into()))
}

// ── PUT /institutions/{id}/access-policy ─────────────────────────────────────

pub async fn update_access_policy(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<AccessPolicyBody>,
) -> Result<Json<InstitutionResponse>, EnrollmentsServiceError> {
    require_admin(&principal)?;
    let uc = UpdateAccessPolicyUseCase {
        institutions: state.institution_repo(),
    };
    let institution = uc.execute(InstitutionId(id), body.into()).await?;
    Ok(Json(institution.into()))
}
