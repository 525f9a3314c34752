use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use campus_domain::portal::PortalType;

use crate::error::EnrollmentsServiceError;
use crate::state::AppState;
use crate::usecase::auth::{CreateTokenInput, CreateTokenUseCase};

// ── POST /auth/token ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateTokenRequest {
    /// Email or username.
    pub login: String,
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: u64,
    pub user_id: Uuid,
    pub portal: PortalType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<i32>,
}

pub async fn create_token(
    State(state): State<AppState>,
    Json(body): Json<CreateTokenRequest>,
) -> Result<Json<CreateTokenResponse>, EnrollmentsServiceError> {
    let uc = CreateTokenUseCase {
        accounts: state.account_repo(),
        jwt_secret: state.jwt_secret.clone(),
    };
    let output = uc
        .execute(CreateTokenInput {
            login: body.login,
            password: body.password,
        })
        .await?;
    Ok(Json(CreateTokenResponse {
        access_token: output.access_token,
        token_type: "Bearer",
        expires_at: output.expires_at,
        user_id: output.user_id,
        portal: output.role.portal(),
        scope: output.role.scope(),
    }))
}
