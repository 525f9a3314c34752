use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context as _;
use uuid::Uuid;

use campus_auth_types::token::{Role, issue_access_token};

use crate::domain::repository::AccountRepository;
use crate::domain::types::{Account, Portal};
use crate::error::EnrollmentsServiceError;
use crate::usecase::credentials::verify_password;

fn now_secs() -> Result<u64, EnrollmentsServiceError> {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock before UNIX epoch")?
        .as_secs();
    Ok(secs)
}

pub fn role_of(account: &Account) -> Role {
    match account.portal {
        Portal::Admin => Role::Admin,
        Portal::Student { .. } => Role::Student,
        Portal::Polo { polo_id } => Role::Polo(polo_id),
        Portal::Partner { partner_id } => Role::Partner(partner_id),
    }
}

// ── CreateToken (login) ──────────────────────────────────────────────────────

pub struct CreateTokenInput {
    pub login: String,
    pub password: String,
}

#[derive(Debug)]
pub struct CreateTokenOutput {
    pub access_token: String,
    pub expires_at: u64,
    pub user_id: Uuid,
    pub role: Role,
}

pub struct CreateTokenUseCase<A: AccountRepository> {
    pub accounts: A,
    pub jwt_secret: String,
}

impl<A: AccountRepository> CreateTokenUseCase<A> {
    /// Unknown login and wrong password both yield `InvalidCredentials`.
    pub async fn execute(
        &self,
        input: CreateTokenInput,
    ) -> Result<CreateTokenOutput, EnrollmentsServiceError> {
        let login = input.login.trim().to_lowercase();
        if login.is_empty() || input.password.is_empty() {
            return Err(EnrollmentsServiceError::MissingData);
        }
        let account = self
            .accounts
            .find_by_login(&login)
            .await?
            .ok_or(EnrollmentsServiceError::InvalidCredentials)?;
        let (password, hash) = (input.password, account.password_hash.clone());
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .context("join password verification")?;
        if !verified {
            tracing::info!(user_id = %account.id, "login rejected");
            return Err(EnrollmentsServiceError::InvalidCredentials);
        }

        let role = role_of(&account);
        let (access_token, expires_at) =
            issue_access_token(account.id, role, now_secs()?, &self.jwt_secret)
                .context("sign access token")?;
        tracing::info!(user_id = %account.id, portal = role.portal().as_str(), "token issued");
        Ok(CreateTokenOutput {
            access_token,
            expires_at,
            user_id: account.id,
            role,
        })
    }
}
