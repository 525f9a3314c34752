use axum::extract::FromRef;
use sea_orm::DatabaseConnection;

use campus_auth_types::principal::TokenSecret;

use crate::infra::db::{
    DbAccountRepository, DbConversionPort, DbEnrollmentRepository, DbInstitutionRepository,
    DbSimplifiedEnrollmentRepository,
};

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub jwt_secret: String,
    pub token_secret: TokenSecret,
}

impl AppState {
    pub fn new(db: DatabaseConnection, jwt_secret: String) -> Self {
        let token_secret = TokenSecret::new(jwt_secret.as_str());
        Self {
            db,
            jwt_secret,
            token_secret,
        }
    }

    pub fn enrollment_repo(&self) -> DbEnrollmentRepository {
        DbEnrollmentRepository {
            db: self.db.clone(),
        }
    }

    pub fn simplified_repo(&self) -> DbSimplifiedEnrollmentRepository {
        DbSimplifiedEnrollmentRepository {
            db: self.db.clone(),
        }
    }

    pub fn institution_repo(&self) -> DbInstitutionRepository {
        DbInstitutionRepository {
            db: self.db.clone(),
        }
    }

    pub fn account_repo(&self) -> DbAccountRepository {
        DbAccountRepository {
            db: self.db.clone(),
        }
    }

    pub fn conversion_port(&self) -> DbConversionPort {
        DbConversionPort {
            db: self.db.clone(),
        }
    }
}

impl FromRef<AppState> for TokenSecret {
    fn from_ref(state: &AppState) -> Self {
        state.token_secret.clone()
    }
}
