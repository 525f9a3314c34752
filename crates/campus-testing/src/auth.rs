//! Bearer-token identities for tests.
//!
//! `MockAuth` signs a real access token with a test secret so requests pass
//! through the same `Principal` extractor as production traffic.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::{HeaderMap, HeaderValue, header::AUTHORIZATION};
use uuid::Uuid;

use campus_auth_types::principal::{Principal, TokenSecret};
use campus_auth_types::token::{Role, issue_access_token};

/// Secret shared by test states and [`MockAuth`] tokens.
pub const TEST_JWT_SECRET: &str = "campus-test-jwt-secret";

/// Configurable identity injected into test requests.
pub struct MockAuth {
    pub user_id: Uuid,
    pub role: Role,
}

impl MockAuth {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn admin() -> Self {
        Self::new(Uuid::now_v7(), Role::Admin)
    }

    pub fn student(user_id: Uuid) -> Self {
        Self::new(user_id, Role::Student)
    }

    /// The principal a handler would see for this identity.
    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.user_id,
            role: self.role,
        }
    }

    /// A freshly signed bearer token.
    pub fn token(&self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before UNIX epoch")
            .as_secs();
        issue_access_token(self.user_id, self.role, now, TEST_JWT_SECRET)
            .expect("sign test token")
            .0
    }

    /// `Authorization: Bearer ...` header map.
    pub fn headers(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.token())).unwrap(),
        );
        map
    }
}

/// Token secret matching [`TEST_JWT_SECRET`].
pub fn test_token_secret() -> TokenSecret {
    TokenSecret::new(TEST_JWT_SECRET)
}
