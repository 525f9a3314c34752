//! Bearer-token `Principal` extractor.

use std::sync::Arc;

use axum::Json;
use axum::extract::{FromRef, FromRequestParts};
use axum::response::{IntoResponse, Response};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use http::StatusCode;
use http::request::Parts;
use uuid::Uuid;

use crate::token::{AuthError, Role, validate_access_token};

/// HMAC secret used to verify bearer tokens. Services expose it from their
/// state with `FromRef`.
#[derive(Clone)]
pub struct TokenSecret(pub Arc<str>);

impl TokenSecret {
    pub fn new(secret: impl Into<Arc<str>>) -> Self {
        Self(secret.into())
    }
}

/// Authenticated caller, resolved from `Authorization: Bearer <jwt>` on every
/// request. No server-side session state is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}

/// Rejection for [`Principal`]: always 401.
#[derive(Debug, thiserror::Error)]
pub enum PrincipalRejection {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid bearer token: {0}")]
    InvalidToken(#[from] AuthError),
}

impl IntoResponse for PrincipalRejection {
    fn into_response(self) -> Response {
        tracing::debug!(reason = %self, "rejected bearer token");
        let body = serde_json::json!({
            "success": false,
            "kind": "UNAUTHORIZED",
            "message": "unauthorized",
        });
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

impl<S> FromRequestParts<S> for Principal
where
    TokenSecret: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = PrincipalRejection;

    // axum-core 0.5 defines this as `fn -> impl Future + Send` (not `async fn`).
    // Resolve everything synchronously and hand back a 'static future.
    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let secret = TokenSecret::from_ref(state);
        let result = match parts.headers.typed_get::<Authorization<Bearer>>() {
            None => Err(PrincipalRejection::MissingToken),
            Some(Authorization(bearer)) => validate_access_token(bearer.token(), &secret.0)
                .map(|info| Principal {
                    user_id: info.user_id,
                    role: info.role,
                })
                .map_err(PrincipalRejection::from),
        };
        async move { result }
    }
}
