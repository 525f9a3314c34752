//! JWT access-token issuing and validation.

use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;
#[cfg(any(feature = "ISSUER", test))]
use serde::Serialize;
use uuid::Uuid;

use campus_domain::portal::PortalType;

/// Access-token JWT lifetime in seconds (4 hours).
pub const ACCESS_TOKEN_EXP: u64 = 14400;

/// Portal role carried by a validated token.
///
/// Polo and partner members are scoped to the single polo/partner they belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Student,
    Polo(i32),
    Partner(i32),
}

impl Role {
    pub fn portal(self) -> PortalType {
        match self {
            Self::Admin => PortalType::Admin,
            Self::Student => PortalType::Student,
            Self::Polo(_) => PortalType::Polo,
            Self::Partner(_) => PortalType::Partner,
        }
    }

    /// The polo/partner id the role is scoped to, if any.
    pub fn scope(self) -> Option<i32> {
        match self {
            Self::Polo(id) | Self::Partner(id) => Some(id),
            Self::Admin | Self::Student => None,
        }
    }

    fn from_parts(portal: PortalType, scope: Option<i32>) -> Option<Self> {
        match (portal, scope) {
            (PortalType::Admin, _) => Some(Self::Admin),
            (PortalType::Student, _) => Some(Self::Student),
            (PortalType::Polo, Some(id)) => Some(Self::Polo(id)),
            (PortalType::Partner, Some(id)) => Some(Self::Partner(id)),
            _ => None,
        }
    }
}

/// Identity extracted from a validated access token.
#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub user_id: Uuid,
    pub role: Role,
    pub access_token_exp: u64,
}

/// Errors returned by [`validate_access_token`].
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
}

/// JWT claims payload.
///
/// | Field | JWT claim | Rust type | Meaning |
/// |-------|-----------|-----------|---------|
/// | `sub` | `sub` | UUID string | user ID |
/// | `portal` | custom | snake_case string | see [`PortalType`] |
/// | `scope` | custom | optional `i32` | polo/partner id for scoped portals |
/// | `exp` | `exp` | seconds since epoch | token expiration |
///
/// [`Serialize`] requires the **`ISSUER`** cargo feature.
#[derive(Debug, Deserialize)]
#[cfg_attr(any(feature = "ISSUER", test), derive(Serialize))]
pub struct JwtClaims {
    pub sub: String,
    pub portal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<i32>,
    pub exp: u64,
}

/// HS256, exp checked, required claims `exp` + `sub`, default 60s leeway.
fn decode_jwt(token: &str, secret: &str) -> Result<JwtClaims, AuthError> {
    let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.validate_exp = true;
    validation.required_spec_claims.clear();
    validation.set_required_spec_claims(&["exp", "sub"]);

    let data = decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        _ => AuthError::Malformed,
    })?;

    Ok(data.claims)
}

/// Validate a bearer token, returning the parsed identity.
pub fn validate_access_token(token: &str, secret: &str) -> Result<TokenInfo, AuthError> {
    let claims = decode_jwt(token, secret)?;
    let user_id = claims
        .sub
        .parse::<Uuid>()
        .map_err(|_| AuthError::Malformed)?;
    let portal = PortalType::parse(&claims.portal).ok_or(AuthError::Malformed)?;
    let role = Role::from_parts(portal, claims.scope).ok_or(AuthError::Malformed)?;
    Ok(TokenInfo {
        user_id,
        role,
        access_token_exp: claims.exp,
    })
}

/// Sign an access token for `user_id` expiring [`ACCESS_TOKEN_EXP`] seconds after `now_secs`.
///
/// Returns the token and its `exp`.
#[cfg(any(feature = "ISSUER", test))]
pub fn issue_access_token(
    user_id: Uuid,
    role: Role,
    now_secs: u64,
    secret: &str,
) -> Result<(String, u64), jsonwebtoken::errors::Error> {
    use jsonwebtoken::{EncodingKey, Header, encode};

    let exp = now_secs + ACCESS_TOKEN_EXP;
    let claims = JwtClaims {
        sub: user_id.to_string(),
        portal: role.portal().as_str().to_owned(),
        scope: role.scope(),
        exp,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok((token, exp))
}
