//! Portal types: which actor role an account signs in as.

use serde::{Deserialize, Serialize};

/// Actor role of an account.
///
/// Wire format (JWT `portal` claim, `users.portal_type` column): snake_case string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortalType {
    Admin,
    Student,
    Polo,
    Partner,
}

impl PortalType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Student => "student",
            Self::Polo => "polo",
            Self::Partner => "partner",
        }
    }

    /// Parse the wire value. Returns `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Self::Admin),
            "student" => Some(Self::Student),
            "polo" => Some(Self::Polo),
            "partner" => Some(Self::Partner),
            _ => None,
        }
    }

    /// Staff portals may act on enrollments they do not own.
    pub fn is_staff(self) -> bool {
        !matches!(self, Self::Student)
    }
}
