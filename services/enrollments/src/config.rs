use serde::Deserialize;

use campus_core::config::Config;

/// Enrollments service configuration loaded from environment variables.
#[derive(Debug, Deserialize)]
pub struct EnrollmentsConfig {
    /// PostgreSQL connection URL. Env var: `DATABASE_URL`.
    pub database_url: String,
    /// HMAC secret for access tokens. Env var: `JWT_SECRET`.
    pub jwt_secret: String,
    /// TCP port for the HTTP server (default 3120). Env var: `ENROLLMENTS_PORT`.
    #[serde(default = "default_port")]
    pub enrollments_port: u16,
}

fn default_port() -> u16 {
    3120
}

impl Config for EnrollmentsConfig {}
