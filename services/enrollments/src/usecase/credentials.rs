use anyhow::anyhow;
use argon2::Argon2;
use chrono::{DateTime, Utc};
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use rand::RngExt;

use crate::domain::types::TEMP_PASSWORD_LEN;
use crate::error::EnrollmentsServiceError;

/// Charset for enrollment code suffixes (uppercase alphanumeric).
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_SUFFIX_LEN: usize = 6;

/// No look-alike characters (0/O, 1/l/I).
const PASSWORD_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnpqrstuvwxyz23456789";

fn random_string(charset: &[u8], len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| charset[rng.random_range(0..charset.len())] as char)
        .collect()
}

/// `ENR-YYYYMMDD-XXXXXX`
pub fn generate_enrollment_code(now: DateTime<Utc>) -> String {
    format!(
        "ENR-{}-{}",
        now.format("%Y%m%d"),
        random_string(CODE_CHARSET, CODE_SUFFIX_LEN)
    )
}

/// Email local part reduced to `[a-z0-9]`, plus a 4-digit suffix.
pub fn generate_username(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let mut base: String = local
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .take(20)
        .collect();
    if base.is_empty() {
        base.push_str("student");
    }
    let suffix = rand::rng().random_range(1000..10000);
    format!("{base}{suffix}")
}

pub fn generate_temp_password() -> String {
    random_string(PASSWORD_CHARSET, TEMP_PASSWORD_LEN)
}

pub fn hash_password(password: &str) -> Result<String, EnrollmentsServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("hash password: {e}"))?;
    Ok(hash.to_string())
}

/// `false` for a wrong password or an unparsable stored hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "unparsable password hash");
            false
        }
    }
}
