use crate::config::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};
use crate::errors::AcError;
use common::jwt::IdentityClaims;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use tracing::instrument;

/// Well-formed bcrypt hash (cost 12) that matches no real password.
///
/// Verified against when no identity exists for a lookup key so that the
/// not-found path spends the same bcrypt time as a real mismatch.
pub const DUMMY_PASSWORD_HASH: &str =
    "$2b$12$LQv3c1yqBWVHxkd0LHAkCOYz6TtxMQJqhN8/LewY5GyYqExt7YD3a";

/// Dummy hash with the given cost, for timing parity on unknown identities.
///
/// Returns [`DUMMY_PASSWORD_HASH`] for cost 12 and hashes a fixed value otherwise.
pub fn dummy_hash_for_cost(cost: u32) -> Result<String, AcError> {
    if cost == 12 {
        return Ok(DUMMY_PASSWORD_HASH.to_string());
    }
    hash_password("access-control-dummy-password", cost)
}

/// Hash a password with bcrypt.
///
/// # Errors
///
/// Returns `AcError::Crypto` if `cost` is outside 10-14 or hashing fails.
#[instrument(skip_all)]
pub fn hash_password(password: &str, cost: u32) -> Result<String, AcError> {
    if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
        return Err(AcError::Crypto(format!(
            "Invalid bcrypt cost: {} (must be {}-{})",
            cost, MIN_BCRYPT_COST, MAX_BCRYPT_COST
        )));
    }

    bcrypt::hash(password, cost)
        .map_err(|e| AcError::Crypto(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a bcrypt hash.
///
/// bcrypt compares digests in constant time.
#[instrument(skip_all)]
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AcError> {
    bcrypt::verify(password, hash)
        .map_err(|e| AcError::Crypto(format!("Password verification failed: {}", e)))
}

/// [`hash_password`] on the blocking thread pool.
pub async fn hash_password_blocking(password: String, cost: u32) -> Result<String, AcError> {
    tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| AcError::Crypto(format!("Password hashing task failed: {}", e)))?
}

/// [`verify_password`] on the blocking thread pool.
pub async fn verify_password_blocking(password: String, hash: String) -> Result<bool, AcError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AcError::Crypto(format!("Password verification task failed: {}", e)))?
}

/// Sign identity claims as an HS256 JWT.
///
/// # Errors
///
/// - `AcError::Config` if `signing_key` is empty
/// - `AcError::Crypto` if encoding fails
#[instrument(skip_all)]
pub fn sign_identity_token(claims: &IdentityClaims, signing_key: &[u8]) -> Result<String, AcError> {
    if signing_key.is_empty() {
        return Err(AcError::Config("JWT signing key is not configured".to_string()));
    }

    let mut header = Header::new(Algorithm::HS256);
    header.typ = Some("JWT".to_string());

    encode(&header, claims, &EncodingKey::from_secret(signing_key))
        .map_err(|e| AcError::Crypto(format!("JWT signing operation failed: {}", e)))
}
