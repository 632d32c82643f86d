//! Identity token claims and verification shared by every service that accepts
//! access tokens issued by the Access Control service.
//!
//! Tokens are HS256-signed JWTs. Issuance lives in the `access-control` crate;
//! this module only knows how to read them back:
//! - Size limits for DoS prevention
//! - Signature, issuer and audience validation
//! - Expiry check with an explicit `now` (`now < exp`, exclusive)
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing
//! - Only HS256 is accepted
//! - Every failure maps to the same generic message
//! - Personal fields in [`IdentityClaims`] are redacted in Debug output
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::verify_identity_token;
//!
//! let claims = verify_identity_token(
//!     token,
//!     key_bytes,
//!     "access-control",
//!     "access-control-clients",
//!     now,
//! )?;
//! println!("authenticated user {}", claims.sub);
//! ```

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Identity tokens are a few hundred bytes; anything larger is rejected before
/// base64 decoding or signature work.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during token validation.
///
/// Every variant renders the same message so callers cannot tell a bad
/// signature from an expired token. Details are logged at debug level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token could not be decoded or its signature, issuer or audience did not match.
    #[error("The access token is invalid or expired")]
    InvalidToken,

    /// Token `exp` is at or before `now`.
    #[error("The access token is invalid or expired")]
    Expired,

    /// No verification key configured.
    #[error("The access token is invalid or expired")]
    MissingKey,
}

// =============================================================================
// Claims Types
// =============================================================================

/// Claims embedded in an identity token.
///
/// # Fields
///
/// - `sub`: user id (UUID string)
/// - `given_name` / `family_name`: copied verbatim from the verified identity
/// - `iss` / `aud`: must match between issuance and verification
/// - `iat` / `exp`: Unix epoch seconds
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Subject (user id) - redacted in Debug output.
    pub sub: String,

    /// Given name - redacted in Debug output.
    pub given_name: String,

    /// Family name - redacted in Debug output.
    pub family_name: String,

    /// Issuer.
    pub iss: String,

    /// Audience.
    pub aud: String,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,
}

impl fmt::Debug for IdentityClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityClaims")
            .field("sub", &"[REDACTED]")
            .field("given_name", &"[REDACTED]")
            .field("family_name", &"[REDACTED]")
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .finish()
    }
}

impl IdentityClaims {
    /// Whether the token is still valid at `now` (Unix epoch seconds).
    ///
    /// Expiry is exclusive: a token is no longer valid at the instant `exp`.
    #[must_use]
    pub fn is_valid_at(&self, now: i64) -> bool {
        now < self.exp
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Verify an HS256 identity token and return its claims.
///
/// Checks, in order: size, key presence, signature, issuer, audience and
/// finally expiry against the supplied `now`. Expiry is evaluated here rather
/// than by `jsonwebtoken` so that callers can inject a clock.
///
/// # Errors
///
/// - `TokenTooLarge` - token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `MissingKey` - `signing_key` is empty
/// - `InvalidToken` - malformed token, bad signature, wrong `iss`/`aud`
/// - `Expired` - `now >= exp`
pub fn verify_identity_token(
    token: &str,
    signing_key: &[u8],
    issuer: &str,
    audience: &str,
    now: i64,
) -> Result<IdentityClaims, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    if signing_key.is_empty() {
        tracing::debug!(target: "common.jwt", "Token rejected: no verification key configured");
        return Err(JwtValidationError::MissingKey);
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.leeway = 0;
    validation.set_issuer(&[issuer]);
    validation.set_audience(&[audience]);
    validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

    let data = decode::<IdentityClaims>(token, &DecodingKey::from_secret(signing_key), &validation)
        .map_err(|e| {
            tracing::debug!(target: "common.jwt", error = %e, "Token verification failed");
            JwtValidationError::InvalidToken
        })?;

    if !data.claims.is_valid_at(now) {
        tracing::debug!(
            target: "common.jwt",
            exp = data.claims.exp,
            now = now,
            "Token rejected: expired"
        );
        return Err(JwtValidationError::Expired);
    }

    Ok(data.claims)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const KEY: &[u8] = b"unit-test-signing-key-with-32-bytes!";

    fn claims(exp: i64) -> IdentityClaims {
        IdentityClaims {
            sub: "00000000-0000-0000-0000-000000000064".to_string(),
            given_name: "Alice".to_string(),
            family_name: "Liddell".to_string(),
            iss: "access-control".to_string(),
            aud: "access-control-clients".to_string(),
            iat: 1_000,
            exp,
        }
    }

    fn verify_with(
        token: &str,
        key: &[u8],
        now: i64,
    ) -> Result<IdentityClaims, JwtValidationError> {
        verify_identity_token(token, key, "access-control", "access-control-clients", now)
    }

    fn sign(claims: &IdentityClaims, key: &[u8]) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(key),
        )
        .unwrap()
    }

    #[test]
    fn test_verify_valid_token() {
        let token = sign(&claims(4_600), KEY);
        let verified = verify_with(&token, KEY, 2_000).unwrap();
        assert_eq!(verified, claims(4_600));
    }

    #[test]
    fn test_expiry_is_exclusive() {
        let token = sign(&claims(4_600), KEY);
        let at_exp = verify_with(&token, KEY, 4_600);
        assert_eq!(at_exp, Err(JwtValidationError::Expired));

        let just_before = verify_with(&token, KEY, 4_599);
        assert!(just_before.is_ok());
    }

    #[test]
    fn test_wrong_key_rejected() {
        let token = sign(&claims(4_600), KEY);
        let result = verify_with(&token, b"another-key-entirely-different-0000", 2_000);
        assert_eq!(result, Err(JwtValidationError::InvalidToken));
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let token = sign(&claims(4_600), KEY);
        let result = verify_identity_token(&token, KEY, "access-control", "someone-else", 2_000);
        assert_eq!(result, Err(JwtValidationError::InvalidToken));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let token = sign(&claims(4_600), KEY);
        let result =
            verify_identity_token(&token, KEY, "impostor", "access-control-clients", 2_000);
        assert_eq!(result, Err(JwtValidationError::InvalidToken));
    }

    #[test]
    fn test_oversized_token_rejected() {
        let token = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        let result = verify_identity_token(&token, KEY, "access-control", "aud", 0);
        assert_eq!(result, Err(JwtValidationError::TokenTooLarge));
    }

    #[test]
    fn test_empty_key_rejected() {
        let token = sign(&claims(4_600), KEY);
        let result = verify_with(&token, b"", 2_000);
        assert_eq!(result, Err(JwtValidationError::MissingKey));
    }

    #[test]
    fn test_error_messages_are_uniform() {
        let messages: Vec<String> = [
            JwtValidationError::TokenTooLarge,
            JwtValidationError::InvalidToken,
            JwtValidationError::Expired,
            JwtValidationError::MissingKey,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert!(messages.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_debug_redacts_personal_fields() {
        let debug = format!("{:?}", claims(4_600));
        assert!(!debug.contains("Alice"));
        assert!(!debug.contains("Liddell"));
        assert!(!debug.contains("0064"));
        assert!(debug.contains("access-control"));
    }
}
