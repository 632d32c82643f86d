//! Custom test assertions for identity tokens.
//!
//! These decode the token without checking the signature; signature checks
//! belong to `common::jwt::verify_identity_token`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use common::jwt::IdentityClaims;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct JwtHeader {
    alg: String,
    #[serde(default)]
    typ: Option<String>,
}

fn decode_part(token: &str, index: usize) -> Vec<u8> {
    let part = token
        .split('.')
        .nth(index)
        .unwrap_or_else(|| panic!("JWT has no part {}", index));
    URL_SAFE_NO_PAD
        .decode(part)
        .unwrap_or_else(|e| panic!("Failed to base64 decode JWT part {}: {}", index, e))
}

fn decode_claims(token: &str) -> IdentityClaims {
    serde_json::from_slice(&decode_part(token, 1)).expect("Failed to parse JWT claims")
}

/// # Example
/// ```rust,ignore
/// token
///     .assert_valid_jwt()
///     .assert_for_subject(&user.id.to_string())
///     .assert_lifetime_hours(1);
/// ```
pub trait TokenAssertions {
    /// Three parts, HS256 header, payload parses as identity claims.
    fn assert_valid_jwt(&self) -> &Self;

    fn assert_for_subject(&self, subject: &str) -> &Self;

    fn assert_names(&self, given_name: &str, family_name: &str) -> &Self;

    /// `exp - iat` equals the given number of hours.
    fn assert_lifetime_hours(&self, hours: i64) -> &Self;
}

impl TokenAssertions for String {
    fn assert_valid_jwt(&self) -> &Self {
        let parts = self.split('.').count();
        assert_eq!(
            parts, 3,
            "JWT must have 3 parts (header.payload.signature), got {}",
            parts
        );

        let header: JwtHeader =
            serde_json::from_slice(&decode_part(self, 0)).expect("Failed to parse JWT header");
        assert_eq!(header.alg, "HS256", "Expected HS256 algorithm");
        assert_eq!(header.typ.as_deref(), Some("JWT"), "Expected JWT type");

        decode_claims(self);
        self
    }

    fn assert_for_subject(&self, subject: &str) -> &Self {
        let claims = decode_claims(self);
        assert_eq!(
            claims.sub, subject,
            "Expected subject '{}', got '{}'",
            subject, claims.sub
        );
        self
    }

    fn assert_names(&self, given_name: &str, family_name: &str) -> &Self {
        let claims = decode_claims(self);
        assert_eq!(claims.given_name, given_name);
        assert_eq!(claims.family_name, family_name);
        self
    }

    fn assert_lifetime_hours(&self, hours: i64) -> &Self {
        let claims = decode_claims(self);
        assert_eq!(
            claims.exp - claims.iat,
            hours * 3600,
            "Expected a {} hour token, got {} seconds",
            hours,
            claims.exp - claims.iat
        );
        self
    }
}
