//! Builder for hand-crafted identity tokens.
//!
//! Tokens issued through the login endpoint are always fresh and correctly
//! addressed; this builder covers the other cases (expired, wrong audience,
//! wrong key).

use chrono::{Duration, Utc};
use common::jwt::IdentityClaims;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use uuid::Uuid;

use crate::fixtures::TEST_SIGNING_KEY;
use crate::test_ids::{TEST_AUDIENCE, TEST_ISSUER, TEST_USER_ALICE};

/// # Example
/// ```rust,ignore
/// let expired = TestTokenBuilder::new()
///     .for_user(user.id)
///     .expired_seconds_ago(60)
///     .build();
/// ```
pub struct TestTokenBuilder {
    claims: IdentityClaims,
    key: Vec<u8>,
}

impl TestTokenBuilder {
    /// Token for Alice, valid for an hour, signed with [`TEST_SIGNING_KEY`].
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            claims: IdentityClaims {
                sub: TEST_USER_ALICE.to_string(),
                given_name: "Alice".to_string(),
                family_name: "Tester".to_string(),
                iss: TEST_ISSUER.to_string(),
                aud: TEST_AUDIENCE.to_string(),
                iat: now.timestamp(),
                exp: (now + Duration::hours(1)).timestamp(),
            },
            key: TEST_SIGNING_KEY.as_bytes().to_vec(),
        }
    }

    pub fn for_user(mut self, user_id: Uuid) -> Self {
        self.claims.sub = user_id.to_string();
        self
    }

    pub fn with_names(mut self, given_name: &str, family_name: &str) -> Self {
        self.claims.given_name = given_name.to_string();
        self.claims.family_name = family_name.to_string();
        self
    }

    pub fn with_audience(mut self, audience: &str) -> Self {
        self.claims.aud = audience.to_string();
        self
    }

    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.claims.iss = issuer.to_string();
        self
    }

    /// Set expiration in seconds from now
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.claims.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Token that expired `seconds` ago, issued an hour before that.
    pub fn expired_seconds_ago(mut self, seconds: i64) -> Self {
        let exp = Utc::now() - Duration::seconds(seconds);
        self.claims.exp = exp.timestamp();
        self.claims.iat = (exp - Duration::hours(1)).timestamp();
        self
    }

    pub fn signed_with(mut self, key: &[u8]) -> Self {
        self.key = key.to_vec();
        self
    }

    pub fn claims(&self) -> &IdentityClaims {
        &self.claims
    }

    /// Sign the claims as an HS256 JWT.
    pub fn build(self) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &self.claims,
            &EncodingKey::from_secret(&self.key),
        )
        .expect("HS256 encoding of test claims should not fail")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
