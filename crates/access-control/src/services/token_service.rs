//! Access token issuance.

use crate::clock::Clock;
use crate::config::JwtSettings;
use crate::crypto;
use crate::errors::AcError;
use crate::observability::metrics::record_token_issuance;
use crate::services::credential_service::Identity;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use common::jwt::IdentityClaims;
use common::secret::{ExposeSecret, SecretString};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Claims taken from a verified identity and embedded verbatim in the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub user_id: Uuid,
    pub given_name: String,
    pub family_name: String,
}

impl From<&Identity> for TokenSubject {
    fn from(identity: &Identity) -> Self {
        Self {
            user_id: identity.id,
            given_name: identity.first_name.clone(),
            family_name: identity.last_name.clone(),
        }
    }
}

/// Signed token handed to the caller. Never stored server-side.
#[derive(Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl IssuedToken {
    /// Expiry is exclusive: the token is no longer valid at `expires_at`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Signs HS256 identity tokens with the process-wide key, issuer and audience.
pub struct TokenIssuer {
    signing_key: SecretString,
    issuer: String,
    audience: String,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    pub fn new(settings: &JwtSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            signing_key: settings.signing_key.clone(),
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
            clock,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Issue a token for `subject` valid for `lifetime_hours` from now.
    ///
    /// # Errors
    ///
    /// - `AcError::Config` - signing key is empty; every call fails until it is set
    /// - `AcError::Crypto` - signing failed
    #[instrument(skip_all, fields(user_id = %subject.user_id))]
    pub fn issue(
        &self,
        subject: &TokenSubject,
        lifetime_hours: u32,
    ) -> Result<IssuedToken, AcError> {
        let result = self.sign(subject, lifetime_hours);
        record_token_issuance(if result.is_ok() { "success" } else { "error" });
        result
    }

    fn sign(&self, subject: &TokenSubject, lifetime_hours: u32) -> Result<IssuedToken, AcError> {
        let key = self.signing_key.expose_secret();
        if key.is_empty() {
            tracing::error!(
                target: "ac.services.token",
                "JWT signing key is not configured, cannot issue tokens"
            );
            return Err(AcError::Config("JWT signing key is not configured".to_string()));
        }

        // `iat`/`exp` are whole seconds, so `expires_at` must be too.
        let issued_at = self.clock.now().trunc_subsecs(0);
        let expires_at = issued_at
            .checked_add_signed(Duration::hours(i64::from(lifetime_hours)))
            .ok_or_else(|| AcError::Config("Token lifetime overflows".to_string()))?;

        let claims = IdentityClaims {
            sub: subject.user_id.to_string(),
            given_name: subject.given_name.clone(),
            family_name: subject.family_name.clone(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = crypto::sign_identity_token(&claims, key.as_bytes())?;

        Ok(IssuedToken { token, expires_at })
    }
}
