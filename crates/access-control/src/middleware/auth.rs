//! Bearer token authentication for protected routes.
//!
//! Extracts the token from the `Authorization` header, verifies it with the
//! same key, issuer and audience used for issuance and checks expiry against
//! the injected clock. Verified claims are stored in request extensions.

use crate::clock::Clock;
use crate::config::JwtSettings;
use crate::errors::AcError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use common::jwt::{verify_identity_token, IdentityClaims};
use common::secret::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    signing_key: SecretString,
    issuer: String,
    audience: String,
    clock: Arc<dyn Clock>,
}

impl AuthState {
    pub fn new(settings: &JwtSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            signing_key: settings.signing_key.clone(),
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
            clock,
        }
    }

    fn verify(&self, token: &str) -> Result<IdentityClaims, AcError> {
        verify_identity_token(
            token,
            self.signing_key.expose_secret().as_bytes(),
            &self.issuer,
            &self.audience,
            self.clock.now().timestamp(),
        )
        .map_err(|e| AcError::InvalidToken(e.to_string()))
    }
}

fn extract_bearer_token(req: &Request) -> Result<&str, AcError> {
    let auth_header = req
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!(target: "ac.middleware.auth", "Missing Authorization header");
            AcError::InvalidToken("Missing Authorization header".to_string())
        })?;

    auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::debug!(target: "ac.middleware.auth", "Invalid Authorization header format");
        AcError::InvalidToken("Invalid Authorization header format".to_string())
    })
}

/// Returns 401 if the token is missing, malformed, wrongly signed or expired.
#[instrument(skip_all, name = "ac.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, AcError> {
    let token = extract_bearer_token(&req)?;
    let claims = state.verify(token)?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
