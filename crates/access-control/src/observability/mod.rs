//! Observability module for the Access Control service
//!
//! # Privacy by Default
//!
//! Instrumentation uses `#[instrument(skip_all)]` and explicit safe field allow-listing.
//! Fields are categorized as:
//! - **SAFE**: Can be logged in plaintext (enums, task kinds, user ids)
//! - **HASHED**: Must be SHA-256 hashed for correlation (email addresses)
//! - **NEVER**: Must never appear in logs (passwords, tokens, signing keys)

pub mod metrics;

use sha2::{Digest, Sha256};

/// Hash a field value for correlation in logs (SHA-256, first 8 hex chars)
///
/// Used for login emails so failed and successful attempts for the same
/// address can be correlated without writing the address itself.
pub fn hash_for_correlation(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    hex::encode(digest.get(..4).unwrap_or_default())
}

/// Error categories for metrics labels (bounded cardinality)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rejected credentials or bearer tokens
    Authentication,
    /// Malformed input, conflicts, missing resources
    Client,
    /// Configuration, database, crypto and mail failures
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::Client => "client",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl From<&crate::errors::AcError> for ErrorCategory {
    fn from(err: &crate::errors::AcError) -> Self {
        use crate::errors::AcError;
        match err {
            AcError::IdentityNotFound | AcError::InvalidCredentials | AcError::InvalidToken(_) => {
                ErrorCategory::Authentication
            }
            AcError::InvalidRequest(_) | AcError::Conflict(_) | AcError::NotFound(_) => {
                ErrorCategory::Client
            }
            AcError::Database(_)
            | AcError::Crypto(_)
            | AcError::Config(_)
            | AcError::Mail(_)
            | AcError::TaskFailed(_)
            | AcError::Internal => ErrorCategory::Internal,
        }
    }
}
