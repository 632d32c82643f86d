use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AcError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Fatal configuration problem on the login path (e.g. missing signing key).
    #[error("Configuration error: {0}")]
    Config(String),

    /// No identity matched the lookup key. Never shown to callers as such.
    #[error("Identity not found")]
    IdentityNotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Mail delivery error: {0}")]
    Mail(String),

    /// A deferred work item failed or panicked inside the worker.
    #[error("Deferred task failed: {0}")]
    TaskFailed(String),

    #[error("Internal server error")]
    Internal,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl AcError {
    pub fn status_code(&self) -> StatusCode {
        self.response_parts().0
    }

    /// HTTP status, stable error code and client-facing message.
    ///
    /// `IdentityNotFound` and `InvalidCredentials` share one response so the
    /// two rejection paths cannot be told apart.
    fn response_parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AcError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "An internal database error occurred".to_string(),
            ),
            AcError::Crypto(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CRYPTO_ERROR",
                "An internal cryptographic error occurred".to_string(),
            ),
            AcError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIGURATION_ERROR",
                "The service is not configured to issue tokens".to_string(),
            ),
            AcError::IdentityNotFound | AcError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid credentials".to_string(),
            ),
            AcError::InvalidToken(reason) => (
                StatusCode::UNAUTHORIZED,
                "INVALID_TOKEN",
                reason.clone(),
            ),
            AcError::InvalidRequest(reason) => (
                StatusCode::BAD_REQUEST,
                "INVALID_REQUEST",
                reason.clone(),
            ),
            AcError::Conflict(reason) => (StatusCode::CONFLICT, "CONFLICT", reason.clone()),
            AcError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "The requested resource was not found".to_string(),
            ),
            AcError::Mail(_) | AcError::TaskFailed(_) | AcError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        }
    }
}

impl IntoResponse for AcError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.response_parts();

        if status.is_server_error() {
            tracing::error!(target: "ac.errors", error = %self, code = code, "Request failed");
        }

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(error_response)).into_response()
    }
}
