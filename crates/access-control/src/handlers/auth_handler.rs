use super::observe_error;
use crate::errors::AcError;
use crate::models::{LoginRequest, LoginResponse};
use crate::routes::AppState;
use axum::{extract::State, Json};
use std::sync::Arc;

/// Handle login
///
/// POST /api/users/login
///
/// Unknown emails and wrong passwords both answer 401 `INVALID_CREDENTIALS`.
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AcError> {
    let issued = state
        .login
        .login(&payload.email, &payload.password)
        .await
        .map_err(observe_error("login"))?;

    Ok(Json(LoginResponse::from(issued)))
}
