//! User management endpoints. All require a bearer token.

use super::observe_error;
use crate::errors::AcError;
use crate::models::{RegisterUserRequest, UpdateUserRequest, UserResponse};
use crate::routes::AppState;
use crate::services::user_service;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

/// POST /api/users/register
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AcError> {
    let user = user_service::register_user(&state.pool, state.config.bcrypt_cost, &payload)
        .await
        .map_err(observe_error("register_user"))?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// GET /api/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserResponse>>, AcError> {
    let users = user_service::list_users(&state.pool)
        .await
        .map_err(observe_error("list_users"))?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, AcError> {
    let user = user_service::get_user(&state.pool, id)
        .await
        .map_err(observe_error("get_user"))?;

    Ok(Json(UserResponse::from(user)))
}

/// PUT /api/users/{id}
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<StatusCode, AcError> {
    user_service::update_user(&state.pool, state.config.bcrypt_cost, id, &payload)
        .await
        .map_err(observe_error("update_user"))?;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/users/{id}
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AcError> {
    user_service::delete_user(&state.pool, id)
        .await
        .map_err(observe_error("delete_user"))?;

    Ok(StatusCode::NO_CONTENT)
}
