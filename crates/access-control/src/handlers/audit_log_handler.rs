//! Read-only audit log endpoints. Entries are written by deferred tasks.

use super::observe_error;
use crate::errors::AcError;
use crate::models::AuditLogResponse;
use crate::repositories::audit_logs;
use crate::routes::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

/// GET /api/logs
pub async fn list_audit_logs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AuditLogResponse>>, AcError> {
    let entries = audit_logs::list_audit_logs(&state.pool)
        .await
        .map_err(observe_error("list_audit_logs"))?;

    Ok(Json(entries.into_iter().map(AuditLogResponse::from).collect()))
}

/// GET /api/logs/{id}
pub async fn get_audit_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AuditLogResponse>, AcError> {
    let entry = audit_logs::get_audit_log(&state.pool, id)
        .await
        .and_then(|entry| {
            entry.ok_or_else(|| AcError::NotFound(format!("Audit log {} not found", id)))
        })
        .map_err(observe_error("get_audit_log"))?;

    Ok(Json(AuditLogResponse::from(entry)))
}
