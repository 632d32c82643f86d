//! Audit log repository.
//!
//! Rows are written by deferred tasks and read back by the log endpoints.

use crate::errors::AcError;
use crate::services::audit_service::AuditRecord;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Audit log row joined with the (possibly deleted) user it refers to.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub event_name: String,
    pub detail: String,
    pub user_id: Option<Uuid>,
    pub email: String,
    pub occurred_at: DateTime<Utc>,
    pub user_first_name: Option<String>,
    pub user_last_name: Option<String>,
}

const ENTRY_SELECT: &str = r#"
    SELECT
        l.id, l.event_name, l.detail, l.user_id, l.email, l.occurred_at,
        u.first_name AS user_first_name, u.last_name AS user_last_name
    FROM audit_logs l
    LEFT JOIN users u ON u.id = l.user_id
"#;

/// Insert one audit record. Returns the new row id.
pub async fn insert_audit_log(pool: &PgPool, record: &AuditRecord) -> Result<Uuid, AcError> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO audit_logs (event_name, detail, user_id, email, occurred_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(&record.event_name)
    .bind(&record.detail)
    .bind(record.user_id)
    .bind(&record.email)
    .bind(record.occurred_at)
    .fetch_one(pool)
    .await
    .map_err(|e| AcError::Database(format!("Failed to insert audit log: {}", e)))?;

    Ok(id)
}

/// All audit entries, newest first.
pub async fn list_audit_logs(pool: &PgPool) -> Result<Vec<AuditLogEntry>, AcError> {
    let entries = sqlx::query_as::<_, AuditLogEntry>(&format!(
        "{} ORDER BY l.occurred_at DESC, l.id",
        ENTRY_SELECT
    ))
    .fetch_all(pool)
    .await
    .map_err(|e| AcError::Database(format!("Failed to list audit logs: {}", e)))?;

    Ok(entries)
}

pub async fn get_audit_log(pool: &PgPool, id: Uuid) -> Result<Option<AuditLogEntry>, AcError> {
    let entry = sqlx::query_as::<_, AuditLogEntry>(&format!("{} WHERE l.id = $1", ENTRY_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| AcError::Database(format!("Failed to fetch audit log: {}", e)))?;

    Ok(entry)
}
