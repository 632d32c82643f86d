//! Audit sink used by deferred tasks to persist account events.

use crate::errors::AcError;
use crate::repositories::audit_logs;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Event name written for every successful login.
pub const EVENT_LOGIN_SUCCEEDED: &str = "user_login_succeeded";

/// One audit event, captured at enqueue time and written later by a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub event_name: String,
    pub detail: String,
    pub user_id: Option<Uuid>,
    pub email: String,
    pub occurred_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn login_succeeded(user_id: Uuid, email: &str, occurred_at: DateTime<Utc>) -> Self {
        Self {
            event_name: EVENT_LOGIN_SUCCEEDED.to_string(),
            detail: format!("{} logged in successfully.", email),
            user_id: Some(user_id),
            email: email.to_string(),
            occurred_at,
        }
    }
}

#[async_trait::async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: AuditRecord) -> Result<(), AcError>;
}

/// Writes audit records to the `audit_logs` table.
#[derive(Clone)]
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AuditSink for PgAuditSink {
    async fn record(&self, record: AuditRecord) -> Result<(), AcError> {
        audit_logs::insert_audit_log(&self.pool, &record).await?;
        Ok(())
    }
}

/// Test doubles.
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Keeps every record in memory.
    #[derive(Default)]
    pub struct RecordingAuditSink {
        records: Mutex<Vec<AuditRecord>>,
    }

    impl RecordingAuditSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn records(&self) -> Vec<AuditRecord> {
            self.records
                .lock()
                .map(|records| records.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait::async_trait]
    impl AuditSink for RecordingAuditSink {
        async fn record(&self, record: AuditRecord) -> Result<(), AcError> {
            self.records
                .lock()
                .map_err(|_| AcError::Internal)?
                .push(record);
            Ok(())
        }
    }

    /// Fails every write.
    #[derive(Default)]
    pub struct FailingAuditSink;

    #[async_trait::async_trait]
    impl AuditSink for FailingAuditSink {
        async fn record(&self, _record: AuditRecord) -> Result<(), AcError> {
            Err(AcError::Database("audit store unavailable".to_string()))
        }
    }
}
