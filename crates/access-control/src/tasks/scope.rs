//! Per-task execution scopes.

use crate::clock::Clock;
use crate::errors::AcError;
use crate::services::audit_service::{AuditSink, PgAuditSink};
use crate::services::email_service::MailSender;
use sqlx::PgPool;
use std::sync::Arc;

/// Collaborators available to one deferred task. Dropped when the task ends.
#[derive(Clone)]
pub struct TaskScope {
    audit: Arc<dyn AuditSink>,
    mail: Arc<dyn MailSender>,
    clock: Arc<dyn Clock>,
}

impl TaskScope {
    pub fn new(
        audit: Arc<dyn AuditSink>,
        mail: Arc<dyn MailSender>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { audit, mail, clock }
    }

    pub fn audit(&self) -> &dyn AuditSink {
        self.audit.as_ref()
    }

    pub fn mail(&self) -> &dyn MailSender {
        self.mail.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn for_tests(audit: Arc<dyn AuditSink>) -> Self {
        Self::new(
            audit,
            Arc::new(crate::services::email_service::LogOnlyMailSender),
            Arc::new(crate::clock::SystemClock),
        )
    }
}

/// Produces a fresh scope for every deferred task a worker runs.
#[async_trait::async_trait]
pub trait ScopeFactory: Send + Sync {
    async fn create_scope(&self) -> Result<TaskScope, AcError>;
}

/// Builds scopes whose audit sink writes through the shared Postgres pool.
pub struct PgScopeFactory {
    pool: PgPool,
    mail: Arc<dyn MailSender>,
    clock: Arc<dyn Clock>,
}

impl PgScopeFactory {
    pub fn new(pool: PgPool, mail: Arc<dyn MailSender>, clock: Arc<dyn Clock>) -> Self {
        Self { pool, mail, clock }
    }
}

#[async_trait::async_trait]
impl ScopeFactory for PgScopeFactory {
    async fn create_scope(&self) -> Result<TaskScope, AcError> {
        Ok(TaskScope::new(
            Arc::new(PgAuditSink::new(self.pool.clone())),
            Arc::clone(&self.mail),
            Arc::clone(&self.clock),
        ))
    }
}

/// Test doubles.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Hands out clones of one scope and counts how many were requested.
    pub struct StaticScopeFactory {
        scope: TaskScope,
        created: AtomicUsize,
    }

    impl StaticScopeFactory {
        pub fn new(scope: TaskScope) -> Self {
            Self {
                scope,
                created: AtomicUsize::new(0),
            }
        }

        pub fn scopes_created(&self) -> usize {
            self.created.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl ScopeFactory for StaticScopeFactory {
        async fn create_scope(&self) -> Result<TaskScope, AcError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(self.scope.clone())
        }
    }

    /// Fails every request, like a database that cannot hand out connections.
    #[derive(Default)]
    pub struct FailingScopeFactory;

    #[async_trait::async_trait]
    impl ScopeFactory for FailingScopeFactory {
        async fn create_scope(&self) -> Result<TaskScope, AcError> {
            Err(AcError::Database("pool exhausted".to_string()))
        }
    }
}
