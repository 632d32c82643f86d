//! Login use case.
//!
//! Verifies the password, issues a token and, before returning it, enqueues
//! two deferred tasks: an audit record and a login notification mail. Their
//! execution is left to the task workers; a failure there never affects the
//! token already returned.
//!
//! Unknown emails and wrong passwords produce the same `InvalidCredentials`
//! error, the same log line and the same metric label, and neither enqueues
//! anything.

use crate::clock::Clock;
use crate::config::LoginNotificationSettings;
use crate::errors::AcError;
use crate::observability::hash_for_correlation;
use crate::observability::metrics::record_login_attempt;
use crate::repositories::users::normalize_email;
use crate::services::audit_service::AuditRecord;
use crate::services::credential_service::{CredentialVerifier, Verification};
use crate::services::email_service::OutgoingMail;
use crate::services::token_service::{IssuedToken, TokenIssuer, TokenSubject};
use crate::tasks::{DeferredTask, TaskQueue, TaskScope};
use common::secret::SecretString;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

/// Task kind label for audit writes.
pub const TASK_KIND_AUDIT: &str = "audit_log";

/// Task kind label for login notification mails.
pub const TASK_KIND_NOTIFICATION: &str = "login_notification";

pub struct LoginService {
    verifier: CredentialVerifier,
    issuer: TokenIssuer,
    queue: Arc<TaskQueue>,
    clock: Arc<dyn Clock>,
    token_lifetime_hours: u32,
    notification: LoginNotificationSettings,
}

impl LoginService {
    pub fn new(
        verifier: CredentialVerifier,
        issuer: TokenIssuer,
        queue: Arc<TaskQueue>,
        clock: Arc<dyn Clock>,
        token_lifetime_hours: u32,
        notification: LoginNotificationSettings,
    ) -> Self {
        Self {
            verifier,
            issuer,
            queue,
            clock,
            token_lifetime_hours,
            notification,
        }
    }

    /// Authenticate `email`/`password` and return a signed token.
    ///
    /// # Errors
    ///
    /// - `AcError::InvalidCredentials` - unknown email or wrong password
    /// - `AcError::Config` - no signing key configured
    /// - `AcError::Database` / `AcError::Crypto` - infrastructure failure
    #[instrument(skip_all, fields(email_hash = %hash_for_correlation(&normalize_email(email))))]
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<IssuedToken, AcError> {
        let start = Instant::now();

        let result = self.authenticate(email, password).await;

        let status = match &result {
            Ok(_) => "success",
            Err(AcError::InvalidCredentials) => "rejected",
            Err(_) => "error",
        };
        record_login_attempt(status, start.elapsed());

        result
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<IssuedToken, AcError> {
        let identity = match self.verifier.verify(email, password).await {
            Ok(Verification::Matched(identity)) => identity,
            Ok(Verification::Mismatched) | Err(AcError::IdentityNotFound) => {
                info!(target: "ac.services.login", "Login rejected: invalid credentials");
                return Err(AcError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };

        let token = self
            .issuer
            .issue(&TokenSubject::from(&identity), self.token_lifetime_hours)?;

        let logged_in_at = self.clock.now();

        self.queue.enqueue(audit_task(AuditRecord::login_succeeded(
            identity.id,
            &identity.email,
            logged_in_at,
        )));
        self.queue.enqueue(notification_task(OutgoingMail::login_notification(
            &self.notification,
            &identity.email,
            logged_in_at,
        )));

        info!(
            target: "ac.services.login",
            user_id = %identity.id,
            "Login succeeded"
        );

        Ok(token)
    }
}

fn audit_task(record: AuditRecord) -> DeferredTask {
    DeferredTask::new(TASK_KIND_AUDIT, move |scope: TaskScope| async move {
        scope.audit().record(record).await
    })
}

fn notification_task(mail: OutgoingMail) -> DeferredTask {
    DeferredTask::new(TASK_KIND_NOTIFICATION, move |scope: TaskScope| async move {
        scope.mail().send(mail).await
    })
}
