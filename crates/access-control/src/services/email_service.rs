//! Outbound mail for login notifications.

use crate::config::{LoginNotificationSettings, SmtpSettings};
use crate::errors::AcError;
use crate::observability::hash_for_correlation;
use chrono::{DateTime, Utc};
use common::secret::ExposeSecret;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingMail {
    /// Build the login notification for `user_email`.
    ///
    /// `[USER_EMAIL]` and `[LOGIN_TIMESTAMP]` in the configured body are
    /// replaced; the recipient override wins over the user's own address.
    pub fn login_notification(
        settings: &LoginNotificationSettings,
        user_email: &str,
        logged_in_at: DateTime<Utc>,
    ) -> Self {
        let body = settings
            .body_template
            .replace("[USER_EMAIL]", user_email)
            .replace("[LOGIN_TIMESTAMP]", &logged_in_at.to_rfc3339());

        Self {
            to: settings
                .recipient_override
                .clone()
                .unwrap_or_else(|| user_email.to_string()),
            subject: settings.subject.clone(),
            body,
        }
    }
}

#[async_trait::async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), AcError>;
}

/// Sends mail through an SMTP relay.
#[derive(Clone)]
pub struct SmtpMailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailSender {
    /// Uses STARTTLS with credentials when a username is configured, otherwise
    /// a plain connection (local relays, MailDev).
    pub fn new(settings: &SmtpSettings) -> Result<Self, AcError> {
        let from: Mailbox = settings
            .from_address
            .parse()
            .map_err(|e| AcError::Mail(format!("Invalid SMTP_FROM address: {}", e)))?;

        let transport = match (&settings.username, &settings.password) {
            (Some(username), Some(password)) => {
                info!(
                    target: "ac.services.email",
                    smtp_host = %settings.host,
                    smtp_port = settings.port,
                    "SMTP mail sender initialized with authentication and TLS"
                );
                let creds =
                    Credentials::new(username.clone(), password.expose_secret().to_string());
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
                    .map_err(|e| AcError::Mail(format!("Failed to build SMTP relay: {}", e)))?
                    .port(settings.port)
                    .credentials(creds)
                    .build()
            }
            _ => {
                info!(
                    target: "ac.services.email",
                    smtp_host = %settings.host,
                    smtp_port = settings.port,
                    "SMTP credentials not configured, using unauthenticated connection"
                );
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
                    .port(settings.port)
                    .build()
            }
        };

        Ok(Self { transport, from })
    }
}

#[async_trait::async_trait]
impl MailSender for SmtpMailSender {
    #[instrument(skip_all, name = "ac.services.email.send")]
    async fn send(&self, mail: OutgoingMail) -> Result<(), AcError> {
        let to: Mailbox = mail
            .to
            .parse()
            .map_err(|e| AcError::Mail(format!("Invalid recipient address: {}", e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body)
            .map_err(|e| AcError::Mail(format!("Failed to build message: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AcError::Mail(format!("SMTP send failed: {}", e)))?;

        info!(
            target: "ac.services.email",
            recipient_hash = %hash_for_correlation(&mail.to),
            "Mail sent"
        );
        Ok(())
    }
}

/// Used when no SMTP host is configured. Logs instead of sending.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOnlyMailSender;

#[async_trait::async_trait]
impl MailSender for LogOnlyMailSender {
    async fn send(&self, mail: OutgoingMail) -> Result<(), AcError> {
        info!(
            target: "ac.services.email",
            recipient_hash = %hash_for_correlation(&mail.to),
            subject = %mail.subject,
            "SMTP not configured, mail not sent"
        );
        Ok(())
    }
}

/// SMTP sender when `SMTP_HOST` is configured, [`LogOnlyMailSender`] otherwise.
pub fn mail_sender_from_settings(
    settings: Option<&SmtpSettings>,
) -> Result<Arc<dyn MailSender>, AcError> {
    match settings {
        Some(settings) => Ok(Arc::new(SmtpMailSender::new(settings)?)),
        None => {
            info!(
                target: "ac.services.email",
                "SMTP_HOST not set, login notifications are logged only"
            );
            Ok(Arc::new(LogOnlyMailSender))
        }
    }
}

/// Test doubles.
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingMailSender {
        sent: Mutex<Vec<OutgoingMail>>,
    }

    impl RecordingMailSender {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn sent(&self) -> Vec<OutgoingMail> {
            self.sent.lock().map(|s| s.clone()).unwrap_or_default()
        }
    }

    #[async_trait::async_trait]
    impl MailSender for RecordingMailSender {
        async fn send(&self, mail: OutgoingMail) -> Result<(), AcError> {
            self.sent.lock().map_err(|_| AcError::Internal)?.push(mail);
            Ok(())
        }
    }

    /// Rejects every message, like an unreachable relay.
    #[derive(Default)]
    pub struct FailingMailSender;

    #[async_trait::async_trait]
    impl MailSender for FailingMailSender {
        async fn send(&self, _mail: OutgoingMail) -> Result<(), AcError> {
            Err(AcError::Mail("connection refused".to_string()))
        }
    }
}
