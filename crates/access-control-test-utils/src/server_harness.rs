//! Test server harness for E2E testing
//!
//! Provides `TestAccessServer` for spawning a real Access Control server,
//! together with its deferred task workers, in tests.

use crate::fixtures::test_config;
use crate::token_builders::TestTokenBuilder;
use access_control::clock::{Clock, SystemClock};
use access_control::config::Config;
use access_control::models::LoginResponse;
use access_control::observability::metrics::init_metrics_recorder;
use access_control::repositories::audit_logs::{self, AuditLogEntry};
use access_control::routes::{self, AppState};
use access_control::services::email_service::mock::RecordingMailSender;
use access_control::services::email_service::OutgoingMail;
use access_control::tasks::{DeferredTaskQueue, PgScopeFactory, TaskQueue, TaskWorkerPool};
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Test harness for spawning the Access Control server in E2E tests
///
/// Mail goes to an in-memory outbox instead of SMTP.
///
/// # Example
/// ```rust,ignore
/// #[sqlx::test(migrations = "../../migrations")]
/// async fn test_login_e2e(pool: PgPool) -> Result<()> {
///     let server = TestAccessServer::spawn(pool).await?;
///     let response = reqwest::Client::new()
///         .post(format!("{}/api/users/login", server.url()))
///         .json(&json!({"email": "a@example.com", "password": "x"}))
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 401);
///     Ok(())
/// }
/// ```
pub struct TestAccessServer {
    addr: SocketAddr,
    pool: PgPool,
    config: Config,
    queue: Arc<TaskQueue>,
    outbox: Arc<RecordingMailSender>,
    workers: CancellationToken,
    _handle: JoinHandle<()>,
}

impl TestAccessServer {
    /// Spawn a server with [`test_config`] on a random local port.
    pub async fn spawn(pool: PgPool) -> Result<Self, anyhow::Error> {
        Self::spawn_with_config(pool, test_config()).await
    }

    /// Spawn a server with custom configuration (e.g. an empty signing key).
    pub async fn spawn_with_config(pool: PgPool, config: Config) -> Result<Self, anyhow::Error> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let queue = Arc::new(DeferredTaskQueue::new());
        let outbox = Arc::new(RecordingMailSender::new());

        let scopes = Arc::new(PgScopeFactory::new(
            pool.clone(),
            outbox.clone(),
            Arc::clone(&clock),
        ));
        let workers = CancellationToken::new();
        // Stopped by cancelling `workers` on drop.
        let _worker_pool = TaskWorkerPool::start(
            config.task_worker_count,
            Arc::clone(&queue),
            scopes,
            workers.clone(),
        );

        let state = Arc::new(
            AppState::new(pool.clone(), config.clone(), clock, Arc::clone(&queue))
                .map_err(|e| anyhow::anyhow!("Failed to build application state: {}", e))?,
        );

        // The global recorder can only be installed once per test process.
        // Later servers get a standalone recorder instead.
        let metrics_handle = match init_metrics_recorder() {
            Ok(handle) => handle,
            Err(_) => {
                use metrics_exporter_prometheus::PrometheusBuilder;
                PrometheusBuilder::new().build_recorder().handle()
            }
        };

        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            pool,
            config,
            queue,
            outbox,
            workers,
            _handle: handle,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Deferred tasks enqueued but not yet taken by a worker.
    pub fn pending_tasks(&self) -> usize {
        self.queue.len()
    }

    /// Mails sent by the notification tasks so far.
    pub fn sent_mail(&self) -> Vec<OutgoingMail> {
        self.outbox.sent()
    }

    /// A valid bearer token for protected endpoints, signed with the test key.
    pub fn bearer_token(&self) -> String {
        TestTokenBuilder::new().build()
    }

    /// Log in through the HTTP API and return the issued token.
    pub async fn login(&self, email: &str, password: &str) -> Result<String, anyhow::Error> {
        let response = reqwest::Client::new()
            .post(format!("{}/api/users/login", self.url()))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        anyhow::ensure!(
            response.status().is_success(),
            "Login failed with status {}",
            response.status()
        );

        let body: LoginResponse = response.json().await?;
        Ok(body.token)
    }

    /// Poll until at least `count` audit rows exist, or fail after `timeout`.
    pub async fn wait_for_audit_logs(
        &self,
        count: usize,
        timeout: Duration,
    ) -> Result<Vec<AuditLogEntry>, anyhow::Error> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let entries = audit_logs::list_audit_logs(&self.pool).await?;
            if entries.len() >= count {
                return Ok(entries);
            }
            if tokio::time::Instant::now() >= deadline {
                anyhow::bail!(
                    "Expected {} audit log entries within {:?}, found {}",
                    count,
                    timeout,
                    entries.len()
                );
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// Poll until at least `count` mails were sent, or fail after `timeout`.
    pub async fn wait_for_mail(
        &self,
        count: usize,
        timeout: Duration,
    ) -> Result<Vec<OutgoingMail>, anyhow::Error> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let sent = self.outbox.sent();
            if sent.len() >= count {
                return Ok(sent);
            }
            if tokio::time::Instant::now() >= deadline {
                anyhow::bail!(
                    "Expected {} mails within {:?}, found {}",
                    count,
                    timeout,
                    sent.len()
                );
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

impl Drop for TestAccessServer {
    fn drop(&mut self) {
        self.workers.cancel();
        self._handle.abort();
    }
}
