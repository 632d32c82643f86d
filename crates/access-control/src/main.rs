use access_control::clock::{Clock, SystemClock};
use access_control::config::{Config, LogFormat};
use access_control::observability::metrics::init_metrics_recorder;
use access_control::routes::{self, AppState};
use access_control::services::email_service::mail_sender_from_settings;
use access_control::tasks::{DeferredTaskQueue, PgScopeFactory, TaskWorkerPool};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(LogFormat::parse(std::env::var("LOG_FORMAT").ok().as_deref()));

    info!("Starting Access Control service");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        jwt_issuer = %config.jwt.issuer,
        jwt_expiration_hours = config.jwt.expiration_hours,
        task_worker_count = config.task_worker_count,
        smtp_enabled = config.smtp.is_some(),
        "Configuration loaded successfully"
    );

    info!("Connecting to database...");
    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            e
        })?;

    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .map_err(|e| {
            error!("Failed to run database migrations: {}", e);
            e
        })?;

    info!("Database connection established");

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let queue = Arc::new(DeferredTaskQueue::new());

    let mail = mail_sender_from_settings(config.smtp.as_ref()).map_err(|e| {
        error!("Failed to initialize mail sender: {}", e);
        e
    })?;
    let scopes = Arc::new(PgScopeFactory::new(db_pool.clone(), mail, Arc::clone(&clock)));

    // Workers outlive the HTTP server so that requests still draining can
    // enqueue; they are stopped once the server has finished.
    let workers = TaskWorkerPool::start(
        config.task_worker_count,
        Arc::clone(&queue),
        scopes,
        CancellationToken::new(),
    );

    let bind_address = config.bind_address.clone();

    let state = Arc::new(AppState::new(
        db_pool.clone(),
        config,
        clock,
        Arc::clone(&queue),
    )?);

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Access Control listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    if let Err(e) = workers.shutdown().await {
        error!("Task workers did not stop cleanly: {}", e);
    }

    let pending = queue.len();
    if pending > 0 {
        warn!(pending, "Deferred tasks left unprocessed at shutdown");
    }

    db_pool.close().await;

    info!("Access Control shutdown complete");

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "access_control=debug,tower_http=debug".into());

    let (text, json) = match format {
        LogFormat::Text => (Some(tracing_subscriber::fmt::layer()), None),
        LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .init();
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
