//! HTTP routes for the Access Control service.
//!
//! Defines the Axum router and application state.

use crate::clock::Clock;
use crate::config::Config;
use crate::crypto;
use crate::errors::AcError;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_auth, AuthState};
use crate::services::credential_service::{CredentialVerifier, PgIdentityStore};
use crate::services::login_service::LoginService;
use crate::services::token_service::TokenIssuer;
use crate::tasks::TaskQueue;
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: PgPool,

    /// Service configuration.
    pub config: Config,

    pub clock: Arc<dyn Clock>,

    /// Login orchestrator. Enqueues onto the queue drained by the task workers.
    pub login: Arc<LoginService>,
}

impl AppState {
    /// Wire the login orchestrator over the Postgres identity store.
    ///
    /// # Errors
    ///
    /// `AcError::Crypto` if the timing-parity dummy hash cannot be built for
    /// the configured bcrypt cost.
    pub fn new(
        pool: PgPool,
        config: Config,
        clock: Arc<dyn Clock>,
        queue: Arc<TaskQueue>,
    ) -> Result<Self, AcError> {
        let verifier = CredentialVerifier::with_dummy_hash(
            Arc::new(PgIdentityStore::new(pool.clone())),
            crypto::dummy_hash_for_cost(config.bcrypt_cost)?,
        );
        let issuer = TokenIssuer::new(&config.jwt, Arc::clone(&clock));
        let login = LoginService::new(
            verifier,
            issuer,
            queue,
            Arc::clone(&clock),
            config.jwt.expiration_hours,
            config.login_notification.clone(),
        );

        Ok(Self {
            pool,
            config,
            clock,
            login: Arc::new(login),
        })
    }
}

/// Build the application routes.
///
/// - `/health`, `/ready`, `/metrics` - public, unversioned
/// - `POST /api/users/login` - public
/// - `/api/users/register`, `/api/users`, `/api/users/:id`, `/api/logs`,
///   `/api/logs/:id` - bearer token required
///
/// Layers: CORS, TraceLayer, 30 second timeout, HTTP metrics (outermost).
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_state = Arc::new(AuthState::new(&state.config.jwt, Arc::clone(&state.clock)));
    let cors = cors_layer(&state.config.cors_allowed_origins);

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/api/users/login", post(handlers::handle_login))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let protected_routes = Router::new()
        .route("/api/users/register", post(handlers::register_user))
        .route("/api/users", get(handlers::list_users))
        .route(
            "/api/users/:id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/api/logs", get(handlers::list_audit_logs))
        .route("/api/logs/:id", get(handlers::get_audit_log))
        .route_layer(middleware::from_fn_with_state(auth_state, require_auth))
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. CorsLayer - answers preflight requests
    // 2. TraceLayer
    // 3. TimeoutLayer
    // 4. http_metrics_middleware - records ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(
                    target: "ac.routes",
                    origin = %origin,
                    "Ignoring invalid CORS origin"
                );
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
