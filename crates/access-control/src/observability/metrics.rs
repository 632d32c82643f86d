//! Metrics definitions for the Access Control service
//!
//! All metrics follow Prometheus naming conventions:
//! - `ac_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `status`: success, rejected, error
//! - `kind`: deferred task kinds known at compile time (audit_log, login_notification)
//! - `path`: normalized to a fixed set, UUID segments collapsed to `{id}`

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the global Prometheus recorder and return the handle rendered by
/// `GET /metrics`.
///
/// Can only succeed once per process.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Login latency is dominated by one bcrypt verification
        .set_buckets_for_metric(
            Matcher::Prefix("ac_login".to_string()),
            &[0.025, 0.050, 0.100, 0.200, 0.300, 0.500, 0.750, 1.000, 2.000],
        )
        .map_err(|e| format!("Failed to set login buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("ac_deferred_task".to_string()),
            &[0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000],
        )
        .map_err(|e| format!("Failed to set deferred task buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("ac_http_request".to_string()),
            &[0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.300, 0.500, 1.000, 2.000],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Login Metrics
// ============================================================================

/// Record a login attempt and its latency.
///
/// Metric: `ac_login_attempts_total`, `ac_login_duration_seconds`
/// Labels: `status`
///
/// Rejections for unknown identities and wrong passwords share the
/// `rejected` label.
pub fn record_login_attempt(status: &str, duration: Duration) {
    histogram!("ac_login_duration_seconds", "status" => status.to_string())
        .record(duration.as_secs_f64());

    counter!("ac_login_attempts_total", "status" => status.to_string()).increment(1);
}

/// Record token issuance outcome
///
/// Metric: `ac_token_issuance_total`
/// Labels: `status`
pub fn record_token_issuance(status: &str) {
    counter!("ac_token_issuance_total", "status" => status.to_string()).increment(1);
}

// ============================================================================
// Deferred Task Metrics
// ============================================================================

/// Record execution of one deferred task.
///
/// Metric: `ac_deferred_tasks_total`, `ac_deferred_task_duration_seconds`
/// Labels: `kind`, `status` (success, error)
pub fn record_deferred_task(kind: &str, status: &str, duration: Duration) {
    histogram!("ac_deferred_task_duration_seconds", "kind" => kind.to_string())
        .record(duration.as_secs_f64());

    counter!("ac_deferred_tasks_total", "kind" => kind.to_string(), "status" => status.to_string())
        .increment(1);
}

/// Update pending deferred task gauge
///
/// Metric: `ac_task_queue_depth`
pub fn set_task_queue_depth(depth: usize) {
    gauge!("ac_task_queue_depth").set(depth as f64);
}

// ============================================================================
// Error Metrics
// ============================================================================

/// Record error by category
///
/// Metric: `ac_errors_total`
/// Labels: `operation`, `error_category`, `status_code`
pub fn record_error(operation: &str, error_category: &str, status_code: u16) {
    counter!("ac_errors_total",
        "operation" => operation.to_string(),
        "error_category" => error_category.to_string(),
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `ac_http_requests_total`, `ac_http_request_duration_seconds`
/// Labels: `method`, `path`, `status_code`
///
/// This captures ALL HTTP responses including framework-level errors like:
/// - 415 Unsupported Media Type (wrong Content-Type)
/// - 400 Bad Request (JSON parse errors)
/// - 404 Not Found
pub fn record_http_request(method: &str, path: &str, status_code: u16, duration: Duration) {
    let normalized_path = normalize_path(path);

    histogram!("ac_http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => normalized_path.clone(),
        "status_code" => status_code.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("ac_http_requests_total",
        "method" => method.to_string(),
        "path" => normalized_path,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Normalize path to prevent label cardinality explosion
fn normalize_path(path: &str) -> String {
    match path {
        "/health"
        | "/ready"
        | "/metrics"
        | "/api/users"
        | "/api/users/login"
        | "/api/users/register"
        | "/api/logs" => path.to_string(),
        _ => normalize_dynamic_path(path),
    }
}

/// Collapse `/api/users/{uuid}` and `/api/logs/{uuid}` to an `{id}` placeholder.
fn normalize_dynamic_path(path: &str) -> String {
    for prefix in ["/api/users/", "/api/logs/"] {
        if let Some(rest) = path.strip_prefix(prefix) {
            if is_uuid(rest) {
                return format!("{}{{id}}", prefix);
            }
        }
    }

    "/other".to_string()
}

/// Check if a string matches UUID format (8-4-4-4-12 hex digits with dashes)
fn is_uuid(s: &str) -> bool {
    if s.len() != 36 {
        return false;
    }

    s.bytes().enumerate().all(|(i, byte)| match i {
        8 | 13 | 18 | 23 => byte == b'-',
        _ => byte.is_ascii_hexdigit(),
    })
}
