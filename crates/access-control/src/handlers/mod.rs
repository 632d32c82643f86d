//! HTTP request handlers.

pub mod audit_log_handler;
pub mod auth_handler;
pub mod health;
pub mod metrics;
pub mod user_handler;

pub use audit_log_handler::{get_audit_log, list_audit_logs};
pub use auth_handler::handle_login;
pub use health::{health_check, readiness_check};
pub use metrics::metrics_handler;
pub use user_handler::{delete_user, get_user, list_users, register_user, update_user};

use crate::errors::AcError;
use crate::observability::metrics::record_error;
use crate::observability::ErrorCategory;

/// Count a failed operation by category before it becomes a response.
fn observe_error(operation: &'static str) -> impl Fn(AcError) -> AcError {
    move |err| {
        record_error(
            operation,
            ErrorCategory::from(&err).as_str(),
            err.status_code().as_u16(),
        );
        err
    }
}
