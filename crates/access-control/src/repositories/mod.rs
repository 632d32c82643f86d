//! Database access layer (Postgres via sqlx).

pub mod audit_logs;
pub mod users;
