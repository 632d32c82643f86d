//! Integration tests for the Access Control service
//!
//! This is the top-level integration test harness that Cargo discovers.
//! Test modules are organized in the integration/ subdirectory.

#[path = "integration/health_tests.rs"]
mod health_tests;

#[path = "integration/login_tests.rs"]
mod login_tests;

#[path = "integration/user_management_tests.rs"]
mod user_management_tests;

#[path = "integration/audit_log_tests.rs"]
mod audit_log_tests;

#[path = "integration/bearer_auth_tests.rs"]
mod bearer_auth_tests;
