//! Fault injection tests for Access Control resilience
//!
//! Programmatic fault injection (closing the database pool, failing
//! collaborators) rather than infrastructure-level chaos.

#[path = "fault_injection/db_failure_tests.rs"]
mod db_failure_tests;
