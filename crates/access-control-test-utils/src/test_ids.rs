//! Fixed test IDs for deterministic tests
//!
//! Using fixed UUIDs prevents flaky tests caused by random data.

use uuid::Uuid;

// User IDs (100-199)
pub const TEST_USER_ALICE: Uuid = Uuid::from_u128(100);

// IDs that never exist in a test database
pub const TEST_MISSING_ID: Uuid = Uuid::from_u128(9999);

// JWT issuer and audience used by test configuration
pub const TEST_ISSUER: &str = "access-control";
pub const TEST_AUDIENCE: &str = "access-control-clients";
