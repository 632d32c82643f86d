//! # Access Control Test Utilities
//!
//! Shared test utilities for the Access Control service.
//!
//! This crate provides:
//! - Fixed signing key and configuration for reproducible tests
//! - Database fixtures (`create_test_user`)
//! - Token builders for hand-crafted (expired, foreign-audience) tokens
//! - Server test harness (`TestAccessServer` for E2E tests)
//! - Fixed test IDs
//! - Custom assertions (`TokenAssertions` trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use access_control_test_utils::*;
//!
//! #[sqlx::test(migrations = "../../migrations")]
//! async fn test_example(pool: PgPool) -> anyhow::Result<()> {
//!     let server = TestAccessServer::spawn(pool).await?;
//!     let user = create_test_user(server.pool(), "alice@example.com").await?;
//!
//!     let token = server.login(&user.email, TEST_PASSWORD).await?;
//!     token.assert_valid_jwt().assert_for_subject(&user.id.to_string());
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod fixtures;
pub mod server_harness;
pub mod test_ids;
pub mod token_builders;

// Re-export commonly used items
pub use assertions::*;
pub use fixtures::*;
pub use server_harness::*;
pub use test_ids::*;
pub use token_builders::*;
