//! Redacting wrappers for passwords, signing keys and SMTP credentials.
//!
//! `SecretString` prints as `[REDACTED]` through `Debug`, so request bodies
//! and settings structs can derive `Debug` and still be logged safely. The
//! value is zeroized on drop and only reachable through
//! [`ExposeSecret::expose_secret`].
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct LoginBody {
//!     email: String,
//!     password: SecretString,
//! }
//!
//! let body: LoginBody =
//!     serde_json::from_str(r#"{"email": "alice@example.com", "password": "Secret-123"}"#)
//!         .unwrap();
//!
//! assert!(!format!("{body:?}").contains("Secret-123"));
//! assert_eq!(body.password.expose_secret(), "Secret-123");
//! ```

pub use secrecy::{ExposeSecret, SecretString};
