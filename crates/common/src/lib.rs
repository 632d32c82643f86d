//! Utilities and types shared across Access Control components.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for identity token claims and verification
pub mod jwt;
