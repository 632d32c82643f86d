//! Business logic layer.

pub mod audit_service;
pub mod credential_service;
pub mod email_service;
pub mod login_service;
pub mod token_service;
pub mod user_service;
