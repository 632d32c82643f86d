//! Access Control service library.
//!
//! User management backend whose core is the login flow and the deferred
//! task machinery behind it:
//!
//! - `tasks` - FIFO queue of deferred work and the workers that drain it
//! - `services::credential_service` - password verification
//! - `services::token_service` - signed access token issuance
//! - `services::login_service` - login orchestration (verify, issue, enqueue)
//!
//! Around it: `config`, `crypto`, `errors`, `handlers`, `middleware`,
//! `models`, `observability`, `repositories`, `routes`.

pub mod clock;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod tasks;
