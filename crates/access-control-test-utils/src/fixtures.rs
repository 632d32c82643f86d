//! Deterministic configuration and database fixtures.

use access_control::config::{
    Config, JwtSettings, LogFormat, LoginNotificationSettings, MIN_BCRYPT_COST,
};
use access_control::crypto;
use access_control::repositories::users::{self, NewUser, User};
use common::secret::SecretString;
use sqlx::PgPool;

use crate::test_ids::{TEST_AUDIENCE, TEST_ISSUER};

/// HS256 key shared by the test server and [`crate::TestTokenBuilder`].
pub const TEST_SIGNING_KEY: &str = "test-signing-key-do-not-use-in-production-0001";

/// Password of every user created by [`create_test_user`]. Meets the password policy.
pub const TEST_PASSWORD: &str = "Test-Password-1";

/// Configuration for in-process test servers.
///
/// Uses the lowest allowed bcrypt cost to keep tests fast.
pub fn test_config() -> Config {
    Config {
        database_url: String::new(),
        bind_address: "127.0.0.1:0".to_string(),
        jwt: JwtSettings {
            signing_key: SecretString::from(TEST_SIGNING_KEY.to_string()),
            issuer: TEST_ISSUER.to_string(),
            audience: TEST_AUDIENCE.to_string(),
            expiration_hours: 1,
        },
        bcrypt_cost: MIN_BCRYPT_COST,
        task_worker_count: 1,
        smtp: None,
        login_notification: LoginNotificationSettings::default(),
        cors_allowed_origins: Vec::new(),
        log_format: LogFormat::Text,
    }
}

/// Insert a user named "Test User" whose password is [`TEST_PASSWORD`].
pub async fn create_test_user(pool: &PgPool, email: &str) -> Result<User, anyhow::Error> {
    create_named_test_user(pool, "Test", "User", email).await
}

pub async fn create_named_test_user(
    pool: &PgPool,
    first_name: &str,
    last_name: &str,
    email: &str,
) -> Result<User, anyhow::Error> {
    let password_hash = crypto::hash_password(TEST_PASSWORD, MIN_BCRYPT_COST)?;

    let user = users::create_user(
        pool,
        &NewUser {
            first_name,
            last_name,
            email,
            password_hash: &password_hash,
        },
    )
    .await?;

    Ok(user)
}
