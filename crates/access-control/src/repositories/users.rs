//! User repository module for database operations.

use crate::errors::AcError;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::fmt;
use uuid::Uuid;

const UNIQUE_EMAIL_CONSTRAINT: &str = "users_normalized_email_unique";

/// User model (maps to users table)
#[derive(Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub normalized_email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &"[REDACTED]")
            .field("password_hash", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

/// Fields for a new user. `password_hash` must already be a bcrypt hash.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
}

/// Partial update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

/// Lookup form of an email: trimmed and upper-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_uppercase()
}

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, normalized_email, password_hash, created_at, updated_at";

/// Get user by normalized email (see [`normalize_email`]).
pub async fn get_by_normalized_email(
    pool: &PgPool,
    normalized_email: &str,
) -> Result<Option<User>, AcError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE normalized_email = $1",
        USER_COLUMNS
    ))
    .bind(normalized_email)
    .fetch_optional(pool)
    .await
    .map_err(|e| AcError::Database(format!("Failed to fetch user by email: {}", e)))?;

    Ok(user)
}

pub async fn get_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, AcError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE id = $1",
        USER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| AcError::Database(format!("Failed to fetch user by id: {}", e)))?;

    Ok(user)
}

/// All users, oldest first.
pub async fn list_users(pool: &PgPool) -> Result<Vec<User>, AcError> {
    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users ORDER BY created_at, id",
        USER_COLUMNS
    ))
    .fetch_all(pool)
    .await
    .map_err(|e| AcError::Database(format!("Failed to list users: {}", e)))?;

    Ok(users)
}

/// Create a user. A second account with the same normalized email is a `Conflict`.
pub async fn create_user(pool: &PgPool, new_user: &NewUser<'_>) -> Result<User, AcError> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (first_name, last_name, email, normalized_email, password_hash)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {}
        "#,
        USER_COLUMNS
    ))
    .bind(new_user.first_name)
    .bind(new_user.last_name)
    .bind(new_user.email.trim())
    .bind(normalize_email(new_user.email))
    .bind(new_user.password_hash)
    .fetch_one(pool)
    .await
    .map_err(|e| map_write_error(e, "create user"))?;

    Ok(user)
}

/// Apply `changes` to a user. Returns `None` if the user does not exist.
pub async fn update_user(
    pool: &PgPool,
    id: Uuid,
    changes: &UserChanges,
) -> Result<Option<User>, AcError> {
    let email = changes.email.as_deref().map(str::trim);
    let normalized_email = changes.email.as_deref().map(normalize_email);

    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            email = COALESCE($4, email),
            normalized_email = COALESCE($5, normalized_email),
            password_hash = COALESCE($6, password_hash),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        USER_COLUMNS
    ))
    .bind(id)
    .bind(changes.first_name.as_deref())
    .bind(changes.last_name.as_deref())
    .bind(email)
    .bind(normalized_email)
    .bind(changes.password_hash.as_deref())
    .fetch_optional(pool)
    .await
    .map_err(|e| map_write_error(e, "update user"))?;

    Ok(user)
}

/// Delete a user. Returns `false` if no row matched.
pub async fn delete_user(pool: &PgPool, id: Uuid) -> Result<bool, AcError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| AcError::Database(format!("Failed to delete user: {}", e)))?;

    Ok(result.rows_affected() > 0)
}

fn map_write_error(e: sqlx::Error, action: &str) -> AcError {
    let is_duplicate_email = e
        .as_database_error()
        .and_then(|db| db.constraint())
        .is_some_and(|c| c == UNIQUE_EMAIL_CONSTRAINT);

    if is_duplicate_email {
        AcError::Conflict("A user with this email already exists".to_string())
    } else {
        AcError::Database(format!("Failed to {}: {}", action, e))
    }
}
