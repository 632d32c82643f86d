//! User account management: registration, lookup, update and deletion.

use crate::crypto;
use crate::errors::AcError;
use crate::models::{RegisterUserRequest, UpdateUserRequest};
use crate::repositories::users::{self, NewUser, User, UserChanges};
use common::secret::{ExposeSecret, SecretString};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_NAME_LENGTH: usize = 50;
const MAX_EMAIL_LENGTH: usize = 254;

/// Register a new user.
///
/// # Errors
///
/// - `AcError::InvalidRequest` - name, email or password fails validation
/// - `AcError::Conflict` - an account with the same (case-insensitive) email exists
#[instrument(skip_all)]
pub async fn register_user(
    pool: &PgPool,
    bcrypt_cost: u32,
    request: &RegisterUserRequest,
) -> Result<User, AcError> {
    let first_name = validate_name("first_name", &request.first_name)?;
    let last_name = validate_name("last_name", &request.last_name)?;
    let email = validate_email(&request.email)?;
    validate_password(&request.password)?;

    let password_hash =
        crypto::hash_password_blocking(request.password.expose_secret().to_string(), bcrypt_cost)
            .await?;

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

    tracing::info!(target: "ac.services.user", user_id = %user.id, "User registered");

    Ok(user)
}

pub async fn list_users(pool: &PgPool) -> Result<Vec<User>, AcError> {
    users::list_users(pool).await
}

pub async fn get_user(pool: &PgPool, id: Uuid) -> Result<User, AcError> {
    users::get_by_id(pool, id)
        .await?
        .ok_or_else(|| AcError::NotFound(format!("User {} not found", id)))
}

/// Apply the fields present in `request` to an existing user.
///
/// A new password is validated and re-hashed with `bcrypt_cost`.
#[instrument(skip_all, fields(user_id = %id))]
pub async fn update_user(
    pool: &PgPool,
    bcrypt_cost: u32,
    id: Uuid,
    request: &UpdateUserRequest,
) -> Result<User, AcError> {
    let mut changes = UserChanges::default();

    if let Some(first_name) = &request.first_name {
        changes.first_name = Some(validate_name("first_name", first_name)?.to_string());
    }
    if let Some(last_name) = &request.last_name {
        changes.last_name = Some(validate_name("last_name", last_name)?.to_string());
    }
    if let Some(email) = &request.email {
        changes.email = Some(validate_email(email)?.to_string());
    }
    if let Some(password) = &request.new_password {
        validate_password(password)?;
        changes.password_hash = Some(
            crypto::hash_password_blocking(password.expose_secret().to_string(), bcrypt_cost)
                .await?,
        );
    }

    let user = users::update_user(pool, id, &changes)
        .await?
        .ok_or_else(|| AcError::NotFound(format!("User {} not found", id)))?;

    tracing::info!(target: "ac.services.user", user_id = %id, "User updated");

    Ok(user)
}

pub async fn delete_user(pool: &PgPool, id: Uuid) -> Result<(), AcError> {
    if !users::delete_user(pool, id).await? {
        return Err(AcError::NotFound(format!("User {} not found", id)));
    }

    tracing::info!(target: "ac.services.user", user_id = %id, "User deleted");
    Ok(())
}

fn validate_name<'a>(field: &str, value: &'a str) -> Result<&'a str, AcError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AcError::InvalidRequest(format!("{} is required", field)));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(AcError::InvalidRequest(format!(
            "{} must be at most {} characters",
            field, MAX_NAME_LENGTH
        )));
    }
    Ok(trimmed)
}

fn validate_email(value: &str) -> Result<&str, AcError> {
    let trimmed = value.trim();
    if is_valid_email(trimmed) {
        Ok(trimmed)
    } else {
        Err(AcError::InvalidRequest("Invalid email format".to_string()))
    }
}

/// Basic shape check: one `@`, non-empty local part, dotted domain.
fn is_valid_email(email: &str) -> bool {
    if email.len() > MAX_EMAIL_LENGTH || email.chars().any(char::is_whitespace) {
        return false;
    }

    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// At least eight characters with an upper-case letter, a lower-case letter,
/// a digit and a non-alphanumeric character.
fn validate_password(password: &SecretString) -> Result<(), AcError> {
    let password = password.expose_secret();

    let long_enough = password.chars().count() >= MIN_PASSWORD_LENGTH;
    let has_upper = password.chars().any(char::is_uppercase);
    let has_lower = password.chars().any(char::is_lowercase);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| !c.is_alphanumeric());

    if long_enough && has_upper && has_lower && has_digit && has_symbol {
        Ok(())
    } else {
        Err(AcError::InvalidRequest(format!(
            "Password must be at least {} characters and contain upper-case, lower-case, \
             digit and non-alphanumeric characters",
            MIN_PASSWORD_LENGTH
        )))
    }
}
