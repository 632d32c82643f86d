//! Password verification against the identity store.
//!
//! # Security
//!
//! - Lookup is case-insensitive on the normalized email
//! - An unknown email still costs one bcrypt verification (against
//!   a dummy hash of the same cost) so it cannot be told apart by timing
//! - The digest comparison itself is done by bcrypt in constant time

use crate::crypto::{self, DUMMY_PASSWORD_HASH};
use crate::errors::AcError;
use crate::repositories::users::{self, normalize_email, User};
use common::secret::{ExposeSecret, SecretString};
use sqlx::PgPool;
use std::fmt;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Account data needed to authenticate and to build token claims.
#[derive(Clone)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("email", &"[REDACTED]")
            .field("password_hash", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl From<User> for Identity {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            password_hash: user.password_hash,
        }
    }
}

#[async_trait::async_trait]
pub trait IdentityStore: Send + Sync {
    /// Find the identity whose normalized email equals `normalize_email(key)`.
    async fn find_by_lookup_key(&self, key: &str) -> Result<Option<Identity>, AcError>;
}

/// Identity store over the `users` table.
#[derive(Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_by_lookup_key(&self, key: &str) -> Result<Option<Identity>, AcError> {
        let user = users::get_by_normalized_email(&self.pool, &normalize_email(key)).await?;
        Ok(user.map(Identity::from))
    }
}

/// Outcome of a verification against a known identity.
#[derive(Debug)]
pub enum Verification {
    Matched(Identity),
    Mismatched,
}

pub struct CredentialVerifier {
    store: Arc<dyn IdentityStore>,
    dummy_hash: String,
}

impl CredentialVerifier {
    /// Verifier whose unknown-identity path uses the cost-12 [`DUMMY_PASSWORD_HASH`].
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self::with_dummy_hash(store, DUMMY_PASSWORD_HASH.to_string())
    }

    /// `dummy_hash` should use the same bcrypt cost as stored passwords.
    pub fn with_dummy_hash(store: Arc<dyn IdentityStore>, dummy_hash: String) -> Self {
        Self { store, dummy_hash }
    }

    /// Check `password` for the identity behind `lookup_key`.
    ///
    /// # Errors
    ///
    /// - `AcError::IdentityNotFound` - no identity for the key (after a dummy
    ///   bcrypt verification)
    /// - `AcError::Database` / `AcError::Crypto` - store or hashing failure
    #[instrument(skip_all)]
    pub async fn verify(
        &self,
        lookup_key: &str,
        password: &SecretString,
    ) -> Result<Verification, AcError> {
        let identity = self.store.find_by_lookup_key(lookup_key).await?;

        let hash = identity
            .as_ref()
            .map_or(self.dummy_hash.as_str(), |i| i.password_hash.as_str())
            .to_string();

        let matched =
            crypto::verify_password_blocking(password.expose_secret().to_string(), hash).await?;

        match identity {
            None => Err(AcError::IdentityNotFound),
            Some(identity) if matched => Ok(Verification::Matched(identity)),
            Some(_) => Ok(Verification::Mismatched),
        }
    }
}

/// Test doubles.
pub mod mock {
    use super::*;
    use crate::config::MIN_BCRYPT_COST;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Build an identity with a real (low-cost) bcrypt hash of `password`.
    pub fn identity(first_name: &str, last_name: &str, email: &str, password: &str) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            password_hash: crypto::hash_password(password, MIN_BCRYPT_COST)
                .unwrap_or_else(|_| DUMMY_PASSWORD_HASH.to_string()),
        }
    }

    #[derive(Default)]
    pub struct InMemoryIdentityStore {
        identities: Mutex<Vec<Identity>>,
        lookups: AtomicUsize,
    }

    impl InMemoryIdentityStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(identities: impl IntoIterator<Item = Identity>) -> Self {
            let store = Self::default();
            if let Ok(mut guard) = store.identities.lock() {
                guard.extend(identities);
            }
            store
        }

        pub fn lookups(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl IdentityStore for InMemoryIdentityStore {
        async fn find_by_lookup_key(&self, key: &str) -> Result<Option<Identity>, AcError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            let wanted = normalize_email(key);
            let identities = self.identities.lock().map_err(|_| AcError::Internal)?;
            Ok(identities
                .iter()
                .find(|i| normalize_email(&i.email) == wanted)
                .cloned())
        }
    }

    /// Always fails, like an unreachable database.
    #[derive(Default)]
    pub struct FailingIdentityStore;

    #[async_trait::async_trait]
    impl IdentityStore for FailingIdentityStore {
        async fn find_by_lookup_key(&self, _key: &str) -> Result<Option<Identity>, AcError> {
            Err(AcError::Database("connection refused".to_string()))
        }
    }
}
