//! User service providing registration and login.

use std::sync::Arc;

use store::{NewUser, UserStore};

use crate::error::{ErrorCode, ServiceError};

use super::{Argon2Hasher, PasswordHasher, User};

/// Service for registering users and checking their credentials.
pub struct UserService<S: UserStore, H: PasswordHasher = Argon2Hasher> {
    store: S,
    hasher: Arc<H>,
}

impl<S: UserStore> UserService<S> {
    /// Creates a new user service with the default Argon2 hasher.
    pub fn new(store: S) -> Self {
        Self::with_hasher(store, Argon2Hasher::new())
    }
}

impl<S: UserStore, H: PasswordHasher> UserService<S, H> {
    /// Creates a new user service with the given hasher.
    pub fn with_hasher(store: S, hasher: H) -> Self {
        Self {
            store,
            hasher: Arc::new(hasher),
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Registers a new user.
    ///
    /// Usernames are unique and compared case-sensitively.
    #[tracing::instrument(skip(self, password))]
    pub async fn register(&self, username: &str, password: &str) -> Result<User, ServiceError> {
        validate_credentials(username, password)?;

        let existing = self
            .store
            .find_user_by_username(username)
            .await
            .map_err(|e| ServiceError::storage(ErrorCode::RegisterFailed, e))?;
        if existing.is_some() {
            return Err(ErrorCode::UsernameExists.into());
        }

        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        let hashed = run_blocking(move || hasher.hash(&password), ErrorCode::RegisterFailed).await?;
        let password_hash = hashed.map_err(|e| {
            tracing::error!(error = %e, "password hashing failed");
            ServiceError::new(ErrorCode::RegisterFailed)
        })?;

        let row = self
            .store
            .insert_user(NewUser {
                username: username.to_string(),
                password_hash,
                created_at: chrono::Utc::now().timestamp(),
            })
            .await
            .map_err(|e| {
                // Lost a race with a concurrent registration.
                if e.is_unique_violation() {
                    ServiceError::new(ErrorCode::UsernameExists)
                } else {
                    ServiceError::storage(ErrorCode::RegisterFailed, e)
                }
            })?;

        metrics::counter!("users_registered_total").increment(1);
        tracing::info!(user_id = %row.user_id, "user registered");
        Ok(row.into())
    }

    /// Checks a username and password pair.
    ///
    /// Unknown users and wrong passwords both yield `InvalidCredentials`,
    /// and both cost one hash verification.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<User, ServiceError> {
        validate_credentials(username, password)?;

        let row = self
            .store
            .find_user_by_username(username)
            .await
            .map_err(|e| ServiceError::storage(ErrorCode::ServerError, e))?;

        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        let stored_hash = row.as_ref().map(|row| row.password_hash.clone());
        let verified = run_blocking(
            move || match stored_hash {
                Some(hash) => hasher.verify(&password, &hash),
                None => {
                    hasher.verify(&password, hasher.decoy_hash());
                    false
                }
            },
            ErrorCode::ServerError,
        )
        .await?;

        match row {
            Some(row) if verified => Ok(row.into()),
            _ => {
                metrics::counter!("logins_failed_total").increment(1);
                Err(ErrorCode::InvalidCredentials.into())
            }
        }
    }
}

/// Runs CPU-bound hashing on the blocking pool.
async fn run_blocking<F, T>(f: F, on_panic: ErrorCode) -> Result<T, ServiceError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        tracing::error!(error = %e, "password task failed");
        ServiceError::new(on_panic)
    })
}

fn validate_credentials(username: &str, password: &str) -> Result<(), ServiceError> {
    if username.is_empty() {
        return Err(ErrorCode::UsernameEmpty.into());
    }
    if password.is_empty() {
        return Err(ErrorCode::PasswordEmpty.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::PasswordError;
    use store::InMemoryStore;

    /// Plain-text hasher that counts verifications.
    #[derive(Default)]
    struct CountingHasher {
        verifies: Arc<AtomicUsize>,
    }

    impl PasswordHasher for CountingHasher {
        fn hash(&self, password: &str) -> Result<String, PasswordError> {
            Ok(format!("plain:{password}"))
        }

        fn verify(&self, password: &str, hash: &str) -> bool {
            self.verifies.fetch_add(1, Ordering::SeqCst);
            hash.strip_prefix("plain:") == Some(password)
        }

        fn decoy_hash(&self) -> &str {
            "decoy"
        }
    }

    fn create_service() -> UserService<InMemoryStore> {
        UserService::with_hasher(
            InMemoryStore::new(),
            Argon2Hasher::with_cost(1024, 1, 1).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_register() {
        let service = create_service();

        let user = service.register("alice", "secret").await.unwrap();

        assert_eq!(user.username, "alice");
        assert!(user.created_at > 0);
        assert_eq!(service.store().user_count().await, 1);
    }

    #[tokio::test]
    async fn test_register_validates_input() {
        let service = create_service();

        let err = service.register("", "secret").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::UsernameEmpty);

        let err = service.register("alice", "").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::PasswordEmpty);
    }

    #[tokio::test]
    async fn test_password_is_stored_hashed() {
        let service = create_service();
        service.register("alice", "secret").await.unwrap();

        let row = service
            .store()
            .find_user_by_username("alice")
            .await
            .unwrap()
            .unwrap();
        assert_ne!(row.password_hash, "secret");
        assert!(row.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_login_unknown_user_matches_wrong_password() {
        let service = create_service();
        service.register("alice", "secret").await.unwrap();

        let unknown = service.login("bob", "secret").await.unwrap_err();
        let wrong = service.login("alice", "nope").await.unwrap_err();

        assert_eq!(unknown.code(), ErrorCode::InvalidCredentials);
        assert_eq!(wrong.code(), unknown.code());
        assert_eq!(wrong.message(), unknown.message());
    }

    #[tokio::test]
    async fn test_unknown_user_costs_one_verification() {
        let hasher = CountingHasher::default();
        let verifies = Arc::clone(&hasher.verifies);
        let service = UserService::with_hasher(InMemoryStore::new(), hasher);
        service.register("alice", "secret").await.unwrap();

        let err = service.login("bob", "secret").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidCredentials);
        assert_eq!(verifies.load(Ordering::SeqCst), 1);

        let err = service.login("alice", "nope").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidCredentials);
        assert_eq!(verifies.load(Ordering::SeqCst), 2);

        service.login("alice", "secret").await.unwrap();
        assert_eq!(verifies.load(Ordering::SeqCst), 3);
    }
}
