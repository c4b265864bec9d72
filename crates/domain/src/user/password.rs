//! Salted password hashing.

use std::sync::{Arc, OnceLock};

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHash, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordVerifier, Version};
use thiserror::Error;

/// Errors raised while producing a password hash.
#[derive(Debug, Error)]
pub enum PasswordError {
    /// The cost parameters are out of range.
    #[error("Invalid hashing parameters: {0}")]
    Params(argon2::Error),

    /// Hashing itself failed.
    #[error("Hashing failed: {0}")]
    Hash(password_hash::Error),
}

/// Password nobody can log in with; only its hash is ever compared.
const DECOY_PASSWORD: &str = "decoy-password-for-unknown-users";

/// Turns passwords into self-describing hash strings and checks them.
///
/// Implementations are CPU-bound; callers run them off the async executor.
pub trait PasswordHasher: Send + Sync + 'static {
    /// Hashes a password with a fresh random salt.
    fn hash(&self, password: &str) -> Result<String, PasswordError>;

    /// Returns true if `password` matches `hash`.
    ///
    /// A malformed hash never matches.
    fn verify(&self, password: &str, hash: &str) -> bool;

    /// Returns a hash produced at this hasher's cost that no caller knows
    /// the password for.
    ///
    /// Verifying against it costs the same as verifying a real user.
    fn decoy_hash(&self) -> &str;
}

/// Argon2id hasher producing PHC strings.
#[derive(Clone, Default)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
    decoy: Arc<OnceLock<String>>,
}

impl Argon2Hasher {
    /// Creates a hasher with the recommended default cost.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a hasher with explicit memory (KiB), iteration and lane costs.
    pub fn with_cost(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Result<Self, PasswordError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(PasswordError::Params)?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            decoy: Arc::default(),
        })
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, PasswordError> {
        use argon2::PasswordHasher as _;

        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(PasswordError::Hash)
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    fn decoy_hash(&self) -> &str {
        self.decoy.get_or_init(|| {
            self.hash(DECOY_PASSWORD).unwrap_or_else(|e| {
                tracing::error!(error = %e, "failed to build decoy hash");
                String::new()
            })
        })
    }
}
