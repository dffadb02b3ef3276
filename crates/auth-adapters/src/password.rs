use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use domains::{DomainError, PasswordHasher, Result};
use tokio::task;
use tracing::error;

/// Argon2id with the crate's default cost parameters. Hashes are stored
/// in PHC string form, so the parameters travel with each hash.
/// Every call runs on tokio's blocking pool.
#[derive(Default, Clone)]
pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
}

impl Argon2PasswordHasher {
    pub fn new() -> Self {
        Self::default()
    }

    fn hash_blocking(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                error!(error = %e, "password hashing failed");
                DomainError::internal("password hashing failed")
            })
    }

    /// A malformed stored hash counts as a mismatch.
    fn verify_blocking(&self, password: &str, hash: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(_) => return false,
        };
        self.argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    }
}

#[async_trait]
impl PasswordHasher for Argon2PasswordHasher {
    async fn hash(&self, password: &str) -> Result<String> {
        let hasher = self.clone();
        let password = password.to_owned();
        task::spawn_blocking(move || hasher.hash_blocking(&password))
            .await
            .map_err(|e| {
                error!(error = %e, "password hashing task failed");
                DomainError::internal("password hashing failed")
            })?
    }

    async fn verify(&self, password: &str, hash: &str) -> bool {
        let hasher = self.clone();
        let (password, hash) = (password.to_owned(), hash.to_owned());
        task::spawn_blocking(move || hasher.verify_blocking(&password, &hash))
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "password verification task failed");
                false
            })
    }
}
