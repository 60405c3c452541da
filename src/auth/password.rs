use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("argon2 hash error: {0}")]
    Hash(String),
    #[error("stored password hash is unreadable: {0}")]
    StoredHash(String),
    #[error("hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

lazy_static! {
    /// Verified against when a login names an unknown email, so that path
    /// costs about the same as a wrong password.
    static ref DUMMY_HASH: Option<String> = hash_password("lead-central-dummy-password").ok();
}

pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            PasswordError::Hash(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        PasswordError::StoredHash(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// [`hash_password`] on the blocking pool.
pub async fn hash_password_async(plain: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password(&plain)).await?
}

/// [`verify_password`] on the blocking pool.
pub async fn verify_password_async(plain: String, hash: String) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || verify_password(&plain, &hash)).await?
}

/// Forces the dummy hash on the blocking pool. Errors if argon2 could not
/// build it.
pub async fn prepare_dummy_hash() -> Result<(), PasswordError> {
    let ready = tokio::task::spawn_blocking(|| DUMMY_HASH.is_some()).await?;
    if ready {
        Ok(())
    } else {
        Err(PasswordError::Hash("dummy hash unavailable".into()))
    }
}

/// Burns one verification and always reports a mismatch.
pub async fn verify_against_dummy(plain: String) -> bool {
    let _ = tokio::task::spawn_blocking(move || match DUMMY_HASH.as_deref() {
        Some(hash) => {
            let _ = verify_password(&plain, hash);
        }
        // still spend one argon2 run
        None => {
            let _ = hash_password(&plain);
        }
    })
    .await;
    false
}
