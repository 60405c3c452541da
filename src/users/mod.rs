//! User persistence and the external-source secret boundary.
//!
//! [`UserStore`] is the only code that touches the source secret in either
//! form: it encrypts on the way into the repository and decrypts on the way
//! out. Repositories only ever see ciphertext.

#[cfg(test)]
pub mod memory;
pub mod repo;
pub mod repo_types;

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, error};
use uuid::Uuid;

use crate::cipher::{CipherError, SecretCipher};

pub use repo::{PgUserRepository, UserRepository};
pub use repo_types::{NewUser, RoleAssignment, SourceConfig, SourceConfigInput, SourceConfigRow, User};

pub const DEFAULT_TABLE_NAME: &str = "leads";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("not found")]
    NotFound,
    #[error("could not encrypt source secret: {0}")]
    Encryption(#[source] CipherError),
    #[error("could not decrypt stored source secret: {0}")]
    Decryption(#[source] CipherError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct UserStore {
    repo: Arc<dyn UserRepository>,
    cipher: Arc<SecretCipher>,
}

impl UserStore {
    pub fn new(repo: Arc<dyn UserRepository>, cipher: Arc<SecretCipher>) -> Self {
        Self { repo, cipher }
    }

    pub async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        self.repo.insert(&new_user).await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.repo
            .find_by_email(email)
            .await?
            .ok_or(StoreError::NotFound)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<User, StoreError> {
        self.repo.find_by_id(id).await?.ok_or(StoreError::NotFound)
    }

    /// Encrypts the secret, applies the table default and stamps the
    /// detection time, then writes all of it in one update.
    pub async fn set_source_config(
        &self,
        user_id: Uuid,
        input: SourceConfigInput,
    ) -> Result<(), StoreError> {
        let source_secret = self
            .cipher
            .encrypt(&input.secret)
            .map_err(StoreError::Encryption)?;

        let source_table_name = input
            .table_name
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string());

        let row = SourceConfigRow {
            source_url: input.source_url,
            source_secret,
            source_table_name,
            source_schema: input.schema,
            source_detected_at: OffsetDateTime::now_utc(),
        };

        if !self.repo.update_source_config(user_id, &row).await? {
            return Err(StoreError::NotFound);
        }
        debug!(%user_id, table = %row.source_table_name, "source config stored");
        Ok(())
    }

    pub async fn get_source_config(&self, user_id: Uuid) -> Result<SourceConfig, StoreError> {
        let row = self
            .repo
            .source_config(user_id)
            .await?
            .ok_or(StoreError::NotFound)?;

        let secret = self.cipher.decrypt(&row.source_secret).map_err(|e| {
            error!(error = %e, %user_id, "stored source secret unreadable");
            StoreError::Decryption(e)
        })?;

        Ok(SourceConfig {
            source_url: row.source_url,
            secret,
            table_name: row.source_table_name,
            schema: row.source_schema,
            detected_at: row.source_detected_at,
        })
    }
}
