use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    repo::UserRepository,
    repo_types::{NewUser, SourceConfigRow, User},
    StoreError,
};

struct Record {
    user: User,
    source: Option<SourceConfigRow>,
}

/// In-process stand-in for the users table, used by the router tests.
#[derive(Default)]
pub struct MemoryUserRepository {
    rows: RwLock<HashMap<Uuid, Record>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the stored ciphertext, to simulate corruption or a key change.
    pub async fn corrupt_secret(&self, user_id: Uuid, stored: &str) {
        if let Some(source) = self
            .rows
            .write()
            .await
            .get_mut(&user_id)
            .and_then(|r| r.source.as_mut())
        {
            source.source_secret = stored.to_string();
        }
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn insert(&self, new_user: &NewUser) -> Result<User, StoreError> {
        let mut rows = self.rows.write().await;
        if rows.values().any(|r| r.user.email == new_user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let role = if rows.is_empty() {
            new_user.role.first.clone()
        } else {
            new_user.role.rest.clone()
        };
        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name.clone(),
            email: new_user.email.clone(),
            password_hash: new_user.password_hash.clone(),
            role,
            created_at: OffsetDateTime::now_utc(),
        };
        rows.insert(
            user.id,
            Record {
                user: user.clone(),
                source: None,
            },
        );
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .find(|r| r.user.email == email)
            .map(|r| r.user.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.rows.read().await.get(&id).map(|r| r.user.clone()))
    }

    async fn update_source_config(
        &self,
        user_id: Uuid,
        row: &SourceConfigRow,
    ) -> Result<bool, StoreError> {
        match self.rows.write().await.get_mut(&user_id) {
            Some(record) => {
                record.source = Some(row.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn source_config(&self, user_id: Uuid) -> Result<Option<SourceConfigRow>, StoreError> {
        Ok(self
            .rows
            .read()
            .await
            .get(&user_id)
            .and_then(|r| r.source.clone()))
    }
}
