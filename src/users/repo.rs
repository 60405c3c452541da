use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{
    repo_types::{NewUser, SourceConfigRow, User},
    StoreError,
};

/// Raw persistence for users. Implementations never see plaintext secrets;
/// [`super::UserStore`] encrypts before calling in and decrypts after.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, new_user: &NewUser) -> Result<User, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// Writes every source column at once. Returns false when no such user exists.
    async fn update_source_config(
        &self,
        user_id: Uuid,
        row: &SourceConfigRow,
    ) -> Result<bool, StoreError>;
    /// `None` unless the user exists and has a completed configuration.
    async fn source_config(&self, user_id: Uuid) -> Result<Option<SourceConfigRow>, StoreError>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn insert_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return StoreError::DuplicateEmail;
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, new_user: &NewUser) -> Result<User, StoreError> {
        // Role is picked inside the statement so two concurrent first
        // sign-ups cannot both observe an empty table in separate queries.
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, role)
            VALUES (
                $1, $2, $3,
                CASE WHEN EXISTS (SELECT 1 FROM users) THEN $5 ELSE $4 END
            )
            RETURNING id, name, email, password_hash, role, created_at
            "#,
        )
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.role.first)
        .bind(&new_user.role.rest)
        .fetch_one(&self.db)
        .await
        .map_err(insert_error)?;
        debug!(user_id = %user.id, "user row inserted");
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn update_source_config(
        &self,
        user_id: Uuid,
        row: &SourceConfigRow,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
               SET source_url = $1,
                   source_secret = $2,
                   source_table_name = $3,
                   source_schema = $4,
                   source_configured = true,
                   source_detected_at = $5
             WHERE id = $6
            "#,
        )
        .bind(&row.source_url)
        .bind(&row.source_secret)
        .bind(&row.source_table_name)
        .bind(&row.source_schema)
        .bind(row.source_detected_at)
        .bind(user_id)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn source_config(&self, user_id: Uuid) -> Result<Option<SourceConfigRow>, StoreError> {
        let row = sqlx::query_as::<_, SourceConfigRow>(
            r#"
            SELECT source_url, source_secret, source_table_name, source_schema, source_detected_at
              FROM users
             WHERE id = $1 AND source_configured = true
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }
}
