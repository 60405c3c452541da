use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string
    pub role: String,
    pub created_at: OffsetDateTime,
}

/// Role to give a new account: `first` if no user exists yet, `rest` otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    pub first: String,
    pub rest: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: RoleAssignment,
}

/// External-source columns as stored: the secret is ciphertext here.
#[derive(Debug, Clone, FromRow)]
pub struct SourceConfigRow {
    pub source_url: String,
    pub source_secret: String,
    pub source_table_name: String,
    pub source_schema: serde_json::Value,
    pub source_detected_at: OffsetDateTime,
}

/// What callers hand to the store. `table_name` of `None` means the default.
#[derive(Debug, Clone)]
pub struct SourceConfigInput {
    pub source_url: String,
    pub secret: String,
    pub table_name: Option<String>,
    pub schema: serde_json::Value,
}

/// Decrypted configuration handed back by the store.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub source_url: String,
    pub secret: String,
    pub table_name: String,
    pub schema: serde_json::Value,
    pub detected_at: OffsetDateTime,
}
