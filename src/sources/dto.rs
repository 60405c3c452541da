use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::users::SourceConfig;

/// Body of `POST /api/external-source/config`. The snake_case aliases are
/// what the first web client sent.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureSourceRequest {
    #[serde(default, alias = "source_url", alias = "supabase_url")]
    pub source_url: String,
    #[serde(default, alias = "supabase_anon_key")]
    pub secret: String,
    #[serde(default, alias = "table_name")]
    pub table_name: Option<String>,
    /// `null` and absent are both treated as missing.
    #[serde(default)]
    pub schema: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct Ack {
    pub message: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfigView {
    pub source_url: String,
    pub secret: String,
    pub table_name: String,
    pub schema: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub detected_at: OffsetDateTime,
}

impl From<SourceConfig> for SourceConfigView {
    fn from(c: SourceConfig) -> Self {
        Self {
            source_url: c.source_url,
            secret: c.secret,
            table_name: c.table_name,
            schema: c.schema,
            detected_at: c.detected_at,
        }
    }
}
