use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT payload. Not persisted anywhere; a token dies by expiry or by a
/// signature that no longer matches the process secret.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,    // user ID
    pub role: String, // role at login time
    pub iat: usize,   // issued at (unix timestamp)
    pub exp: usize,   // expires at (unix timestamp)
}
