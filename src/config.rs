use std::{str::FromStr, time::Duration};

use anyhow::{anyhow, Context};

use crate::users::RoleAssignment;

pub const ADMIN_ROLE: &str = "admin";
pub const MEMBER_ROLE: &str = "member";

/// One year, plus a day for leap years.
pub const MAX_JWT_TTL_HOURS: i64 = 24 * 366;

#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_hours: i64,
}

/// Connection pool bounds. The pool is the only backpressure in the service:
/// once `max_connections` are checked out, requests wait up to
/// `acquire_timeout` for one to come back.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime: Duration,
    pub acquire_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolePolicy {
    /// First account becomes admin, everyone after that is a member.
    Bootstrap,
    /// Every account is admin.
    Flat,
}

impl RolePolicy {
    pub fn assignment(self) -> RoleAssignment {
        match self {
            RolePolicy::Bootstrap => RoleAssignment {
                first: ADMIN_ROLE.into(),
                rest: MEMBER_ROLE.into(),
            },
            RolePolicy::Flat => RoleAssignment {
                first: ADMIN_ROLE.into(),
                rest: ADMIN_ROLE.into(),
            },
        }
    }
}

impl FromStr for RolePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bootstrap" => Ok(RolePolicy::Bootstrap),
            "flat" => Ok(RolePolicy::Flat),
            other => Err(anyhow!("unknown role policy {other:?} (expected bootstrap or flat)")),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub db: DbConfig,
    pub jwt: JwtConfig,
    /// base64 of the 32 byte AES key
    pub encryption_key: String,
    pub host: String,
    pub port: u16,
    pub role_policy: RolePolicy,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> anyhow::Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("{key} must be set"))
        };

        let db = DbConfig {
            url: required("DATABASE_URL")?,
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 25)?,
            min_connections: parse_or(&lookup, "DB_MIN_CONNECTIONS", 10)?,
            max_lifetime: Duration::from_secs(parse_or(&lookup, "DB_MAX_LIFETIME_SECS", 300)?),
            acquire_timeout: Duration::from_secs(parse_or(
                &lookup,
                "DB_ACQUIRE_TIMEOUT_SECS",
                30,
            )?),
        };
        if db.min_connections > db.max_connections {
            anyhow::bail!(
                "DB_MIN_CONNECTIONS ({}) exceeds DB_MAX_CONNECTIONS ({})",
                db.min_connections,
                db.max_connections
            );
        }

        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            ttl_hours: parse_or(&lookup, "JWT_TTL_HOURS", 24)?,
        };
        if !(1..=MAX_JWT_TTL_HOURS).contains(&jwt.ttl_hours) {
            anyhow::bail!(
                "JWT_TTL_HOURS must be between 1 and {MAX_JWT_TTL_HOURS}, got {}",
                jwt.ttl_hours
            );
        }

        let port = match lookup("APP_PORT").or_else(|| lookup("PORT")) {
            Some(v) => v
                .trim()
                .parse::<u16>()
                .with_context(|| format!("invalid port {v:?}"))?,
            None => 8080,
        };

        let role_policy = match lookup("ROLE_POLICY") {
            Some(v) => v.parse()?,
            None => RolePolicy::Bootstrap,
        };

        Ok(Self {
            db,
            jwt,
            encryption_key: required("ENCRYPTION_KEY")?,
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            role_policy,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(v) => v
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {v:?}")),
        None => Ok(default),
    }
}
