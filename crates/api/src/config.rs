use std::str::FromStr;

use crate::auth::jwt::{
    JwtConfig, SigningKey, SigningKeyError, DEFAULT_ACCESS_TTL_MS, DEFAULT_REFRESH_TTL_MS,
};

/// Paths reachable without an authenticated context when no
/// `AUTH_PUBLIC_PATHS` override is given.
pub const DEFAULT_PUBLIC_PATHS: [&str; 5] = [
    "/api/v1/auth/login",
    "/api/v1/auth/register",
    "/api/v1/auth/refresh-token",
    "/health",
    "/docs",
];

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("JWT_SECRET is unusable: {0}")]
    SigningKey(#[from] SigningKeyError),
}

/// Route whitelist for the authentication layer.
///
/// A path is public if it equals an entry or lies beneath it (`/docs`
/// covers `/docs/openapi.json`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicPaths(Vec<String>);

impl PublicPaths {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            paths
                .into_iter()
                .map(|p| p.into().trim_end_matches('/').to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        )
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.0.iter().any(|p| {
            path == p
                || path
                    .strip_prefix(p.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

impl Default for PublicPaths {
    fn default() -> Self {
        Self::new(DEFAULT_PUBLIC_PATHS)
    }
}

/// Server configuration loaded from environment variables.
///
/// Everything except `JWT_SECRET` has a default suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// PostgreSQL URL. When absent the server runs on the in-memory store.
    pub database_url: Option<String>,
    /// JWT token configuration (key, lifetimes).
    pub jwt: JwtConfig,
    /// Routes that skip the authentication requirement.
    pub public_paths: PublicPaths,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `DATABASE_URL`         | unset (in-memory store)    |
    /// | `JWT_SECRET`           | **required**, base64       |
    /// | `JWT_ACCESS_TTL_MS`    | `900000` (15 minutes)      |
    /// | `JWT_REFRESH_TTL_MS`   | `604800000` (7 days)       |
    /// | `AUTH_PUBLIC_PATHS`    | see [`DEFAULT_PUBLIC_PATHS`] |
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse_or(&lookup, "PORT", 3000u16)?;

        let cors_origins = split_list(
            &lookup("CORS_ORIGINS").unwrap_or_else(|| "http://localhost:5173".into()),
        );

        let request_timeout_secs = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30u64)?;

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let secret = lookup("JWT_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let jwt = JwtConfig {
            signing_key: SigningKey::from_base64(&secret)?,
            access_token_ttl_ms: ttl_ms(
                "JWT_ACCESS_TTL_MS",
                parse_or(&lookup, "JWT_ACCESS_TTL_MS", DEFAULT_ACCESS_TTL_MS)?,
            )?,
            refresh_token_ttl_ms: ttl_ms(
                "JWT_REFRESH_TTL_MS",
                parse_or(&lookup, "JWT_REFRESH_TTL_MS", DEFAULT_REFRESH_TTL_MS)?,
            )?,
        };

        let public_paths = match lookup("AUTH_PUBLIC_PATHS") {
            Some(raw) => PublicPaths::new(split_list(&raw)),
            None => PublicPaths::default(),
        };

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            database_url,
            jwt,
            public_paths,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

/// Longest accepted token lifetime: ten years.
pub const MAX_TTL_MS: i64 = 10 * 365 * 24 * 60 * 60 * 1000;

/// Accept a lifetime in `1..=MAX_TTL_MS`.
fn ttl_ms(key: &'static str, value: i64) -> Result<i64, ConfigError> {
    if !(1..=MAX_TTL_MS).contains(&value) {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        });
    }
    Ok(value)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
