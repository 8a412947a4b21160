// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup and handed to the components that
//! need it, so tests can build their own `Config` without touching the
//! process environment.

use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Which backends the store and the session cache use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// MySQL for records, Redis for sessions.
    MySql,
    /// In-process maps for both (local development, tests).
    Memory,
}

/// Relational database connection parameters.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub driver: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
}

/// Session cache connection parameters.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
}

impl RedisConfig {
    /// Connection parameters for the `redis` crate. Built field by field so
    /// the password never passes through URL parsing.
    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            addr: ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: RedisConnectionInfo {
                password: self.password.clone(),
                ..Default::default()
            },
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    pub store_backend: StoreBackend,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,

    /// JWT signing key for access and refresh tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    /// Upper bound for a single request, store and cache calls included
    pub request_timeout: Duration,
    pub bcrypt_cost: u32,

    /// Directory food images are written to
    pub upload_dir: String,
    /// Public base URL the upload directory is served under
    pub public_upload_url: String,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            port: 8888,
            frontend_url: "http://localhost:3000".to_string(),
            store_backend: StoreBackend::Memory,
            database: DatabaseConfig {
                driver: "mysql".to_string(),
                host: "127.0.0.1".to_string(),
                port: 3306,
                user: "root".to_string(),
                password: String::new(),
                name: "food_app_test".to_string(),
            },
            redis: RedisConfig {
                host: "127.0.0.1".to_string(),
                port: 6379,
                password: None,
            },
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            access_token_ttl: Duration::from_secs(15 * 60),
            refresh_token_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            request_timeout: Duration::from_secs(30),
            bcrypt_cost: 4,
            upload_dir: env::temp_dir()
                .join("food-api-test-uploads")
                .to_string_lossy()
                .into_owned(),
            public_upload_url: "http://localhost:8888/uploads".to_string(),
        }
    }

    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let store_backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "mysql".to_string())
            .to_lowercase()
            .as_str()
        {
            "mysql" => StoreBackend::MySql,
            "memory" => StoreBackend::Memory,
            other => return Err(ConfigError::Invalid("STORE_BACKEND", other.to_string())),
        };

        let driver = env::var("DB_DRIVER").unwrap_or_else(|_| "mysql".to_string());
        if store_backend == StoreBackend::MySql && driver != "mysql" {
            return Err(ConfigError::Invalid("DB_DRIVER", driver));
        }

        let database = DatabaseConfig {
            driver,
            host: env::var("DB_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_or("DB_PORT", 3306)?,
            user: env::var("DB_USER").unwrap_or_else(|_| "root".to_string()),
            password: env::var("DB_PASSWORD").unwrap_or_default(),
            name: env::var("DB_NAME").unwrap_or_else(|_| "food_app".to_string()),
        };

        let redis = RedisConfig {
            host: env::var("REDIS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_or("REDIS_PORT", 6379)?,
            password: env::var("REDIS_PASSWORD")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        };

        Ok(Self {
            port: parse_or("PORT", 8888)?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            store_backend,
            database,
            redis,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            access_token_ttl: token_ttl("ACCESS_TOKEN_TTL_SECS", 15 * 60)?,
            refresh_token_ttl: token_ttl("REFRESH_TOKEN_TTL_SECS", 7 * 24 * 60 * 60)?,
            request_timeout: Duration::from_secs(parse_or("REQUEST_TIMEOUT_SECS", 30)?),
            bcrypt_cost: parse_or("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            public_upload_url: env::var("PUBLIC_UPLOAD_URL")
                .unwrap_or_else(|_| "http://localhost:8888/uploads".to_string()),
        })
    }
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Longest accepted token lifetime (ten years).
pub const MAX_TOKEN_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Parse a token TTL in seconds, rejecting zero and absurdly long values.
fn token_ttl(name: &'static str, default: u64) -> Result<Duration, ConfigError> {
    let secs: u64 = parse_or(name, default)?;
    if secs == 0 || secs > MAX_TOKEN_TTL_SECS {
        return Err(ConfigError::Invalid(name, secs.to_string()));
    }
    Ok(Duration::from_secs(secs))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::set_var("STORE_BACKEND", "memory");
        env::set_var("REDIS_PASSWORD", "hunter2");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.jwt_signing_key, b"test_jwt_key_32_bytes_minimum!!");
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.access_token_ttl, Duration::from_secs(900));
        assert_eq!(
            config.redis.connection_info().redis.password.as_deref(),
            Some("hunter2")
        );
    }

    #[test]
    fn test_redis_password_with_reserved_characters() {
        let mut redis = Config::test_default().redis;
        redis.password = Some("ab/cd#ef?g@h".to_string());

        let info = redis.connection_info();

        match &info.addr {
            ConnectionAddr::Tcp(host, port) => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(*port, 6379);
            }
            other => panic!("unexpected address {:?}", other),
        }
        assert_eq!(info.redis.password.as_deref(), Some("ab/cd#ef?g@h"));
        assert!(redis::Client::open(info).is_ok());
    }

    #[test]
    fn test_redis_without_password() {
        let info = Config::test_default().redis.connection_info();
        assert!(info.redis.password.is_none());
        assert_eq!(info.redis.db, 0);
    }

    #[test]
    fn test_token_ttl_bounds() {
        const VAR: &str = "FOOD_API_TEST_TOKEN_TTL_SECS";

        env::remove_var(VAR);
        assert_eq!(token_ttl(VAR, 900).unwrap(), Duration::from_secs(900));

        env::set_var(VAR, "1000000000000000");
        assert!(matches!(token_ttl(VAR, 900), Err(ConfigError::Invalid(VAR, _))));

        env::set_var(VAR, "0");
        assert!(token_ttl(VAR, 900).is_err());

        env::set_var(VAR, MAX_TOKEN_TTL_SECS.to_string());
        assert_eq!(
            token_ttl(VAR, 900).unwrap(),
            Duration::from_secs(MAX_TOKEN_TTL_SECS)
        );
        env::remove_var(VAR);
    }
}
