//! Server configuration loaded from environment variables.
//!
//! Every setting has a default so the server starts with zero configuration
//! for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use carelink_linking::LinkingConfig;
use carelink_linking::code::{DEFAULT_CODE_LENGTH, MAX_CODE_LENGTH};
use tracing::warn;

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Env: `CARELINK_HOST` / `CARELINK_PORT`
    /// Default: `0.0.0.0:3000`
    pub http_addr: SocketAddr,

    /// Env: `CARELINK_DB_PATH`
    /// Default: `carelink.db`
    pub db_path: PathBuf,

    /// Env: `CARELINK_JWT_SECRET`
    pub jwt_secret: String,

    /// Env: `CARELINK_TOKEN_TTL_DAYS`
    /// Default: `30`
    pub token_ttl_days: i64,

    /// Env: `CARELINK_CODE_LENGTH`
    /// Default: `8`
    pub code_length: usize,

    /// Env: `CARELINK_CODE_TTL_HOURS` (unset or `0` = codes never expire)
    pub code_ttl_hours: Option<i64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 3000).into(),
            db_path: PathBuf::from("carelink.db"),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_days: 30,
            code_length: DEFAULT_CODE_LENGTH,
            code_ttl_hours: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        let host = var("CARELINK_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = var("CARELINK_PORT").unwrap_or_else(|| "3000".into());
        match format!("{}:{}", host, port).parse::<SocketAddr>() {
            Ok(addr) => config.http_addr = addr,
            Err(e) => warn!(%host, %port, error = %e, "Invalid listen address, using default"),
        }

        if let Some(path) = var("CARELINK_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }

        match var("CARELINK_JWT_SECRET") {
            Some(secret) if !secret.is_empty() => config.jwt_secret = secret,
            _ => warn!("CARELINK_JWT_SECRET not set, using development secret"),
        }

        if let Some(val) = var("CARELINK_TOKEN_TTL_DAYS") {
            match val.parse::<i64>() {
                Ok(days) if days > 0 => config.token_ttl_days = days,
                _ => warn!(value = %val, "Invalid CARELINK_TOKEN_TTL_DAYS, using default"),
            }
        }

        if let Some(val) = var("CARELINK_CODE_LENGTH") {
            match val.parse::<usize>() {
                Ok(len) if (1..=MAX_CODE_LENGTH).contains(&len) => config.code_length = len,
                _ => warn!(value = %val, "Invalid CARELINK_CODE_LENGTH, using default"),
            }
        }

        if let Some(val) = var("CARELINK_CODE_TTL_HOURS") {
            match val.parse::<i64>() {
                Ok(0) => config.code_ttl_hours = None,
                Ok(hours) if hours > 0 => config.code_ttl_hours = Some(hours),
                _ => warn!(value = %val, "Invalid CARELINK_CODE_TTL_HOURS, codes will not expire"),
            }
        }

        config
    }

    pub fn linking(&self) -> LinkingConfig {
        LinkingConfig {
            code_length: self.code_length,
            code_ttl: self.code_ttl_hours.map(chrono::Duration::hours),
            ..LinkingConfig::default()
        }
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.token_ttl_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> ServerConfig {
        let env: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ServerConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_without_env() {
        let config = load(&[]);
        assert_eq!(config.http_addr.port(), 3000);
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(config.linking().code_length, DEFAULT_CODE_LENGTH);
        assert!(config.linking().code_ttl.is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            ("CARELINK_HOST", "127.0.0.1"),
            ("CARELINK_PORT", "8088"),
            ("CARELINK_DB_PATH", "/var/lib/carelink/app.db"),
            ("CARELINK_JWT_SECRET", "hunter2"),
            ("CARELINK_CODE_LENGTH", "10"),
            ("CARELINK_CODE_TTL_HOURS", "48"),
        ]);
        assert_eq!(config.http_addr.to_string(), "127.0.0.1:8088");
        assert_eq!(config.db_path, PathBuf::from("/var/lib/carelink/app.db"));
        assert_eq!(config.jwt_secret, "hunter2");
        assert_eq!(config.linking().code_length, 10);
        assert_eq!(config.linking().code_ttl, Some(chrono::Duration::hours(48)));
    }

    #[test]
    fn bad_values_fall_back() {
        let config = load(&[
            ("CARELINK_PORT", "not-a-port"),
            ("CARELINK_CODE_LENGTH", "0"),
            ("CARELINK_CODE_TTL_HOURS", "-3"),
            ("CARELINK_TOKEN_TTL_DAYS", "soon"),
        ]);
        assert_eq!(config.http_addr.port(), 3000);
        assert_eq!(config.code_length, DEFAULT_CODE_LENGTH);
        assert!(config.code_ttl_hours.is_none());
        assert_eq!(config.token_ttl(), chrono::Duration::days(30));
    }
}
