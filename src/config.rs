use std::env;

use derive_more::Display;
use log::warn;

const FALLBACK_JWT_SECRET: &str = "fallback-secret-change-in-production";

#[derive(Debug, Display)]
#[display(fmt = "invalid value for {}: {}", key, value)]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Without a database url the service runs on the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_ttl_secs: u64,
    pub app_env: String,
    pub log_level: String,
}

/// Accepts plain seconds or a number suffixed with `s`, `m`, `h` or `d`.
pub fn parse_duration_secs(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let (digits, unit) = match raw.char_indices().last()? {
        (i, c) if c.is_ascii_alphabetic() => (&raw[..i], c),
        _ => (raw, 's'),
    };
    let value: u64 = digits.parse().ok()?;
    let factor = match unit {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        'd' => 24 * 60 * 60,
        _ => return None,
    };
    value.checked_mul(factor)
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port_raw = var_or("PORT", "3000");
        let port = port_raw.parse().map_err(|_| ConfigError {
            key: "PORT",
            value: port_raw.clone(),
        })?;

        let pool_raw = var_or("DB_MAX_CONNECTIONS", "5");
        let db_max_connections = pool_raw.parse().map_err(|_| ConfigError {
            key: "DB_MAX_CONNECTIONS",
            value: pool_raw.clone(),
        })?;

        let expire_raw = var_or("JWT_EXPIRE", "7d");
        let jwt_ttl_secs = parse_duration_secs(&expire_raw).ok_or(ConfigError {
            key: "JWT_EXPIRE",
            value: expire_raw.clone(),
        })?;

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            warn!("JWT_SECRET is not set, using the fallback secret");
            FALLBACK_JWT_SECRET.to_string()
        });

        Ok(Self {
            host: var_or("HOST", "127.0.0.1"),
            port,
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            db_max_connections,
            jwt_secret,
            jwt_ttl_secs,
            app_env: var_or("APP_ENV", "development"),
            log_level: var_or("LOG_LEVEL", "info"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(parse_duration_secs("3600"), Some(3600));
        assert_eq!(parse_duration_secs("90s"), Some(90));
        assert_eq!(parse_duration_secs("15m"), Some(900));
        assert_eq!(parse_duration_secs("12h"), Some(43_200));
        assert_eq!(parse_duration_secs("7d"), Some(604_800));
        assert_eq!(parse_duration_secs("7w"), None);
        assert_eq!(parse_duration_secs("d"), None);
        assert_eq!(parse_duration_secs(""), None);
    }
}
