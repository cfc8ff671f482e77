use std::str::FromStr;
use std::time::Duration;

use crate::utils::RetryConfig;

// ============================================================================
// Configuration - environment variables with defaults
// ============================================================================
//
// Values are read from the process environment after an optional `.env`
// file has been loaded. A variable that is set but cannot be parsed fails
// startup with an error naming it.
//
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub max_connections: u32,
    /// Run the bundled schema at startup.
    pub apply_schema: bool,
    pub connect_attempts: u32,
    pub connect_delay: Duration,
}

impl DatabaseConfig {
    /// Startup wait loop for the database.
    pub fn connect_retry(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.connect_attempts.max(1),
            initial_delay: self.connect_delay,
            max_delay: self.connect_delay * 4,
            multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub http_host: String,
    pub http_port: u16,
    pub metrics_port: u16,
    pub database: DatabaseConfig,
}

impl AppConfig {
    /// Loads `.env` when present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        Ok(Self {
            http_host: env.string("HTTP_HOST", "0.0.0.0"),
            http_port: env.parse("PORT", 3000)?,
            metrics_port: env.parse("METRICS_PORT", 9090)?,
            database: DatabaseConfig {
                host: env.string("DB_HOST", "localhost"),
                port: env.parse("DB_PORT", 5432)?,
                user: env.string("DB_USER", "postgres"),
                password: env.string("DB_PASSWORD", "postgres"),
                name: env.string("DB_NAME", "food_delivery"),
                max_connections: env.parse("DB_MAX_CONNECTIONS", 10)?,
                apply_schema: env.flag("DB_APPLY_SCHEMA", false)?,
                connect_attempts: env.parse("DB_CONNECT_ATTEMPTS", 5)?,
                connect_delay: Duration::from_millis(env.parse("DB_CONNECT_DELAY_MS", 5000)?),
            },
        })
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn raw(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn string(&self, name: &str, default: &str) -> String {
        self.raw(name).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.raw(name) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
                name,
                reason: e.to_string(),
                value,
            }),
        }
    }

    fn flag(&self, name: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.raw(name).map(|v| v.to_ascii_lowercase()) {
            None => Ok(default),
            Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
            Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
            Some(value) => Err(ConfigError::Invalid {
                name,
                value,
                reason: "expected a boolean".to_string(),
            }),
        }
    }
}
