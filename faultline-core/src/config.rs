use std::env;

use crate::errors::{ConfigError, FaultlineError};

/// Runtime environment used by the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    fn from_str(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "staging" | "stage" => Environment::Staging,
            _ => Environment::Development,
        }
    }
}

/// Default response-cache TTL when the environment does not override it.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Global configuration shared across the service crates.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub database_url: String,
    pub environment: Environment,
    pub node_name: String,
    pub http_bind: Option<String>,
    /// Allowed browser origin for CORS; `None` means any origin.
    pub frontend_origin: Option<String>,
    /// Time-to-live for cached query responses, in seconds.
    pub cache_ttl_secs: u64,
    /// Requests allowed per minute; `0` disables rate limiting.
    pub rate_limit_per_minute: u64,
}

impl CoreConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("DATABASE_URL".into()))?;

        let environment = env::var("FAULTLINE_ENV")
            .map(|raw| Environment::from_str(&raw))
            .unwrap_or_default();

        let node_name =
            env::var("FAULTLINE_NODE_NAME").unwrap_or_else(|_| "faultline-node".to_string());
        let http_bind = env::var("FAULTLINE_HTTP_BIND").ok();
        let frontend_origin = env::var("FAULTLINE_FRONTEND_ORIGIN").ok();
        let cache_ttl_secs =
            parse_u64_var("FAULTLINE_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?;
        let rate_limit_per_minute = parse_u64_var("FAULTLINE_RATE_LIMIT_PER_MINUTE", 0)?;

        Ok(Self {
            database_url,
            environment,
            node_name,
            http_bind,
            frontend_origin,
            cache_ttl_secs,
            rate_limit_per_minute,
        })
    }

    /// Loads configuration from env vars prefixed with the provided value (e.g. `LOGS_`).
    pub fn from_env_with_prefix(prefix: &str) -> Result<Self, ConfigError> {
        let key = |suffix: &str| format!("{}{}", prefix, suffix);

        let db_key = key("DATABASE_URL");
        let database_url =
            env::var(&db_key).map_err(|_| ConfigError::MissingEnvVar(db_key.clone()))?;

        let environment = env::var(key("ENV"))
            .map(|raw| Environment::from_str(&raw))
            .unwrap_or_default();

        let node_name =
            env::var(key("NODE_NAME")).unwrap_or_else(|_| "faultline-node".to_string());
        let http_bind = env::var(key("HTTP_BIND")).ok();
        let frontend_origin = env::var(key("FRONTEND_ORIGIN")).ok();
        let cache_ttl_secs = parse_u64_var(&key("CACHE_TTL_SECS"), DEFAULT_CACHE_TTL_SECS)?;
        let rate_limit_per_minute = parse_u64_var(&key("RATE_LIMIT_PER_MINUTE"), 0)?;

        Ok(Self {
            database_url,
            environment,
            node_name,
            http_bind,
            frontend_origin,
            cache_ttl_secs,
            rate_limit_per_minute,
        })
    }

    /// Returns the base Postgres URL.
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Whether the service is running in production.
    pub fn is_production(&self) -> bool {
        matches!(self.environment, Environment::Production)
    }
}

fn parse_u64_var(key: &str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidEnvVar {
            key: key.to_string(),
            message: format!("expected a non-negative integer, got {raw:?}"),
        }),
        Err(_) => Ok(default),
    }
}

/// Helper that loads config and converts to the canonical Faultline error type.
pub fn load_core_config() -> Result<CoreConfig, FaultlineError> {
    Ok(CoreConfig::from_env()?)
}
