//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// Shortest accepted HS256 signing secret, in bytes.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Longest accepted token lifetime: ten years, in minutes.
pub const MAX_JWT_EXPIRATION_MINUTES: i64 = 10 * 365 * 24 * 60;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Credentials of the administrator account created by the `seed` binary.
#[derive(Clone, Debug)]
pub struct AdminAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub database_max_connections: u32,
    pub log_level: Level,
    pub jwt_secret: String,
    pub jwt_expiration_minutes: i64,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Load Server and Database Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = database_url(&var)?;

        let database_max_connections =
            parse_or("DATABASE_MAX_CONNECTIONS", var("DATABASE_MAX_CONNECTIONS"), 5)?;

        let log_level = log_level(&var)?;

        // --- Load Token Settings ---
        let jwt_secret =
            var("JWT_SECRET").ok_or_else(|| ConfigError::MissingVar("JWT_SECRET".to_string()))?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::InvalidValue(
                "JWT_SECRET".to_string(),
                format!("must be at least {} bytes long", MIN_JWT_SECRET_LEN),
            ));
        }

        let jwt_expiration_minutes =
            parse_or("JWT_EXPIRATION_MINUTES", var("JWT_EXPIRATION_MINUTES"), 1440)?;
        if !(1..=MAX_JWT_EXPIRATION_MINUTES).contains(&jwt_expiration_minutes) {
            return Err(ConfigError::InvalidValue(
                "JWT_EXPIRATION_MINUTES".to_string(),
                format!("must be between 1 and {}", MAX_JWT_EXPIRATION_MINUTES),
            ));
        }

        let cors_origin =
            var("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        Ok(Self {
            bind_address,
            database_url,
            database_max_connections,
            log_level,
            jwt_secret,
            jwt_expiration_minutes,
            cors_origin,
        })
    }
}

/// Configuration of the `seed` binary. It never signs tokens, so it needs no
/// JWT settings.
#[derive(Clone, Debug)]
pub struct SeedConfig {
    pub database_url: String,
    pub log_level: Level,
    pub admin: Option<AdminAccount>,
}

impl SeedConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            database_url: database_url(&var)?,
            log_level: log_level(&var)?,
            admin: admin_account(&var),
        })
    }
}

fn database_url(var: &impl Fn(&str) -> Option<String>) -> Result<String, ConfigError> {
    var("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))
}

fn log_level(var: &impl Fn(&str) -> Option<String>) -> Result<Level, ConfigError> {
    let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
    log_level_str.parse::<Level>().map_err(|_| {
        ConfigError::InvalidValue(
            "RUST_LOG".to_string(),
            format!("'{}' is not a valid log level", log_level_str),
        )
    })
}

/// All three `ADMIN_*` variables or none.
fn admin_account(var: &impl Fn(&str) -> Option<String>) -> Option<AdminAccount> {
    match (
        var("ADMIN_USERNAME"),
        var("ADMIN_EMAIL"),
        var("ADMIN_PASSWORD"),
    ) {
        (Some(username), Some(email), Some(password)) => Some(AdminAccount {
            username,
            email,
            password,
        }),
        _ => None,
    }
}

fn parse_or<T>(name: &str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/store"),
            ("JWT_SECRET", SECRET),
        ]))
        .unwrap();

        assert_eq!(config.bind_address.port(), 3000);
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.jwt_expiration_minutes, 1440);
        assert_eq!(config.cors_origin, "http://localhost:3000");
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    fn short_jwt_secret_is_rejected() {
        let result = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/store"),
            ("JWT_SECRET", "too-short"),
        ]));

        assert!(matches!(result, Err(ConfigError::InvalidValue(name, _)) if name == "JWT_SECRET"));
    }

    #[test]
    fn missing_database_url_is_reported() {
        let result = Config::from_lookup(lookup(&[("JWT_SECRET", SECRET)]));

        assert!(matches!(result, Err(ConfigError::MissingVar(name)) if name == "DATABASE_URL"));
    }

    #[test]
    fn admin_account_needs_all_three_variables() {
        let partial = SeedConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/store"),
            ("ADMIN_USERNAME", "admin"),
        ]))
        .unwrap();
        assert!(partial.admin.is_none());

        let full = SeedConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/store"),
            ("ADMIN_USERNAME", "admin"),
            ("ADMIN_EMAIL", "admin@example.com"),
            ("ADMIN_PASSWORD", "change-me"),
        ]))
        .unwrap();
        assert_eq!(full.admin.map(|a| a.username).as_deref(), Some("admin"));
    }

    #[test]
    fn seed_config_does_not_need_token_settings() {
        let config = SeedConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/store"),
            ("RUST_LOG", "debug"),
        ]))
        .unwrap();

        assert_eq!(config.database_url, "postgres://localhost/store");
        assert_eq!(config.log_level, Level::DEBUG);

        let missing = SeedConfig::from_lookup(lookup(&[("JWT_SECRET", SECRET)]));
        assert!(matches!(missing, Err(ConfigError::MissingVar(name)) if name == "DATABASE_URL"));
    }

    #[test]
    fn unparsable_pool_size_is_an_invalid_value() {
        let result = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/store"),
            ("JWT_SECRET", SECRET),
            ("DATABASE_MAX_CONNECTIONS", "many"),
        ]));

        assert!(
            matches!(result, Err(ConfigError::InvalidValue(name, _)) if name == "DATABASE_MAX_CONNECTIONS")
        );
    }

    #[test]
    fn token_lifetime_must_stay_within_ten_years() {
        let env = |minutes: &'static str| {
            lookup(&[
                ("DATABASE_URL", "postgres://localhost/store"),
                ("JWT_SECRET", SECRET),
                ("JWT_EXPIRATION_MINUTES", minutes),
            ])
        };

        for minutes in ["0", "-5", "5256001", "1000000000000"] {
            let result = Config::from_lookup(env(minutes));
            assert!(
                matches!(result, Err(ConfigError::InvalidValue(ref name, _)) if name == "JWT_EXPIRATION_MINUTES"),
                "{minutes} should be rejected"
            );
        }

        let longest = Config::from_lookup(env("5256000")).unwrap();
        assert_eq!(longest.jwt_expiration_minutes, MAX_JWT_EXPIRATION_MINUTES);
    }
}
