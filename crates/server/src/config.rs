//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Server
//! - `APP_HOST` - Bind address (default: 0.0.0.0)
//! - `APP_PORT` - Listen port (default: 8000)
//! - `APP_STORE` - `postgres` (default) or `memory`
//! - `CORS_ALLOWED_ORIGIN` - Allowed browser origin (default: <http://localhost:8080>)
//! - `AUTH_TOKEN_TTL_MINUTES` - Bearer token lifetime (default: 120)
//! - `LOG_FORMAT` - `text` (default) or `json`
//!
//! ## Main database
//! - `DATABASE_URL` - Full connection string; overrides the parts below
//! - `APP_DB_HOST`, `APP_DB_PORT`, `APP_DB_USER`, `APP_DB_PASSWORD`, `APP_DB_NAME`
//!   (defaults: localhost, 5432, postgres, empty, addressbook)
//! - `APP_DB_CONNECT_RETRIES` - Initial connection attempts (default: 5)
//! - `APP_DB_CONNECT_DELAY_SECS` - Pause between attempts (default: 3)
//!
//! ## Device database (optional)
//! - `DEVICE_DATABASE_URL` or any of `DEVICE_DB_HOST`, `DEVICE_DB_PORT`,
//!   `DEVICE_DB_USER`, `DEVICE_DB_PASSWORD`, `DEVICE_DB_NAME`
//!   (defaults: localhost, 5432, postgres, empty, `device_management_database`).
//!   When none is set the device tables live in the main database.
//!
//! ## Bootstrap admin
//! - `BOOTSTRAP_ADMIN_USERNAME` (default: admin)
//! - `BOOTSTRAP_ADMIN_EMAIL` (default: admin@system.local)
//! - `BOOTSTRAP_ADMIN_PASSWORD` - Must pass the secret-strength check; when
//!   unset a random password is generated on first seed
//!
//! ## Error tracking
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE` (default 1.0),
//!   `SENTRY_TRACES_SAMPLE_RATE` (default 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgConnectOptions;
use thiserror::Error;

use addressbook_core::Email;

use crate::db::PoolSettings;
use crate::services::BootstrapAdmin;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Which [`Store`](crate::db::Store) backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("expected 'postgres' or 'memory', got '{other}'")),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("expected 'text' or 'json', got '{other}'")),
        }
    }
}

/// Where a `PostgreSQL` database lives.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub enum DatabaseConfig {
    /// A full connection URL (may embed a password).
    Url(SecretString),
    /// Individual connection parameters.
    Parts {
        host: String,
        port: u16,
        user: String,
        password: SecretString,
        name: String,
    },
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(_) => f.debug_tuple("Url").field(&"[REDACTED]").finish(),
            Self::Parts {
                host,
                port,
                user,
                name,
                ..
            } => f
                .debug_struct("Parts")
                .field("host", host)
                .field("port", port)
                .field("user", user)
                .field("password", &"[REDACTED]")
                .field("name", name)
                .finish(),
        }
    }
}

impl DatabaseConfig {
    /// sqlx connection options for this database.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a URL does not parse.
    pub fn connect_options(&self, var_name: &str) -> Result<PgConnectOptions, ConfigError> {
        match self {
            Self::Url(url) => PgConnectOptions::from_str(url.expose_secret())
                .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string())),
            Self::Parts {
                host,
                port,
                user,
                password,
                name,
            } => {
                let options = PgConnectOptions::new()
                    .host(host)
                    .port(*port)
                    .username(user)
                    .database(name);
                let password = password.expose_secret();
                Ok(if password.is_empty() {
                    options
                } else {
                    options.password(password)
                })
            }
        }
    }

    /// Read `<url_var>` or the `<prefix>_*` parts.
    fn from_env(url_var: &str, prefix: &str, default_name: &str) -> Result<Self, ConfigError> {
        if let Some(url) = get_optional_env(url_var) {
            return Ok(Self::Url(SecretString::from(url)));
        }

        Ok(Self::Parts {
            host: get_env_or_default(&format!("{prefix}_HOST"), "localhost"),
            port: parse_env_or_default(&format!("{prefix}_PORT"), 5432)?,
            user: get_env_or_default(&format!("{prefix}_USER"), "postgres"),
            password: SecretString::from(get_env_or_default(&format!("{prefix}_PASSWORD"), "")),
            name: get_env_or_default(&format!("{prefix}_NAME"), default_name),
        })
    }

    /// The device database is configured only if any of its variables is set.
    fn device_from_env() -> Result<Option<Self>, ConfigError> {
        let configured = std::iter::once("DEVICE_DATABASE_URL".to_string())
            .chain(
                ["HOST", "PORT", "USER", "PASSWORD", "NAME"]
                    .iter()
                    .map(|part| format!("DEVICE_DB_{part}")),
            )
            .any(|key| get_optional_env(&key).is_some());

        if !configured {
            return Ok(None);
        }
        Self::from_env("DEVICE_DATABASE_URL", "DEVICE_DB", "device_management_database").map(Some)
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Storage backend
    pub store: StoreBackend,
    /// Main database (RBAC, directory, tokens)
    pub database: DatabaseConfig,
    /// Separate device database, if configured
    pub device_database: Option<DatabaseConfig>,
    /// Pool sizing and startup retry policy
    pub pool: PoolSettings,
    /// Bearer token lifetime
    pub token_ttl: chrono::Duration,
    /// Browser origin allowed by CORS
    pub cors_allowed_origin: String,
    /// Account the seed guarantees
    pub bootstrap_admin: BootstrapAdmin,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is malformed or if the bootstrap
    /// admin password fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or_default("APP_HOST", IpAddr::from([0, 0, 0, 0]))?;
        let port = parse_env_or_default("APP_PORT", 8000)?;
        let store = parse_env_or_default("APP_STORE", StoreBackend::Postgres)?;
        let database = DatabaseConfig::from_env("DATABASE_URL", "APP_DB", "addressbook")?;
        let device_database = DatabaseConfig::device_from_env()?;

        let pool = PoolSettings {
            connect_attempts: parse_env_or_default("APP_DB_CONNECT_RETRIES", 5)?,
            retry_delay: Duration::from_secs(parse_env_or_default("APP_DB_CONNECT_DELAY_SECS", 3)?),
            ..PoolSettings::default()
        };

        let ttl_minutes: i64 = parse_env_or_default("AUTH_TOKEN_TTL_MINUTES", 120)?;
        if ttl_minutes <= 0 {
            return Err(ConfigError::InvalidEnvVar(
                "AUTH_TOKEN_TTL_MINUTES".to_string(),
                "must be positive".to_string(),
            ));
        }

        let cors_allowed_origin = get_env_or_default("CORS_ALLOWED_ORIGIN", "http://localhost:8080");
        let bootstrap_admin = bootstrap_admin_from_env()?;
        let log_format = parse_env_or_default("LOG_FORMAT", LogFormat::Text)?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0);

        Ok(Self {
            host,
            port,
            store,
            database,
            device_database,
            pool,
            token_ttl: chrono::Duration::minutes(ttl_minutes),
            cors_allowed_origin,
            bootstrap_admin,
            log_format,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Read the bootstrap admin account from the environment.
///
/// # Errors
///
/// Returns `ConfigError` if the email is malformed or the password is weak.
pub fn bootstrap_admin_from_env() -> Result<BootstrapAdmin, ConfigError> {
    let username = get_env_or_default("BOOTSTRAP_ADMIN_USERNAME", "admin");
    let email = Email::normalized(&get_env_or_default(
        "BOOTSTRAP_ADMIN_EMAIL",
        "admin@system.local",
    ))
    .map_err(|e| ConfigError::InvalidEnvVar("BOOTSTRAP_ADMIN_EMAIL".to_string(), e.to_string()))?;

    let password = match get_optional_env("BOOTSTRAP_ADMIN_PASSWORD") {
        Some(value) => {
            validate_secret_strength(&value, "BOOTSTRAP_ADMIN_PASSWORD")?;
            Some(SecretString::from(value))
        }
        None => None,
    };

    Ok(BootstrapAdmin {
        username,
        email,
        password,
    })
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if unset.
pub fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| parse_value(key, &raw))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
///
/// # Errors
///
/// Returns `ConfigError::InsecureSecret` describing the failed check.
pub fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_edges() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_rejects_literal_admin_passwords() {
        assert!(matches!(
            validate_secret_strength("admin", "BOOTSTRAP_ADMIN_PASSWORD"),
            Err(ConfigError::InsecureSecret(_, _))
        ));
        assert!(matches!(
            validate_secret_strength("changeme123", "BOOTSTRAP_ADMIN_PASSWORD"),
            Err(ConfigError::InsecureSecret(_, _))
        ));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_store_backend_parsing() {
        assert_eq!("postgres".parse::<StoreBackend>(), Ok(StoreBackend::Postgres));
        assert_eq!(" Memory ".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert!("sqlite".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_parse_value_reports_variable_name() {
        let err = parse_value::<u16>("APP_PORT", "eighty").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "APP_PORT"));
        assert_eq!(parse_value::<u16>("APP_PORT", " 8000 ").unwrap(), 8000);
    }

    #[test]
    fn test_database_parts_build_options() {
        let db = DatabaseConfig::Parts {
            host: "db.internal".to_string(),
            port: 6543,
            user: "svc".to_string(),
            password: SecretString::from(""),
            name: "addressbook".to_string(),
        };
        let options = db.connect_options("APP_DB").unwrap();
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_database(), Some("addressbook"));
    }

    #[test]
    fn test_database_url_is_parsed() {
        let db = DatabaseConfig::Url(SecretString::from(
            "postgres://svc:pw@localhost:5433/addressbook",
        ));
        let options = db.connect_options("DATABASE_URL").unwrap();
        assert_eq!(options.get_port(), 5433);

        let bad = DatabaseConfig::Url(SecretString::from("not a url"));
        assert!(matches!(
            bad.connect_options("DATABASE_URL"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_database_config_debug_redacts_password() {
        let db = DatabaseConfig::Parts {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: SecretString::from("hunter2-but-longer"),
            name: "addressbook".to_string(),
        };
        let debug_output = format!("{db:?}");

        assert!(debug_output.contains("localhost"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("hunter2-but-longer"));

        let url = DatabaseConfig::Url(SecretString::from("postgres://u:topsecretpw@h/db"));
        assert!(!format!("{url:?}").contains("topsecretpw"));
    }
}
