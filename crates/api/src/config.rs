//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `BASE_URL` - Public URL of the API (used in verification links)
//! - `JWT_ACCESS_SECRET` - Access token signing secret (min 32 chars, high entropy)
//! - `JWT_REFRESH_SECRET` - Refresh token signing secret
//! - `JWT_EMAIL_SECRET` - Email verification token signing secret
//! - `MAIL_API_URL` - Transactional mail API base URL
//! - `MAIL_API_KEY` - Transactional mail API key
//! - `MAIL_FROM_EMAIL` - Sender address for outbound mail
//!
//! ## Optional
//! - `HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` - Listen port (default: 3000)
//! - `MAIL_FROM_NAME` - Sender display name (default: Mercata)
//! - `ACCESS_TOKEN_TTL_MINUTES` - Access token lifetime (default: 15)
//! - `REFRESH_TOKEN_TTL_DAYS` - Refresh token lifetime (default: 7)
//! - `REFRESH_TOKEN_MAX_USES` - Refresh rotations per sign-in (default: 5)
//! - `EMAIL_TOKEN_TTL_HOURS` - Verification link lifetime (default: 1)
//! - `OTP_TTL_MINUTES` - Password-reset code lifetime (default: 10)
//! - `PUSH_GATEWAY_KEY` - Bearer key sent with web-push deliveries
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SECRET_LENGTH: usize = 32;
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

/// API application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the API
    pub base_url: String,
    /// Token signing configuration
    pub jwt: JwtConfig,
    /// Transactional mail configuration
    pub mail: MailConfig,
    /// Web-push delivery configuration
    pub push: PushConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// JWT signing secrets and lifetimes.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub access_secret: SecretString,
    pub refresh_secret: SecretString,
    pub email_secret: SecretString,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
    /// How many times a refresh token chain may rotate before the user has
    /// to sign in again.
    pub refresh_max_uses: u32,
    pub email_ttl_hours: i64,
    pub otp_ttl_minutes: i64,
}

/// Transactional mail API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: SecretString,
    pub from_email: String,
    pub from_name: String,
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .field("from_email", &self.from_email)
            .field("from_name", &self.from_name)
            .finish()
    }
}

/// Web-push delivery configuration.
#[derive(Debug, Clone, Default)]
pub struct PushConfig {
    /// Optional bearer key attached to each delivery request.
    pub gateway_key: Option<SecretString>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_required_secret("DATABASE_URL")?;
        let host = get_env_or_default("HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("HOST".to_owned(), e.to_string()))?;
        let port = get_env_or_default("PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_owned(), e.to_string()))?;
        let base_url = get_required_env("BASE_URL")?;

        let jwt = JwtConfig::from_env()?;
        let mail = MailConfig::from_env()?;
        let push = PushConfig::from_env();
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            jwt,
            mail,
            push,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            access_secret: get_validated_secret("JWT_ACCESS_SECRET")?,
            refresh_secret: get_validated_secret("JWT_REFRESH_SECRET")?,
            email_secret: get_validated_secret("JWT_EMAIL_SECRET")?,
            access_ttl_minutes: get_numeric_or_default("ACCESS_TOKEN_TTL_MINUTES", 15)?,
            refresh_ttl_days: get_numeric_or_default("REFRESH_TOKEN_TTL_DAYS", 7)?,
            refresh_max_uses: u32::try_from(get_numeric_or_default(
                "REFRESH_TOKEN_MAX_USES",
                5,
            )?)
            .map_err(|e| {
                ConfigError::InvalidEnvVar("REFRESH_TOKEN_MAX_USES".to_owned(), e.to_string())
            })?,
            email_ttl_hours: get_numeric_or_default("EMAIL_TOKEN_TTL_HOURS", 1)?,
            otp_ttl_minutes: get_numeric_or_default("OTP_TTL_MINUTES", 10)?,
        })
    }
}

impl MailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: get_required_env("MAIL_API_URL")?,
            api_key: get_required_secret("MAIL_API_KEY")?,
            from_email: get_required_env("MAIL_FROM_EMAIL")?,
            from_name: get_env_or_default("MAIL_FROM_NAME", "Mercata"),
        })
    }
}

impl PushConfig {
    fn from_env() -> Self {
        Self {
            gateway_key: get_optional_env("PUSH_GATEWAY_KEY").map(SecretString::from),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_owned()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Get an integer environment variable with a default value.
fn get_numeric_or_default(key: &str, default: i64) -> Result<i64, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<i64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_owned(), e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Get a signing secret, rejecting placeholders and low-entropy values.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let secret = get_required_secret(key)?;
    validate_secret_value(secret.expose_secret(), key)?;
    Ok(secret)
}

/// Validate a secret's strength: length, placeholder blocklist, entropy.
fn validate_secret_value(value: &str, key: &str) -> Result<(), ConfigError> {
    if value.len() < MIN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            key.to_owned(),
            format!("must be at least {MIN_SECRET_LENGTH} characters"),
        ));
    }

    let lowered = value.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lowered.contains(**p)) {
        return Err(ConfigError::InsecureSecret(
            key.to_owned(),
            format!("looks like a placeholder (contains \"{pattern}\")"),
        ));
    }

    if shannon_entropy(value) < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            key.to_owned(),
            "entropy too low, use a randomly generated value".to_owned(),
        ));
    }

    Ok(())
}

/// Shannon entropy in bits per character.
fn shannon_entropy(value: &str) -> f64 {
    let mut frequencies: HashMap<char, usize> = HashMap::new();
    for ch in value.chars() {
        *frequencies.entry(ch).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    let len = value.chars().count() as f64;

    frequencies
        .values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_short_secret() {
        assert!(validate_secret_value("short", "KEY").is_err());
    }

    #[test]
    fn test_rejects_placeholder_secret() {
        let err = validate_secret_value(
            "your-super-long-placeholder-value-here-123",
            "KEY",
        );
        assert!(matches!(err, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_rejects_low_entropy_secret() {
        assert!(validate_secret_value(&"a".repeat(64), "KEY").is_err());
    }

    #[test]
    fn test_accepts_random_secret() {
        assert!(
            validate_secret_value("kJ8#mP2$vN9@qR5!wT3%xY7&zB4*cF6-hD1Q", "KEY").is_ok()
        );
    }

    #[test]
    fn test_entropy_ordering() {
        assert!(shannon_entropy("aaaaaaaa") < shannon_entropy("a8F!kq2Z"));
    }
}
