//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `VITRINA_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `VITRINA_BASE_URL` - Public URL of the shop (used in feeds and sitemap)
//! - `VITRINA_SESSION_SECRET` - Session secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `VITRINA_HOST` - Bind address (default: 127.0.0.1)
//! - `VITRINA_PORT` - Listen port (default: 3000)
//! - `APP_ENV` - `development` (default) or `production`
//! - `UPLOAD_DIR_DEV` - Upload directory in development (default: ./uploads)
//! - `UPLOAD_DIR_PROD` - Upload directory in production (default: /var/www/vitrina/uploads)
//! - `UPLOAD_PUBLIC_PREFIX` - URL prefix uploaded files are served under (default: /uploads)
//! - `YOOKASSA_SHOP_ID`, `YOOKASSA_SECRET_KEY` - Payment gateway credentials
//! - `YOOKASSA_RETURN_URL` - Where the gateway sends the buyer back (default: `<base>/checkout/complete`)
//! - `SMS_RU_API_ID`, `SMS_SENDER` - SMS gateway credentials
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM` - Email delivery
//! - `FEED_SHOP_NAME`, `FEED_COMPANY` - Shop identity in the YML feed
//! - `FEED_CACHE_TTL_SECS` - Feed and sitemap cache lifetime (default: 3600)
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT` - Sentry error tracking
//!
//! Missing gateway credentials are not fatal: SMS and email fall back to
//! logging the verification code, online checkout reports the gateway as
//! unavailable.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Largest accepted upload (15 MiB).
pub const MAX_UPLOAD_BYTES: usize = 15 * 1024 * 1024;

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

/// Deployment environment, selects the upload directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppEnv {
    #[default]
    Development,
    Production,
}

impl std::str::FromStr for AppEnv {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("expected development or production, got {other:?}")),
        }
    }
}

/// Shop server configuration.
#[derive(Debug, Clone)]
pub struct VitrinaConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, without trailing slash
    pub base_url: String,
    /// Session secret
    pub session_secret: SecretString,
    /// Deployment environment
    pub app_env: AppEnv,
    /// Image upload storage
    pub uploads: UploadConfig,
    /// `YooKassa` payment gateway, if configured
    pub yookassa: Option<YooKassaConfig>,
    /// SMS gateway, if configured
    pub sms: Option<SmsConfig>,
    /// SMTP delivery, if configured
    pub email: Option<EmailConfig>,
    /// Yandex YML feed and sitemap settings
    pub feed: FeedConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// Where uploaded images go and how they are served.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Directory used when `APP_ENV=development`
    pub dev_dir: PathBuf,
    /// Directory used when `APP_ENV=production`
    pub prod_dir: PathBuf,
    /// URL prefix files are served under, without trailing slash
    pub public_prefix: String,
    /// Size limit in bytes
    pub max_bytes: usize,
}

impl UploadConfig {
    /// The storage directory for the given environment.
    #[must_use]
    pub fn dir_for(&self, env: AppEnv) -> &PathBuf {
        match env {
            AppEnv::Development => &self.dev_dir,
            AppEnv::Production => &self.prod_dir,
        }
    }
}

/// `YooKassa` credentials.
///
/// Implements `Debug` manually to redact the secret key.
#[derive(Clone)]
pub struct YooKassaConfig {
    /// Shop ID from the `YooKassa` dashboard
    pub shop_id: String,
    /// API secret key
    pub secret_key: SecretString,
    /// Return URL after the hosted payment page
    pub return_url: String,
    /// API base, overridable for tests
    pub api_base: String,
}

impl std::fmt::Debug for YooKassaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YooKassaConfig")
            .field("shop_id", &self.shop_id)
            .field("secret_key", &"[REDACTED]")
            .field("return_url", &self.return_url)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// sms.ru credentials.
#[derive(Clone)]
pub struct SmsConfig {
    /// API ID from the sms.ru dashboard
    pub api_id: SecretString,
    /// Registered sender name, if any
    pub sender: Option<String>,
}

impl std::fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsConfig")
            .field("api_id", &"[REDACTED]")
            .field("sender", &self.sender)
            .finish()
    }
}

/// SMTP settings for verification emails.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Yandex YML feed settings.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Short shop name (`<name>`)
    pub shop_name: String,
    /// Legal company name (`<company>`)
    pub company: String,
    /// How long the rendered feed and sitemap stay cached
    pub cache_ttl: Duration,
}

impl VitrinaConfig {
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

        let database_url = get_database_url("VITRINA_DATABASE_URL")?;
        let host = parse_env("VITRINA_HOST", "127.0.0.1")?;
        let port = parse_env("VITRINA_PORT", "3000")?;
        let base_url = get_required_env("VITRINA_BASE_URL")?
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("VITRINA_BASE_URL".to_string(), e.to_string()))?;
        let session_secret = get_validated_secret("VITRINA_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "VITRINA_SESSION_SECRET")?;
        let app_env = get_env_or_default("APP_ENV", "development")
            .parse::<AppEnv>()
            .map_err(|e| ConfigError::InvalidEnvVar("APP_ENV".to_string(), e))?;

        let uploads = UploadConfig::from_env();
        let yookassa = YooKassaConfig::from_env(&base_url)?;
        let sms = SmsConfig::from_env();
        let email = EmailConfig::from_env()?;
        let feed = FeedConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            app_env,
            uploads,
            yookassa,
            sms,
            email,
            feed,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Upload directory for the current environment.
    #[must_use]
    pub fn upload_dir(&self) -> &PathBuf {
        self.uploads.dir_for(self.app_env)
    }
}

impl UploadConfig {
    fn from_env() -> Self {
        Self {
            dev_dir: PathBuf::from(get_env_or_default("UPLOAD_DIR_DEV", "./uploads")),
            prod_dir: PathBuf::from(get_env_or_default(
                "UPLOAD_DIR_PROD",
                "/var/www/vitrina/uploads",
            )),
            public_prefix: get_env_or_default("UPLOAD_PUBLIC_PREFIX", "/uploads")
                .trim_end_matches('/')
                .to_string(),
            max_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

impl YooKassaConfig {
    fn from_env(base_url: &str) -> Result<Option<Self>, ConfigError> {
        let Some(shop_id) = get_optional_env("YOOKASSA_SHOP_ID") else {
            return Ok(None);
        };
        Ok(Some(Self {
            shop_id,
            secret_key: get_validated_secret("YOOKASSA_SECRET_KEY")?,
            return_url: get_optional_env("YOOKASSA_RETURN_URL")
                .unwrap_or_else(|| format!("{base_url}/checkout/complete")),
            api_base: get_env_or_default("YOOKASSA_API_BASE", "https://api.yookassa.ru/v3"),
        }))
    }
}

impl SmsConfig {
    fn from_env() -> Option<Self> {
        get_optional_env("SMS_RU_API_ID").map(|api_id| Self {
            api_id: SecretString::from(api_id),
            sender: get_optional_env("SMS_SENDER"),
        })
    }
}

impl EmailConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };
        Ok(Some(Self {
            smtp_host,
            smtp_port: parse_env("SMTP_PORT", "587")?,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("SMTP_FROM")?,
        }))
    }
}

impl FeedConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let ttl_secs: u64 = parse_env("FEED_CACHE_TTL_SECS", "3600")?;
        Ok(Self {
            shop_name: get_env_or_default("FEED_SHOP_NAME", "Vitrina"),
            company: get_env_or_default("FEED_COMPANY", "Vitrina"),
            cache_ttl: Duration::from_secs(ttl_secs),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating empty as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
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
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
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

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Config fixtures shared by unit tests in this crate.

    use super::*;

    /// A configuration that needs no environment and no gateways.
    #[must_use]
    pub fn test_config(upload_dir: PathBuf) -> VitrinaConfig {
        VitrinaConfig {
            database_url: SecretString::from("postgres://localhost/vitrina_test"),
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: "https://shop.test".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            app_env: AppEnv::Development,
            uploads: UploadConfig {
                dev_dir: upload_dir.clone(),
                prod_dir: upload_dir,
                public_prefix: "/uploads".to_string(),
                max_bytes: MAX_UPLOAD_BYTES,
            },
            yookassa: None,
            sms: None,
            email: None,
            feed: FeedConfig {
                shop_name: "Vitrina".to_string(),
                company: "OOO Vitrina".to_string(),
                cache_ttl: Duration::from_secs(60),
            },
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-shop-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_err());
    }

    #[test]
    fn test_app_env_parse() {
        assert_eq!("production".parse::<AppEnv>().unwrap(), AppEnv::Production);
        assert_eq!("DEV".parse::<AppEnv>().unwrap(), AppEnv::Development);
        assert!("staging".parse::<AppEnv>().is_err());
    }

    #[test]
    fn test_upload_dir_follows_environment() {
        let uploads = UploadConfig {
            dev_dir: PathBuf::from("/tmp/dev"),
            prod_dir: PathBuf::from("/srv/prod"),
            public_prefix: "/uploads".to_string(),
            max_bytes: MAX_UPLOAD_BYTES,
        };
        assert_eq!(uploads.dir_for(AppEnv::Development), &PathBuf::from("/tmp/dev"));
        assert_eq!(uploads.dir_for(AppEnv::Production), &PathBuf::from("/srv/prod"));
    }

    #[test]
    fn test_socket_addr() {
        let config = test_support::test_config(PathBuf::from("/tmp"));
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_yookassa_debug_redacts_secret() {
        let config = YooKassaConfig {
            shop_id: "123456".to_string(),
            secret_key: SecretString::from("live_super_secret_value"),
            return_url: "https://shop.test/checkout/complete".to_string(),
            api_base: "https://api.yookassa.ru/v3".to_string(),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("123456"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("live_super_secret_value"));
    }
}
