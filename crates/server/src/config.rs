//! Registry server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `REGISTRY_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `ADMIN_CODE` - Shared secret expected in the `x-admin-code` header
//!
//! ## Email (one provider required)
//! - `RESEND_API_KEY` - Resend API key (preferred when set)
//! - `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD` - SMTP relay credentials
//! - `SMTP_PORT` - SMTP port (default: 587)
//!
//! ## Optional
//! - `REGISTRY_HOST` - Bind address (default: 127.0.0.1)
//! - `REGISTRY_PORT` - Listen port (default: 3000)
//! - `REGISTRY_NAME` - Display name used in pages and emails (default: Baby in Need)
//! - `NOTIFY_FROM` - Sender mailbox (default: `Baby in Need <onboarding@resend.dev>`)
//! - `RECIPIENTS_TO` - Comma-separated fallback owner recipients
//! - `CLAIM_RATE_LIMIT` - Set to `off` to disable claim rate limiting
//! - `TRUST_PROXY_HEADERS` - Set to `true` behind a proxy that sets
//!   `CF-Connecting-IP`/`X-Forwarded-For`; otherwise the peer address is used
//! - `LOG_FORMAT` - `pretty` (default) or `json`
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use gift_registry_core::RecipientList;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_ADMIN_CODE_LENGTH: usize = 8;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_REGISTRY_NAME: &str = "Baby in Need";
const DEFAULT_FROM_ADDRESS: &str = "Baby in Need <onboarding@resend.dev>";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
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
    #[error("No email provider configured: set RESEND_API_KEY or SMTP_HOST")]
    MissingEmailProvider,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Registry server configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Shared secret gating the admin API
    pub admin_code: SecretString,
    /// Display name used in page titles and email copy
    pub registry_name: String,
    /// Outbound email configuration
    pub email: EmailConfig,
    /// Whether `POST /claim` is rate limited per client IP
    pub claim_rate_limit: bool,
    /// Whether client IP headers from a reverse proxy are trusted
    pub trust_proxy_headers: bool,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// Outbound email configuration.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// Sender mailbox, e.g. `Registry <noreply@example.org>`
    pub from_address: String,
    /// Owner recipients used when none are configured in the store
    pub fallback_recipients: RecipientList,
    /// Which provider delivers mail
    pub provider: EmailProvider,
}

/// Transactional email provider.
#[derive(Debug, Clone)]
pub enum EmailProvider {
    /// Resend HTTP API.
    Resend { api_key: SecretString },
    /// SMTP relay with STARTTLS.
    Smtp(SmtpConfig),
}

/// SMTP relay settings.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl RegistryConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("REGISTRY_DATABASE_URL")?;
        let host = get_env_or_default("REGISTRY_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("REGISTRY_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("REGISTRY_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("REGISTRY_PORT".to_string(), e.to_string()))?;
        let admin_code = SecretString::from(get_required_env("ADMIN_CODE")?);
        validate_admin_code(&admin_code, "ADMIN_CODE")?;

        let registry_name = get_env_or_default("REGISTRY_NAME", DEFAULT_REGISTRY_NAME);
        let email = EmailConfig::from_env()?;
        let claim_rate_limit = !get_optional_env("CLAIM_RATE_LIMIT")
            .is_some_and(|v| matches!(v.to_lowercase().as_str(), "off" | "false" | "0"));
        let trust_proxy_headers = get_optional_env("TRUST_PROXY_HEADERS")
            .is_some_and(|v| matches!(v.to_lowercase().as_str(), "on" | "true" | "1"));
        let log_format = parse_log_format(get_optional_env("LOG_FORMAT").as_deref())?;

        Ok(Self {
            database_url,
            host,
            port,
            admin_code,
            registry_name,
            email,
            claim_rate_limit,
            trust_proxy_headers,
            log_format,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl EmailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let provider = if get_optional_env("RESEND_API_KEY").is_some() {
            EmailProvider::Resend {
                api_key: get_validated_secret("RESEND_API_KEY")?,
            }
        } else if let Some(host) = get_optional_env("SMTP_HOST") {
            let port = get_env_or_default("SMTP_PORT", "587")
                .parse::<u16>()
                .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?;
            EmailProvider::Smtp(SmtpConfig {
                host,
                port,
                username: get_required_env("SMTP_USERNAME")?,
                password: SecretString::from(get_required_env("SMTP_PASSWORD")?),
            })
        } else {
            return Err(ConfigError::MissingEmailProvider);
        };

        Ok(Self {
            from_address: get_env_or_default("NOTIFY_FROM", DEFAULT_FROM_ADDRESS),
            fallback_recipients: RecipientList::parse(
                &get_optional_env("RECIPIENTS_TO").unwrap_or_default(),
            ),
            provider,
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

/// Get an optional environment variable. Blank values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_log_format(value: Option<&str>) -> Result<LogFormat, ConfigError> {
    match value.map(str::to_lowercase).as_deref() {
        None | Some("pretty") => Ok(LogFormat::Pretty),
        Some("json") => Ok(LogFormat::Json),
        Some(other) => Err(ConfigError::InvalidEnvVar(
            "LOG_FORMAT".to_string(),
            format!("expected 'pretty' or 'json', got '{other}'"),
        )),
    }
}

/// Validate the admin shared secret.
///
/// The code is typed by people, so only length and placeholder checks apply.
fn validate_admin_code(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.trim().len() < MIN_ADMIN_CODE_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_ADMIN_CODE_LENGTH,
                value.trim().len()
            ),
        ));
    }
    check_placeholder(value, var_name)
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

fn check_placeholder(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }
    Ok(())
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    check_placeholder(secret, var_name)?;

    // Real API keys have high entropy
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the provider."
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
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("re_aB3xY9mK2nL5pQ7rT0uW4zC6dE8fG1", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_admin_code_too_short() {
        let result = validate_admin_code(&SecretString::from("baby"), "ADMIN_CODE");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_admin_code_placeholder() {
        let result = validate_admin_code(&SecretString::from("changeme-please"), "ADMIN_CODE");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_admin_code_human_code_ok() {
        // Low entropy is acceptable for a typed shared code.
        let result = validate_admin_code(&SecretString::from("baby2025"), "ADMIN_CODE");
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_log_format() {
        assert_eq!(parse_log_format(None).unwrap(), LogFormat::Pretty);
        assert_eq!(parse_log_format(Some("JSON")).unwrap(), LogFormat::Json);
        assert!(parse_log_format(Some("xml")).is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = RegistryConfig {
            database_url: SecretString::from("postgres://localhost/registry"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            admin_code: SecretString::from("baby2025"),
            registry_name: DEFAULT_REGISTRY_NAME.to_string(),
            email: EmailConfig {
                from_address: DEFAULT_FROM_ADDRESS.to_string(),
                fallback_recipients: RecipientList::default(),
                provider: EmailProvider::Resend {
                    api_key: SecretString::from("re_test"),
                },
            },
            claim_rate_limit: true,
            trust_proxy_headers: false,
            log_format: LogFormat::Pretty,
            sentry_dsn: None,
            sentry_environment: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_smtp_config_debug_redacts_password() {
        let config = SmtpConfig {
            host: "smtp.mail.ch".to_string(),
            port: 587,
            username: "registry".to_string(),
            password: SecretString::from("super_secret_smtp_password"),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("smtp.mail.ch"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_smtp_password"));
    }
}
