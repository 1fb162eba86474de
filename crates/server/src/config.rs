//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CAFE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `CAFE_HOST` - Bind address (default: 127.0.0.1)
//! - `CAFE_PORT` - Listen port (default: 8000)
//! - `ACCESS_EXPIRE_MIN` - Access token lifetime in minutes (default: 60)
//! - `REFRESH_EXPIRE_DAYS` - Refresh token lifetime in days (default: 7)
//! - `ORDER_CANCEL_GRACE_MINUTES` - Cancellation window after placement (default: 15)
//! - `CORS_ALLOWED_ORIGINS` - Comma-separated browser origins
//! - `AUTH_RATE_LIMIT` - Rate limit login and registration (default: true)
//! - `MENU_AI_API_KEY` - Enables menu parsing and review summaries when set
//! - `MENU_AI_BASE_URL` - Chat-completions API base (default: <https://api.mistral.ai/v1>)
//! - `MENU_AI_MODEL` - Model for structuring and summaries (default: mistral-small-latest)
//! - `MENU_AI_OCR_MODEL` - Model for document OCR (default: mistral-ocr-latest)
//! - `MENU_AI_TIMEOUT_SECS` - Per-request timeout (default: 20)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const MAX_ACCESS_MINUTES: i64 = 7 * 24 * 60;
const MAX_REFRESH_DAYS: i64 = 365;
const MAX_CANCEL_GRACE_MINUTES: i64 = 24 * 60;

const DEFAULT_AI_BASE_URL: &str = "https://api.mistral.ai/v1";

const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:3000,http://127.0.0.1:3000,http://localhost:5173,http://127.0.0.1:5173";

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

/// Server configuration, built once at startup and passed into `AppState`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    pub auth: AuthConfig,
    pub orders: OrderConfig,
    /// Browser origins allowed by CORS
    pub cors_origins: Vec<String>,
    /// Whether login and registration are rate limited
    pub auth_rate_limit: bool,
    /// External menu/review AI service; `None` disables those endpoints
    pub ai: Option<AiConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

/// Token signing configuration.
///
/// Implements `Debug` manually to redact the signing secret.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: SecretString,
    pub access_ttl: chrono::Duration,
    pub refresh_ttl: chrono::Duration,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// Order policy knobs.
#[derive(Debug, Clone, Copy)]
pub struct OrderConfig {
    /// How long after placement the customer may cancel
    pub cancel_grace: chrono::Duration,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            cancel_grace: chrono::Duration::minutes(15),
        }
    }
}

/// Chat-completions service used for menu parsing and review summaries.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct AiConfig {
    pub base_url: String,
    pub api_key: SecretString,
    pub model: String,
    pub ocr_model: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("ocr_model", &self.ocr_model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Where configuration values come from.
///
/// Production reads the process environment; tests pass a map so they never
/// have to mutate global state.
struct Source<F: Fn(&str) -> Option<String>>(F);

impl<F: Fn(&str) -> Option<String>> Source<F> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }

    /// Get database URL with fallback to generic `DATABASE_URL`.
    fn database_url(&self, primary_key: &str) -> Result<SecretString, ConfigError> {
        self.optional(primary_key)
            .or_else(|| self.optional("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
    }

    /// Load and validate a secret.
    fn validated_secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        let value = self.required(key)?;
        validate_secret_strength(&value, key)?;
        Ok(SecretString::from(value))
    }
}

impl ServerConfig {
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
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ServerConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Source(lookup);

        let database_url = env.database_url("CAFE_DATABASE_URL")?;
        let host = env.parsed::<IpAddr>("CAFE_HOST", IpAddr::from([127, 0, 0, 1]))?;
        let port = env.parsed::<u16>("CAFE_PORT", 8000)?;

        let jwt_secret = env.validated_secret("JWT_SECRET")?;
        validate_jwt_secret(&jwt_secret, "JWT_SECRET")?;
        let auth = AuthConfig {
            jwt_secret,
            access_ttl: bounded_duration(
                &env,
                "ACCESS_EXPIRE_MIN",
                60,
                MAX_ACCESS_MINUTES,
                chrono::Duration::try_minutes,
            )?,
            refresh_ttl: bounded_duration(
                &env,
                "REFRESH_EXPIRE_DAYS",
                7,
                MAX_REFRESH_DAYS,
                chrono::Duration::try_days,
            )?,
        };
        let orders = OrderConfig {
            cancel_grace: bounded_duration(
                &env,
                "ORDER_CANCEL_GRACE_MINUTES",
                15,
                MAX_CANCEL_GRACE_MINUTES,
                chrono::Duration::try_minutes,
            )?,
        };

        let cors_origins = env
            .or_default("CORS_ALLOWED_ORIGINS", DEFAULT_CORS_ORIGINS)
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(ToString::to_string)
            .collect();
        let auth_rate_limit = env.parsed::<bool>("AUTH_RATE_LIMIT", true)?;

        let ai = match env.optional("MENU_AI_API_KEY") {
            Some(key) => Some(AiConfig {
                base_url: ai_base_url(&env.or_default("MENU_AI_BASE_URL", DEFAULT_AI_BASE_URL))?,
                api_key: SecretString::from(key),
                model: env.or_default("MENU_AI_MODEL", "mistral-small-latest"),
                ocr_model: env.or_default("MENU_AI_OCR_MODEL", "mistral-ocr-latest"),
                timeout: Duration::from_secs(env.parsed::<u64>("MENU_AI_TIMEOUT_SECS", 20)?),
            }),
            None => None,
        };

        Ok(Self {
            database_url,
            host,
            port,
            auth,
            orders,
            cors_origins,
            auth_rate_limit,
            ai,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// The AI base URL must be absolute http(s); the trailing slash is dropped.
fn ai_base_url(raw: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEnvVar("MENU_AI_BASE_URL".to_string(), reason);
    let parsed = url::Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", parsed.scheme())));
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

/// A duration setting in `1..=max` units, built with `unit`.
fn bounded_duration<F: Fn(&str) -> Option<String>>(
    env: &Source<F>,
    key: &str,
    default: i64,
    max: i64,
    unit: fn(i64) -> Option<chrono::Duration>,
) -> Result<chrono::Duration, ConfigError> {
    let value = env.parsed::<i64>(key, default)?;
    if !(1..=max).contains(&value) {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be between 1 and {max}"),
        ));
    }
    unit(value).ok_or_else(|| ConfigError::InvalidEnvVar(key.to_string(), "out of range".to_string()))
}

/// Validate that the signing secret meets minimum length requirements.
fn validate_jwt_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
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
    let len = s.chars().count() as f64;
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

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
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

    const STRONG_SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%";

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("CAFE_DATABASE_URL", "postgres://localhost/cafe"),
            ("JWT_SECRET", STRONG_SECRET),
        ]
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&minimal())).unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8000");
        assert_eq!(config.auth.access_ttl, chrono::Duration::minutes(60));
        assert_eq!(config.auth.refresh_ttl, chrono::Duration::days(7));
        assert_eq!(config.orders.cancel_grace, chrono::Duration::minutes(15));
        assert_eq!(config.cors_origins.len(), 4);
        assert!(config.auth_rate_limit);
        assert!(config.ai.is_none());
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_database_url_fallback() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://fallback/cafe"),
            ("JWT_SECRET", STRONG_SECRET),
        ]))
        .unwrap();
        assert_eq!(
            config.database_url.expose_secret(),
            "postgres://fallback/cafe"
        );
    }

    #[test]
    fn test_missing_jwt_secret() {
        let err = ServerConfig::from_lookup(lookup(&[("CAFE_DATABASE_URL", "postgres://x/y")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "JWT_SECRET"));
    }

    #[test]
    fn test_invalid_port() {
        let mut pairs = minimal();
        pairs.push(("CAFE_PORT", "eighty"));
        let err = ServerConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "CAFE_PORT"));
    }

    #[test]
    fn test_zero_token_lifetime_rejected() {
        let mut pairs = minimal();
        pairs.push(("ACCESS_EXPIRE_MIN", "0"));
        assert!(ServerConfig::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn test_cancel_grace_bounds() {
        for bad in ["-5", "0", "1441", "9223372036854775807"] {
            let mut pairs = minimal();
            pairs.push(("ORDER_CANCEL_GRACE_MINUTES", bad));
            let err = ServerConfig::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(
                matches!(&err, ConfigError::InvalidEnvVar(key, _) if key == "ORDER_CANCEL_GRACE_MINUTES"),
                "{bad} accepted"
            );
        }

        let mut pairs = minimal();
        pairs.push(("ORDER_CANCEL_GRACE_MINUTES", "30"));
        let config = ServerConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.orders.cancel_grace, chrono::Duration::minutes(30));
    }

    #[test]
    fn test_huge_token_lifetime_rejected() {
        let mut pairs = minimal();
        pairs.push(("REFRESH_EXPIRE_DAYS", "9223372036854775807"));
        let err = ServerConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "REFRESH_EXPIRE_DAYS"));
    }

    #[test]
    fn test_ai_enabled_by_api_key() {
        let mut pairs = minimal();
        pairs.push(("MENU_AI_API_KEY", "k-123"));
        pairs.push(("MENU_AI_BASE_URL", "http://localhost:9999/v1/"));
        pairs.push(("MENU_AI_TIMEOUT_SECS", "5"));
        let ai = ServerConfig::from_lookup(lookup(&pairs)).unwrap().ai.unwrap();

        assert_eq!(ai.base_url, "http://localhost:9999/v1");
        assert_eq!(ai.timeout, Duration::from_secs(5));
        assert_eq!(ai.model, "mistral-small-latest");
    }

    #[test]
    fn test_cors_origins_parsed() {
        let mut pairs = minimal();
        pairs.push(("CORS_ALLOWED_ORIGINS", " https://a.test , ,https://b.test"));
        let config = ServerConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.cors_origins, ["https://a.test", "https://b.test"]);
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy(STRONG_SECRET) > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-jwt-key-here-please-0123456789", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
        assert!(validate_secret_strength("changeme123", "TEST_VAR").is_err());
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_jwt_secret_too_short() {
        let mut pairs = minimal();
        pairs.retain(|(k, _)| *k != "JWT_SECRET");
        pairs.push(("JWT_SECRET", "aB3$xY9!mK2@"));
        let err = ServerConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut pairs = minimal();
        pairs.push(("MENU_AI_API_KEY", "k-super-private-value"));
        let config = ServerConfig::from_lookup(lookup(&pairs)).unwrap();

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains(STRONG_SECRET));
        assert!(!debug_output.contains("k-super-private-value"));
    }

    #[test]
    fn test_ai_base_url_must_be_http() {
        let mut pairs = minimal();
        pairs.push(("MENU_AI_API_KEY", "k-123"));
        pairs.push(("MENU_AI_BASE_URL", "ftp://models.internal/v1"));
        let err = ServerConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "MENU_AI_BASE_URL"));
    }
}
