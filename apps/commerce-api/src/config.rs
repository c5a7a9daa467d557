//! Commerce API configuration module.
//!
//! Configuration is layered: built-in defaults, then an optional TOML file
//! (`commerce.toml`, or the path in `BOUTIQUE_CONFIG`), then environment
//! variables prefixed with `BOUTIQUE__`. Nested keys use `__` as well:
//!
//! ```text
//! BOUTIQUE__HTTP_PORT=9000
//! BOUTIQUE__REDIS_URL=redis://127.0.0.1/
//! BOUTIQUE__PAYMENT__API_KEY=sk_test_...
//! BOUTIQUE__CREDIT_POLICY=allow_goodwill
//! ```

use std::env;
use std::time::Duration;

use boutique_core::credit_note::CreditPolicy;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

/// File read when `BOUTIQUE_CONFIG` is not set.
pub const DEFAULT_CONFIG_FILE: &str = "commerce.toml";

const ENV_PREFIX: &str = "BOUTIQUE";

/// Commerce API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CommerceConfig {
    /// HTTP listen port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// SQLite database file, or `:memory:`
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Redis connection string. Without it carts live in process memory.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Cart lifetime in the cart store, refreshed on every write
    #[serde(default = "default_cart_ttl_secs")]
    pub cart_ttl_secs: u64,

    /// Compare-and-set attempts before a cart update reports a conflict
    #[serde(default = "default_cart_update_retries")]
    pub cart_update_retries: u32,

    /// Whether credit notes may exceed the ordered quantities
    #[serde(default)]
    pub credit_policy: CreditPolicy,

    #[serde(default)]
    pub payment: PaymentConfig,

    #[serde(default)]
    pub email: EmailConfig,
}

/// Hosted payment page settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    #[serde(default = "default_payment_base_url")]
    pub base_url: String,

    /// Secret key sent as a bearer token
    #[serde(default)]
    pub api_key: Option<String>,

    /// Where the processor sends the customer after paying
    #[serde(default = "default_success_url")]
    pub success_url: String,

    #[serde(default = "default_cancel_url")]
    pub cancel_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Transactional email service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "default_email_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_from_address")]
    pub from_address: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_http_port() -> u16 {
    8080
}

fn default_database_path() -> String {
    "./boutique.db".to_string()
}

fn default_cart_ttl_secs() -> u64 {
    boutique_core::CART_TTL_SECS
}

fn default_cart_update_retries() -> u32 {
    5
}

fn default_payment_base_url() -> String {
    "http://localhost:12111".to_string()
}

fn default_success_url() -> String {
    "http://localhost:3000/checkout/success".to_string()
}

fn default_cancel_url() -> String {
    "http://localhost:3000/cart".to_string()
}

fn default_email_base_url() -> String {
    "http://localhost:8025".to_string()
}

fn default_from_address() -> String {
    "orders@boutique.local".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for PaymentConfig {
    fn default() -> Self {
        PaymentConfig {
            base_url: default_payment_base_url(),
            api_key: None,
            success_url: default_success_url(),
            cancel_url: default_cancel_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        EmailConfig {
            base_url: default_email_base_url(),
            api_key: None,
            from_address: default_from_address(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for CommerceConfig {
    fn default() -> Self {
        CommerceConfig {
            http_port: default_http_port(),
            database_path: default_database_path(),
            redis_url: None,
            cart_ttl_secs: default_cart_ttl_secs(),
            cart_update_retries: default_cart_update_retries(),
            credit_policy: CreditPolicy::default(),
            payment: PaymentConfig::default(),
            email: EmailConfig::default(),
        }
    }
}

impl CommerceConfig {
    /// Load configuration from the config file and environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("BOUTIQUE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let settings = Config::builder()
            .add_source(File::with_name(&path).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: CommerceConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text alone.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config: CommerceConfig = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn cart_ttl(&self) -> Duration {
        Duration::from_secs(self.cart_ttl_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.http_port == 0 {
            return Err(ConfigError::InvalidValue {
                key: "http_port",
                reason: "must be non-zero".to_string(),
            });
        }

        if self.database_path.trim().is_empty() {
            return Err(ConfigError::MissingRequired("database_path"));
        }

        if self.cart_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "cart_ttl_secs",
                reason: "must be at least 1 second".to_string(),
            });
        }

        if self.cart_update_retries == 0 {
            return Err(ConfigError::InvalidValue {
                key: "cart_update_retries",
                reason: "must be at least 1".to_string(),
            });
        }

        if let Some(url) = &self.redis_url {
            if !url.starts_with("redis://") && !url.starts_with("rediss://") {
                return Err(ConfigError::InvalidValue {
                    key: "redis_url",
                    reason: format!("expected a redis:// URL, got '{}'", url),
                });
            }
        }

        check_http_url("payment.base_url", &self.payment.base_url)?;
        check_http_url("payment.success_url", &self.payment.success_url)?;
        check_http_url("payment.cancel_url", &self.payment.cancel_url)?;
        check_http_url("email.base_url", &self.email.base_url)?;

        if !self.email.from_address.contains('@') {
            return Err(ConfigError::InvalidValue {
                key: "email.from_address",
                reason: "must be an email address".to_string(),
            });
        }

        Ok(())
    }
}

fn check_http_url(key: &'static str, url: &str) -> Result<(), ConfigError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key,
            reason: format!("expected an http(s) URL, got '{}'", url),
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = CommerceConfig::from_toml("").unwrap();

        assert_eq!(config.http_port, 8080);
        assert_eq!(config.cart_ttl_secs, 86_400);
        assert_eq!(config.cart_update_retries, 5);
        assert_eq!(config.credit_policy, CreditPolicy::Strict);
        assert!(config.redis_url.is_none());
    }

    #[test]
    fn test_nested_sections() {
        let config = CommerceConfig::from_toml(
            r#"
            http_port = 9000
            credit_policy = "allow_goodwill"

            [payment]
            base_url = "https://pay.example.com"
            api_key = "sk_test_123"
            "#,
        )
        .unwrap();

        assert_eq!(config.http_port, 9000);
        assert_eq!(config.credit_policy, CreditPolicy::AllowGoodwill);
        assert_eq!(config.payment.base_url, "https://pay.example.com");
        assert_eq!(config.payment.api_key.as_deref(), Some("sk_test_123"));
        assert_eq!(config.email.base_url, "http://localhost:8025");
    }

    #[test]
    fn test_unknown_credit_policy_rejected() {
        let result = CommerceConfig::from_toml(r#"credit_policy = "generous""#);
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_zero_retries_rejected() {
        let result = CommerceConfig::from_toml("cart_update_retries = 0");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key: "cart_update_retries", .. })
        ));
    }

    #[test]
    fn test_bad_redis_url_rejected() {
        let result = CommerceConfig::from_toml(r#"redis_url = "localhost:6379""#);
        assert!(matches!(result, Err(ConfigError::InvalidValue { key: "redis_url", .. })));
    }
}
