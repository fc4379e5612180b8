//! Application configuration
//!
//! Typed configuration loaded from environment variables with the `config`
//! and `dotenvy` crates. Variables use the `ACADEMY_PAYMENTS` prefix and a
//! double underscore between nesting levels.
//!
//! # Example
//!
//! ```no_run
//! use academy_payments::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod auth;
mod database;
mod error;
mod payment;
mod server;

pub use auth::{AuthConfig, MIN_PRODUCTION_SECRET_LEN};
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::{GatewayCredentials, PaymentConfig};
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "ACADEMY_PAYMENTS";

/// Root configuration of the payment service.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    pub database: DatabaseConfig,

    /// Access token validation
    #[serde(default)]
    pub auth: AuthConfig,

    /// Paymob gateway; payments are disabled when credentials are absent
    #[serde(default)]
    pub payment: PaymentConfig,
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// A `.env` file is read first when present.
    ///
    /// - `ACADEMY_PAYMENTS__SERVER__PORT=8080` -> `server.port`
    /// - `ACADEMY_PAYMENTS__PAYMENT__HMAC_SECRET=...` -> `payment.hmac_secret`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a required value is missing or a value
    /// cannot be parsed into its field type.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Semantic validation of every section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.auth.validate(self.server.environment)?;
        self.payment.validate(self.server.environment)?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Environment variables are process-global.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const MINIMAL: &[(&str, &str)] = &[
        (
            "ACADEMY_PAYMENTS__DATABASE__URL",
            "postgresql://academy@localhost/payments",
        ),
        ("ACADEMY_PAYMENTS__AUTH__JWT_SECRET", "dev-secret"),
        ("ACADEMY_PAYMENTS__AUTH__JWT_ISSUER", "https://id.academy.example.com"),
        ("ACADEMY_PAYMENTS__AUTH__JWT_AUDIENCE", "academy-api"),
    ];

    const GATEWAY: &[(&str, &str)] = &[
        ("ACADEMY_PAYMENTS__PAYMENT__API_KEY", "paymob-key"),
        ("ACADEMY_PAYMENTS__PAYMENT__INTEGRATION_ID", "4512345"),
        ("ACADEMY_PAYMENTS__PAYMENT__IFRAME_ID", "812345"),
        ("ACADEMY_PAYMENTS__PAYMENT__HMAC_SECRET", "callback-secret"),
    ];

    const EXTRA: &[&str] = &[
        "ACADEMY_PAYMENTS__SERVER__PORT",
        "ACADEMY_PAYMENTS__SERVER__ENVIRONMENT",
        "ACADEMY_PAYMENTS__PAYMENT__DEFAULT_CURRENCY",
    ];

    fn set(vars: &[(&str, &str)]) {
        for (key, value) in vars {
            env::set_var(key, value);
        }
    }

    fn clear_env() {
        for (key, _) in MINIMAL.iter().chain(GATEWAY) {
            env::remove_var(key);
        }
        for key in EXTRA {
            env::remove_var(key);
        }
    }

    fn load_with(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        set(MINIMAL);
        set(vars);
        let result = AppConfig::load();
        clear_env();
        result
    }

    #[test]
    fn loads_minimal_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[]).unwrap();

        assert_eq!(config.database.url, "postgresql://academy@localhost/payments");
        assert_eq!(config.auth.jwt_audience, "academy-api");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn payments_disabled_without_gateway_credentials() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[]).unwrap();

        assert!(!config.payment.is_configured());
        assert_eq!(config.payment.default_currency, "EGP");
    }

    #[test]
    fn gateway_credentials_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(GATEWAY).unwrap();

        assert!(config.payment.is_configured());
        assert_eq!(config.payment.integration_id, Some(4_512_345));
        assert_eq!(config.payment.iframe_id.as_deref(), Some("812345"));
    }

    #[test]
    fn server_overrides_apply() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[
            ("ACADEMY_PAYMENTS__SERVER__PORT", "3000"),
            ("ACADEMY_PAYMENTS__SERVER__ENVIRONMENT", "production"),
        ])
        .unwrap();

        assert_eq!(config.server.port, 3000);
        assert!(config.is_production());
        // dev-secret is too short for production
        assert!(matches!(
            config.validate(),
            Err(ValidationError::WeakJwtSecret(_))
        ));
    }

    #[test]
    fn bad_default_currency_fails_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[("ACADEMY_PAYMENTS__PAYMENT__DEFAULT_CURRENCY", "EURO")]).unwrap();

        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidCurrency(_))
        ));
    }
}
