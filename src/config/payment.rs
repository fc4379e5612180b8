//! Payment gateway configuration
//!
//! Gateway credentials are optional at load time. When any of them is
//! missing the service still starts, and the payment endpoints answer
//! `503 PAYMENTS_UNAVAILABLE`.

use secrecy::SecretString;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use crate::adapters::paymob::{PaymobConfig, DEFAULT_API_BASE_URL, DEFAULT_IFRAME_BASE_URL};
use crate::application::{PaymentSettings, RetryPolicy};
use crate::domain::foundation::CurrencyCode;

use super::error::ValidationError;
use super::server::Environment;

/// Gateway credentials, present only when fully configured.
#[derive(Clone, Debug)]
pub struct GatewayCredentials {
    pub gateway: PaymobConfig,
    pub hmac_secret: SecretString,
}

/// Paymob Accept configuration
#[derive(Clone, Deserialize)]
pub struct PaymentConfig {
    /// Merchant API key used for the authentication step
    pub api_key: Option<String>,

    /// Card integration the payment keys are issued for
    pub integration_id: Option<u64>,

    /// Hosted checkout iframe
    pub iframe_id: Option<String>,

    /// Callback signing secret
    pub hmac_secret: Option<String>,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_iframe_base_url")]
    pub iframe_base_url: String,

    /// ISO 4217 currency applied when the client sends none
    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// Per-request timeout for gateway calls, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_payment_key_expiry")]
    pub payment_key_expiry_secs: u64,

    /// Attempts for retryable handshake and lookup calls
    #[serde(default = "default_handshake_attempts")]
    pub handshake_max_attempts: u32,

    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,

    /// Reject start requests whose amount disagrees with the plan catalog
    #[serde(default)]
    pub enforce_catalog_pricing: bool,
}

impl PaymentConfig {
    /// True when every credential the gateway needs is present.
    pub fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }

    /// Assemble gateway credentials, naming the first missing setting.
    pub fn credentials(&self) -> Result<GatewayCredentials, ValidationError> {
        let api_key = non_empty(&self.api_key).ok_or(ValidationError::MissingRequired(
            "PAYMENT__API_KEY",
        ))?;
        let integration_id = self
            .integration_id
            .ok_or(ValidationError::MissingRequired("PAYMENT__INTEGRATION_ID"))?;
        let iframe_id = non_empty(&self.iframe_id).ok_or(ValidationError::MissingRequired(
            "PAYMENT__IFRAME_ID",
        ))?;
        let hmac_secret = non_empty(&self.hmac_secret).ok_or(ValidationError::MissingRequired(
            "PAYMENT__HMAC_SECRET",
        ))?;

        let gateway = PaymobConfig::new(SecretString::new(api_key), integration_id, iframe_id)
            .with_base_url(self.api_base_url.as_str())
            .with_iframe_base_url(self.iframe_base_url.as_str())
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs));

        Ok(GatewayCredentials {
            gateway,
            hmac_secret: SecretString::new(hmac_secret),
        })
    }

    /// Application-level payment settings.
    pub fn settings(&self) -> Result<PaymentSettings, ValidationError> {
        let currency = CurrencyCode::new(&self.default_currency)
            .map_err(|_| ValidationError::InvalidCurrency(self.default_currency.clone()))?;

        Ok(PaymentSettings::new(currency)
            .with_payment_key_expiry(self.payment_key_expiry_secs)
            .with_catalog_enforcement(self.enforce_catalog_pricing)
            .with_retry(RetryPolicy::new(
                self.handshake_max_attempts,
                Duration::from_millis(self.retry_backoff_ms),
            )))
    }

    pub fn validate(&self, environment: Environment) -> Result<(), ValidationError> {
        self.settings()?;
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 60 {
            return Err(ValidationError::InvalidTimeout);
        }
        if !(1..=5).contains(&self.handshake_max_attempts) {
            return Err(ValidationError::InvalidRetryAttempts);
        }
        if self.payment_key_expiry_secs == 0 {
            return Err(ValidationError::InvalidPaymentKeyExpiry);
        }
        if environment == Environment::Production {
            if !self.api_base_url.starts_with("https://") {
                return Err(ValidationError::GatewayUrlMustBeHttps("PAYMENT__API_BASE_URL"));
            }
            if !self.iframe_base_url.starts_with("https://") {
                return Err(ValidationError::GatewayUrlMustBeHttps(
                    "PAYMENT__IFRAME_BASE_URL",
                ));
            }
        }
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            integration_id: None,
            iframe_id: None,
            hmac_secret: None,
            api_base_url: default_api_base_url(),
            iframe_base_url: default_iframe_base_url(),
            default_currency: default_currency(),
            request_timeout_secs: default_request_timeout(),
            payment_key_expiry_secs: default_payment_key_expiry(),
            handshake_max_attempts: default_handshake_attempts(),
            retry_backoff_ms: default_retry_backoff(),
            enforce_catalog_pricing: false,
        }
    }
}

impl fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("integration_id", &self.integration_id)
            .field("iframe_id", &self.iframe_id)
            .field("hmac_secret", &self.hmac_secret.as_ref().map(|_| "[REDACTED]"))
            .field("api_base_url", &self.api_base_url)
            .field("iframe_base_url", &self.iframe_base_url)
            .field("default_currency", &self.default_currency)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("payment_key_expiry_secs", &self.payment_key_expiry_secs)
            .field("handshake_max_attempts", &self.handshake_max_attempts)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("enforce_catalog_pricing", &self.enforce_catalog_pricing)
            .finish()
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_iframe_base_url() -> String {
    DEFAULT_IFRAME_BASE_URL.to_string()
}

fn default_currency() -> String {
    "EGP".to_string()
}

fn default_request_timeout() -> u64 {
    15
}

fn default_payment_key_expiry() -> u64 {
    3600
}

fn default_handshake_attempts() -> u32 {
    2
}

fn default_retry_backoff() -> u64 {
    250
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn configured() -> PaymentConfig {
        PaymentConfig {
            api_key: Some("paymob-api-key".to_string()),
            integration_id: Some(4_512_345),
            iframe_id: Some("812345".to_string()),
            hmac_secret: Some("callback-secret".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_target_egp_with_two_attempts() {
        let config = PaymentConfig::default();
        assert_eq!(config.default_currency, "EGP");
        assert_eq!(config.request_timeout_secs, 15);
        assert_eq!(config.payment_key_expiry_secs, 3600);
        assert_eq!(config.handshake_max_attempts, 2);
        assert!(!config.enforce_catalog_pricing);
        assert!(config.validate(Environment::Production).is_ok());
    }

    #[test]
    fn unconfigured_gateway_names_first_missing_setting() {
        let config = PaymentConfig::default();
        assert!(!config.is_configured());
        assert_eq!(
            config.credentials().err(),
            Some(ValidationError::MissingRequired("PAYMENT__API_KEY"))
        );

        let without_hmac = PaymentConfig {
            hmac_secret: Some("   ".to_string()),
            ..configured()
        };
        assert_eq!(
            without_hmac.credentials().err(),
            Some(ValidationError::MissingRequired("PAYMENT__HMAC_SECRET"))
        );
    }

    #[test]
    fn missing_setting_names_the_full_environment_variable() {
        let err = PaymentConfig::default().credentials().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Required configuration missing: ACADEMY_PAYMENTS__PAYMENT__API_KEY"
        );
        assert!(err
            .to_string()
            .contains(&format!("{}__PAYMENT__", crate::config::ENV_PREFIX)));
    }

    #[test]
    fn full_credentials_are_assembled() {
        let credentials = configured().credentials().unwrap();
        assert_eq!(credentials.hmac_secret.expose_secret(), "callback-secret");
    }

    #[test]
    fn settings_carry_currency_and_retry() {
        let config = PaymentConfig {
            default_currency: "usd".to_string(),
            handshake_max_attempts: 3,
            payment_key_expiry_secs: 900,
            ..configured()
        };
        let settings = config.settings().unwrap();
        assert_eq!(settings.default_currency.as_str(), "USD");
        assert_eq!(settings.payment_key_expiry_secs, 900);
        assert_eq!(settings.retry.max_attempts(), 3);
    }

    #[test]
    fn invalid_currency_is_rejected() {
        let config = PaymentConfig {
            default_currency: "POUNDS".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(Environment::Development),
            Err(ValidationError::InvalidCurrency("POUNDS".to_string()))
        );
    }

    #[test]
    fn bounds_are_enforced() {
        let slow = PaymentConfig {
            request_timeout_secs: 120,
            ..Default::default()
        };
        assert_eq!(
            slow.validate(Environment::Development),
            Err(ValidationError::InvalidTimeout)
        );

        let no_attempts = PaymentConfig {
            handshake_max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(
            no_attempts.validate(Environment::Development),
            Err(ValidationError::InvalidRetryAttempts)
        );
    }

    #[test]
    fn production_requires_https_gateway() {
        let config = PaymentConfig {
            api_base_url: "http://localhost:9000/api".to_string(),
            ..Default::default()
        };
        assert!(config.validate(Environment::Development).is_ok());
        assert_eq!(
            config.validate(Environment::Production),
            Err(ValidationError::GatewayUrlMustBeHttps("PAYMENT__API_BASE_URL"))
        );
    }

    #[test]
    fn debug_output_hides_credentials() {
        let rendered = format!("{:?}", configured());
        assert!(!rendered.contains("paymob-api-key"));
        assert!(!rendered.contains("callback-secret"));
        assert!(rendered.contains("812345"));
    }
}
