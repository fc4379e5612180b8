//! Runtime knobs for the payment handlers.

use crate::domain::foundation::CurrencyCode;

use super::RetryPolicy;

/// Default lifetime of an issued payment key.
pub const DEFAULT_PAYMENT_KEY_EXPIRY_SECS: u64 = 3600;

/// Settings shared by the payment command handlers.
#[derive(Debug, Clone)]
pub struct PaymentSettings {
    /// Currency used when a start request names none.
    pub default_currency: CurrencyCode,

    /// Lifetime requested for payment keys.
    pub payment_key_expiry_secs: u64,

    /// Reject starts whose amount or currency disagrees with the catalog.
    pub enforce_catalog_pricing: bool,

    /// Retry policy for authentication and transaction lookups.
    pub retry: RetryPolicy,
}

impl PaymentSettings {
    pub fn new(default_currency: CurrencyCode) -> Self {
        Self {
            default_currency,
            payment_key_expiry_secs: DEFAULT_PAYMENT_KEY_EXPIRY_SECS,
            enforce_catalog_pricing: false,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_payment_key_expiry(mut self, secs: u64) -> Self {
        self.payment_key_expiry_secs = secs;
        self
    }

    pub fn with_catalog_enforcement(mut self, enforce: bool) -> Self {
        self.enforce_catalog_pricing = enforce;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
