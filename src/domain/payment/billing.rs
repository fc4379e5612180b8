//! Billing details sent to the gateway with each payment key request.

use serde::{Deserialize, Serialize};

/// Placeholder the gateway accepts for billing fields the user did not supply.
pub const NOT_AVAILABLE: &str = "NA";

/// Optional billing fields supplied by the client when starting a payment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingInput {
    pub phone_number: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub street: Option<String>,
}

/// Complete billing snapshot stored on the order and forwarded to the gateway.
///
/// Every field is populated; gaps are filled with [`NOT_AVAILABLE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub city: String,
    pub country: String,
    pub postal_code: String,
    pub street: String,
    pub building: String,
    pub floor: String,
    pub apartment: String,
    pub state: String,
}

impl BillingDetails {
    /// Builds the snapshot from the user's profile and optional client input.
    ///
    /// The display name is split on its first whitespace into first and last
    /// name; a missing display name falls back to the email's local part.
    pub fn from_contact(email: &str, display_name: Option<&str>, input: &BillingInput) -> Self {
        let name = display_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

        let (first_name, last_name) = match name.split_once(char::is_whitespace) {
            Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
            None => (name.clone(), String::new()),
        };

        Self {
            first_name: or_na(Some(first_name)),
            last_name: or_na(Some(last_name)),
            email: or_na(Some(email.to_string())),
            phone_number: or_na(input.phone_number.clone()),
            city: or_na(input.city.clone()),
            country: or_na(input.country.clone()),
            postal_code: or_na(input.postal_code.clone()),
            street: or_na(input.street.clone()),
            building: NOT_AVAILABLE.to_string(),
            floor: NOT_AVAILABLE.to_string(),
            apartment: NOT_AVAILABLE.to_string(),
            state: NOT_AVAILABLE.to_string(),
        }
    }
}

fn or_na(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
