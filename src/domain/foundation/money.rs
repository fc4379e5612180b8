//! Money value objects.
//!
//! Amounts are carried as integer minor units (cents, piastres) end to end.
//! Major-unit decimals only exist at the HTTP boundary: client input is
//! parsed from its decimal text into minor units, and responses render minor
//! units back as a decimal.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// Largest accepted amount in minor units (10 million major units).
pub const MAX_MINOR_UNITS: i64 = 1_000_000_000;

/// An amount in integer minor currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinorUnits(i64);

impl MinorUnits {
    /// Wraps a raw minor-unit value, which must be positive.
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if value <= 0 || value > MAX_MINOR_UNITS {
            return Err(ValidationError::out_of_range(
                "amount",
                1,
                MAX_MINOR_UNITS,
                value,
            ));
        }
        Ok(Self(value))
    }

    /// Wraps a value reported by the gateway or loaded from storage without
    /// range checks.
    pub fn from_raw(value: i64) -> Self {
        Self(value)
    }

    /// Converts a decimal major-unit amount, rounding half away from zero at
    /// the third fraction digit (`round(amount * 100)`).
    ///
    /// Parsing works on the decimal text so that values such as `19.99`
    /// never pass through binary floating point.
    pub fn from_major_str(text: &str) -> Result<Self, ValidationError> {
        let text = text.trim();
        let invalid = |reason: &str| ValidationError::invalid_format("amount", reason);

        if text.is_empty() {
            return Err(ValidationError::empty_field("amount"));
        }
        if text.starts_with('-') {
            return Err(invalid("amount must be positive"));
        }
        if text.contains(['e', 'E']) {
            let value: f64 = text.parse().map_err(|_| invalid("not a decimal number"))?;
            return Self::from_major_f64(value);
        }

        let (whole, fraction) = match text.split_once('.') {
            Some((w, f)) => (w, f),
            None => (text, ""),
        };
        let whole = if whole.is_empty() { "0" } else { whole };
        if !whole.bytes().all(|b| b.is_ascii_digit())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid("not a decimal number"));
        }
        if whole.len() > 12 {
            return Err(invalid("amount too large"));
        }

        let whole: i64 = whole.parse().map_err(|_| invalid("not a decimal number"))?;
        let digits: Vec<i64> = fraction.bytes().map(|b| i64::from(b - b'0')).collect();
        let tenths = digits.first().copied().unwrap_or(0);
        let hundredths = digits.get(1).copied().unwrap_or(0);
        let round_up = digits.get(2).copied().unwrap_or(0) >= 5;

        let cents = whole * 100 + tenths * 10 + hundredths + i64::from(round_up);
        Self::new(cents)
    }

    /// Converts a floating-point major amount (`round(amount * 100)`).
    pub fn from_major_f64(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::invalid_format("amount", "not a finite number"));
        }
        let cents = (value * 100.0).round();
        if cents > MAX_MINOR_UNITS as f64 || cents < 1.0 {
            return Err(ValidationError::out_of_range(
                "amount",
                1,
                MAX_MINOR_UNITS,
                cents as i64,
            ));
        }
        Self::new(cents as i64)
    }

    /// Converts a JSON number (or numeric string) from a request body.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ValidationError> {
        match value {
            serde_json::Value::Number(n) => Self::from_major_str(&n.to_string()),
            serde_json::Value::String(s) => Self::from_major_str(s),
            _ => Err(ValidationError::invalid_format("amount", "expected a number")),
        }
    }

    /// Raw minor-unit value.
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Exact decimal rendering with two fraction digits (`500.00`).
    pub fn to_major_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{}{}.{:02}", sign, abs / 100, abs % 100)
    }

    /// Major-unit value for JSON responses (`minor / 100`).
    pub fn to_major_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for MinorUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_major_string())
    }
}

/// ISO 4217 alphabetic currency code, upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: impl AsRef<str>) -> Result<Self, ValidationError> {
        let code = code.as_ref().trim().to_ascii_uppercase();
        if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(ValidationError::invalid_format(
                "currency",
                "expected a three-letter ISO 4217 code",
            ));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
