//! Subscription plans and the access window they buy.

use crate::domain::foundation::{Timestamp, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Billing plan purchased by an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    /// One calendar month of premium access.
    Monthly,

    /// One calendar year of premium access.
    Yearly,

    /// Unbounded premium access.
    Lifetime,
}

impl PlanType {
    /// Access window for a purchase confirmed at `start`.
    pub fn window_from(&self, start: Timestamp) -> SubscriptionWindow {
        let end = match self {
            PlanType::Monthly => Some(start.add_calendar_months(1)),
            PlanType::Yearly => Some(start.add_calendar_years(1)),
            PlanType::Lifetime => None,
        };
        SubscriptionWindow { start, end }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Monthly => "monthly",
            PlanType::Yearly => "yearly",
            PlanType::Lifetime => "lifetime",
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PlanType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" => Ok(PlanType::Monthly),
            "yearly" => Ok(PlanType::Yearly),
            "lifetime" => Ok(PlanType::Lifetime),
            other => Err(ValidationError::invalid_format(
                "plan_type",
                format!("unknown plan type '{}'", other),
            )),
        }
    }
}

/// Premium access window granted by a successful order.
///
/// `end == None` means unbounded (lifetime).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionWindow {
    pub start: Timestamp,
    pub end: Option<Timestamp>,
}

impl SubscriptionWindow {
    pub fn is_unbounded(&self) -> bool {
        self.end.is_none()
    }

    /// True if `at` falls inside the window.
    pub fn contains(&self, at: Timestamp) -> bool {
        !at.is_before(&self.start) && self.end.map_or(true, |end| at.is_before(&end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Utc};

    fn jan_15() -> Timestamp {
        Timestamp::from_datetime(Utc.with_ymd_and_hms(2025, 1, 15, 9, 30, 0).unwrap())
    }

    #[test]
    fn monthly_window_ends_one_calendar_month_later() {
        let window = PlanType::Monthly.window_from(jan_15());
        let end = window.end.unwrap();
        assert_eq!(end.as_datetime().month(), 2);
        assert_eq!(end.as_datetime().day(), 15);
        assert_eq!(window.start, jan_15());
    }

    #[test]
    fn yearly_window_ends_one_calendar_year_later() {
        let end = PlanType::Yearly.window_from(jan_15()).end.unwrap();
        assert_eq!(end.as_datetime().year(), 2026);
        assert_eq!(end.as_datetime().month(), 1);
        assert_eq!(end.as_datetime().day(), 15);
    }

    #[test]
    fn lifetime_window_is_unbounded() {
        let window = PlanType::Lifetime.window_from(jan_15());
        assert!(window.is_unbounded());
        assert!(window.contains(jan_15().add_days(365 * 50)));
    }

    #[test]
    fn window_contains_checks_both_edges() {
        let window = PlanType::Monthly.window_from(jan_15());
        assert!(window.contains(jan_15()));
        assert!(window.contains(jan_15().add_days(10)));
        assert!(!window.contains(jan_15().add_days(-1)));
        assert!(!window.contains(jan_15().add_days(40)));
    }

    #[test]
    fn plan_type_parses_case_insensitively() {
        assert_eq!("Monthly".parse::<PlanType>().unwrap(), PlanType::Monthly);
        assert_eq!("YEARLY".parse::<PlanType>().unwrap(), PlanType::Yearly);
        assert!("weekly".parse::<PlanType>().is_err());
    }

    #[test]
    fn plan_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&PlanType::Lifetime).unwrap(), "\"lifetime\"");
    }
}
