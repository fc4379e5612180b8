//! Order status state machine.
//!
//! ```text
//!            ┌──────────► success ──────► refunded
//! pending ───┼──────────► failed
//!            └──────────► cancelled
//! ```

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a payment order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Registered with the gateway, awaiting a transaction outcome.
    Pending,

    /// Gateway confirmed a successful transaction.
    Success,

    /// Gateway reported a declined or errored transaction.
    Failed,

    /// Abandoned by administrator override before payment.
    Cancelled,

    /// Refunded by an administrator after success.
    Refunded,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Success,
        OrderStatus::Failed,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
    ];

    /// True once the gateway (or an administrator) has settled the order.
    ///
    /// Settled orders ignore further gateway events. `Success` is settled even
    /// though the administrative refund edge still leaves it.
    pub fn is_settled(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Success => "success",
            OrderStatus::Failed => "failed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }
}

impl StateMachine for OrderStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use OrderStatus::*;
        matches!(
            (self, target),
            (Pending, Success) | (Pending, Failed) | (Pending, Cancelled) | (Success, Refunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use OrderStatus::*;
        match self {
            Pending => vec![Success, Failed, Cancelled],
            Success => vec![Refunded],
            Failed | Cancelled | Refunded => vec![],
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "success" => Ok(OrderStatus::Success),
            "failed" => Ok(OrderStatus::Failed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "refunded" => Ok(OrderStatus::Refunded),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown order status '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_reaches_every_outcome() {
        let status = OrderStatus::Pending;
        assert_eq!(status.transition_to(OrderStatus::Success), Ok(OrderStatus::Success));
        assert_eq!(status.transition_to(OrderStatus::Failed), Ok(OrderStatus::Failed));
        assert_eq!(status.transition_to(OrderStatus::Cancelled), Ok(OrderStatus::Cancelled));
    }

    #[test]
    fn pending_cannot_be_refunded() {
        assert!(OrderStatus::Pending.transition_to(OrderStatus::Refunded).is_err());
    }

    #[test]
    fn success_only_moves_to_refunded() {
        assert_eq!(OrderStatus::Success.valid_transitions(), vec![OrderStatus::Refunded]);
        assert!(!OrderStatus::Success.can_transition_to(&OrderStatus::Pending));
        assert!(!OrderStatus::Success.can_transition_to(&OrderStatus::Failed));
    }

    #[test]
    fn failed_cancelled_refunded_are_terminal() {
        assert!(OrderStatus::Failed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Refunded.is_terminal());
        assert!(!OrderStatus::Success.is_terminal());
    }

    #[test]
    fn only_pending_is_unsettled() {
        for status in OrderStatus::ALL {
            assert_eq!(status.is_settled(), status != OrderStatus::Pending);
        }
    }

    #[test]
    fn no_transition_leads_back_to_pending() {
        for status in OrderStatus::ALL {
            assert!(!status.can_transition_to(&OrderStatus::Pending));
        }
    }

    #[test]
    fn can_transition_to_is_consistent_with_valid_transitions() {
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                assert_eq!(
                    from.can_transition_to(&to),
                    from.valid_transitions().contains(&to),
                    "{:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn string_roundtrip() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("paid".parse::<OrderStatus>().is_err());
    }
}
