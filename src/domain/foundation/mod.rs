//! Foundation module - Shared domain primitives.
//!
//! Value objects, identifiers, errors and the state machine trait that the
//! payment domain is built from.

mod auth;
mod errors;
mod ids;
mod money;
mod state_machine;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser, ADMIN_ROLE};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{MerchantOrderId, OrderId, UserId};
pub use money::{CurrencyCode, MinorUnits, MAX_MINOR_UNITS};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
