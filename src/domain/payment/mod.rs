//! Payment domain: orders, their state machine, gateway callbacks and
//! the entitlements successful orders grant.

mod billing;
mod callback;
mod entitlement;
mod errors;
mod order;
mod plan;
mod pricing;
mod signature;
mod status;
mod transition;

pub use billing::{BillingDetails, BillingInput, NOT_AVAILABLE};
pub use callback::{
    CallbackData, CallbackOrder, CallbackSourceData, ReportedOutcome, TransactionCallback,
    WebhookPayload, AMOUNT_MISMATCH_CODE, DEFAULT_DECLINE_REASON, TRANSACTION_CALLBACK,
};
pub use entitlement::{ActivationRequest, Entitlement};
pub use errors::PaymentError;
pub use order::{NewOrder, Order};
pub use plan::{PlanType, SubscriptionWindow};
pub use pricing::PricingPlan;
pub use signature::SignatureVerifier;
pub use status::OrderStatus;
pub use transition::{
    transition, GatewayReport, PaymentEvent, ReportSource, Transition, TransitionOutcome,
};
