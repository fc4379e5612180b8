//! Event-driven transitions of a payment order.
//!
//! [`transition`] is pure: it takes the current order and an event and
//! returns the order as it should be persisted, plus whether the entitlement
//! must be activated. Callers persist the result under the per-order lock.

use serde_json::Value;

use crate::domain::foundation::{StateMachine, Timestamp};

use super::{Order, OrderStatus};

/// Where a gateway report came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportSource {
    /// Pushed to the webhook endpoint.
    Webhook { signature_verified: bool },

    /// Fetched directly from the gateway API with our credentials.
    DirectLookup,
}

/// Transaction details carried by gateway-driven events.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayReport {
    pub source: ReportSource,
    pub transaction_id: Option<String>,
    pub failure_reason: Option<String>,
    pub failure_code: Option<String>,
    pub raw: Option<Value>,
}

impl GatewayReport {
    pub fn from_webhook(transaction_id: Option<String>, signature_verified: bool, raw: Value) -> Self {
        Self {
            source: ReportSource::Webhook { signature_verified },
            transaction_id,
            failure_reason: None,
            failure_code: None,
            raw: Some(raw),
        }
    }

    pub fn from_lookup(transaction_id: Option<String>) -> Self {
        Self {
            source: ReportSource::DirectLookup,
            transaction_id,
            failure_reason: None,
            failure_code: None,
            raw: None,
        }
    }

    pub fn with_failure(mut self, reason: impl Into<String>, code: Option<String>) -> Self {
        self.failure_reason = Some(reason.into());
        self.failure_code = code;
        self
    }

    /// True if the report may change order state.
    pub fn is_authentic(&self) -> bool {
        match self.source {
            ReportSource::Webhook { signature_verified } => signature_verified,
            ReportSource::DirectLookup => true,
        }
    }

    fn is_webhook(&self) -> bool {
        matches!(self.source, ReportSource::Webhook { .. })
    }
}

/// Something that happened to an order.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEvent {
    WebhookSuccess(GatewayReport),
    WebhookPending(GatewayReport),
    WebhookFailure(GatewayReport),
    ManualVerifySuccess(GatewayReport),
    ManualVerifyFailure(GatewayReport),
    AdminRefund,
    AdminCancel,
}

impl PaymentEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PaymentEvent::WebhookSuccess(_) => "webhook_success",
            PaymentEvent::WebhookPending(_) => "webhook_pending",
            PaymentEvent::WebhookFailure(_) => "webhook_failure",
            PaymentEvent::ManualVerifySuccess(_) => "manual_verify_success",
            PaymentEvent::ManualVerifyFailure(_) => "manual_verify_failure",
            PaymentEvent::AdminRefund => "admin_refund",
            PaymentEvent::AdminCancel => "admin_cancel",
        }
    }

    fn report(&self) -> Option<&GatewayReport> {
        match self {
            PaymentEvent::WebhookSuccess(r)
            | PaymentEvent::WebhookPending(r)
            | PaymentEvent::WebhookFailure(r)
            | PaymentEvent::ManualVerifySuccess(r)
            | PaymentEvent::ManualVerifyFailure(r) => Some(r),
            PaymentEvent::AdminRefund | PaymentEvent::AdminCancel => None,
        }
    }

    fn is_success(&self) -> bool {
        matches!(
            self,
            PaymentEvent::WebhookSuccess(_) | PaymentEvent::ManualVerifySuccess(_)
        )
    }
}

/// How an event affected the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Status changed.
    Applied { from: OrderStatus, to: OrderStatus },

    /// Status unchanged; audit fields updated.
    Recorded,

    /// A repeat success for an order whose entitlement was never recorded.
    EntitlementRetry,

    /// Nothing to do: the order already reflects the event.
    Unchanged,

    /// The event is not allowed for the order's state or provenance.
    Rejected(String),
}

/// Result of applying an event to an order.
#[derive(Debug, Clone)]
pub struct Transition {
    pub order: Order,
    pub outcome: TransitionOutcome,
    pub activate_entitlement: bool,
}

impl Transition {
    fn unchanged(order: &Order) -> Self {
        Self {
            order: order.clone(),
            outcome: TransitionOutcome::Unchanged,
            activate_entitlement: false,
        }
    }

    fn rejected(order: &Order, reason: impl Into<String>) -> Self {
        Self {
            order: order.clone(),
            outcome: TransitionOutcome::Rejected(reason.into()),
            activate_entitlement: false,
        }
    }

    /// True if the order must be written back.
    pub fn requires_write(&self) -> bool {
        matches!(
            self.outcome,
            TransitionOutcome::Applied { .. } | TransitionOutcome::Recorded
        )
    }
}

/// Applies `event` to `order` at `now`.
///
/// Settled orders ignore gateway events, so replays are harmless. Only an
/// authentic success moves a pending order to `Success`, and only that move
/// (or a replay for an order whose entitlement was never recorded) asks for
/// entitlement activation.
pub fn transition(order: &Order, event: &PaymentEvent, now: Timestamp) -> Transition {
    if let Some(report) = event.report() {
        if !report.is_authentic() {
            return Transition::rejected(order, "unverified gateway report");
        }
    }

    match (order.status, event) {
        (OrderStatus::Pending, PaymentEvent::WebhookSuccess(report))
        | (OrderStatus::Pending, PaymentEvent::ManualVerifySuccess(report)) => {
            let mut next = order.clone();
            next.status = OrderStatus::Success;
            next.subscription_window = Some(order.plan_type.window_from(now));
            next.completed_at = Some(now);
            next.failure_reason = None;
            next.failure_code = None;
            absorb_report(&mut next, report);
            applied(order, next, now, true)
        }

        (OrderStatus::Pending, PaymentEvent::WebhookFailure(report))
        | (OrderStatus::Pending, PaymentEvent::ManualVerifyFailure(report)) => {
            let mut next = order.clone();
            next.status = OrderStatus::Failed;
            next.completed_at = Some(now);
            next.failure_reason = report.failure_reason.clone();
            next.failure_code = report.failure_code.clone();
            absorb_report(&mut next, report);
            applied(order, next, now, false)
        }

        (OrderStatus::Pending, PaymentEvent::WebhookPending(report)) => {
            let mut next = order.clone();
            absorb_report(&mut next, report);
            if next == *order {
                return Transition::unchanged(order);
            }
            next.updated_at = now;
            Transition {
                order: next,
                outcome: TransitionOutcome::Recorded,
                activate_entitlement: false,
            }
        }

        (OrderStatus::Pending, PaymentEvent::AdminCancel) => {
            let mut next = order.clone();
            next.status = OrderStatus::Cancelled;
            next.completed_at = Some(now);
            applied(order, next, now, false)
        }

        (OrderStatus::Pending, PaymentEvent::AdminRefund) => {
            Transition::rejected(order, "only successful orders can be refunded")
        }

        (OrderStatus::Success, PaymentEvent::AdminRefund) => {
            let mut next = order.clone();
            next.status = OrderStatus::Refunded;
            next.refunded_at = Some(now);
            next.subscription_window = None;
            applied(order, next, now, false)
        }

        (OrderStatus::Success, _) if event.is_success() && order.awaiting_entitlement() => {
            Transition {
                order: order.clone(),
                outcome: TransitionOutcome::EntitlementRetry,
                activate_entitlement: true,
            }
        }

        (OrderStatus::Success, PaymentEvent::AdminCancel) => {
            Transition::rejected(order, "successful orders can only be refunded")
        }

        (OrderStatus::Cancelled | OrderStatus::Failed, PaymentEvent::AdminRefund) => {
            Transition::rejected(order, "only successful orders can be refunded")
        }

        _ => Transition::unchanged(order),
    }
}

fn absorb_report(order: &mut Order, report: &GatewayReport) {
    if let Some(id) = report.transaction_id.as_ref().filter(|id| !id.is_empty()) {
        order.gateway_transaction_id = Some(id.clone());
    }
    if report.is_webhook() {
        order.signature_verified = true;
        if let Some(raw) = &report.raw {
            order.raw_notification = Some(raw.clone());
        }
    }
}

fn applied(order: &Order, mut next: Order, now: Timestamp, activate: bool) -> Transition {
    debug_assert!(order.status.can_transition_to(&next.status));
    next.updated_at = now;
    Transition {
        outcome: TransitionOutcome::Applied {
            from: order.status,
            to: next.status,
        },
        order: next,
        activate_entitlement: activate,
    }
}
