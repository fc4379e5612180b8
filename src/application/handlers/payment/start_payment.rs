//! StartPaymentHandler - Command handler for starting a hosted checkout.
//!
//! Runs the three-step gateway handshake (authenticate, register order,
//! issue payment key) and persists the pending order only after all three
//! succeeded. A failed handshake leaves nothing behind locally.

use std::sync::Arc;

use crate::domain::foundation::{
    AuthenticatedUser, CurrencyCode, MerchantOrderId, MinorUnits, OrderId, Timestamp,
};
use crate::domain::payment::{
    BillingDetails, BillingInput, NewOrder, Order, PaymentError, PlanType,
};
use crate::ports::{
    GatewayError, GatewayErrorCode, OrderItem, OrderRepository, PaymentGateway, PaymentKey,
    PaymentKeyRequest, PricingCatalog, RegisterOrderRequest,
};

use super::PaymentSettings;

/// Command to start a payment for a plan.
#[derive(Debug, Clone)]
pub struct StartPaymentCommand {
    pub user: AuthenticatedUser,
    pub plan_type: PlanType,
    pub plan_name: String,
    pub amount: MinorUnits,
    /// Falls back to the configured default currency.
    pub currency: Option<CurrencyCode>,
    pub billing: BillingInput,
}

/// Everything the client needs to open the hosted checkout.
#[derive(Debug, Clone)]
pub struct StartPaymentResult {
    pub payment_id: OrderId,
    pub gateway_order_id: String,
    pub payment_key: PaymentKey,
    pub iframe_url: String,
    pub amount: MinorUnits,
    pub currency: CurrencyCode,
    pub plan_name: String,
}

/// Handler for starting payments.
pub struct StartPaymentHandler {
    gateway: Arc<dyn PaymentGateway>,
    repository: Arc<dyn OrderRepository>,
    pricing: Option<Arc<dyn PricingCatalog>>,
    settings: PaymentSettings,
}

impl StartPaymentHandler {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        repository: Arc<dyn OrderRepository>,
        pricing: Option<Arc<dyn PricingCatalog>>,
        settings: PaymentSettings,
    ) -> Self {
        Self {
            gateway,
            repository,
            pricing,
            settings,
        }
    }

    pub async fn handle(&self, cmd: StartPaymentCommand) -> Result<StartPaymentResult, PaymentError> {
        // 1. Validate input
        let plan_name = cmd.plan_name.trim().to_string();
        if plan_name.is_empty() {
            return Err(PaymentError::validation("planName", "Plan name is required"));
        }
        let currency = cmd
            .currency
            .clone()
            .unwrap_or_else(|| self.settings.default_currency.clone());

        // 2. Compare against the catalog
        self.check_price(cmd.plan_type, &plan_name, cmd.amount, &currency)
            .await?;

        let now = Timestamp::now();
        let merchant_order_id = MerchantOrderId::generate(&cmd.user.id, now);

        // 3. Handshake
        let gateway = &self.gateway;
        let token = self
            .settings
            .retry
            .run("authenticate", move || gateway.authenticate())
            .await
            .map_err(|e| handshake_error("authenticate", &merchant_order_id, e))?;

        let gateway_order = self
            .gateway
            .register_order(
                &token,
                RegisterOrderRequest {
                    merchant_order_id: merchant_order_id.clone(),
                    amount: cmd.amount,
                    currency: currency.clone(),
                    items: vec![OrderItem {
                        name: plan_name.clone(),
                        description: format!("{} subscription", cmd.plan_type),
                        amount: cmd.amount,
                        quantity: 1,
                    }],
                },
            )
            .await
            .map_err(|e| handshake_error("register_order", &merchant_order_id, e))?;

        let billing = BillingDetails::from_contact(
            &cmd.user.email,
            cmd.user.display_name.as_deref(),
            &cmd.billing,
        );

        let payment_key = self
            .gateway
            .issue_payment_key(
                &token,
                PaymentKeyRequest {
                    gateway_order_id: gateway_order.id.clone(),
                    amount: cmd.amount,
                    currency: currency.clone(),
                    billing: billing.clone(),
                    expires_in_secs: self.settings.payment_key_expiry_secs,
                },
            )
            .await
            .map_err(|e| handshake_error("issue_payment_key", &merchant_order_id, e))?;

        // 4. Persist the pending order
        let order = Order::create_pending(
            NewOrder {
                user_id: cmd.user.id.clone(),
                merchant_order_id,
                gateway_order_id: gateway_order.id,
                amount: cmd.amount,
                currency,
                plan_type: cmd.plan_type,
                plan_name,
                billing,
            },
            now,
        )?;

        self.repository.create_pending(&order).await.map_err(|e| {
            tracing::error!(
                merchant_order_id = %order.merchant_order_id,
                gateway_order_id = %order.gateway_order_id,
                error = %e,
                "Failed to persist pending order after handshake"
            );
            PaymentError::from(e)
        })?;

        tracing::info!(
            order_id = %order.id,
            user_id = %order.user_id,
            merchant_order_id = %order.merchant_order_id,
            gateway_order_id = %order.gateway_order_id,
            amount = order.amount.value(),
            currency = %order.currency,
            plan = %order.plan_type,
            "Payment started"
        );

        let iframe_url = self.gateway.checkout_url(&payment_key);
        Ok(StartPaymentResult {
            payment_id: order.id,
            gateway_order_id: order.gateway_order_id,
            payment_key,
            iframe_url,
            amount: order.amount,
            currency: order.currency,
            plan_name: order.plan_name,
        })
    }

    async fn check_price(
        &self,
        plan_type: PlanType,
        plan_name: &str,
        amount: MinorUnits,
        currency: &CurrencyCode,
    ) -> Result<(), PaymentError> {
        let Some(pricing) = &self.pricing else {
            return Ok(());
        };
        let enforce = self.settings.enforce_catalog_pricing;

        let plan = match pricing.find_plan(plan_type, plan_name).await {
            Ok(plan) => plan,
            Err(e) if enforce => return Err(e.into()),
            Err(e) => {
                tracing::warn!(error = %e, "Pricing catalog unavailable, skipping price check");
                return Ok(());
            }
        };

        let mismatch = match plan {
            Some(plan) if plan.charges(amount, currency) => return Ok(()),
            Some(plan) => format!(
                "{} {} costs {} {}, got {} {}",
                plan_type, plan_name, plan.price, plan.currency, amount, currency
            ),
            None => format!("no active {} plan named {}", plan_type, plan_name),
        };

        if enforce {
            return Err(PaymentError::PriceMismatch(mismatch));
        }
        tracing::warn!(mismatch = %mismatch, "Start amount disagrees with pricing catalog");
        Ok(())
    }
}

fn handshake_error(
    step: &'static str,
    merchant_order_id: &MerchantOrderId,
    error: GatewayError,
) -> PaymentError {
    tracing::error!(
        step,
        merchant_order_id = %merchant_order_id,
        code = %error.code,
        http_status = ?error.http_status,
        error = %error.message,
        "Gateway handshake failed"
    );
    match error.code {
        GatewayErrorCode::NotConfigured => PaymentError::NotConfigured,
        _ => PaymentError::InitiationFailed(format!("{} failed", step)),
    }
}
