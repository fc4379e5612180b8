//! In-memory payment gateway for tests and local development.
//!
//! Supports:
//! - Deterministic order ids and payment keys
//! - Error injection per method (persistent or for a number of calls)
//! - Seeded transactions for direct lookups
//! - Call tracking

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::ports::{
    AuthToken, GatewayError, GatewayOrder, PaymentGateway, PaymentKey, PaymentKeyRequest,
    RegisterOrderRequest, TransactionSnapshot,
};

/// Method names used for call tracking and error injection.
pub mod methods {
    pub const AUTHENTICATE: &str = "authenticate";
    pub const REGISTER_ORDER: &str = "register_order";
    pub const ISSUE_PAYMENT_KEY: &str = "issue_payment_key";
    pub const GET_TRANSACTION: &str = "get_transaction";
    pub const FIND_TRANSACTION_FOR_ORDER: &str = "find_transaction_for_order";
}

/// Mock gateway; clones share state.
#[derive(Clone, Default)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    next_order_number: u64,
    transactions: HashMap<String, TransactionSnapshot>,
    order_transactions: HashMap<String, String>,
    method_errors: HashMap<String, InjectedError>,
    registered_orders: Vec<RegisterOrderRequest>,
    key_requests: Vec<PaymentKeyRequest>,
    call_log: Vec<MethodCall>,
}

struct InjectedError {
    error: GatewayError,
    remaining: Option<usize>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panic while holding the lock only happens inside a failing test.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make `method` fail with `error` on every call.
    pub fn set_method_error(&self, method: &str, error: GatewayError) {
        self.state().method_errors.insert(
            method.to_string(),
            InjectedError {
                error,
                remaining: None,
            },
        );
    }

    /// Make `method` fail with `error` for the next `times` calls.
    pub fn fail_times(&self, method: &str, error: GatewayError, times: usize) {
        self.state().method_errors.insert(
            method.to_string(),
            InjectedError {
                error,
                remaining: Some(times),
            },
        );
    }

    pub fn clear_errors(&self) {
        self.state().method_errors.clear();
    }

    /// Seed a transaction; it becomes visible to both lookup methods.
    pub fn add_transaction(&self, snapshot: TransactionSnapshot) {
        let mut state = self.state();
        if let Some(order_id) = &snapshot.gateway_order_id {
            state
                .order_transactions
                .insert(order_id.clone(), snapshot.id.clone());
        }
        state.transactions.insert(snapshot.id.clone(), snapshot);
    }

    /// Orders registered so far, in call order.
    pub fn registered_orders(&self) -> Vec<RegisterOrderRequest> {
        self.state().registered_orders.clone()
    }

    pub fn payment_key_requests(&self) -> Vec<PaymentKeyRequest> {
        self.state().key_requests.clone()
    }

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.call_count(method) > 0
    }

    fn enter(&self, method: &str, args: Vec<String>) -> Result<(), GatewayError> {
        let mut state = self.state();
        state.call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });

        let Some(injected) = state.method_errors.get_mut(method) else {
            return Ok(());
        };
        let error = injected.error.clone();
        match injected.remaining.as_mut() {
            None => Err(error),
            Some(0) => Ok(()),
            Some(n) => {
                *n -= 1;
                Err(error)
            }
        }
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn authenticate(&self) -> Result<AuthToken, GatewayError> {
        self.enter(methods::AUTHENTICATE, vec![])?;
        Ok(AuthToken::new(SecretString::new("mock_auth_token".to_string())))
    }

    async fn register_order(
        &self,
        _token: &AuthToken,
        request: RegisterOrderRequest,
    ) -> Result<GatewayOrder, GatewayError> {
        self.enter(
            methods::REGISTER_ORDER,
            vec![
                request.merchant_order_id.to_string(),
                request.amount.value().to_string(),
            ],
        )?;
        let mut state = self.state();
        state.next_order_number += 1;
        let id = format!("{}", 100_000 + state.next_order_number);
        state.registered_orders.push(request);
        Ok(GatewayOrder { id })
    }

    async fn issue_payment_key(
        &self,
        _token: &AuthToken,
        request: PaymentKeyRequest,
    ) -> Result<PaymentKey, GatewayError> {
        self.enter(methods::ISSUE_PAYMENT_KEY, vec![request.gateway_order_id.clone()])?;
        let key = format!("mock_payment_key_{}", request.gateway_order_id);
        self.state().key_requests.push(request);
        Ok(PaymentKey::new(SecretString::new(key)))
    }

    async fn get_transaction(&self, transaction_id: &str) -> Result<TransactionSnapshot, GatewayError> {
        self.enter(methods::GET_TRANSACTION, vec![transaction_id.to_string()])?;
        self.state()
            .transactions
            .get(transaction_id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found("transaction"))
    }

    async fn find_transaction_for_order(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<TransactionSnapshot>, GatewayError> {
        self.enter(
            methods::FIND_TRANSACTION_FOR_ORDER,
            vec![gateway_order_id.to_string()],
        )?;
        let state = self.state();
        let snapshot = state
            .order_transactions
            .get(gateway_order_id)
            .and_then(|txn| state.transactions.get(txn))
            .cloned();
        Ok(snapshot)
    }

    fn checkout_url(&self, payment_key: &PaymentKey) -> String {
        format!(
            "https://checkout.mock/iframes/1?payment_token={}",
            payment_key.secret().expose_secret()
        )
    }
}
