//! Paymob Accept adapter for the `PaymentGateway` port.
//!
//! # Configuration
//!
//! ```ignore
//! let config = PaymobConfig::new(api_key, integration_id, iframe_id)
//!     .with_request_timeout(Duration::from_secs(15));
//! let gateway = PaymobGateway::new(config)?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::payment::TransactionCallback;
use crate::ports::{
    AuthToken, GatewayError, GatewayErrorCode, GatewayOrder, PaymentGateway, PaymentKey,
    PaymentKeyRequest, RegisterOrderRequest, TransactionSnapshot,
};

use super::wire_types::{
    id_text, AuthTokenRequest, AuthTokenResponse, BillingDataBody, OrderItemBody, PaymentKeyBody,
    PaymentKeyResponse, RegisterOrderBody, RegisterOrderResponse, TransactionInquiryBody,
};

pub const DEFAULT_API_BASE_URL: &str = "https://accept.paymob.com/api";
pub const DEFAULT_IFRAME_BASE_URL: &str = "https://accept.paymob.com/api/acceptance/iframes";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Paymob API configuration.
#[derive(Clone, Debug)]
pub struct PaymobConfig {
    api_key: SecretString,
    integration_id: u64,
    iframe_id: String,
    api_base_url: String,
    iframe_base_url: String,
    request_timeout: Duration,
}

impl PaymobConfig {
    pub fn new(api_key: SecretString, integration_id: u64, iframe_id: impl Into<String>) -> Self {
        Self {
            api_key,
            integration_id,
            iframe_id: iframe_id.into(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            iframe_base_url: DEFAULT_IFRAME_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set a custom API base URL (for sandboxes and tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_iframe_base_url(mut self, url: impl Into<String>) -> Self {
        self.iframe_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Paymob payment gateway adapter.
pub struct PaymobGateway {
    config: PaymobConfig,
    http_client: reqwest::Client,
}

impl PaymobGateway {
    pub fn new(config: PaymobConfig) -> Result<Self, GatewayError> {
        if config.api_key.expose_secret().trim().is_empty() {
            return Err(GatewayError::not_configured("Paymob API key is missing"));
        }
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GatewayError::network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, http_client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    async fn post_json<B, R>(
        &self,
        path: &str,
        bearer: Option<&AuthToken>,
        body: &B,
        failure_code: GatewayErrorCode,
    ) -> Result<R, GatewayError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut request = self.http_client.post(self.url(path)).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token.secret().expose_secret());
        }
        let response = request.send().await.map_err(transport_error)?;
        read_json(response, path, failure_code).await
    }

    async fn fetch_transaction(
        &self,
        token: &AuthToken,
        transaction_id: &str,
    ) -> Result<TransactionSnapshot, GatewayError> {
        let path = format!("/acceptance/transactions/{}", transaction_id);
        let response = self
            .http_client
            .get(self.url(&path))
            .bearer_auth(token.secret().expose_secret())
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GatewayError::not_found("transaction"));
        }

        let callback: TransactionCallback =
            read_json(response, "/acceptance/transactions", GatewayErrorCode::ProviderError).await?;
        snapshot_from(callback)
    }
}

#[async_trait]
impl PaymentGateway for PaymobGateway {
    async fn authenticate(&self) -> Result<AuthToken, GatewayError> {
        let body = AuthTokenRequest {
            api_key: self.config.api_key.expose_secret(),
        };
        let response: AuthTokenResponse = self
            .post_json("/auth/tokens", None, &body, GatewayErrorCode::AuthenticationFailed)
            .await?;

        response
            .token
            .filter(|t| !t.is_empty())
            .map(|t| AuthToken::new(SecretString::new(t)))
            .ok_or_else(|| GatewayError::authentication("Paymob returned no auth token"))
    }

    async fn register_order(
        &self,
        token: &AuthToken,
        request: RegisterOrderRequest,
    ) -> Result<GatewayOrder, GatewayError> {
        let body = RegisterOrderBody {
            auth_token: token.secret().expose_secret(),
            delivery_needed: false,
            amount_cents: request.amount.value(),
            currency: request.currency.as_str(),
            merchant_order_id: request.merchant_order_id.as_str(),
            items: request
                .items
                .iter()
                .map(|item| OrderItemBody {
                    name: &item.name,
                    amount_cents: item.amount.value(),
                    description: &item.description,
                    quantity: item.quantity,
                })
                .collect(),
        };

        let response: RegisterOrderResponse = self
            .post_json(
                "/ecommerce/orders",
                None,
                &body,
                GatewayErrorCode::OrderRegistrationFailed,
            )
            .await?;

        let id = response.id.as_ref().and_then(id_text).ok_or_else(|| {
            GatewayError::new(
                GatewayErrorCode::OrderRegistrationFailed,
                "Paymob returned no order id",
            )
        })?;
        Ok(GatewayOrder { id })
    }

    async fn issue_payment_key(
        &self,
        token: &AuthToken,
        request: PaymentKeyRequest,
    ) -> Result<PaymentKey, GatewayError> {
        let body = PaymentKeyBody {
            auth_token: token.secret().expose_secret(),
            amount_cents: request.amount.value(),
            expiration: request.expires_in_secs,
            order_id: &request.gateway_order_id,
            billing_data: BillingDataBody::from(&request.billing),
            currency: request.currency.as_str(),
            integration_id: self.config.integration_id,
            lock_order_when_paid: true,
        };

        let response: PaymentKeyResponse = self
            .post_json(
                "/acceptance/payment_keys",
                None,
                &body,
                GatewayErrorCode::PaymentKeyFailed,
            )
            .await?;

        response
            .token
            .filter(|t| !t.is_empty())
            .map(|t| PaymentKey::new(SecretString::new(t)))
            .ok_or_else(|| {
                GatewayError::new(GatewayErrorCode::PaymentKeyFailed, "Paymob returned no payment key")
            })
    }

    async fn get_transaction(&self, transaction_id: &str) -> Result<TransactionSnapshot, GatewayError> {
        let token = self.authenticate().await?;
        self.fetch_transaction(&token, transaction_id).await
    }

    async fn find_transaction_for_order(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<TransactionSnapshot>, GatewayError> {
        let token = self.authenticate().await?;
        let body = TransactionInquiryBody {
            auth_token: token.secret().expose_secret(),
            order_id: gateway_order_id,
        };

        let response = self
            .http_client
            .post(self.url("/ecommerce/orders/transaction_inquiry"))
            .bearer_auth(token.secret().expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let callback: TransactionCallback = read_json(
            response,
            "/ecommerce/orders/transaction_inquiry",
            GatewayErrorCode::ProviderError,
        )
        .await?;

        if callback.id.is_none() {
            return Ok(None);
        }
        snapshot_from(callback).map(Some)
    }

    fn checkout_url(&self, payment_key: &PaymentKey) -> String {
        format!(
            "{}/{}?payment_token={}",
            self.config.iframe_base_url,
            self.config.iframe_id,
            payment_key.secret().expose_secret()
        )
    }
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::timeout(format!("Paymob request timed out: {}", err))
    } else {
        GatewayError::network(err.to_string())
    }
}

async fn read_json<R: DeserializeOwned>(
    response: reqwest::Response,
    path: &str,
    failure_code: GatewayErrorCode,
) -> Result<R, GatewayError> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        tracing::error!(path, status = status.as_u16(), error = %error_text, "Paymob request failed");
        let code = if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            GatewayErrorCode::AuthenticationFailed
        } else {
            failure_code
        };
        return Err(GatewayError::new(code, format!("Paymob API error: {}", error_text))
            .with_http_status(status.as_u16()));
    }

    response.json().await.map_err(|e| {
        GatewayError::invalid_response(format!("Failed to parse Paymob response from {}: {}", path, e))
    })
}

fn snapshot_from(callback: TransactionCallback) -> Result<TransactionSnapshot, GatewayError> {
    let id = callback
        .id
        .clone()
        .ok_or_else(|| GatewayError::invalid_response("transaction without id"))?;
    let data = callback.data.clone().unwrap_or_default();

    Ok(TransactionSnapshot {
        id,
        gateway_order_id: callback.gateway_order_id().map(str::to_string),
        success: callback.success.unwrap_or(false),
        pending: callback.pending.unwrap_or(false),
        is_refunded: callback.is_refunded.unwrap_or(false),
        is_voided: callback.is_voided.unwrap_or(false),
        amount: callback.amount(),
        currency: callback.currency.clone(),
        message: data.message,
        response_code: data.txn_response_code,
    })
}
