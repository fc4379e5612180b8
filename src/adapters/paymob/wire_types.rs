//! Request and response bodies of the Paymob Accept API.

use serde::{Deserialize, Serialize};

use crate::domain::payment::{BillingDetails, NOT_AVAILABLE};

#[derive(Debug, Serialize)]
pub(crate) struct AuthTokenRequest<'a> {
    pub api_key: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthTokenResponse {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RegisterOrderBody<'a> {
    pub auth_token: &'a str,
    pub delivery_needed: bool,
    pub amount_cents: i64,
    pub currency: &'a str,
    pub merchant_order_id: &'a str,
    pub items: Vec<OrderItemBody<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OrderItemBody<'a> {
    pub name: &'a str,
    pub amount_cents: i64,
    pub description: &'a str,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterOrderResponse {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PaymentKeyBody<'a> {
    pub auth_token: &'a str,
    pub amount_cents: i64,
    pub expiration: u64,
    pub order_id: &'a str,
    pub billing_data: BillingDataBody<'a>,
    pub currency: &'a str,
    pub integration_id: u64,
    pub lock_order_when_paid: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct BillingDataBody<'a> {
    pub apartment: &'a str,
    pub email: &'a str,
    pub floor: &'a str,
    pub first_name: &'a str,
    pub street: &'a str,
    pub building: &'a str,
    pub phone_number: &'a str,
    pub shipping_method: &'a str,
    pub postal_code: &'a str,
    pub city: &'a str,
    pub country: &'a str,
    pub last_name: &'a str,
    pub state: &'a str,
}

impl<'a> From<&'a BillingDetails> for BillingDataBody<'a> {
    fn from(billing: &'a BillingDetails) -> Self {
        Self {
            apartment: &billing.apartment,
            email: &billing.email,
            floor: &billing.floor,
            first_name: &billing.first_name,
            street: &billing.street,
            building: &billing.building,
            phone_number: &billing.phone_number,
            shipping_method: NOT_AVAILABLE,
            postal_code: &billing.postal_code,
            city: &billing.city,
            country: &billing.country,
            last_name: &billing.last_name,
            state: &billing.state,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PaymentKeyResponse {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TransactionInquiryBody<'a> {
    pub auth_token: &'a str,
    pub order_id: &'a str,
}

/// Renders a JSON id (number or string) as text.
pub(crate) fn id_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::BillingInput;
    use serde_json::json;

    #[test]
    fn billing_body_carries_na_shipping_method() {
        let billing = BillingDetails::from_contact("a@b.co", Some("Ali Hassan"), &BillingInput::default());
        let body = serde_json::to_value(BillingDataBody::from(&billing)).unwrap();
        assert_eq!(body["shipping_method"], "NA");
        assert_eq!(body["first_name"], "Ali");
        assert_eq!(body["last_name"], "Hassan");
        assert_eq!(body["city"], "NA");
    }

    #[test]
    fn register_order_body_shape() {
        let body = RegisterOrderBody {
            auth_token: "tok",
            delivery_needed: false,
            amount_cents: 50000,
            currency: "EGP",
            merchant_order_id: "u_1_abc",
            items: vec![OrderItemBody {
                name: "Premium",
                amount_cents: 50000,
                description: "monthly plan",
                quantity: 1,
            }],
        };
        let value = serde_json::to_value(body).unwrap();
        assert_eq!(value["delivery_needed"], json!(false));
        assert_eq!(value["items"][0]["amount_cents"], json!(50000));
    }

    #[test]
    fn id_text_accepts_numbers_and_strings() {
        assert_eq!(id_text(&json!(12345)), Some("12345".to_string()));
        assert_eq!(id_text(&json!("987")), Some("987".to_string()));
        assert_eq!(id_text(&json!(null)), None);
        assert_eq!(id_text(&json!("")), None);
    }
}
