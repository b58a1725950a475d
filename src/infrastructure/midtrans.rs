//! Midtrans-compatible payment gateway: Snap transactions and notification verification.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

use crate::domain::aggregates::OrderSnapshot;
use crate::{EcommerceError, Result};

#[derive(Clone)]
pub struct MidtransClient {
    http: reqwest::Client,
    base_url: String,
    server_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapTransaction {
    pub token: String,
    pub redirect_url: String,
}

/// Body of the HTTP notification the gateway posts on every status change.
#[derive(Debug, Clone, Deserialize)]
pub struct Notification {
    pub order_id: String,
    pub status_code: String,
    pub gross_amount: String,
    pub signature_key: String,
    pub transaction_status: String,
    pub transaction_id: Option<String>,
    pub fraud_status: Option<String>,
    pub payment_type: Option<String>,
}

/// What a notification means for the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Settled { reference: String },
    Failed { reason: String },
    Pending,
    Ignored,
}

impl Notification {
    /// Only `settlement` and fraud-accepted `capture` settle; only `deny`, `cancel` and
    /// `expire` cancel. A fraud-denied capture is followed by its own `deny` notification.
    pub fn outcome(&self) -> PaymentOutcome {
        let reference = self.transaction_id.clone().unwrap_or_else(|| self.order_id.clone());
        match (self.transaction_status.as_str(), self.fraud_status.as_deref()) {
            ("capture", Some("accept")) | ("settlement", _) => PaymentOutcome::Settled { reference },
            ("capture", Some("challenge")) | ("pending", _) => PaymentOutcome::Pending,
            ("deny" | "cancel" | "expire", _) => PaymentOutcome::Failed { reason: format!("payment {}", self.transaction_status) },
            _ => PaymentOutcome::Ignored,
        }
    }
}

/// `hex(sha512(order_id + status_code + gross_amount + server_key))`
pub fn signature(order_id: &str, status_code: &str, gross_amount: &str, server_key: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    hex::encode(hasher.finalize())
}

impl MidtransClient {
    pub fn new(base_url: impl Into<String>, server_key: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into().trim_end_matches('/').to_string(), server_key: server_key.into() }
    }

    pub fn verify(&self, n: &Notification) -> Result<()> {
        let expected = signature(&n.order_id, &n.status_code, &n.gross_amount, &self.server_key);
        if !constant_time_eq(&expected, &n.signature_key.to_ascii_lowercase()) {
            return Err(EcommerceError::Unauthorized("invalid notification signature".into()));
        }
        Ok(())
    }

    pub async fn create_transaction(&self, order: &OrderSnapshot) -> Result<SnapTransaction> {
        let gross = order.total.amount().round_dp(0);
        let body = serde_json::json!({
            "transaction_details": {
                "order_id": order.order_number,
                "gross_amount": decimal_to_i64(gross)?,
            },
            "customer_details": {
                "first_name": order.shipping_address.recipient,
                "phone": order.shipping_address.phone,
            },
        });
        let auth = STANDARD.encode(format!("{}:", self.server_key));
        let response = self.http
            .post(format!("{}/snap/v1/transactions", self.base_url))
            .header(reqwest::header::AUTHORIZATION, format!("Basic {auth}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| EcommerceError::PaymentGateway(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(EcommerceError::PaymentGateway(format!("{status}: {text}")));
        }
        response.json::<SnapTransaction>().await.map_err(|e| EcommerceError::PaymentGateway(e.to_string()))
    }
}

/// Compares without short-circuiting so the timing does not reveal the matching prefix.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn decimal_to_i64(d: Decimal) -> Result<i64> {
    i64::try_from(d).map_err(|e| EcommerceError::PaymentGateway(e.to_string()))
}
