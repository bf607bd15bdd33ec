//! Razorpay orders API client.

use super::PaymentError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error};

/// Body of `POST /orders`. `amount` is in the currency's smallest unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    pub amount: u64,
    pub currency: String,
    pub receipt: String,
}

/// An order as returned by the gateway. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Order {
    pub id: String,
    pub amount: u64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Client authenticated with a key id and secret (HTTP basic auth).
#[derive(Clone)]
pub struct RazorpayClient {
    client: Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl fmt::Debug for RazorpayClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RazorpayClient")
            .field("base_url", &self.base_url)
            .field("key_id", &self.key_id)
            .field("key_secret", &"<redacted>")
            .finish()
    }
}

impl RazorpayClient {
    pub fn new(
        base_url: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Result<Self, PaymentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PaymentError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Create an order. Any non-2xx answer is [`PaymentError::OrderFailed`];
    /// the gateway's body is logged, not returned.
    pub async fn create_order(&self, request: &OrderRequest) -> Result<Order, PaymentError> {
        debug!(
            amount = request.amount,
            currency = %request.currency,
            receipt = %request.receipt,
            "Creating Razorpay order"
        );

        let response = self
            .client
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!("Razorpay order request failed: {}", e);
                PaymentError::OrderFailed
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), %body, "Razorpay order creation failed");
            return Err(PaymentError::OrderFailed);
        }

        response.json::<Order>().await.map_err(|e| {
            error!("Unreadable Razorpay order: {}", e);
            PaymentError::OrderFailed
        })
    }
}
