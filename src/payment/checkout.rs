//! Client side of the upgrade: call the two payment functions and build the
//! options for the gateway's checkout overlay.

use super::{
    CreateOrderRequest, CreateOrderResponse, PaymentError, VerifyPaymentRequest,
    VerifyPaymentResponse,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// What the Pro upgrade costs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradePlan {
    /// Whole currency units.
    pub amount: u64,
    pub currency: String,
    pub plan_type: String,
}

impl Default for UpgradePlan {
    fn default() -> Self {
        Self {
            amount: 999,
            currency: "INR".into(),
            plan_type: "pro".into(),
        }
    }
}

impl UpgradePlan {
    pub fn order_request(&self) -> CreateOrderRequest {
        CreateOrderRequest {
            amount: self.amount,
            currency: self.currency.clone(),
            plan_type: self.plan_type.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutPrefill {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutTheme {
    pub color: String,
}

/// Options passed to the gateway's checkout overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutOptions {
    pub key: String,
    pub amount: u64,
    pub currency: String,
    pub name: String,
    pub description: String,
    pub order_id: String,
    pub prefill: CheckoutPrefill,
    pub theme: CheckoutTheme,
}

impl CheckoutOptions {
    pub fn for_order(order: &CreateOrderResponse, email: Option<&str>) -> Self {
        Self {
            key: order.razorpay_key_id.clone(),
            amount: order.amount,
            currency: order.currency.clone(),
            name: "FlipFlow".into(),
            description: "Pro Plan - Unlimited Flipbooks".into(),
            order_id: order.order_id.clone(),
            prefill: CheckoutPrefill {
                email: email.unwrap_or_default().to_string(),
            },
            theme: CheckoutTheme {
                color: "#8B5CF6".into(),
            },
        }
    }
}

/// What the overlay hands back after a completed payment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentReceipt {
    pub razorpay_payment_id: String,
    pub razorpay_order_id: String,
    pub razorpay_signature: String,
}

impl From<PaymentReceipt> for VerifyPaymentRequest {
    fn from(r: PaymentReceipt) -> Self {
        Self {
            razorpay_payment_id: r.razorpay_payment_id,
            razorpay_order_id: r.razorpay_order_id,
            razorpay_signature: r.razorpay_signature,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FunctionError {
    error: String,
}

/// Calls the payment functions as the signed-in user.
#[derive(Clone)]
pub struct FunctionsClient {
    client: Client,
    /// e.g. `https://<project>.supabase.co/functions/v1`
    base_url: String,
    access_token: String,
}

impl fmt::Debug for FunctionsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionsClient")
            .field("base_url", &self.base_url)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl FunctionsClient {
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, PaymentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PaymentError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    pub async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<CreateOrderResponse, PaymentError> {
        self.invoke("create-razorpay-order", request).await
    }

    pub async fn verify_payment(
        &self,
        receipt: PaymentReceipt,
    ) -> Result<VerifyPaymentResponse, PaymentError> {
        let request = VerifyPaymentRequest::from(receipt);
        self.invoke("verify-razorpay-payment", &request).await
    }

    /// Create the order for `plan` and build the checkout overlay options.
    pub async fn start_checkout(
        &self,
        plan: &UpgradePlan,
        email: Option<&str>,
    ) -> Result<CheckoutOptions, PaymentError> {
        let order = self.create_order(&plan.order_request()).await?;
        Ok(CheckoutOptions::for_order(&order, email))
    }

    async fn invoke<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        function: &str,
        body: &B,
    ) -> Result<T, PaymentError> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, function))
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| PaymentError::Transport(e.to_string()));
        }

        let message = response
            .json::<FunctionError>()
            .await
            .map(|e| e.error)
            .unwrap_or_else(|_| format!("HTTP {status}"));
        Err(PaymentError::Rejected(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_options_from_order() {
        let order = CreateOrderResponse {
            order_id: "order_9".into(),
            amount: 99_900,
            currency: "INR".into(),
            razorpay_key_id: "rzp_test_key".into(),
        };
        let opts = CheckoutOptions::for_order(&order, None);
        assert_eq!(opts.key, "rzp_test_key");
        assert_eq!(opts.amount, 99_900);
        assert_eq!(opts.name, "FlipFlow");
        assert_eq!(opts.description, "Pro Plan - Unlimited Flipbooks");
        assert_eq!(opts.theme.color, "#8B5CF6");
        assert_eq!(opts.prefill.email, "");
    }

    #[test]
    fn default_plan_is_pro_in_rupees() {
        let req = UpgradePlan::default().order_request();
        assert_eq!(req.amount, 999);
        assert_eq!(req.currency, "INR");
        assert_eq!(req.plan_type, "pro");
    }

    #[tokio::test]
    async fn start_checkout_calls_order_function_with_bearer() {
        use wiremock::matchers::{header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/functions/v1/create-razorpay-order"))
            .and(header("authorization", "Bearer jwt-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "order_id": "order_5",
                "amount": 99_900,
                "currency": "INR",
                "razorpay_key_id": "rzp_live_key"
            })))
            .mount(&server)
            .await;

        let client =
            FunctionsClient::new(format!("{}/functions/v1/", server.uri()), "jwt-1").unwrap();
        let opts = client
            .start_checkout(&UpgradePlan::default(), Some("owner@example.com"))
            .await
            .unwrap();
        assert_eq!(opts.order_id, "order_5");
        assert_eq!(opts.key, "rzp_live_key");
        assert_eq!(opts.prefill.email, "owner@example.com");
    }

    #[tokio::test]
    async fn function_error_body_becomes_rejection() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify-razorpay-payment"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({ "error": "Invalid payment signature" })),
            )
            .mount(&server)
            .await;

        let client = FunctionsClient::new(server.uri(), "jwt-1").unwrap();
        let err = client
            .verify_payment(PaymentReceipt {
                razorpay_payment_id: "pay_1".into(),
                razorpay_order_id: "order_1".into(),
                razorpay_signature: "00".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, PaymentError::Rejected("Invalid payment signature".into()));
    }
}
