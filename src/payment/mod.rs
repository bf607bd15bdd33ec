//! The Pro upgrade: order creation, signature verification, role upgrade.
//!
//! ```text
//! client ──create-razorpay-order──▶ PaymentService::create_order ──▶ gateway /orders
//!    │                                   └─▶ subscriptions (pending)
//!    ├── gateway checkout overlay (out of band)
//!    └──verify-razorpay-payment──▶ PaymentService::verify_payment
//!                                        ├─▶ subscriptions (active)
//!                                        └─▶ user_roles (pro)
//! ```
//!
//! [`PaymentService`] is the server side; [`checkout`] is the client side
//! that calls it over HTTP. Every failure is a [`PaymentError`] whose
//! `Display` text is the message returned to the client.

pub mod checkout;
pub mod razorpay;
pub mod signature;

use crate::model::{NewSubscription, Role, SubscriptionStatus, UserId};
use crate::store::{AuthVerifier, RecordStore};
use chrono::Utc;
use razorpay::{OrderRequest, RazorpayClient};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

pub use checkout::{CheckoutOptions, FunctionsClient, PaymentReceipt, UpgradePlan};

/// Payment failure. The `Display` text is returned to the client as is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("No authorization header")]
    MissingAuthorization,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Razorpay credentials not configured")]
    CredentialsNotConfigured,

    #[error("Razorpay secret not configured")]
    SecretNotConfigured,

    #[error("Failed to create Razorpay order")]
    OrderFailed,

    #[error("Failed to record order")]
    OrderRecordFailed,

    #[error("Invalid payment signature")]
    InvalidSignature,

    #[error("Failed to update subscription")]
    SubscriptionUpdateFailed,

    #[error("Failed to update user role")]
    RoleUpdateFailed,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Error returned by a payment function, seen from the client.
    #[error("{0}")]
    Rejected(String),

    /// Transport failure seen from the client.
    #[error("Payment service unreachable: {0}")]
    Transport(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Wire types ───────────────────────────────────────────────────────────

/// Body of `create-razorpay-order`. `amount` is in whole currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub amount: u64,
    pub currency: String,
    pub plan_type: String,
}

/// Reply of `create-razorpay-order`. `amount` is as the gateway reports it
/// (smallest currency unit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub amount: u64,
    pub currency: String,
    pub razorpay_key_id: String,
}

/// Body of `verify-razorpay-payment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyPaymentRequest {
    pub razorpay_payment_id: String,
    pub razorpay_order_id: String,
    pub razorpay_signature: String,
}

/// Reply of `verify-razorpay-payment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub message: String,
}

/// Which secrets are configured. Never the values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreflightReport {
    pub has_razorpay_key_id: bool,
    pub has_razorpay_key_secret: bool,
    pub has_supabase_url: bool,
    pub has_service_role_key: bool,
}

// ── Service ──────────────────────────────────────────────────────────────

/// Razorpay credentials as configured. Either may be missing.
#[derive(Clone, Default)]
pub struct RazorpayCredentials {
    pub api_url: String,
    pub key_id: Option<String>,
    pub key_secret: Option<String>,
}

impl std::fmt::Debug for RazorpayCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayCredentials")
            .field("api_url", &self.api_url)
            .field("key_id", &self.key_id)
            .field("key_secret", &self.key_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Server side of the upgrade handshake.
#[derive(Clone)]
pub struct PaymentService {
    records: Arc<dyn RecordStore>,
    auth: Arc<dyn AuthVerifier>,
    credentials: RazorpayCredentials,
}

impl PaymentService {
    pub fn new(
        records: Arc<dyn RecordStore>,
        auth: Arc<dyn AuthVerifier>,
        credentials: RazorpayCredentials,
    ) -> Self {
        Self {
            records,
            auth,
            credentials,
        }
    }

    /// Resolve an `Authorization` header value to a user.
    ///
    /// A leading `Bearer ` is stripped; anything else is taken as the token.
    pub async fn authenticate(&self, header: Option<&str>) -> Result<UserId, PaymentError> {
        let header = header.ok_or(PaymentError::MissingAuthorization)?;
        let token = header.strip_prefix("Bearer ").unwrap_or(header);
        self.auth.verify(token).await.map_err(|e| {
            warn!("Token rejected: {}", e);
            PaymentError::Unauthorized
        })
    }

    /// Create a gateway order and record it as a pending subscription.
    ///
    /// Not idempotent: every call creates a new order and a new row.
    pub async fn create_order(
        &self,
        user: UserId,
        request: CreateOrderRequest,
    ) -> Result<CreateOrderResponse, PaymentError> {
        let (key_id, key_secret) = match (&self.credentials.key_id, &self.credentials.key_secret) {
            (Some(id), Some(secret)) => (id, secret),
            _ => return Err(PaymentError::CredentialsNotConfigured),
        };
        let client = RazorpayClient::new(&self.credentials.api_url, key_id, key_secret)?;

        let amount = request
            .amount
            .checked_mul(100)
            .ok_or_else(|| PaymentError::InvalidRequest("amount too large".into()))?;
        let order = client
            .create_order(&OrderRequest {
                amount,
                currency: request.currency.clone(),
                receipt: format!("receipt_{}_{}", user, Utc::now().timestamp_millis()),
            })
            .await?;

        self.records
            .insert_subscription(NewSubscription {
                user_id: user,
                razorpay_order_id: order.id.clone(),
                plan_type: request.plan_type,
                amount: request.amount,
                currency: request.currency,
                status: SubscriptionStatus::Pending,
            })
            .await
            .map_err(|e| {
                error!(user_id = %user, order_id = %order.id, "Failed to record order: {}", e);
                PaymentError::OrderRecordFailed
            })?;

        info!(user_id = %user, order_id = %order.id, "Order created");
        Ok(CreateOrderResponse {
            order_id: order.id,
            amount: order.amount,
            currency: order.currency,
            razorpay_key_id: client.key_id().to_string(),
        })
    }

    /// Check the gateway signature, activate the subscription, upgrade the user.
    ///
    /// Nothing is written unless the signature matches.
    pub async fn verify_payment(
        &self,
        user: UserId,
        request: VerifyPaymentRequest,
    ) -> Result<VerifyPaymentResponse, PaymentError> {
        let secret = self
            .credentials
            .key_secret
            .as_deref()
            .ok_or(PaymentError::SecretNotConfigured)?;

        if !signature::verify_payment_signature(
            secret,
            &request.razorpay_order_id,
            &request.razorpay_payment_id,
            &request.razorpay_signature,
        ) {
            error!(user_id = %user, order_id = %request.razorpay_order_id, "Signature verification failed");
            return Err(PaymentError::InvalidSignature);
        }
        info!(user_id = %user, "Payment verified");

        self.records
            .activate_subscription(
                user,
                &request.razorpay_order_id,
                &request.razorpay_payment_id,
                Utc::now(),
            )
            .await
            .map_err(|e| {
                error!(user_id = %user, "Failed to update subscription: {}", e);
                PaymentError::SubscriptionUpdateFailed
            })?;

        self.records
            .upsert_user_role(user, Role::Pro)
            .await
            .map_err(|e| {
                error!(user_id = %user, "Failed to update user role: {}", e);
                PaymentError::RoleUpdateFailed
            })?;

        info!(user_id = %user, "User upgraded to Pro");
        Ok(VerifyPaymentResponse {
            success: true,
            message: "Payment verified and user upgraded to Pro".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{MemoryRecordStore, StaticTokenVerifier};

    fn service(records: Arc<MemoryRecordStore>, user: UserId, secret: Option<&str>) -> PaymentService {
        PaymentService::new(
            records,
            Arc::new(StaticTokenVerifier::new().with_token("tok", user)),
            RazorpayCredentials {
                api_url: "http://127.0.0.1:9".into(),
                key_id: Some("rzp_test".into()),
                key_secret: secret.map(String::from),
            },
        )
    }

    #[tokio::test]
    async fn authenticate_requires_header_and_valid_token() {
        let user = UserId::generate();
        let svc = service(Arc::new(MemoryRecordStore::new()), user, Some("s"));
        assert_eq!(
            svc.authenticate(None).await,
            Err(PaymentError::MissingAuthorization)
        );
        assert_eq!(
            svc.authenticate(Some("Bearer nope")).await,
            Err(PaymentError::Unauthorized)
        );
        assert_eq!(svc.authenticate(Some("Bearer tok")).await, Ok(user));
    }

    #[tokio::test]
    async fn create_order_needs_both_credentials() {
        let user = UserId::generate();
        let svc = service(Arc::new(MemoryRecordStore::new()), user, None);
        let err = svc
            .create_order(
                user,
                CreateOrderRequest {
                    amount: 999,
                    currency: "INR".into(),
                    plan_type: "pro".into(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, PaymentError::CredentialsNotConfigured);
    }

    #[tokio::test]
    async fn bad_signature_changes_nothing() {
        let records = Arc::new(MemoryRecordStore::new());
        let user = UserId::generate();
        records
            .insert_subscription(NewSubscription {
                user_id: user,
                razorpay_order_id: "order_1".into(),
                plan_type: "pro".into(),
                amount: 999,
                currency: "INR".into(),
                status: SubscriptionStatus::Pending,
            })
            .await
            .unwrap();
        let svc = service(records.clone(), user, Some("secret"));

        let err = svc
            .verify_payment(
                user,
                VerifyPaymentRequest {
                    razorpay_payment_id: "pay_1".into(),
                    razorpay_order_id: "order_1".into(),
                    razorpay_signature: "deadbeef".into(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, PaymentError::InvalidSignature);
        assert_eq!(records.get_user_role(user).await.unwrap(), Role::Free);
        assert_eq!(
            records.subscriptions(user).await[0].status,
            SubscriptionStatus::Pending
        );
    }

    #[tokio::test]
    async fn good_signature_upgrades() {
        let records = Arc::new(MemoryRecordStore::new());
        let user = UserId::generate();
        records
            .insert_subscription(NewSubscription {
                user_id: user,
                razorpay_order_id: "order_1".into(),
                plan_type: "pro".into(),
                amount: 999,
                currency: "INR".into(),
                status: SubscriptionStatus::Pending,
            })
            .await
            .unwrap();
        let svc = service(records.clone(), user, Some("secret"));

        let reply = svc
            .verify_payment(
                user,
                VerifyPaymentRequest {
                    razorpay_payment_id: "pay_1".into(),
                    razorpay_order_id: "order_1".into(),
                    razorpay_signature: signature::payment_signature("secret", "order_1", "pay_1"),
                },
            )
            .await
            .unwrap();
        assert!(reply.success);
        assert_eq!(reply.message, "Payment verified and user upgraded to Pro");
        assert_eq!(records.get_user_role(user).await.unwrap(), Role::Pro);
        let sub = &records.subscriptions(user).await[0];
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.razorpay_payment_id.as_deref(), Some("pay_1"));
        assert!(sub.started_at.is_some());
    }

    #[tokio::test]
    async fn missing_secret_is_reported() {
        let user = UserId::generate();
        let svc = service(Arc::new(MemoryRecordStore::new()), user, None);
        let err = svc
            .verify_payment(
                user,
                VerifyPaymentRequest {
                    razorpay_payment_id: "p".into(),
                    razorpay_order_id: "o".into(),
                    razorpay_signature: "s".into(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, PaymentError::SecretNotConfigured);
    }
}
