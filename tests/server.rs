//! HTTP tests for the payment functions.
//!
//! The gateway is a wiremock server; records and tokens live in memory.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use flipflow::payment::signature::payment_signature;
use flipflow::payment::{
    CreateOrderResponse, PaymentService, PreflightReport, RazorpayCredentials,
    VerifyPaymentResponse,
};
use flipflow::server::{create_router, AppState};
use flipflow::store::memory::{MemoryRecordStore, StaticTokenVerifier};
use flipflow::{RecordStore, Role, ServiceConfig, SubscriptionStatus, UserId};
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "user-access-token";
const KEY_ID: &str = "rzp_test_key";
const KEY_SECRET: &str = "rzp_test_secret";
const DEBUG_TOKEN: &str = "let-me-in";

struct TestHarness {
    server: TestServer,
    records: Arc<MemoryRecordStore>,
    user: UserId,
    gateway: MockServer,
}

impl TestHarness {
    async fn new() -> Self {
        Self::with_secret(Some(KEY_SECRET)).await
    }

    async fn with_secret(secret: Option<&str>) -> Self {
        let gateway = MockServer::start().await;
        let records = Arc::new(MemoryRecordStore::new());
        let user = UserId::generate();

        let payments = PaymentService::new(
            records.clone(),
            Arc::new(StaticTokenVerifier::new().with_token(TOKEN, user)),
            RazorpayCredentials {
                api_url: gateway.uri(),
                key_id: Some(KEY_ID.into()),
                key_secret: secret.map(String::from),
            },
        );
        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            supabase_url: Some("http://localhost:54321".into()),
            supabase_service_role_key: Some("service-role".into()),
            razorpay_key_id: Some(KEY_ID.into()),
            razorpay_key_secret: secret.map(String::from),
            razorpay_api_url: gateway.uri(),
            debug_token: Some(DEBUG_TOKEN.into()),
            ..ServiceConfig::default()
        };

        let server = TestServer::new(create_router(AppState::new(payments, config)))
            .expect("Failed to create test server");

        Self {
            server,
            records,
            user,
            gateway,
        }
    }

    fn auth(&self) -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static("authorization"),
            HeaderValue::from_str(&format!("Bearer {TOKEN}")).unwrap(),
        )
    }

    async fn mount_order(&self, order_id: &str, amount: u64) {
        Mock::given(method("POST"))
            .and(path("/orders"))
            .and(header_exists("authorization"))
            .and(body_partial_json(json!({ "amount": amount, "currency": "INR" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": order_id,
                "entity": "order",
                "amount": amount,
                "currency": "INR",
                "status": "created"
            })))
            .expect(1)
            .mount(&self.gateway)
            .await;
    }
}

fn order_body() -> Value {
    json!({ "amount": 999, "currency": "INR", "plan_type": "pro" })
}

// ── Health ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_service_name() {
    let h = TestHarness::new().await;
    let response = h.server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "flipflow");
}

// ── Authentication ───────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_authorization_header_is_rejected() {
    let h = TestHarness::new().await;
    let response = h
        .server
        .post("/functions/v1/create-razorpay-order")
        .json(&order_body())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "No authorization header");
}

#[tokio::test]
async fn unknown_token_is_unauthorized() {
    let h = TestHarness::new().await;
    let response = h
        .server
        .post("/functions/v1/create-razorpay-order")
        .add_header(
            HeaderName::from_static("authorization"),
            HeaderValue::from_static("Bearer forged"),
        )
        .json(&order_body())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Unauthorized");
}

// ── Orders ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn order_is_created_in_paise_and_recorded_pending() {
    let h = TestHarness::new().await;
    h.mount_order("order_Q1", 99_900).await;

    let (name, value) = h.auth();
    let response = h
        .server
        .post("/functions/v1/create-razorpay-order")
        .add_header(name, value)
        .json(&order_body())
        .await;

    response.assert_status_ok();
    let reply: CreateOrderResponse = response.json();
    assert_eq!(reply.order_id, "order_Q1");
    assert_eq!(reply.amount, 99_900);
    assert_eq!(reply.currency, "INR");
    assert_eq!(reply.razorpay_key_id, KEY_ID);

    let subs = h.records.subscriptions(h.user).await;
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].razorpay_order_id, "order_Q1");
    assert_eq!(subs[0].amount, 999);
    assert_eq!(subs[0].plan_type, "pro");
    assert_eq!(subs[0].status, SubscriptionStatus::Pending);
}

#[tokio::test]
async fn gateway_failure_records_nothing() {
    let h = TestHarness::new().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "code": "BAD_REQUEST_ERROR", "description": "Authentication failed" }
        })))
        .mount(&h.gateway)
        .await;

    let (name, value) = h.auth();
    let response = h
        .server
        .post("/functions/v1/create-razorpay-order")
        .add_header(name, value)
        .json(&order_body())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Failed to create Razorpay order");
    assert!(h.records.subscriptions(h.user).await.is_empty());
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let h = TestHarness::new().await;
    let (name, value) = h.auth();
    let response = h
        .server
        .post("/functions/v1/create-razorpay-order")
        .add_header(name, value)
        .json(&json!({ "amount": "lots" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid request"));
}

// ── Verification ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn valid_signature_activates_subscription_and_upgrades() {
    let h = TestHarness::new().await;
    h.mount_order("order_Q1", 99_900).await;

    let (name, value) = h.auth();
    h.server
        .post("/functions/v1/create-razorpay-order")
        .add_header(name.clone(), value.clone())
        .json(&order_body())
        .await
        .assert_status_ok();

    let signature = payment_signature(KEY_SECRET, "order_Q1", "pay_77");
    let response = h
        .server
        .post("/functions/v1/verify-razorpay-payment")
        .add_header(name, value)
        .json(&json!({
            "razorpay_order_id": "order_Q1",
            "razorpay_payment_id": "pay_77",
            "razorpay_signature": signature,
        }))
        .await;

    response.assert_status_ok();
    let reply: VerifyPaymentResponse = response.json();
    assert!(reply.success);
    assert_eq!(reply.message, "Payment verified and user upgraded to Pro");

    let subs = h.records.subscriptions(h.user).await;
    assert_eq!(subs[0].status, SubscriptionStatus::Active);
    assert_eq!(subs[0].razorpay_payment_id.as_deref(), Some("pay_77"));
    assert!(subs[0].started_at.is_some());
    assert_eq!(h.records.get_user_role(h.user).await.unwrap(), Role::Pro);
}

#[tokio::test]
async fn tampered_signature_changes_nothing() {
    let h = TestHarness::new().await;
    h.mount_order("order_Q1", 99_900).await;

    let (name, value) = h.auth();
    h.server
        .post("/functions/v1/create-razorpay-order")
        .add_header(name.clone(), value.clone())
        .json(&order_body())
        .await
        .assert_status_ok();

    let signature = payment_signature(KEY_SECRET, "order_Q1", "pay_other");
    let response = h
        .server
        .post("/functions/v1/verify-razorpay-payment")
        .add_header(name, value)
        .json(&json!({
            "razorpay_order_id": "order_Q1",
            "razorpay_payment_id": "pay_77",
            "razorpay_signature": signature,
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Invalid payment signature");

    let subs = h.records.subscriptions(h.user).await;
    assert_eq!(subs[0].status, SubscriptionStatus::Pending);
    assert_eq!(h.records.get_user_role(h.user).await.unwrap(), Role::Free);
}

#[tokio::test]
async fn verify_without_secret_is_rejected() {
    let h = TestHarness::with_secret(None).await;
    let (name, value) = h.auth();
    let response = h
        .server
        .post("/functions/v1/verify-razorpay-payment")
        .add_header(name, value)
        .json(&json!({
            "razorpay_order_id": "order_Q1",
            "razorpay_payment_id": "pay_77",
            "razorpay_signature": "00",
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Razorpay secret not configured");
}

#[tokio::test]
async fn verify_for_unknown_order_fails_to_update() {
    let h = TestHarness::new().await;
    let (name, value) = h.auth();
    let signature = payment_signature(KEY_SECRET, "order_missing", "pay_1");
    let response = h
        .server
        .post("/functions/v1/verify-razorpay-payment")
        .add_header(name, value)
        .json(&json!({
            "razorpay_order_id": "order_missing",
            "razorpay_payment_id": "pay_1",
            "razorpay_signature": signature,
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Failed to update subscription");
    assert_eq!(h.records.get_user_role(h.user).await.unwrap(), Role::Free);
}

// ── Preflight ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn preflight_requires_debug_token() {
    let h = TestHarness::new().await;

    let response = h.server.get("/functions/v1/razorpay-preflight").await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["error"], "Forbidden");

    let response = h
        .server
        .get("/functions/v1/razorpay-preflight")
        .add_header(
            HeaderName::from_static("x-debug-token"),
            HeaderValue::from_static("wrong"),
        )
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn preflight_reports_presence_only() {
    let h = TestHarness::with_secret(None).await;
    let response = h
        .server
        .post("/functions/v1/razorpay-preflight")
        .add_header(
            HeaderName::from_static("x-debug-token"),
            HeaderValue::from_static(DEBUG_TOKEN),
        )
        .await;

    response.assert_status_ok();
    let report: PreflightReport = response.json();
    assert_eq!(
        report,
        PreflightReport {
            has_razorpay_key_id: true,
            has_razorpay_key_secret: false,
            has_supabase_url: true,
            has_service_role_key: true,
        }
    );
    assert!(!response.text().contains("service-role"));
}
