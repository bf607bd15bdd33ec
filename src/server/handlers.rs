//! Route handlers.

use super::auth::AuthUser;
use super::error::ApiError;
use super::state::AppState;
use crate::payment::signature::constant_time_eq;
use crate::payment::{
    CreateOrderRequest, CreateOrderResponse, PaymentError, PreflightReport, VerifyPaymentRequest,
    VerifyPaymentResponse,
};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Parse a JSON body, reporting problems in the usual `{error}` shape.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::Payment(PaymentError::InvalidRequest(e.to_string())))
}

/// `POST /functions/v1/create-razorpay-order`
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    body: Bytes,
) -> Result<Json<CreateOrderResponse>, ApiError> {
    let request: CreateOrderRequest = parse_body(&body)?;
    let reply = state.payments.create_order(user.user_id, request).await?;
    Ok(Json(reply))
}

/// `POST /functions/v1/verify-razorpay-payment`
pub async fn verify_payment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    body: Bytes,
) -> Result<Json<VerifyPaymentResponse>, ApiError> {
    let request: VerifyPaymentRequest = parse_body(&body)?;
    let reply = state.payments.verify_payment(user.user_id, request).await?;
    Ok(Json(reply))
}

/// `GET|POST /functions/v1/razorpay-preflight`
///
/// Requires `x-debug-token` to match the configured token.
pub async fn preflight(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<PreflightReport>, ApiError> {
    let provided = headers.get("x-debug-token").and_then(|v| v.to_str().ok());
    match (state.config.debug_token.as_deref(), provided) {
        (Some(expected), Some(provided)) if constant_time_eq(expected, provided) => {}
        _ => return Err(ApiError::Forbidden),
    }

    let c = &state.config;
    Ok(Json(PreflightReport {
        has_razorpay_key_id: c.razorpay_key_id.is_some(),
        has_razorpay_key_secret: c.razorpay_key_secret.is_some(),
        has_supabase_url: c.supabase_url.is_some(),
        has_service_role_key: c.supabase_service_role_key.is_some(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "flipflow".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
