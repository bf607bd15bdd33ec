//! HTTP error responses.
//!
//! Every function error is a 400 with `{"error": "<message>"}`; the preflight
//! probe answers a bad token with a 403 and `{"error": "Forbidden"}`.

use crate::payment::PaymentError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("Forbidden")]
    Forbidden,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Payment(e) => {
                tracing::warn!(error = %e, "Payment function failed");
                StatusCode::BAD_REQUEST
            }
            ApiError::Forbidden => StatusCode::FORBIDDEN,
        };
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
