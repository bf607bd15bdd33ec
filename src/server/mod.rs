//! HTTP service hosting the payment functions.
//!
//! # Routes
//!
//! - `GET /health` - health check
//! - `POST /functions/v1/create-razorpay-order` - bearer auth
//! - `POST /functions/v1/verify-razorpay-payment` - bearer auth
//! - `GET|POST /functions/v1/razorpay-preflight` - `x-debug-token`
//!
//! Handlers share no state beyond the [`AppState`] collaborators; every
//! request stands alone.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

use crate::config::ServiceConfig;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::map_response_body::MapResponseBodyLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Create the service router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/functions/v1/create-razorpay-order",
            post(handlers::create_order),
        )
        .route(
            "/functions/v1/verify-razorpay-payment",
            post(handlers::verify_payment),
        )
        .route(
            "/functions/v1/razorpay-preflight",
            get(handlers::preflight).post(handlers::preflight),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(MapResponseBodyLayer::new(axum::body::Body::new))
                .layer(RequestBodyLimitLayer::new(max_body_bytes))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    request_timeout_seconds,
                ))),
        )
        .with_state(state)
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let cors = if origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };
    cors.allow_methods(Any).allow_headers(Any)
}

/// Bind `config.listen_addr` and serve until Ctrl-C.
pub async fn serve(config: ServiceConfig) -> std::io::Result<()> {
    let listen_addr = config.listen_addr.clone();
    let state = AppState::from_config(config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    let app = create_router(state);

    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await
}
