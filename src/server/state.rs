//! Application state.

use crate::config::ServiceConfig;
use crate::payment::{PaymentService, RazorpayCredentials};
use crate::store::supabase::SupabaseClient;
use crate::store::StoreError;
use std::sync::Arc;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub payments: PaymentService,
    pub config: ServiceConfig,
}

impl AppState {
    pub fn new(payments: PaymentService, config: ServiceConfig) -> Self {
        Self { payments, config }
    }

    /// Build the state against the configured Supabase project.
    ///
    /// Missing Supabase settings do not stop the service from starting:
    /// record writes and token checks then fail per request, and the
    /// preflight probe reports what is missing.
    pub fn from_config(config: ServiceConfig) -> Result<Self, StoreError> {
        if config.supabase_url.is_none() || config.supabase_service_role_key.is_none() {
            tracing::warn!("Supabase not configured - every authenticated call will be rejected");
        }
        if config.razorpay_key_id.is_none() || config.razorpay_key_secret.is_none() {
            tracing::warn!("Razorpay not configured - orders cannot be created");
        }

        let supabase = Arc::new(SupabaseClient::new(
            config.supabase_url.clone().unwrap_or_default(),
            config.supabase_service_role_key.clone().unwrap_or_default(),
        )?);

        let payments = PaymentService::new(
            supabase.clone(),
            supabase,
            RazorpayCredentials {
                api_url: config.razorpay_api_url.clone(),
                key_id: config.razorpay_key_id.clone(),
                key_secret: config.razorpay_key_secret.clone(),
            },
        );

        Ok(Self::new(payments, config))
    }
}
