//! Configuration types.
//!
//! Rendering and workflow behaviour is controlled through [`FlipbookConfig`],
//! built via its [`FlipbookConfigBuilder`]. The service half (the two payment
//! functions and the preflight probe) reads [`ServiceConfig`] from the
//! environment.

use crate::error::FlipbookError;
use crate::model::Role;
use crate::progress::RenderProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

const MB: u64 = 1024 * 1024;

/// Configuration for rendering, viewing and creating flipbooks.
///
/// Built via [`FlipbookConfig::builder()`] or [`FlipbookConfig::default()`].
///
/// # Example
/// ```rust
/// use flipflow::FlipbookConfig;
///
/// let config = FlipbookConfig::builder()
///     .render_scale(1.5)
///     .page_quality(85)
///     .build()
///     .unwrap();
/// assert_eq!(config.page_quality, 85);
/// ```
#[derive(Clone)]
pub struct FlipbookConfig {
    /// Oversampling scale for full-deck page renders. Range: 0.25–4.0. Default: 2.0.
    ///
    /// Pages are shown at roughly 800 px; rendering at 2× keeps text sharp on
    /// high-density screens without producing multi-megabyte images.
    pub render_scale: f32,

    /// Scale for the single-page thumbnail render. Default: 0.5.
    pub thumbnail_scale: f32,

    /// JPEG quality (1–100) for deck pages. Default: 90.
    pub page_quality: u8,

    /// JPEG quality (1–100) for thumbnails. Default: 80.
    pub thumbnail_quality: u8,

    /// Display width used when the first page is landscape. Default: 800.
    pub landscape_width: u32,

    /// Display height used when the first page is portrait or square. Default: 733.
    pub portrait_height: u32,

    /// Smallest size the flip widget may shrink to, as a fraction of the
    /// display box. Default: 0.5.
    pub min_size_factor: f32,

    /// Largest size the flip widget may grow to, as a multiple of the display
    /// box. Default: 2.0.
    pub max_size_factor: f32,

    /// Download timeout for URL sources in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-tier upload limits.
    pub plan_limits: PlanLimits,

    /// Remove the PDF, thumbnail and styling images when a flipbook is
    /// deleted. Default: false (storage objects are left behind).
    pub cleanup_assets_on_delete: bool,

    /// Optional per-page render progress callback.
    pub progress_callback: Option<Arc<dyn RenderProgressCallback>>,
}

impl Default for FlipbookConfig {
    fn default() -> Self {
        Self {
            render_scale: 2.0,
            thumbnail_scale: 0.5,
            page_quality: 90,
            thumbnail_quality: 80,
            landscape_width: 800,
            portrait_height: 733,
            min_size_factor: 0.5,
            max_size_factor: 2.0,
            download_timeout_secs: 120,
            plan_limits: PlanLimits::default(),
            cleanup_assets_on_delete: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for FlipbookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlipbookConfig")
            .field("render_scale", &self.render_scale)
            .field("thumbnail_scale", &self.thumbnail_scale)
            .field("page_quality", &self.page_quality)
            .field("thumbnail_quality", &self.thumbnail_quality)
            .field("landscape_width", &self.landscape_width)
            .field("portrait_height", &self.portrait_height)
            .field("min_size_factor", &self.min_size_factor)
            .field("max_size_factor", &self.max_size_factor)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("plan_limits", &self.plan_limits)
            .field("cleanup_assets_on_delete", &self.cleanup_assets_on_delete)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn RenderProgressCallback>"),
            )
            .finish()
    }
}

impl FlipbookConfig {
    /// Create a new builder for `FlipbookConfig`.
    pub fn builder() -> FlipbookConfigBuilder {
        FlipbookConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`FlipbookConfig`].
#[derive(Debug)]
pub struct FlipbookConfigBuilder {
    config: FlipbookConfig,
}

impl FlipbookConfigBuilder {
    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale.clamp(0.25, 4.0);
        self
    }

    pub fn thumbnail_scale(mut self, scale: f32) -> Self {
        self.config.thumbnail_scale = scale.clamp(0.1, 2.0);
        self
    }

    pub fn page_quality(mut self, quality: u8) -> Self {
        self.config.page_quality = quality.clamp(1, 100);
        self
    }

    pub fn thumbnail_quality(mut self, quality: u8) -> Self {
        self.config.thumbnail_quality = quality.clamp(1, 100);
        self
    }

    pub fn landscape_width(mut self, px: u32) -> Self {
        self.config.landscape_width = px;
        self
    }

    pub fn portrait_height(mut self, px: u32) -> Self {
        self.config.portrait_height = px;
        self
    }

    pub fn size_factors(mut self, min: f32, max: f32) -> Self {
        self.config.min_size_factor = min;
        self.config.max_size_factor = max;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn plan_limits(mut self, limits: PlanLimits) -> Self {
        self.config.plan_limits = limits;
        self
    }

    pub fn cleanup_assets_on_delete(mut self, v: bool) -> Self {
        self.config.cleanup_assets_on_delete = v;
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn RenderProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<FlipbookConfig, FlipbookError> {
        let c = &self.config;
        if c.landscape_width == 0 || c.portrait_height == 0 {
            return Err(FlipbookError::InvalidConfig(
                "display dimensions must be non-zero".into(),
            ));
        }
        if !(c.min_size_factor > 0.0 && c.min_size_factor <= 1.0) {
            return Err(FlipbookError::InvalidConfig(format!(
                "min_size_factor must be in (0, 1], got {}",
                c.min_size_factor
            )));
        }
        if c.max_size_factor < 1.0 {
            return Err(FlipbookError::InvalidConfig(format!(
                "max_size_factor must be ≥ 1, got {}",
                c.max_size_factor
            )));
        }
        if c.plan_limits.free.max_file_bytes == 0 || c.plan_limits.pro.max_file_bytes == 0 {
            return Err(FlipbookError::InvalidConfig(
                "file size limits must be non-zero".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Plan limits ──────────────────────────────────────────────────────────

/// Upload limits for one plan tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    /// Largest accepted PDF, inclusive.
    pub max_file_bytes: u64,
    /// Largest number of flipbooks a user may own. `None` means unlimited.
    pub max_flipbooks: Option<usize>,
}

impl TierLimits {
    /// The size limit in whole megabytes, as shown to users.
    pub fn max_file_mb(&self) -> u64 {
        self.max_file_bytes / MB
    }
}

/// Limits for both plan tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub free: TierLimits,
    pub pro: TierLimits,
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self {
            free: TierLimits {
                max_file_bytes: 10 * MB,
                max_flipbooks: Some(3),
            },
            pro: TierLimits {
                max_file_bytes: 50 * MB,
                max_flipbooks: None,
            },
        }
    }
}

impl PlanLimits {
    pub fn for_role(&self, role: Role) -> &TierLimits {
        match role {
            Role::Free => &self.free,
            Role::Pro => &self.pro,
        }
    }
}

// ── Page selection ───────────────────────────────────────────────────────

/// Specifies which pages of the PDF to render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Every page (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

// ── Service configuration ────────────────────────────────────────────────

/// Environment-driven configuration for the payment service.
#[derive(Clone)]
pub struct ServiceConfig {
    /// Address to bind, e.g. `0.0.0.0:8080`.
    pub listen_addr: String,
    /// Base URL of the Supabase project.
    pub supabase_url: Option<String>,
    /// Service-role key used for privileged record writes.
    pub supabase_service_role_key: Option<String>,
    /// Publishable Razorpay key id, returned to clients for checkout.
    pub razorpay_key_id: Option<String>,
    /// Razorpay secret used for order creation and signature checks.
    pub razorpay_key_secret: Option<String>,
    /// Razorpay REST base URL.
    pub razorpay_api_url: String,
    /// Shared token guarding the preflight probe.
    pub debug_token: Option<String>,
    /// Allowed CORS origins (`*` for any).
    pub cors_origins: Vec<String>,
    pub max_body_bytes: usize,
    pub request_timeout_seconds: u64,
}

impl ServiceConfig {
    pub const DEFAULT_RAZORPAY_API_URL: &'static str = "https://api.razorpay.com/v1";

    /// Read configuration from the process environment.
    ///
    /// Empty variables count as unset.
    pub fn from_env() -> Self {
        fn var(name: &str) -> Option<String> {
            std::env::var(name).ok().filter(|v| !v.trim().is_empty())
        }

        Self {
            listen_addr: var("LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:8080".into()),
            supabase_url: var("SUPABASE_URL"),
            supabase_service_role_key: var("SUPABASE_SERVICE_ROLE_KEY"),
            razorpay_key_id: var("RAZORPAY_KEY_ID"),
            razorpay_key_secret: var("RAZORPAY_KEY_SECRET"),
            razorpay_api_url: var("RAZORPAY_API_URL")
                .unwrap_or_else(|| Self::DEFAULT_RAZORPAY_API_URL.into()),
            debug_token: var("DEBUG_TOKEN"),
            cors_origins: var("CORS_ORIGINS")
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|| vec!["*".into()]),
            max_body_bytes: var("MAX_BODY_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(64 * 1024),
            request_timeout_seconds: var("REQUEST_TIMEOUT_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            supabase_url: None,
            supabase_service_role_key: None,
            razorpay_key_id: None,
            razorpay_key_secret: None,
            razorpay_api_url: Self::DEFAULT_RAZORPAY_API_URL.into(),
            debug_token: None,
            cors_origins: vec!["*".into()],
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 30,
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("ServiceConfig")
            .field("listen_addr", &self.listen_addr)
            .field("supabase_url", &self.supabase_url)
            .field("supabase_service_role_key", &redact(&self.supabase_service_role_key))
            .field("razorpay_key_id", &self.razorpay_key_id)
            .field("razorpay_key_secret", &redact(&self.razorpay_key_secret))
            .field("razorpay_api_url", &self.razorpay_api_url)
            .field("debug_token", &redact(&self.debug_token))
            .field("cors_origins", &self.cors_origins)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_product_limits() {
        let c = FlipbookConfig::default();
        assert_eq!(c.plan_limits.free.max_file_mb(), 10);
        assert_eq!(c.plan_limits.pro.max_file_mb(), 50);
        assert_eq!(c.plan_limits.free.max_flipbooks, Some(3));
        assert_eq!(c.plan_limits.pro.max_flipbooks, None);
        assert_eq!(c.render_scale, 2.0);
        assert_eq!(c.thumbnail_scale, 0.5);
    }

    #[test]
    fn builder_clamps_quality_and_scale() {
        let c = FlipbookConfig::builder()
            .page_quality(0)
            .render_scale(100.0)
            .build()
            .unwrap();
        assert_eq!(c.page_quality, 1);
        assert_eq!(c.render_scale, 4.0);

        let low = FlipbookConfig::builder().thumbnail_scale(0.01).build().unwrap();
        let high = FlipbookConfig::builder().thumbnail_scale(3.0).build().unwrap();
        assert_eq!(low.thumbnail_scale, 0.1);
        assert_eq!(high.thumbnail_scale, 2.0);
    }

    #[test]
    fn builder_rejects_bad_factors() {
        assert!(FlipbookConfig::builder().size_factors(0.0, 2.0).build().is_err());
        assert!(FlipbookConfig::builder().size_factors(0.5, 0.9).build().is_err());
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(5), vec![0, 1, 2, 3, 4]);
        assert_eq!(PageSelection::Single(1).to_indices(5), vec![0]);
        assert_eq!(PageSelection::Single(6).to_indices(5), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(2, 4).to_indices(5), vec![1, 2, 3]);
        assert_eq!(PageSelection::Set(vec![3, 1, 3]).to_indices(5), vec![0, 2]);
    }

    #[test]
    fn service_config_debug_redacts_secrets() {
        let c = ServiceConfig {
            razorpay_key_secret: Some("shh".into()),
            ..ServiceConfig::default()
        };
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("shh"));
        assert!(dbg.contains("<redacted>"));
    }
}
