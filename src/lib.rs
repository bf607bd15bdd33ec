//! # flipflow
//!
//! Turn uploaded PDFs into interactive page-flip books.
//!
//! A flipbook is a stored PDF plus a record describing how to show it. The
//! viewer never keeps pre-rendered pages: every open rasterises the PDF
//! again, page by page, into JPEG images that a page-turning widget shows
//! as leaves.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF (upload or public URL)
//!  │
//!  ├─ 1. Input     resolve URL / local file / in-memory bytes
//!  ├─ 2. Inspect   page count + first page size (sets the display box)
//!  ├─ 3. Render    rasterise pages via pdfium (spawn_blocking, in order)
//!  ├─ 4. Encode    RGBA → JPEG → data URL
//!  └─ 5. Assemble  leaves: hard covers, soft interior pages with footers
//! ```
//!
//! Around it sit the workflows: creating a flipbook (plan limits, upload,
//! best-effort thumbnail), editing and deleting it, counting views, and
//! the Razorpay upgrade from the free plan to Pro.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flipflow::{render_deck, CancelToken, FlipbookConfig, PdfSource, PdfiumRasterizer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FlipbookConfig::default();
//!     let rasterizer = PdfiumRasterizer::from_config(&config)?;
//!     let deck = render_deck(
//!         &rasterizer,
//!         PdfSource::parse("brochure.pdf"),
//!         &config,
//!         CancelToken::new(),
//!     )
//!     .await?;
//!     println!("{} pages at {}x{}", deck.page_count(), deck.display.width, deck.display.height);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | axum service for the order / verify / preflight functions |
//! | `cli`    | on      | Enables the `flipflow` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable both when embedding only the library:
//! ```toml
//! flipflow = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod deck;
pub mod error;
pub mod model;
pub mod payment;
pub mod pipeline;
pub mod progress;
pub mod store;
pub mod stream;
pub mod viewer;
pub mod workflow;

#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    FlipbookConfig, FlipbookConfigBuilder, PageSelection, PlanLimits, ServiceConfig, TierLimits,
};
pub use deck::{inspect, open_deck, render_deck, render_thumbnail, RenderedDeck};
pub use error::{FlipbookError, RenderError, ValidationError};
pub use model::{
    Flipbook, FlipbookId, FlipbookStatus, FlipbookUpdate, NewFlipbook, Role, Subscription,
    SubscriptionStatus, UserId,
};
pub use payment::{PaymentError, PaymentService};
pub use pipeline::input::PdfSource;
pub use pipeline::render::{DocumentInfo, PdfiumRasterizer, Rasterizer, RenderRequest};
pub use progress::{NoopProgressCallback, ProgressCallback, RenderProgressCallback};
pub use store::{AssetStore, AuthVerifier, Bucket, RecordStore, StoreError};
pub use stream::{collect_pages, CancelToken, PageStream, RenderedPage};
pub use viewer::{FlipbookViewer, Leaf, PageDensity, ViewerPhase};
pub use workflow::{CreateRequest, EditRequest, FlipbookService, SelectedFile, Session};
