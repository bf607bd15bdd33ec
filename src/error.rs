//! Error types for the flipflow library.
//!
//! Errors are split by who has to react to them:
//!
//! * [`ValidationError`] — the user's input was rejected before any network
//!   call. Its `Display` text is the message shown to the user verbatim.
//!
//! * [`RenderError`] — rasterising a PDF failed. For the thumbnail path this
//!   is swallowed (logged) by the creation workflow; for the viewer path it
//!   puts the view into its failed phase.
//!
//! * [`FlipbookError`] — a workflow could not complete (upstream store
//!   failure, missing session, permission denied). Each variant maps to a
//!   single user-facing message through [`FlipbookError::user_message`].
//!
//! Storage failures ([`crate::store::StoreError`]) and payment failures
//! ([`crate::payment::PaymentError`]) live next to the code that raises them.

use crate::store::StoreError;
use thiserror::Error;

/// Input rejected on the client side before anything is uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Title is required")]
    MissingTitle,

    #[error("A PDF file is required")]
    MissingFile,

    /// File larger than the tier allows. `upgrade_hint` is set for tiers that
    /// have a larger paid limit.
    #[error("File size must be less than {limit_mb}MB{}", .upgrade_hint.map(|mb| format!(" (upgrade to Pro for {mb}MB)")).unwrap_or_default())]
    FileTooLarge {
        limit_mb: u64,
        upgrade_hint: Option<u64>,
    },

    #[error("Free plan limit reached ({limit} flipbooks). Upgrade to Pro for unlimited flipbooks.")]
    PlanLimitReached { limit: usize },

    #[error("Background color must be a hex color like #FFFFFF, got '{0}'")]
    InvalidColor(String),
}

/// Failure while decoding or rasterising a PDF.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// The PDF decode worker could not be bound.
    #[error(
        "PDF decode worker unavailable: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    WorkerUnavailable(String),

    /// The bytes could not be fetched from the remote URL.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// Local file could not be read.
    #[error("Failed to read '{path}': {reason}")]
    ReadFailed { path: String, reason: String },

    /// The bytes are not a PDF.
    #[error("Source is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    /// The PDF could not be decoded.
    #[error("PDF could not be decoded: {0}")]
    DecodeFailed(String),

    /// A page could not be given a drawing surface or rendered into it.
    #[error("Rasterisation failed for page {page}: {detail}")]
    SurfaceFailed { page: usize, detail: String },

    /// The rendered bitmap could not be compressed.
    #[error("Encoding failed for page {page}: {detail}")]
    EncodeFailed { page: usize, detail: String },

    /// The document has no pages to render.
    #[error("PDF has no pages")]
    EmptyDocument,

    /// The render sequence was cancelled between pages.
    #[error("Rendering cancelled after {rendered} pages")]
    Cancelled { rendered: usize },

    /// Unexpected internal failure (task panic, closed channel).
    #[error("Internal render error: {0}")]
    Internal(String),
}

/// Fatal errors returned by the workflows.
#[derive(Debug, Error)]
pub enum FlipbookError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// No signed-in user.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Signed in, but not the owner of the record.
    #[error("{0}")]
    Forbidden(String),

    #[error("Flipbook not found: {0}")]
    NotFound(String),

    /// The record exists but is not in the `ready` state.
    #[error("Flipbook {0} is not ready yet")]
    NotReady(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FlipbookError {
    /// The single message a user should see for this error.
    ///
    /// Validation and permission failures carry their own wording; everything
    /// else, storage failures included, collapses to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            FlipbookError::Validation(v) => v.to_string(),
            FlipbookError::Forbidden(msg) => msg.clone(),
            FlipbookError::Unauthenticated => "Not authenticated".to_string(),
            _ => fallback.to_string(),
        }
    }

    /// Like [`FlipbookError::user_message`], but storage errors that arrive
    /// with an upstream-provided message show that message. Only the create
    /// dialog surfaces upstream text.
    pub fn user_message_with_upstream(&self, fallback: &str) -> String {
        match self {
            FlipbookError::Store(StoreError::Upstream { message, .. }) if !message.is_empty() => {
                message.clone()
            }
            _ => self.user_message(fallback),
        }
    }
}
