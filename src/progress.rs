//! Progress callbacks for page rasterisation.
//!
//! Inject an [`Arc<dyn RenderProgressCallback>`] via
//! [`crate::config::FlipbookConfigBuilder::progress_callback`] to hear about
//! each page as the serial render loop produces it. The CLI drives its
//! progress bar from these events; a front end could forward them to a
//! loading indicator.
//!
//! # Example
//!
//! ```rust
//! use flipflow::{FlipbookConfig, RenderProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     rendered: AtomicUsize,
//! }
//!
//! impl RenderProgressCallback for CountingCallback {
//!     fn on_page_rendered(&self, page_num: usize, total_pages: usize, bytes: usize) {
//!         self.rendered.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page_num}/{total_pages}: {bytes} bytes");
//!     }
//! }
//!
//! let config = FlipbookConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { rendered: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the rasteriser as it works through a document.
///
/// Pages are rendered one after another on the decode worker thread, so
/// events for one document never overlap; the trait is still `Send + Sync`
/// because the worker is not the thread that registered the callback. All
/// methods default to no-ops.
pub trait RenderProgressCallback: Send + Sync {
    /// Called once the document is decoded and the page count is known.
    fn on_render_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after a page has been rasterised and encoded.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — pages selected for this render
    /// * `bytes`       — size of the encoded image
    fn on_page_rendered(&self, page_num: usize, total_pages: usize, bytes: usize) {
        let _ = (page_num, total_pages, bytes);
    }

    /// Called when a page fails; the render stops after this.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once when the sequence ends, whether complete, failed or cancelled.
    fn on_render_complete(&self, total_pages: usize, rendered: usize) {
        let _ = (total_pages, rendered);
    }
}

/// Used when no callback is configured.
pub struct NoopProgressCallback;

impl RenderProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::FlipbookConfig`].
pub type ProgressCallback = Arc<dyn RenderProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        started_total: AtomicUsize,
        rendered: AtomicUsize,
        errors: AtomicUsize,
        finished_with: AtomicUsize,
    }

    impl RenderProgressCallback for TrackingCallback {
        fn on_render_start(&self, total_pages: usize) {
            self.started_total.store(total_pages, Ordering::SeqCst);
        }

        fn on_page_rendered(&self, _page_num: usize, _total_pages: usize, _bytes: usize) {
            self.rendered.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_error(&self, _page_num: usize, _total_pages: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_render_complete(&self, _total_pages: usize, rendered: usize) {
            self.finished_with.store(rendered, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_render_start(5);
        cb.on_page_rendered(1, 5, 42);
        cb.on_page_error(2, 5, "surface");
        cb.on_render_complete(5, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_render_start(3);
        tracker.on_page_rendered(1, 3, 100);
        tracker.on_page_rendered(2, 3, 200);
        tracker.on_page_error(3, 3, "surface");
        tracker.on_render_complete(3, 2);

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.rendered.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.finished_with.load(Ordering::SeqCst), 2);
    }
}
