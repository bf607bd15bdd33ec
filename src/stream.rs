//! The page sequence produced by a render.
//!
//! A render yields a [`PageStream`]: pages arrive in page order, one at a
//! time, and the stream ends after the last selected page. It cannot be
//! restarted; rendering again means asking the rasteriser for a new stream.
//!
//! Two things stop a render early, both checked between pages:
//!
//! * [`CancelToken::cancel`] — the stream yields [`RenderError::Cancelled`]
//!   and ends.
//! * Dropping the stream — the worker notices the closed channel and stops
//!   without rendering the next page.

use crate::error::RenderError;
use crate::pipeline::encode;
use futures::stream::StreamExt;
use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_stream::Stream;

/// One rasterised page. Lives in memory only.
#[derive(Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// 1-indexed page number.
    pub page_number: usize,
    /// Pixel width of the encoded image.
    pub width: u32,
    /// Pixel height of the encoded image.
    pub height: u32,
    pub mime_type: String,
    /// Encoded image bytes.
    pub data: Vec<u8>,
}

impl RenderedPage {
    /// `data:` URL for use as an image source.
    pub fn data_url(&self) -> String {
        encode::data_url(&self.mime_type, &self.data)
    }
}

impl fmt::Debug for RenderedPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderedPage")
            .field("page_number", &self.page_number)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// A boxed, ordered stream of rendered pages.
pub type PageStream = Pin<Box<dyn Stream<Item = Result<RenderedPage, RenderError>> + Send>>;

/// Cooperative cancellation flag shared between a view and its render.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drain a stream, failing on the first error.
pub async fn collect_pages(mut stream: PageStream) -> Result<Vec<RenderedPage>, RenderError> {
    let mut pages = Vec::new();
    while let Some(item) = stream.next().await {
        pages.push(item?);
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn page(n: usize) -> RenderedPage {
        RenderedPage {
            page_number: n,
            width: 10,
            height: 10,
            mime_type: encode::JPEG_MIME.into(),
            data: vec![0xFF, 0xD8],
        }
    }

    #[tokio::test]
    async fn collect_keeps_order() {
        let s: PageStream = Box::pin(stream::iter(vec![Ok(page(1)), Ok(page(2)), Ok(page(3))]));
        let pages = collect_pages(s).await.unwrap();
        let numbers: Vec<_> = pages.iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn collect_stops_on_error() {
        let s: PageStream = Box::pin(stream::iter(vec![
            Ok(page(1)),
            Err(RenderError::SurfaceFailed {
                page: 2,
                detail: "no surface".into(),
            }),
            Ok(page(3)),
        ]));
        let err = collect_pages(s).await.unwrap_err();
        assert!(matches!(err, RenderError::SurfaceFailed { page: 2, .. }));
    }

    #[test]
    fn cancel_token_is_shared() {
        let a = CancelToken::new();
        let b = a.clone();
        assert!(!b.is_cancelled());
        a.cancel();
        assert!(b.is_cancelled());
    }

    #[test]
    fn debug_hides_bytes() {
        let dbg = format!("{:?}", page(1));
        assert!(dbg.contains("bytes: 2"));
    }
}
