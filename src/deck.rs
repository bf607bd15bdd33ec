//! Deck-level entry points: inspect a PDF, render every page for the viewer,
//! or render page 1 as a thumbnail.
//!
//! These wrap a [`Rasterizer`] with the render constants from
//! [`FlipbookConfig`]. Use the rasteriser directly when you need a custom
//! page selection or want pages as they arrive instead of all at once.

use crate::config::{FlipbookConfig, PageSelection};
use crate::error::RenderError;
use crate::pipeline::input::PdfSource;
use crate::pipeline::layout::DisplayBox;
use crate::pipeline::render::{DocumentInfo, Rasterizer, RenderRequest};
use crate::stream::{collect_pages, CancelToken, PageStream, RenderedPage};
use std::time::Instant;
use tracing::{debug, info};

/// A fully rendered deck plus the box every page is displayed in.
#[derive(Debug, Clone)]
pub struct RenderedDeck {
    pub display: DisplayBox,
    /// Pages in order, 1..=N.
    pub pages: Vec<RenderedPage>,
}

impl RenderedDeck {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Page count and first-page geometry without rendering anything.
pub async fn inspect(
    rasterizer: &dyn Rasterizer,
    source: &PdfSource,
) -> Result<DocumentInfo, RenderError> {
    rasterizer.inspect(source).await
}

/// Compute the display box and open the page stream for a full deck.
///
/// The source is resolved once and shared by the inspect and render calls.
pub async fn open_deck(
    rasterizer: &dyn Rasterizer,
    source: PdfSource,
    config: &FlipbookConfig,
    cancel: CancelToken,
) -> Result<(DisplayBox, PageStream), RenderError> {
    let source = rasterizer.load(source).await?;

    let info = rasterizer.inspect(&source).await?;
    let first_page = info.first_page.ok_or(RenderError::EmptyDocument)?;
    let display = DisplayBox::for_page(first_page, config.landscape_width, config.portrait_height);
    let (display_width, display_height) = (display.width, display.height);
    debug!(
        "Deck has {} pages; display box {}x{}",
        info.page_count, display_width, display_height
    );

    let request = RenderRequest {
        pages: PageSelection::All,
        scale: config.render_scale,
        quality: config.page_quality,
    };
    let stream = rasterizer.render(&source, request, cancel).await?;
    Ok((display, stream))
}

/// Render every page of a deck and wait for all of them.
pub async fn render_deck(
    rasterizer: &dyn Rasterizer,
    source: PdfSource,
    config: &FlipbookConfig,
    cancel: CancelToken,
) -> Result<RenderedDeck, RenderError> {
    let start = Instant::now();
    info!("Rendering deck: {}", source.describe());

    let (display, stream) = open_deck(rasterizer, source, config, cancel).await?;
    let pages = collect_pages(stream).await?;

    info!(
        "Rendered {} pages in {}ms",
        pages.len(),
        start.elapsed().as_millis()
    );
    Ok(RenderedDeck { display, pages })
}

/// Render page 1 at thumbnail scale. Always yields exactly one image.
pub async fn render_thumbnail(
    rasterizer: &dyn Rasterizer,
    source: &PdfSource,
    config: &FlipbookConfig,
) -> Result<RenderedPage, RenderError> {
    let request = RenderRequest {
        pages: PageSelection::Single(1),
        scale: config.thumbnail_scale,
        quality: config.thumbnail_quality,
    };
    let stream = rasterizer.render(source, request, CancelToken::new()).await?;
    collect_pages(stream)
        .await?
        .into_iter()
        .next()
        .ok_or(RenderError::EmptyDocument)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::layout::PageSize;
    use async_trait::async_trait;
    use futures::stream;
    use std::sync::Mutex;

    /// Yields solid pages for any selection.
    struct FakeRasterizer {
        pages: usize,
        first: PageSize,
        requests: Mutex<Vec<RenderRequest>>,
    }

    impl FakeRasterizer {
        fn new(pages: usize, first: PageSize) -> Self {
            Self {
                pages,
                first,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Rasterizer for FakeRasterizer {
        async fn inspect(&self, _source: &PdfSource) -> Result<DocumentInfo, RenderError> {
            Ok(DocumentInfo {
                page_count: self.pages,
                first_page: (self.pages > 0).then_some(self.first),
            })
        }

        async fn render(
            &self,
            _source: &PdfSource,
            request: RenderRequest,
            _cancel: CancelToken,
        ) -> Result<PageStream, RenderError> {
            let indices = request.pages.to_indices(self.pages);
            self.requests.lock().unwrap().push(request);
            let items: Vec<_> = indices
                .into_iter()
                .map(|i| {
                    Ok(RenderedPage {
                        page_number: i + 1,
                        width: 2,
                        height: 2,
                        mime_type: "image/jpeg".into(),
                        data: vec![0xFF, 0xD8],
                    })
                })
                .collect();
            Ok(Box::pin(stream::iter(items)))
        }
    }

    #[tokio::test]
    async fn deck_renders_every_page_in_order() {
        let r = FakeRasterizer::new(5, PageSize::new(612.0, 792.0));
        let config = FlipbookConfig::default();
        let deck = render_deck(&r, PdfSource::Bytes(vec![]), &config, CancelToken::new())
            .await
            .unwrap();
        let numbers: Vec<_> = deck.pages.iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        assert_eq!(deck.display.height, 733);

        let req = &r.requests.lock().unwrap()[0];
        assert_eq!(req.scale, 2.0);
        assert_eq!(req.quality, 90);
    }

    #[tokio::test]
    async fn thumbnail_is_one_page_at_reduced_scale() {
        let r = FakeRasterizer::new(12, PageSize::new(960.0, 540.0));
        let config = FlipbookConfig::default();
        let thumb = render_thumbnail(&r, &PdfSource::Bytes(vec![]), &config)
            .await
            .unwrap();
        assert_eq!(thumb.page_number, 1);

        let req = &r.requests.lock().unwrap()[0];
        assert_eq!(req.pages, PageSelection::Single(1));
        assert_eq!(req.scale, 0.5);
        assert_eq!(req.quality, 80);
    }

    #[tokio::test]
    async fn empty_document_fails() {
        let r = FakeRasterizer::new(0, PageSize::new(1.0, 1.0));
        let config = FlipbookConfig::default();
        let err = render_deck(&r, PdfSource::Bytes(vec![]), &config, CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::EmptyDocument));
    }
}
