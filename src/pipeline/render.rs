//! PDF rasterisation: decode a document and render pages to JPEG via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which is
//! CPU-bound and not async-aware. `tokio::task::spawn_blocking` moves decode
//! and render work off the async worker threads so the caller's event loop
//! never stalls.
//!
//! ## Serial pages
//!
//! Pages are rendered strictly one after another. The blocking task hands
//! each finished page to a channel of capacity 1, so page N+1 is not started
//! until page N has been produced, and the task stops as soon as the
//! consumer goes away or the [`CancelToken`] fires.

use crate::config::{FlipbookConfig, PageSelection};
use crate::error::RenderError;
use crate::pipeline::encode::{self, JPEG_MIME};
use crate::pipeline::input::{self, PdfSource};
use crate::pipeline::layout::PageSize;
use crate::pipeline::worker::RenderWorker;
use crate::progress::{NoopProgressCallback, ProgressCallback};
use crate::stream::{CancelToken, PageStream, RenderedPage};
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

/// What a decoded document looks like before any page is rendered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DocumentInfo {
    pub page_count: usize,
    /// Size of page 1 at unit scale; `None` for an empty document.
    pub first_page: Option<PageSize>,
}

/// Which pages to render and how.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub pages: PageSelection,
    /// Multiplier applied to the page's point size.
    pub scale: f32,
    /// JPEG quality, 1–100.
    pub quality: u8,
}

/// Turns a PDF source into page images.
///
/// The pdfium-backed implementation is [`PdfiumRasterizer`]; tests and
/// alternative back ends provide their own.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Resolve a source into the form this rasteriser reads fastest.
    ///
    /// Callers that inspect and then render the same document call this
    /// once so a URL is not fetched twice. The default keeps the source.
    async fn load(&self, source: PdfSource) -> Result<PdfSource, RenderError> {
        Ok(source)
    }

    /// Decode the document and report its page count and first-page size.
    async fn inspect(&self, source: &PdfSource) -> Result<DocumentInfo, RenderError>;

    /// Render the selected pages in order.
    async fn render(
        &self,
        source: &PdfSource,
        request: RenderRequest,
        cancel: CancelToken,
    ) -> Result<PageStream, RenderError>;
}

/// [`Rasterizer`] backed by the shared pdfium [`RenderWorker`].
pub struct PdfiumRasterizer {
    worker: &'static RenderWorker,
    download_timeout_secs: u64,
    progress: ProgressCallback,
}

impl PdfiumRasterizer {
    /// Create a rasteriser, binding the decode worker if this is the first use.
    pub fn new(download_timeout_secs: u64) -> Result<Self, RenderError> {
        Ok(Self {
            worker: RenderWorker::init()?,
            download_timeout_secs,
            progress: Arc::new(NoopProgressCallback),
        })
    }

    /// Create a rasteriser using the timeout and progress callback in `config`.
    pub fn from_config(config: &FlipbookConfig) -> Result<Self, RenderError> {
        let rasterizer = Self::new(config.download_timeout_secs)?;
        Ok(match &config.progress_callback {
            Some(cb) => rasterizer.with_progress(Arc::clone(cb)),
            None => rasterizer,
        })
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    async fn bytes_of(&self, source: &PdfSource) -> Result<Vec<u8>, RenderError> {
        input::load_bytes(source.clone(), self.download_timeout_secs).await
    }
}

#[async_trait]
impl Rasterizer for PdfiumRasterizer {
    async fn load(&self, source: PdfSource) -> Result<PdfSource, RenderError> {
        match source {
            PdfSource::Bytes(_) => Ok(source),
            other => self.bytes_of(&other).await.map(PdfSource::Bytes),
        }
    }

    async fn inspect(&self, source: &PdfSource) -> Result<DocumentInfo, RenderError> {
        let bytes = self.bytes_of(source).await?;
        let worker = self.worker;
        tokio::task::spawn_blocking(move || inspect_blocking(worker.pdfium(), bytes))
            .await
            .map_err(|e| RenderError::Internal(format!("Inspect task panicked: {e}")))?
    }

    async fn render(
        &self,
        source: &PdfSource,
        request: RenderRequest,
        cancel: CancelToken,
    ) -> Result<PageStream, RenderError> {
        let bytes = self.bytes_of(source).await?;
        let worker = self.worker;
        let progress = Arc::clone(&self.progress);

        Ok(spawn_page_stream(move |tx| {
            render_blocking(worker.pdfium(), bytes, &request, &cancel, tx, progress.as_ref())
        }))
    }
}

/// Run `produce` on a blocking thread and stream what it sends.
///
/// If `produce` panics the stream ends with [`RenderError::Internal`]
/// instead of just stopping, so a truncated deck never looks complete.
pub(crate) fn spawn_page_stream<F>(produce: F) -> PageStream
where
    F: FnOnce(&mpsc::Sender<Result<RenderedPage, RenderError>>) + Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);
    let panic_tx = tx.clone();

    let handle = tokio::task::spawn_blocking(move || produce(&tx));
    tokio::spawn(async move {
        if let Err(e) = handle.await {
            warn!("Render task failed: {}", e);
            let _ = panic_tx
                .send(Err(RenderError::Internal(format!("Render task failed: {e}"))))
                .await;
        }
    });

    Box::pin(ReceiverStream::new(rx))
}

/// Blocking implementation of [`Rasterizer::inspect`].
fn inspect_blocking(pdfium: &Pdfium, bytes: Vec<u8>) -> Result<DocumentInfo, RenderError> {
    let document = pdfium
        .load_pdf_from_byte_vec(bytes, None)
        .map_err(|e| RenderError::DecodeFailed(format!("{e:?}")))?;

    let pages = document.pages();
    let page_count = pages.len() as usize;
    let first_page = if page_count > 0 {
        let page = pages
            .get(0)
            .map_err(|e| RenderError::DecodeFailed(format!("{e:?}")))?;
        Some(PageSize::new(page.width().value, page.height().value))
    } else {
        None
    };

    info!("PDF decoded: {} pages", page_count);
    Ok(DocumentInfo {
        page_count,
        first_page,
    })
}

/// Blocking render loop. Sends each page as soon as it is encoded.
fn render_blocking(
    pdfium: &Pdfium,
    bytes: Vec<u8>,
    request: &RenderRequest,
    cancel: &CancelToken,
    tx: &mpsc::Sender<Result<RenderedPage, RenderError>>,
    progress: &dyn crate::progress::RenderProgressCallback,
) {
    let document = match pdfium.load_pdf_from_byte_vec(bytes, None) {
        Ok(doc) => doc,
        Err(e) => {
            let _ = tx.blocking_send(Err(RenderError::DecodeFailed(format!("{e:?}"))));
            progress.on_render_complete(0, 0);
            return;
        }
    };

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    let indices = request.pages.to_indices(total_pages);
    if indices.is_empty() {
        let _ = tx.blocking_send(Err(RenderError::EmptyDocument));
        progress.on_render_complete(0, 0);
        return;
    }

    let selected = indices.len();
    progress.on_render_start(selected);

    let render_config = PdfRenderConfig::new().scale_page_by_factor(request.scale);
    let mut rendered = 0usize;

    for idx in indices {
        let page_num = idx + 1;

        if cancel.is_cancelled() {
            debug!("Render cancelled before page {}", page_num);
            let _ = tx.blocking_send(Err(RenderError::Cancelled { rendered }));
            break;
        }
        if tx.is_closed() {
            debug!("Page consumer dropped before page {}; stopping", page_num);
            break;
        }

        match render_one(&pages, idx, &render_config, request.quality) {
            Ok(page) => {
                let len = page.data.len();
                if tx.blocking_send(Ok(page)).is_err() {
                    debug!("Page consumer dropped after page {}; stopping", page_num);
                    break;
                }
                rendered += 1;
                progress.on_page_rendered(page_num, selected, len);
            }
            Err(e) => {
                warn!("Page {} failed: {}", page_num, e);
                progress.on_page_error(page_num, selected, &e.to_string());
                let _ = tx.blocking_send(Err(e));
                break;
            }
        }
    }

    progress.on_render_complete(selected, rendered);
}

/// Rasterise and encode a single page.
fn render_one(
    pages: &PdfPages,
    idx: usize,
    render_config: &PdfRenderConfig,
    quality: u8,
) -> Result<RenderedPage, RenderError> {
    let page_num = idx + 1;

    let page = pages
        .get(idx as u16)
        .map_err(|e| RenderError::SurfaceFailed {
            page: page_num,
            detail: format!("{e:?}"),
        })?;

    let bitmap = page
        .render_with_config(render_config)
        .map_err(|e| RenderError::SurfaceFailed {
            page: page_num,
            detail: format!("{e:?}"),
        })?;

    let image = bitmap.as_image();
    let data = encode::encode_jpeg(&image, quality).map_err(|e| RenderError::EncodeFailed {
        page: page_num,
        detail: e.to_string(),
    })?;

    debug!(
        "Rendered page {} → {}x{} px, {} bytes",
        page_num,
        image.width(),
        image.height(),
        data.len()
    );

    Ok(RenderedPage {
        page_number: page_num,
        width: image.width(),
        height: image.height(),
        mime_type: JPEG_MIME.to_string(),
        data,
    })
}
