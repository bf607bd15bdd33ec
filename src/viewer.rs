//! The flipbook viewer: turns a rendered deck into page-flip leaves and
//! tracks navigation.
//!
//! The viewer does not animate anything itself. It produces the leaves and
//! [`FlipWidgetSettings`] a page-flip widget is configured with, issues
//! [`FlipCommand`]s for the next/previous controls, and learns the current
//! page only from the widget's flip-completed event ([`FlipbookViewer::on_flip`]).
//! Asking for the next page does not move the index; the flip event does.

use crate::config::FlipbookConfig;
use crate::deck::{self, RenderedDeck};
use crate::error::RenderError;
use crate::model::{Flipbook, DEFAULT_BACKGROUND_COLOR};
use crate::pipeline::input::PdfSource;
use crate::pipeline::layout::{DisplayBox, SizeBounds};
use crate::pipeline::render::Rasterizer;
use crate::store::{AssetStore, Bucket};
use crate::stream::{CancelToken, RenderedPage};
use serde::Serialize;
use tracing::{error, info};

/// How a leaf behaves when flipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageDensity {
    /// Cover page: turns rigidly.
    Hard,
    /// Interior page: bends while turning.
    Soft,
}

/// One page as handed to the flip widget.
#[derive(Debug, Clone)]
pub struct Leaf {
    pub page: RenderedPage,
    pub density: PageDensity,
    /// Page number printed under interior pages. Covers have none.
    pub footer: Option<usize>,
}

/// Build leaves: the first page and (for decks longer than one page) the
/// last page are hard covers; every other page is soft and numbered.
pub fn assemble_leaves(pages: Vec<RenderedPage>) -> Vec<Leaf> {
    let len = pages.len();
    pages
        .into_iter()
        .enumerate()
        .map(|(i, page)| {
            let cover = i == 0 || (len > 1 && i == len - 1);
            if cover {
                Leaf {
                    page,
                    density: PageDensity::Hard,
                    footer: None,
                }
            } else {
                let number = page.page_number;
                Leaf {
                    page,
                    density: PageDensity::Soft,
                    footer: Some(number),
                }
            }
        })
        .collect()
}

/// Configuration for the page-flip widget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlipWidgetSettings {
    pub width: u32,
    pub height: u32,
    pub min_width: u32,
    pub max_width: u32,
    pub min_height: u32,
    pub max_height: u32,
    pub show_cover: bool,
    /// One page at a time instead of spreads.
    pub use_portrait: bool,
    pub flipping_time_ms: u32,
    pub max_shadow_opacity: f32,
    pub swipe_distance: u32,
    pub start_page: usize,
    pub mobile_scroll_support: bool,
}

impl FlipWidgetSettings {
    pub fn new(display: DisplayBox, min_factor: f32, max_factor: f32) -> Self {
        let bounds = display.bounds(min_factor, max_factor);
        Self {
            width: display.width,
            height: display.height,
            min_width: bounds.min_width,
            max_width: bounds.max_width,
            min_height: bounds.min_height,
            max_height: bounds.max_height,
            show_cover: true,
            use_portrait: display.is_portrait(),
            flipping_time_ms: 1000,
            max_shadow_opacity: 0.5,
            swipe_distance: 30,
            start_page: 0,
            mobile_scroll_support: true,
        }
    }

    pub fn bounds(&self) -> SizeBounds {
        SizeBounds {
            min_width: self.min_width,
            max_width: self.max_width,
            min_height: self.min_height,
            max_height: self.max_height,
        }
    }

    /// Page size for a container, keeping the aspect ratio within bounds.
    pub fn fit(&self, container_width: u32, container_height: u32) -> DisplayBox {
        let base = DisplayBox {
            width: self.width,
            height: self.height,
        };
        self.bounds().fit(base, container_width, container_height)
    }
}

/// Navigation request sent to the flip widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipCommand {
    Next,
    Prev,
}

/// Background and logo shown around the widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewerStyling {
    pub background_color: String,
    pub background_image_url: Option<String>,
    pub logo_url: Option<String>,
}

impl Default for ViewerStyling {
    fn default() -> Self {
        Self {
            background_color: DEFAULT_BACKGROUND_COLOR.to_string(),
            background_image_url: None,
            logo_url: None,
        }
    }
}

impl ViewerStyling {
    /// Resolve a record's storage paths to public URLs.
    pub fn resolve(assets: &dyn AssetStore, flipbook: &Flipbook) -> Self {
        Self {
            background_color: flipbook.background_color.clone(),
            background_image_url: flipbook
                .background_image_path
                .as_deref()
                .map(|p| assets.public_url(Bucket::Backgrounds, p)),
            logo_url: flipbook
                .logo_image_path
                .as_deref()
                .map(|p| assets.public_url(Bucket::Logos, p)),
        }
    }
}

/// Where the viewer is in its life.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerPhase {
    /// Pages are still being rendered.
    Loading,
    Ready,
    /// Rendering failed. Terminal for this viewer.
    Failed(String),
}

/// State of one flipbook view.
#[derive(Debug)]
pub struct FlipbookViewer {
    phase: ViewerPhase,
    leaves: Vec<Leaf>,
    settings: Option<FlipWidgetSettings>,
    current_index: usize,
    styling: ViewerStyling,
    min_size_factor: f32,
    max_size_factor: f32,
    cancel: CancelToken,
}

impl FlipbookViewer {
    pub fn new(styling: ViewerStyling, config: &FlipbookConfig) -> Self {
        Self {
            phase: ViewerPhase::Loading,
            leaves: Vec::new(),
            settings: None,
            current_index: 0,
            styling,
            min_size_factor: config.min_size_factor,
            max_size_factor: config.max_size_factor,
            cancel: CancelToken::new(),
        }
    }

    /// Render the deck and move to `Ready`, or to `Failed` on error.
    ///
    /// Cancelling the token from [`FlipbookViewer::cancel_token`] in another
    /// task stops the render between pages.
    pub async fn load(
        &mut self,
        rasterizer: &dyn Rasterizer,
        source: PdfSource,
        config: &FlipbookConfig,
    ) -> Result<(), RenderError> {
        match deck::render_deck(rasterizer, source, config, self.cancel.clone()).await {
            Ok(deck) => {
                self.show(deck);
                Ok(())
            }
            Err(e) => {
                error!("Error loading PDF: {}", e);
                self.phase = ViewerPhase::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Install an already rendered deck.
    pub fn show(&mut self, deck: RenderedDeck) {
        info!("Viewer ready with {} pages", deck.pages.len());
        self.settings = Some(FlipWidgetSettings::new(
            deck.display,
            self.min_size_factor,
            self.max_size_factor,
        ));
        self.leaves = assemble_leaves(deck.pages);
        self.current_index = 0;
        self.phase = ViewerPhase::Ready;
    }

    /// Token that stops an in-flight [`FlipbookViewer::load`].
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Stop rendering; the view is going away.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn phase(&self) -> &ViewerPhase {
        &self.phase
    }

    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    pub fn page_count(&self) -> usize {
        self.leaves.len()
    }

    pub fn settings(&self) -> Option<&FlipWidgetSettings> {
        self.settings.as_ref()
    }

    pub fn styling(&self) -> &ViewerStyling {
        &self.styling
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Flip-completed event from the widget. Out-of-range indices are ignored.
    pub fn on_flip(&mut self, index: usize) {
        if index < self.leaves.len() {
            self.current_index = index;
        }
    }

    pub fn can_prev(&self) -> bool {
        self.phase == ViewerPhase::Ready && self.current_index > 0
    }

    pub fn can_next(&self) -> bool {
        self.phase == ViewerPhase::Ready && self.current_index + 1 < self.leaves.len()
    }

    /// Command for the "next" control, `None` when it is disabled.
    pub fn next(&self) -> Option<FlipCommand> {
        self.can_next().then_some(FlipCommand::Next)
    }

    /// Command for the "previous" control, `None` when it is disabled.
    pub fn prev(&self) -> Option<FlipCommand> {
        self.can_prev().then_some(FlipCommand::Prev)
    }

    /// "Page N of M".
    pub fn page_label(&self) -> String {
        format!("Page {} of {}", self.current_index + 1, self.leaves.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(n: usize) -> Vec<RenderedPage> {
        (1..=n)
            .map(|i| RenderedPage {
                page_number: i,
                width: 4,
                height: 4,
                mime_type: "image/jpeg".into(),
                data: vec![0xFF, 0xD8],
            })
            .collect()
    }

    fn ready_viewer(n: usize) -> FlipbookViewer {
        let mut v = FlipbookViewer::new(ViewerStyling::default(), &FlipbookConfig::default());
        v.show(RenderedDeck {
            display: DisplayBox {
                width: 567,
                height: 733,
            },
            pages: pages(n),
        });
        v
    }

    #[test]
    fn covers_are_hard_and_interior_numbered() {
        let leaves = assemble_leaves(pages(4));
        let densities: Vec<_> = leaves.iter().map(|l| l.density).collect();
        assert_eq!(
            densities,
            vec![PageDensity::Hard, PageDensity::Soft, PageDensity::Soft, PageDensity::Hard]
        );
        assert_eq!(leaves[1].footer, Some(2));
        assert_eq!(leaves[2].footer, Some(3));
        assert_eq!(leaves[0].footer, None);
    }

    #[test]
    fn single_page_is_one_hard_cover() {
        let leaves = assemble_leaves(pages(1));
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].density, PageDensity::Hard);
    }

    #[test]
    fn navigation_bounds() {
        let mut v = ready_viewer(3);
        assert_eq!(v.prev(), None);
        assert_eq!(v.next(), Some(FlipCommand::Next));

        // Requesting a flip does not move the index; the event does.
        assert_eq!(v.current_index(), 0);
        v.on_flip(2);
        assert_eq!(v.current_index(), 2);
        assert_eq!(v.next(), None);
        assert_eq!(v.prev(), Some(FlipCommand::Prev));
        assert_eq!(v.page_label(), "Page 3 of 3");
    }

    #[test]
    fn out_of_range_flip_is_ignored() {
        let mut v = ready_viewer(2);
        v.on_flip(5);
        assert_eq!(v.current_index(), 0);
    }

    #[test]
    fn loading_viewer_cannot_navigate() {
        let v = FlipbookViewer::new(ViewerStyling::default(), &FlipbookConfig::default());
        assert_eq!(v.phase(), &ViewerPhase::Loading);
        assert!(!v.can_next());
        assert!(!v.can_prev());
    }

    #[test]
    fn widget_settings_follow_display_box() {
        let v = ready_viewer(3);
        let s = v.settings().unwrap();
        assert!(s.use_portrait);
        assert!(s.show_cover);
        assert_eq!(s.min_width, 283);
        assert_eq!(s.max_height, 1466);
        assert_eq!(s.flipping_time_ms, 1000);

        let fitted = s.fit(10_000, 10_000);
        assert_eq!(fitted.height, 1466);
    }
}
