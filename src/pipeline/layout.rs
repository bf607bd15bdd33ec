//! Display geometry derived from the first page.
//!
//! The flip widget needs a base page size before any page is shown. It is
//! taken from page 1 at unit scale: landscape pages get a fixed width,
//! portrait (and square) pages a fixed height, with the other side following
//! the aspect ratio. Min/max bounds around that box let the widget stretch
//! with its container.

use serde::{Deserialize, Serialize};

/// Page size in PDF points at unit scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Width over height. Degenerate pages count as square.
    pub fn aspect_ratio(&self) -> f64 {
        if self.width <= 0.0 || self.height <= 0.0 {
            return 1.0;
        }
        f64::from(self.width) / f64::from(self.height)
    }

    pub fn is_landscape(&self) -> bool {
        self.aspect_ratio() > 1.0
    }
}

/// Base display size for every page of a deck, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayBox {
    pub width: u32,
    pub height: u32,
}

impl DisplayBox {
    /// Choose the display box for a deck whose first page is `first_page`.
    pub fn for_page(first_page: PageSize, landscape_width: u32, portrait_height: u32) -> Self {
        let ratio = first_page.aspect_ratio();
        if ratio > 1.0 {
            Self {
                width: landscape_width,
                height: (f64::from(landscape_width) / ratio).round() as u32,
            }
        } else {
            Self {
                width: (f64::from(portrait_height) * ratio).round() as u32,
                height: portrait_height,
            }
        }
    }

    /// Portrait decks are shown one page at a time.
    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }

    /// Resize limits as fractions/multiples of this box, floored to whole pixels.
    pub fn bounds(&self, min_factor: f32, max_factor: f32) -> SizeBounds {
        let scale = |v: u32, f: f32| (f64::from(v) * f64::from(f)).floor() as u32;
        SizeBounds {
            min_width: scale(self.width, min_factor),
            max_width: scale(self.width, max_factor),
            min_height: scale(self.height, min_factor),
            max_height: scale(self.height, max_factor),
        }
    }
}

/// Resize limits handed to the flip widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeBounds {
    pub min_width: u32,
    pub max_width: u32,
    pub min_height: u32,
    pub max_height: u32,
}

impl SizeBounds {
    /// Largest size with `base`'s aspect ratio that fits the container,
    /// clamped into these bounds.
    pub fn fit(&self, base: DisplayBox, container_width: u32, container_height: u32) -> DisplayBox {
        if base.width == 0 || base.height == 0 {
            return base;
        }
        let sx = f64::from(container_width) / f64::from(base.width);
        let sy = f64::from(container_height) / f64::from(base.height);
        let s = sx.min(sy);

        let min_s = (f64::from(self.min_width) / f64::from(base.width))
            .max(f64::from(self.min_height) / f64::from(base.height));
        let max_s = (f64::from(self.max_width) / f64::from(base.width))
            .min(f64::from(self.max_height) / f64::from(base.height));
        let s = s.clamp(min_s, max_s.max(min_s));

        DisplayBox {
            width: ((f64::from(base.width) * s).round() as u32)
                .clamp(self.min_width, self.max_width),
            height: ((f64::from(base.height) * s).round() as u32)
                .clamp(self.min_height, self.max_height),
        }
    }
}
