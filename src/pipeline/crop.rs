//! Whitespace cropping: find the content box of a rendered page.
//!
//! ## Background test
//!
//! A pixel counts as background when, after compositing it onto white with
//! its own alpha, its luminance is within `tolerance` of pure white:
//!
//! ```text
//! c' = (c·a + 255·(255 − a)) / 255          per channel
//! L  = (299·R' + 587·G' + 114·B') / 1000     ITU-R 601 luma
//! background ⇔ 255 − L ≤ tolerance
//! ```
//!
//! Fully transparent pixels are therefore always background, and the output
//! encoder (which has no alpha channel) sees exactly what was tested.
//!
//! ## Scan
//!
//! Each edge is scanned inward independently; the first row or column with a
//! non-background pixel fixes that side. A blank page yields the full page,
//! never an empty box.

use crate::pipeline::render::RasterPage;
use image::{GenericImageView, Rgba};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default luminance tolerance: anything with L ≥ 250 is background.
pub const DEFAULT_TOLERANCE: u8 = 5;

/// Default padding kept around detected content, in pixels.
pub const DEFAULT_MARGIN: u32 = 10;

/// Sub-rectangle of a page to retain. `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CropBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CropBox {
    /// The whole `width × height` page.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            left: 0,
            top: 0,
            right: width,
            bottom: height,
        }
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    /// `true` when `0 ≤ left < right ≤ width` and `0 ≤ top < bottom ≤ height`.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        self.left < self.right
            && self.right <= width
            && self.top < self.bottom
            && self.bottom <= height
    }

    /// Grow by `margin` on every side, clamped to a `width × height` page.
    pub fn expand(&self, margin: u32, width: u32, height: u32) -> Self {
        Self {
            left: self.left.saturating_sub(margin),
            top: self.top.saturating_sub(margin),
            right: self.right.saturating_add(margin).min(width),
            bottom: self.bottom.saturating_add(margin).min(height),
        }
    }

    /// `true` when `other` lies entirely inside `self`.
    pub fn contains(&self, other: &CropBox) -> bool {
        self.left <= other.left
            && self.top <= other.top
            && self.right >= other.right
            && self.bottom >= other.bottom
    }
}

impl fmt::Display for CropBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {})–({}, {}) [{}x{}]",
            self.left,
            self.top,
            self.right,
            self.bottom,
            self.width(),
            self.height()
        )
    }
}

/// Tolerance and margin for [`detect_crop_box`], selected once per document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropOptions {
    pub tolerance: u8,
    pub margin: u32,
}

impl Default for CropOptions {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            margin: DEFAULT_MARGIN,
        }
    }
}

/// Luminance of `px` after compositing it onto white.
pub fn flattened_luma(px: Rgba<u8>) -> u8 {
    let [r, g, b, a] = px.0;
    let a = a as u32;
    let over_white = |c: u8| (c as u32 * a + 255 * (255 - a)) / 255;
    let luma = (299 * over_white(r) + 587 * over_white(g) + 114 * over_white(b)) / 1000;
    luma as u8
}

/// Whether `px` is background under `tolerance`.
pub fn is_background(px: Rgba<u8>, tolerance: u8) -> bool {
    255 - flattened_luma(px) <= tolerance
}

/// Tight box around every non-background pixel, or `None` for a blank page.
pub fn content_box(page: &RasterPage, tolerance: u8) -> Option<CropBox> {
    let img = &page.image;
    let (width, height) = img.dimensions();
    let ink = |x: u32, y: u32| !is_background(img.get_pixel(x, y), tolerance);
    let row_has_ink = |y: u32| (0..width).any(|x| ink(x, y));

    let top = (0..height).find(|&y| row_has_ink(y))?;
    // A row with ink exists, so the reverse scan always finds one.
    let bottom = (top..height).rev().find(|&y| row_has_ink(y))? + 1;

    let col_has_ink = |x: u32| (top..bottom).any(|y| ink(x, y));
    let left = (0..width).find(|&x| col_has_ink(x))?;
    let right = (left..width).rev().find(|&x| col_has_ink(x))? + 1;

    Some(CropBox {
        left,
        top,
        right,
        bottom,
    })
}

/// Compute the crop box for one page.
///
/// Blank pages return [`CropBox::full`]; otherwise the tight content box grown
/// by `margin` and clamped to the page.
pub fn detect_crop_box(page: &RasterPage, tolerance: u8, margin: u32) -> CropBox {
    let (width, height) = (page.width(), page.height());
    match content_box(page, tolerance) {
        Some(tight) => tight.expand(margin, width, height),
        None => CropBox::full(width, height),
    }
}
