//! Canvas composition: stack cropped pages into one tall image.
//!
//! Composition happens in two steps. [`plan`] validates the inputs and fixes
//! every page's position; [`render_plan`] paints. [`compose`] does both.
//! Between the two, [`CompositionPlan::ensure_within`] refuses canvases
//! larger than a pixel budget, so an oversized document fails with an error
//! instead of an aborted allocation.
//!
//! ```text
//!  LeftAligned (default)        Centered
//!  ┌──────────────┐             ┌──────────────────┐
//!  │page 1        │             │   page 1         │
//!  ├────────┐░░░░░│  spacing    │░░░░░░░░░░░░░░░░░░│
//!  │page 2  │░░░░░│             │  page 2 (narrow) │
//!  └────────┘░░░░░┘             └──────────────────┘
//!  width = max cropped width    width = max original width
//! ```

use crate::error::LongshotError;
use crate::pipeline::crop::CropBox;
use crate::pipeline::render::RasterPage;
use image::{imageops, Rgb, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Canvas pixel budget used by [`compose`]: about 1.5 GB of RGB.
pub const DEFAULT_MAX_CANVAS_PIXELS: u64 = 500_000_000;

/// Horizontal placement policy for pages narrower than the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Alignment {
    /// Variable width: canvas as wide as the widest cropped page, every page
    /// flush left. (default)
    #[default]
    LeftAligned,
    /// Fixed width: canvas as wide as the widest original page, every page
    /// centred.
    Centered,
}

/// Where one page lands on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Index into the page sequence.
    pub page_index: usize,
    pub x: u32,
    pub y: u32,
    pub crop: CropBox,
}

/// Complete layout for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionPlan {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub spacing: u32,
    pub background: Rgb<u8>,
    pub placements: Vec<Placement>,
}

impl CompositionPlan {
    /// Number of pixels the canvas will hold.
    pub fn pixel_count(&self) -> u64 {
        self.canvas_width as u64 * self.canvas_height as u64
    }

    /// Fail with [`LongshotError::CanvasOverBudget`] when the canvas holds
    /// more than `max_pixels` pixels.
    pub fn ensure_within(&self, max_pixels: u64) -> Result<(), LongshotError> {
        let pixels = self.pixel_count();
        if pixels > max_pixels {
            return Err(LongshotError::CanvasOverBudget {
                width: self.canvas_width,
                height: self.canvas_height,
                pixels,
                limit: max_pixels,
            });
        }
        Ok(())
    }
}

/// Compute the layout for `pages` cropped to `boxes`.
///
/// # Errors
/// [`LongshotError::EmptyDocument`] for no pages,
/// [`LongshotError::PageCountMismatch`] when the sequences differ in length,
/// [`LongshotError::InvalidCropBox`] when a box does not fit its page and
/// [`LongshotError::CanvasTooLarge`] when a dimension overflows `u32`.
pub fn plan(
    pages: &[RasterPage],
    boxes: &[CropBox],
    spacing: u32,
    alignment: Alignment,
    background: Rgb<u8>,
) -> Result<CompositionPlan, LongshotError> {
    if pages.is_empty() {
        return Err(LongshotError::EmptyDocument);
    }
    if pages.len() != boxes.len() {
        return Err(LongshotError::PageCountMismatch {
            pages: pages.len(),
            boxes: boxes.len(),
        });
    }

    for (idx, (page, crop)) in pages.iter().zip(boxes).enumerate() {
        if !crop.fits(page.width(), page.height()) {
            return Err(LongshotError::InvalidCropBox {
                page: idx + 1,
                detail: format!(
                    "{} does not fit a {}x{} page",
                    crop,
                    page.width(),
                    page.height()
                ),
            });
        }
    }

    let canvas_width = match alignment {
        Alignment::LeftAligned => boxes.iter().map(CropBox::width).max(),
        Alignment::Centered => pages.iter().map(RasterPage::width).max(),
    }
    .unwrap_or(0);

    let content_height: u64 = boxes.iter().map(|b| b.height() as u64).sum();
    let gaps = spacing as u64 * (boxes.len() as u64 - 1);
    let total_height = content_height + gaps;
    let canvas_height =
        u32::try_from(total_height).map_err(|_| LongshotError::CanvasTooLarge {
            width: canvas_width as u64,
            height: total_height,
        })?;

    let mut placements = Vec::with_capacity(boxes.len());
    let mut y = 0u32;
    for (page_index, crop) in boxes.iter().enumerate() {
        let x = match alignment {
            Alignment::LeftAligned => 0,
            Alignment::Centered => (canvas_width - crop.width()) / 2,
        };
        placements.push(Placement {
            page_index,
            x,
            y,
            crop: *crop,
        });
        // Cannot overflow: y + heights + gaps ≤ canvas_height.
        y = y + crop.height() + if page_index + 1 < boxes.len() { spacing } else { 0 };
    }

    debug!(
        "Composition plan: {} pages → {}x{} px",
        placements.len(),
        canvas_width,
        canvas_height
    );

    Ok(CompositionPlan {
        canvas_width,
        canvas_height,
        spacing,
        background,
        placements,
    })
}

/// Paint `plan` onto a fresh background-filled canvas.
///
/// # Errors
/// [`LongshotError::PageCountMismatch`] when a placement points past the end
/// of `pages`, [`LongshotError::InvalidCropBox`] when its crop does not fit
/// the page it points at. Both mean `plan` was built for other pages.
pub fn render_plan(
    pages: &[RasterPage],
    plan: &CompositionPlan,
) -> Result<RgbImage, LongshotError> {
    for placement in &plan.placements {
        let page = pages
            .get(placement.page_index)
            .ok_or(LongshotError::PageCountMismatch {
                pages: pages.len(),
                boxes: plan.placements.len(),
            })?;
        if !placement.crop.fits(page.width(), page.height()) {
            return Err(LongshotError::InvalidCropBox {
                page: placement.page_index + 1,
                detail: format!(
                    "{} does not fit a {}x{} page",
                    placement.crop,
                    page.width(),
                    page.height()
                ),
            });
        }
    }

    let mut canvas = RgbImage::from_pixel(plan.canvas_width, plan.canvas_height, plan.background);

    for placement in &plan.placements {
        let page = &pages[placement.page_index];
        let CropBox {
            left,
            top,
            right,
            bottom,
        } = placement.crop;
        let region = page
            .image
            .crop_imm(left, top, right - left, bottom - top)
            .to_rgba8();
        let flat = flatten_onto(&region, plan.background);
        imageops::replace(&mut canvas, &flat, placement.x as i64, placement.y as i64);
    }

    Ok(canvas)
}

/// Plan and paint in one call, within [`DEFAULT_MAX_CANVAS_PIXELS`].
pub fn compose(
    pages: &[RasterPage],
    boxes: &[CropBox],
    spacing: u32,
    alignment: Alignment,
    background: Rgb<u8>,
) -> Result<RgbImage, LongshotError> {
    let plan = plan(pages, boxes, spacing, alignment, background)?;
    plan.ensure_within(DEFAULT_MAX_CANVAS_PIXELS)?;
    render_plan(pages, &plan)
}

/// Alpha-composite an image region onto an opaque `background`.
fn flatten_onto(region: &RgbaImage, background: Rgb<u8>) -> RgbImage {
    let (w, h) = region.dimensions();
    RgbImage::from_fn(w, h, |x, y| {
        let [r, g, b, a] = region.get_pixel(x, y).0;
        let a = a as u32;
        let blend = |c: u8, bg: u8| ((c as u32 * a + bg as u32 * (255 - a)) / 255) as u8;
        Rgb([
            blend(r, background[0]),
            blend(g, background[1]),
            blend(b, background[2]),
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba};

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    fn solid(w: u32, h: u32, c: [u8; 3]) -> RasterPage {
        RasterPage::new(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(c))),
            72,
        )
    }

    fn full_boxes(pages: &[RasterPage]) -> Vec<CropBox> {
        pages
            .iter()
            .map(|p| CropBox::full(p.width(), p.height()))
            .collect()
    }

    #[test]
    fn empty_sequence_is_an_error() {
        let err = compose(&[], &[], 0, Alignment::LeftAligned, WHITE).unwrap_err();
        assert!(matches!(err, LongshotError::EmptyDocument));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let pages = vec![solid(10, 10, [0, 0, 0])];
        let err = plan(&pages, &[], 0, Alignment::LeftAligned, WHITE).unwrap_err();
        assert!(matches!(
            err,
            LongshotError::PageCountMismatch { pages: 1, boxes: 0 }
        ));
    }

    #[test]
    fn out_of_bounds_box_is_rejected() {
        let pages = vec![solid(10, 10, [0, 0, 0])];
        let boxes = vec![CropBox {
            left: 0,
            top: 0,
            right: 11,
            bottom: 10,
        }];
        let err = plan(&pages, &boxes, 0, Alignment::LeftAligned, WHITE).unwrap_err();
        assert!(matches!(err, LongshotError::InvalidCropBox { page: 1, .. }));
    }

    #[test]
    fn uncropped_equal_width_pages_stack_exactly() {
        let pages = vec![
            solid(100, 50, [255, 0, 0]),
            solid(100, 60, [0, 255, 0]),
            solid(100, 40, [0, 0, 255]),
        ];
        let canvas = compose(&pages, &full_boxes(&pages), 0, Alignment::LeftAligned, WHITE)
            .unwrap();
        assert_eq!(canvas.dimensions(), (100, 150));
        assert_eq!(*canvas.get_pixel(50, 25), Rgb([255, 0, 0]));
        assert_eq!(*canvas.get_pixel(50, 80), Rgb([0, 255, 0]));
        assert_eq!(*canvas.get_pixel(50, 149), Rgb([0, 0, 255]));
    }

    #[test]
    fn spacing_is_background_coloured() {
        let pages = vec![solid(100, 50, [0, 0, 0]), solid(100, 60, [0, 0, 0])];
        let bg = Rgb([10, 20, 30]);
        let canvas = compose(&pages, &full_boxes(&pages), 10, Alignment::LeftAligned, bg)
            .unwrap();
        assert_eq!(canvas.dimensions(), (100, 120));
        assert_eq!(*canvas.get_pixel(0, 55), bg);
        assert_eq!(*canvas.get_pixel(0, 60), Rgb([0, 0, 0]));
    }

    #[test]
    fn left_aligned_pads_narrow_pages_on_the_right() {
        let pages = vec![solid(100, 50, [255, 0, 0]), solid(150, 60, [0, 255, 0])];
        let canvas = compose(&pages, &full_boxes(&pages), 0, Alignment::LeftAligned, WHITE)
            .unwrap();
        assert_eq!(canvas.dimensions(), (150, 110));
        assert_eq!(*canvas.get_pixel(0, 0), Rgb([255, 0, 0]));
        assert_eq!(*canvas.get_pixel(120, 10), WHITE);
    }

    #[test]
    fn centered_uses_widest_original_page() {
        let pages = vec![solid(200, 50, [0, 0, 0]), solid(120, 50, [0, 0, 0])];
        let boxes = vec![
            CropBox {
                left: 50,
                top: 0,
                right: 150,
                bottom: 50,
            },
            CropBox {
                left: 0,
                top: 0,
                right: 81,
                bottom: 50,
            },
        ];
        let p = plan(&pages, &boxes, 5, Alignment::Centered, WHITE).unwrap();
        assert_eq!(p.canvas_width, 200);
        assert_eq!(p.canvas_height, 105);
        assert_eq!((p.placements[0].x, p.placements[0].y), (50, 0));
        // (200 − 81) / 2 = 59.5 → 59
        assert_eq!((p.placements[1].x, p.placements[1].y), (59, 55));

        let left = plan(&pages, &boxes, 5, Alignment::LeftAligned, WHITE).unwrap();
        assert_eq!(left.canvas_width, 100);
        assert!(left.placements.iter().all(|pl| pl.x == 0));
    }

    #[test]
    fn offsets_are_monotonic_and_fill_canvas_exactly() {
        let pages: Vec<_> = (1..=5).map(|i| solid(20 * i, 7 * i, [0, 0, 0])).collect();
        let p = plan(&pages, &full_boxes(&pages), 3, Alignment::Centered, WHITE).unwrap();
        for pair in p.placements.windows(2) {
            assert!(pair[0].y + pair[0].crop.height() <= pair[1].y);
        }
        let last = p.placements.last().unwrap();
        assert_eq!(last.y + last.crop.height(), p.canvas_height);
    }

    #[test]
    fn canvas_over_budget_is_refused_before_painting() {
        let pages = vec![solid(100, 50, [0, 0, 0]), solid(100, 50, [0, 0, 0])];
        let p = plan(&pages, &full_boxes(&pages), 10, Alignment::LeftAligned, WHITE).unwrap();
        assert_eq!(p.pixel_count(), 100 * 110);

        assert!(p.ensure_within(100 * 110).is_ok());
        let err = p.ensure_within(100 * 110 - 1).unwrap_err();
        assert!(matches!(
            err,
            LongshotError::CanvasOverBudget {
                width: 100,
                height: 110,
                pixels: 11_000,
                limit: 10_999,
            }
        ));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn plan_for_other_pages_is_an_error_not_a_panic() {
        let pages = vec![solid(100, 50, [0, 0, 0]), solid(100, 50, [0, 0, 0])];
        let p = plan(&pages, &full_boxes(&pages), 0, Alignment::LeftAligned, WHITE).unwrap();

        let err = render_plan(&pages[..1], &p).unwrap_err();
        assert!(matches!(
            err,
            LongshotError::PageCountMismatch { pages: 1, boxes: 2 }
        ));

        let smaller = vec![solid(40, 50, [0, 0, 0]), solid(100, 50, [0, 0, 0])];
        let err = render_plan(&smaller, &p).unwrap_err();
        assert!(matches!(err, LongshotError::InvalidCropBox { page: 1, .. }));
    }

    #[test]
    fn alpha_is_flattened_onto_background() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0]));
        let pages = vec![RasterPage::new(DynamicImage::ImageRgba8(img), 72)];
        let bg = Rgb([200, 100, 50]);
        let canvas = compose(&pages, &full_boxes(&pages), 0, Alignment::LeftAligned, bg)
            .unwrap();
        assert!(canvas.pixels().all(|px| *px == bg));
    }

    #[test]
    fn crop_region_is_what_gets_drawn() {
        let mut img = RgbImage::from_pixel(10, 10, Rgb([255, 255, 255]));
        img.put_pixel(6, 3, Rgb([1, 2, 3]));
        let pages = vec![RasterPage::new(DynamicImage::ImageRgb8(img), 72)];
        let boxes = vec![CropBox {
            left: 5,
            top: 2,
            right: 8,
            bottom: 5,
        }];
        let canvas = compose(&pages, &boxes, 0, Alignment::LeftAligned, WHITE).unwrap();
        assert_eq!(canvas.dimensions(), (3, 3));
        assert_eq!(*canvas.get_pixel(1, 1), Rgb([1, 2, 3]));
    }
}
