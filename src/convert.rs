//! Single-document conversion entry points.
//!
//! [`convert`] returns the composed canvas in memory; [`convert_to_file`]
//! also encodes it and writes it atomically. Both run every CPU-bound stage
//! on tokio's blocking pool and poll the configured
//! [`crate::CancellationToken`] between stages.

use crate::config::ConversionConfig;
use crate::error::LongshotError;
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::crop::{detect_crop_box, CropBox, CropOptions};
use crate::pipeline::render::{PageSource, PdfiumPageSource, RasterPage};
use crate::pipeline::{compose, encode, input};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Convert a PDF file into one long RGB image.
///
/// # Errors
/// Returns the first failing stage's error; see [`LongshotError::kind`] for
/// the classification. A cancelled run returns [`LongshotError::Cancelled`].
pub async fn convert(
    input: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, LongshotError> {
    let output = build_canvas(input.as_ref(), config).await?;
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(&output.stats);
    }
    Ok(output)
}

/// Convert a PDF and write the encoded image to `output_path`.
///
/// Parent directories are created as needed. The write is atomic: either
/// the complete image appears at `output_path` or nothing does.
pub async fn convert_to_file(
    input: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, LongshotError> {
    let total_start = Instant::now();
    let output_path = output_path.as_ref().to_path_buf();
    let ConversionOutput { image, mut stats } = build_canvas(input.as_ref(), config).await?;

    let encode_start = Instant::now();
    let (format, quality) = (config.format, config.quality);
    let path = output_path.clone();
    let bytes = run_blocking(move || encode::encode_image(&image, format, quality, &path)).await?;
    stats.encode_ms = encode_start.elapsed().as_millis() as u64;

    config.cancel.check()?;

    let output_bytes = bytes.len() as u64;
    let path = output_path.clone();
    run_blocking(move || encode::write_atomic(&path, &bytes)).await?;

    stats.output_bytes = output_bytes;
    stats.total_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Wrote {} ({} bytes, {}ms total)",
        output_path.display(),
        output_bytes,
        stats.total_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(&stats);
    }
    Ok(stats)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, LongshotError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| LongshotError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input, config))
}

/// The configured page source, or pdfium with default library discovery.
pub fn resolve_page_source(config: &ConversionConfig) -> Arc<dyn PageSource> {
    match config.page_source {
        Some(ref source) => Arc::clone(source),
        None => Arc::new(PdfiumPageSource::new()),
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Validate → count → render → crop → compose.
async fn build_canvas(
    input_path: &Path,
    config: &ConversionConfig,
) -> Result<ConversionOutput, LongshotError> {
    let total_start = Instant::now();
    info!("Starting conversion: {}", input_path.display());

    // ── Step 1: Validate input ───────────────────────────────────────────
    let validated = input::validate_input(input_path, config.max_file_size_bytes)?;
    let pdf_path = validated.path;
    config.cancel.check()?;

    // ── Step 2: Page count (before any rendering) ────────────────────────
    let source = resolve_page_source(config);
    let total_pages = {
        let source = Arc::clone(&source);
        let path = pdf_path.clone();
        run_blocking(move || source.page_count(&path)).await?
    };
    if let Some(limit) = config.max_pages {
        if total_pages > limit {
            return Err(LongshotError::TooManyPages {
                path: pdf_path,
                pages: total_pages,
                limit,
            });
        }
    }
    info!("PDF has {} pages", total_pages);

    // ── Step 2b: Pixel budget (before any rendering) ─────────────────────
    let sizes = {
        let source = Arc::clone(&source);
        let path = pdf_path.clone();
        let dpi = config.dpi;
        run_blocking(move || source.page_dimensions(&path, dpi)).await?
    };
    if let Some(sizes) = sizes {
        let pixels: u64 = sizes.iter().map(|&(w, h)| w as u64 * h as u64).sum();
        debug!("Pages need {} pixels at {} DPI", pixels, config.dpi);
        if pixels > config.max_canvas_pixels {
            return Err(LongshotError::DocumentTooLarge {
                path: pdf_path,
                pixels,
                limit: config.max_canvas_pixels,
            });
        }
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(total_pages);
    }
    config.cancel.check()?;

    // ── Step 3: Rasterise ────────────────────────────────────────────────
    let render_start = Instant::now();
    let pages = {
        let path = pdf_path.clone();
        let dpi = config.dpi;
        let cb = config.progress_callback.clone();
        run_blocking(move || {
            let mut on_page = |page_num: usize, total: usize| {
                if let Some(ref cb) = cb {
                    cb.on_page_rendered(page_num, total);
                }
            };
            source.render_pages(&path, dpi, &mut on_page)
        })
        .await?
    };
    let render_ms = render_start.elapsed().as_millis() as u64;
    info!("Rendered {} pages in {}ms", pages.len(), render_ms);
    config.cancel.check()?;

    // ── Step 4–5: Crop and compose ───────────────────────────────────────
    if let Some(ref cb) = config.progress_callback {
        cb.on_composition_start(pages.len());
    }
    let compose_start = Instant::now();
    let page_count = pages.len();
    let image = {
        let crop = config.crop;
        let (spacing, alignment, background) = (config.spacing, config.alignment, config.background);
        let max_pixels = config.max_canvas_pixels;
        run_blocking(move || {
            let boxes = crop_boxes(&pages, crop);
            let layout = compose::plan(&pages, &boxes, spacing, alignment, background)?;
            layout.ensure_within(max_pixels)?;
            compose::render_plan(&pages, &layout)
        })
        .await?
    };
    let compose_ms = compose_start.elapsed().as_millis() as u64;
    info!(
        "Composed {}x{} canvas in {}ms",
        image.width(),
        image.height(),
        compose_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_composition_complete(image.width(), image.height());
    }
    config.cancel.check()?;

    let stats = ConversionStats {
        page_count,
        canvas_width: image.width(),
        canvas_height: image.height(),
        render_ms,
        compose_ms,
        encode_ms: 0,
        total_ms: total_start.elapsed().as_millis() as u64,
        output_bytes: 0,
    };
    Ok(ConversionOutput { image, stats })
}

fn crop_boxes(
    pages: &[RasterPage],
    crop: Option<CropOptions>,
) -> Vec<CropBox> {
    pages
        .iter()
        .enumerate()
        .map(|(idx, page)| {
            let b = match crop {
                Some(opts) => detect_crop_box(page, opts.tolerance, opts.margin),
                None => CropBox::full(page.width(), page.height()),
            };
            debug!("Page {} crop box {}", idx + 1, b);
            b
        })
        .collect()
}

/// Run `f` on the blocking pool, mapping a panicked task to `Internal`.
async fn run_blocking<T, F>(f: F) -> Result<T, LongshotError>
where
    F: FnOnce() -> Result<T, LongshotError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| LongshotError::Internal(format!("Blocking task failed: {}", e)))?
}
