//! PDF rasterisation: the [`PageSource`] seam and its pdfium implementation.
//!
//! ## Why a trait?
//!
//! Rasterisation belongs to pdfium, not to this crate. Everything downstream
//! (cropping, composing, batch orchestration) only needs "give me the pages of
//! this file at N DPI". Putting that behind [`PageSource`] keeps the core
//! testable with synthetic pages and lets callers swap the backend through
//! [`crate::config::ConversionConfigBuilder::page_source`].
//!
//! ## Threading
//!
//! pdfium keeps thread-local state and is not async-safe. Both trait methods
//! are blocking; [`crate::convert`] calls them from
//! `tokio::task::spawn_blocking`.

use crate::error::LongshotError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// PDF user space is defined at 72 points per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// One rendered page and the resolution it was rendered at.
#[derive(Debug, Clone)]
pub struct RasterPage {
    pub image: DynamicImage,
    pub dpi: u32,
}

impl RasterPage {
    pub fn new(image: DynamicImage, dpi: u32) -> Self {
        Self { image, dpi }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Produces one raster image per document page.
///
/// Implementations must be `Send + Sync`: the batch orchestrator shares a
/// single source across concurrently converting documents.
pub trait PageSource: Send + Sync {
    /// Number of pages in the document, without rendering anything.
    ///
    /// Encrypted or unparsable documents must be reported here as
    /// [`LongshotError::PasswordRequired`] / [`LongshotError::CorruptPdf`].
    fn page_count(&self, pdf_path: &Path) -> Result<usize, LongshotError>;

    /// Pixel size of every page at `dpi`, without rendering.
    ///
    /// Used to refuse documents whose pages alone would exceed the pixel
    /// budget. Sources that cannot tell cheaply return `None`.
    fn page_dimensions(
        &self,
        _pdf_path: &Path,
        _dpi: u32,
    ) -> Result<Option<Vec<(u32, u32)>>, LongshotError> {
        Ok(None)
    }

    /// Render every page, in order, at `dpi`.
    ///
    /// `on_page(page_num, total)` is called after each page (1-indexed).
    fn render_pages(
        &self,
        pdf_path: &Path,
        dpi: u32,
        on_page: &mut dyn FnMut(usize, usize),
    ) -> Result<Vec<RasterPage>, LongshotError>;
}

/// [`PageSource`] backed by the pdfium C++ library.
///
/// The library is bound on every call, which keeps the type trivially
/// `Send + Sync` and costs a few milliseconds per document.
#[derive(Debug, Clone, Default)]
pub struct PdfiumPageSource {
    library_path: Option<PathBuf>,
}

impl PdfiumPageSource {
    /// Resolve the library from `PDFIUM_LIB_PATH`, the working directory, or
    /// the system library path, in that order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Always bind the library at `path`.
    pub fn with_library(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }

    fn bind(&self) -> Result<Pdfium, LongshotError> {
        bind_pdfium(self.library_path.as_deref())
    }
}

impl PageSource for PdfiumPageSource {
    fn page_count(&self, pdf_path: &Path) -> Result<usize, LongshotError> {
        let pdfium = self.bind()?;
        let document = load_document(&pdfium, pdf_path)?;
        let total = document.pages().len() as usize;
        debug!("{}: {} pages", pdf_path.display(), total);
        Ok(total)
    }

    fn page_dimensions(
        &self,
        pdf_path: &Path,
        dpi: u32,
    ) -> Result<Option<Vec<(u32, u32)>>, LongshotError> {
        let pdfium = self.bind()?;
        let document = load_document(&pdfium, pdf_path)?;
        let scale = dpi as f32 / POINTS_PER_INCH;
        let sizes = document
            .pages()
            .iter()
            .map(|page| {
                (
                    (page.width().value * scale).ceil() as u32,
                    (page.height().value * scale).ceil() as u32,
                )
            })
            .collect();
        Ok(Some(sizes))
    }

    fn render_pages(
        &self,
        pdf_path: &Path,
        dpi: u32,
        on_page: &mut dyn FnMut(usize, usize),
    ) -> Result<Vec<RasterPage>, LongshotError> {
        let pdfium = self.bind()?;
        let document = load_document(&pdfium, pdf_path)?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("PDF loaded: {} pages at {} DPI", total_pages, dpi);

        let render_config =
            PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / POINTS_PER_INCH);

        let mut results = Vec::with_capacity(total_pages);

        for (idx, page) in pages.iter().enumerate() {
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                LongshotError::RasterisationFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                }
            })?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );

            results.push(RasterPage::new(image, dpi));
            on_page(idx + 1, total_pages);
        }

        Ok(results)
    }
}

/// Bind to a pdfium shared library.
///
/// An explicit `library_path` wins; otherwise `PDFIUM_LIB_PATH`, then a
/// library in the current directory, then the system library.
pub fn bind_pdfium(library_path: Option<&Path>) -> Result<Pdfium, LongshotError> {
    let bindings = match library_path {
        Some(path) => Pdfium::bind_to_library(path),
        None => match std::env::var("PDFIUM_LIB_PATH") {
            Ok(env_path) if !env_path.is_empty() => Pdfium::bind_to_library(env_path),
            _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        },
    }
    .map_err(|e| LongshotError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Open a document, classifying load failures as validation errors.
fn load_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
) -> Result<PdfDocument<'a>, LongshotError> {
    pdfium.load_pdf_from_file(pdf_path, None).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            LongshotError::PasswordRequired {
                path: pdf_path.to_path_buf(),
            }
        } else {
            LongshotError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}
