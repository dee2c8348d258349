//! # edgequake-longshot
//!
//! Turn a multi-page PDF into one tall "long screenshot": every page is
//! rasterised, trimmed of its blank margins and stacked top to bottom on a
//! single canvas.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    extension, size and %PDF magic checks
//!  ├─ 2. Render   rasterise pages via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Crop     per-page content box under a luminance tolerance + margin
//!  ├─ 4. Compose  stack pages, left-aligned or centred, with spacing
//!  └─ 5. Output   PNG / JPEG, written atomically
//! ```
//!
//! [`run_batch`] drives the same pipeline over a directory tree, mirroring it
//! into an output tree and recording one [`ConversionResult`] per file.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_longshot::{convert_to_file, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder().dpi(200).spacing(16).build()?;
//!     let stats = convert_to_file("document.pdf", "document.png", &config).await?;
//!     eprintln!("{} pages → {}x{} px",
//!         stats.page_count, stats.canvas_width, stats.canvas_height);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `longshot` and `longshot-batch` binaries (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-longshot = { version = "0.1", default-features = false }
//! ```
//!
//! ## PDFium
//!
//! Rendering binds a pdfium shared library at runtime: `PDFIUM_LIB_PATH`
//! first, then the working directory, then the system library path. Supply
//! your own [`PageSource`] through
//! [`ConversionConfigBuilder::page_source`] to render some other way.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod cancel;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{
    discover_inputs, mirror_output_path, run_batch, BatchPhase, BatchReport, ConversionResult,
    FileState, SkipReason,
};
pub use cancel::CancellationToken;
pub use config::{
    default_output_path, BatchConfig, BatchConfigBuilder, ConversionConfig,
    ConversionConfigBuilder, OutputFormat,
};
pub use convert::{convert, convert_sync, convert_to_file, resolve_page_source};
pub use error::{ErrorKind, LongshotError};
pub use output::{ConversionOutput, ConversionStats};
pub use pipeline::compose::{compose, plan, Alignment, CompositionPlan, Placement};
pub use pipeline::crop::{detect_crop_box, CropBox, CropOptions};
pub use pipeline::render::{PageSource, PdfiumPageSource, RasterPage};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
