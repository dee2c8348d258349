//! Configuration types for long-screenshot conversion.
//!
//! All single-document behaviour is controlled through [`ConversionConfig`],
//! built via its [`ConversionConfigBuilder`]. Batch runs add a
//! [`BatchConfig`] for the directory walk and reuse one `ConversionConfig`
//! for every file, so every document in a run is rendered, cropped and
//! encoded the same way.

use crate::cancel::CancellationToken;
use crate::error::LongshotError;
use crate::pipeline::compose::{Alignment, DEFAULT_MAX_CANVAS_PIXELS};
use crate::pipeline::crop::CropOptions;
use crate::pipeline::render::PageSource;
use crate::progress::ProgressCallback;
use image::Rgb;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

pub const MIN_DPI: u32 = 72;
pub const MAX_DPI: u32 = 300;
pub const DEFAULT_DPI: u32 = 150;
pub const DEFAULT_JPEG_QUALITY: u8 = 85;
/// 100 MiB.
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 100 * 1024 * 1024;

/// Suffix appended to the input stem by [`default_output_path`].
pub const OUTPUT_SUFFIX: &str = "_long_screenshot";

/// Configuration for converting one PDF into one long image.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_longshot::{Alignment, ConversionConfig, OutputFormat};
///
/// let config = ConversionConfig::builder()
///     .dpi(200)
///     .format(OutputFormat::Jpeg)
///     .quality(90)
///     .alignment(Alignment::Centered)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Rendering DPI. Range: 72–300. Default: 150.
    pub dpi: u32,

    /// Output encoding. Default: PNG.
    pub format: OutputFormat,

    /// JPEG quality, 1–100. Ignored for PNG. Default: 85.
    pub quality: u8,

    /// Background-coloured gap between consecutive pages, in pixels. Default: 0.
    pub spacing: u32,

    /// Whitespace cropping policy; `None` keeps every page whole. Default: on,
    /// tolerance 5, margin 10.
    pub crop: Option<CropOptions>,

    /// Horizontal page placement. Default: [`Alignment::LeftAligned`].
    pub alignment: Alignment,

    /// Canvas fill and alpha-flattening colour. Default: white.
    pub background: Rgb<u8>,

    /// Inputs larger than this are rejected before rendering. Default: 100 MiB.
    pub max_file_size_bytes: u64,

    /// Reject documents with more pages than this. Default: unlimited.
    pub max_pages: Option<usize>,

    /// Pixel budget for one document: checked against the summed page areas
    /// before rendering and against the canvas before it is allocated.
    /// Default: 500 million.
    pub max_canvas_pixels: u64,

    /// Pre-constructed page source. If None, [`crate::PdfiumPageSource`] is used.
    pub page_source: Option<Arc<dyn PageSource>>,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,

    /// Polled between pipeline stages and between batch files.
    pub cancel: CancellationToken,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            format: OutputFormat::default(),
            quality: DEFAULT_JPEG_QUALITY,
            spacing: 0,
            crop: Some(CropOptions::default()),
            alignment: Alignment::default(),
            background: Rgb([255, 255, 255]),
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            max_pages: None,
            max_canvas_pixels: DEFAULT_MAX_CANVAS_PIXELS,
            page_source: None,
            progress_callback: None,
            cancel: CancellationToken::new(),
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("dpi", &self.dpi)
            .field("format", &self.format)
            .field("quality", &self.quality)
            .field("spacing", &self.spacing)
            .field("crop", &self.crop)
            .field("alignment", &self.alignment)
            .field("background", &format_hex(self.background))
            .field("max_file_size_bytes", &self.max_file_size_bytes)
            .field("max_pages", &self.max_pages)
            .field("max_canvas_pixels", &self.max_canvas_pixels)
            .field(
                "page_source",
                &self.page_source.as_ref().map(|_| "<dyn PageSource>"),
            )
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(MIN_DPI, MAX_DPI);
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.config.quality = quality.clamp(1, 100);
        self
    }

    pub fn spacing(mut self, px: u32) -> Self {
        self.config.spacing = px;
        self
    }

    /// Enable or disable cropping. Enabling keeps any options already set.
    pub fn crop(mut self, enabled: bool) -> Self {
        self.config.crop = if enabled {
            Some(self.config.crop.unwrap_or_default())
        } else {
            None
        };
        self
    }

    pub fn crop_options(mut self, options: CropOptions) -> Self {
        self.config.crop = Some(options);
        self
    }

    /// Set the crop margin; has no effect while cropping is disabled.
    pub fn crop_margin(mut self, px: u32) -> Self {
        if let Some(opts) = self.config.crop.as_mut() {
            opts.margin = px;
        }
        self
    }

    /// Set the crop tolerance; has no effect while cropping is disabled.
    pub fn tolerance(mut self, tolerance: u8) -> Self {
        if let Some(opts) = self.config.crop.as_mut() {
            opts.tolerance = tolerance;
        }
        self
    }

    pub fn alignment(mut self, alignment: Alignment) -> Self {
        self.config.alignment = alignment;
        self
    }

    pub fn background(mut self, color: Rgb<u8>) -> Self {
        self.config.background = color;
        self
    }

    pub fn max_file_size_bytes(mut self, bytes: u64) -> Self {
        self.config.max_file_size_bytes = bytes;
        self
    }

    pub fn max_file_size_mb(self, mb: u64) -> Self {
        self.max_file_size_bytes(mb.saturating_mul(1024 * 1024))
    }

    pub fn max_pages(mut self, pages: usize) -> Self {
        self.config.max_pages = Some(pages);
        self
    }

    /// Pixel budget for one document. `0` is rejected by [`Self::build`].
    pub fn max_canvas_pixels(mut self, pixels: u64) -> Self {
        self.config.max_canvas_pixels = pixels;
        self
    }

    pub fn page_source(mut self, source: Arc<dyn PageSource>) -> Self {
        self.config.page_source = Some(source);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.config.cancel = token;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, LongshotError> {
        let c = &self.config;
        if !(MIN_DPI..=MAX_DPI).contains(&c.dpi) {
            return Err(LongshotError::InvalidConfig(format!(
                "DPI must be {}–{}, got {}",
                MIN_DPI, MAX_DPI, c.dpi
            )));
        }
        if !(1..=100).contains(&c.quality) {
            return Err(LongshotError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                c.quality
            )));
        }
        if c.max_file_size_bytes == 0 {
            return Err(LongshotError::InvalidConfig(
                "Maximum file size must be > 0".into(),
            ));
        }
        if c.max_canvas_pixels == 0 {
            return Err(LongshotError::InvalidConfig(
                "Maximum canvas size must be > 0 pixels".into(),
            ));
        }
        if c.max_pages == Some(0) {
            return Err(LongshotError::InvalidConfig(
                "Maximum page count must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Batch ────────────────────────────────────────────────────────────────

/// Directory-walk settings for [`crate::run_batch`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Root searched for PDFs. Default: `pdfs`.
    pub input_dir: PathBuf,
    /// Root of the mirrored output tree. Default: `images`.
    pub output_dir: PathBuf,
    /// Descend into subdirectories. Default: true.
    pub recursive: bool,
    /// Leave files whose output already exists untouched. Default: false.
    pub skip_existing: bool,
    /// Documents converted at once. Default: 1 (strictly sequential).
    pub concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("pdfs"),
            output_dir: PathBuf::from("images"),
            recursive: true,
            skip_existing: false,
            concurrency: 1,
        }
    }
}

impl BatchConfig {
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`BatchConfig`].
#[derive(Debug)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.input_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn recursive(mut self, v: bool) -> Self {
        self.config.recursive = v;
        self
    }

    pub fn skip_existing(mut self, v: bool) -> Self {
        self.config.skip_existing = v;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn build(self) -> Result<BatchConfig, LongshotError> {
        if self.config.concurrency == 0 {
            return Err(LongshotError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Encoding of the stitched image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossless, maximum compression. (default)
    #[default]
    Png,
    /// Lossy, quality-controlled.
    Jpeg,
}

impl OutputFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Png => f.write_str("png"),
            OutputFormat::Jpeg => f.write_str("jpeg"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = LongshotError;

    /// Accepts `png`, `jpeg` and `jpg`, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            other => Err(LongshotError::InvalidConfig(format!(
                "Unsupported output format '{}' (expected png, jpeg or jpg)",
                other
            ))),
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

/// `<dir>/<stem>_long_screenshot.<ext>` next to `input`.
pub fn default_output_path(input: &Path, format: OutputFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}{}.{}", stem, OUTPUT_SUFFIX, format.extension()))
}

/// Parse `RRGGBB` or `#RRGGBB`.
pub fn parse_hex_color(s: &str) -> Result<Rgb<u8>, LongshotError> {
    let hex = s.trim().trim_start_matches('#');
    let invalid = || {
        LongshotError::InvalidConfig(format!(
            "Invalid colour '{}' (expected RRGGBB hex)",
            s
        ))
    };
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(invalid());
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
    Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}

fn format_hex(c: Rgb<u8>) -> String {
    format!("#{:02X}{:02X}{:02X}", c[0], c[1], c[2])
}
