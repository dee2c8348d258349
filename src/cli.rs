//! Terminal plumbing shared by the `longshot` and `longshot-batch` binaries.
//!
//! Only compiled with the `cli` feature.

use crate::batch::{BatchPhase, BatchReport, ConversionResult};
use crate::config::{
    parse_hex_color, ConversionConfig, ConversionConfigBuilder, OutputFormat, DEFAULT_DPI,
    DEFAULT_JPEG_QUALITY,
};
use crate::error::LongshotError;
use crate::output::ConversionStats;
use crate::pipeline::compose::{Alignment, DEFAULT_MAX_CANVAS_PIXELS};
use crate::pipeline::crop::{CropOptions, DEFAULT_MARGIN, DEFAULT_TOLERANCE};
use crate::progress::ConversionProgressCallback;
use clap::Args;
use image::Rgb;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

pub fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
pub fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
pub fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
pub fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
pub fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── Shared rendering / output flags ──────────────────────────────────────────

/// Flags common to single-document and batch runs.
#[derive(Args, Debug, Clone)]
pub struct FormatArgs {
    /// Rendering DPI (72–300).
    #[arg(long, env = "LONGSHOT_DPI", default_value_t = DEFAULT_DPI,
          value_parser = clap::value_parser!(u32).range(72..=300))]
    pub dpi: u32,

    /// Output format: png, jpeg or jpg.
    #[arg(short, long, env = "LONGSHOT_FORMAT", default_value = "png",
          value_parser = parse_format)]
    pub format: OutputFormat,

    /// JPEG quality (1–100). Ignored for PNG.
    #[arg(short, long, env = "LONGSHOT_QUALITY", default_value_t = DEFAULT_JPEG_QUALITY,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: u8,

    /// Gap between pages in pixels, filled with the background colour.
    #[arg(short, long, env = "LONGSHOT_SPACING", default_value_t = 0)]
    pub spacing: u32,

    /// Keep every page whole instead of trimming blank margins.
    #[arg(long, env = "LONGSHOT_NO_CROP")]
    pub no_crop: bool,

    /// Padding kept around detected content, in pixels.
    #[arg(long, env = "LONGSHOT_CROP_MARGIN", default_value_t = DEFAULT_MARGIN)]
    pub crop_margin: u32,

    /// How far below pure white (0–255 luminance) still counts as blank.
    #[arg(long, env = "LONGSHOT_TOLERANCE", default_value_t = DEFAULT_TOLERANCE)]
    pub tolerance: u8,

    /// Canvas as wide as the widest page, with pages centred.
    #[arg(long, env = "LONGSHOT_FIXED_WIDTH")]
    pub fixed_width: bool,

    /// Background colour as RRGGBB hex.
    #[arg(long, env = "LONGSHOT_BACKGROUND", default_value = "FFFFFF",
          value_parser = parse_background)]
    pub background: Rgb<u8>,

    /// Reject documents with more pages than this.
    #[arg(long, env = "LONGSHOT_MAX_PAGES")]
    pub max_pages: Option<usize>,

    /// Reject input files larger than this many MiB.
    #[arg(long, env = "LONGSHOT_MAX_FILE_SIZE_MB", default_value_t = 100)]
    pub max_file_size_mb: u64,

    /// Refuse documents whose pages or canvas exceed this many pixels.
    #[arg(long, env = "LONGSHOT_MAX_CANVAS_PIXELS", default_value_t = DEFAULT_MAX_CANVAS_PIXELS,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub max_canvas_pixels: u64,
}

impl FormatArgs {
    /// Start a config builder populated from these flags.
    pub fn to_builder(&self) -> ConversionConfigBuilder {
        let mut builder = ConversionConfig::builder()
            .dpi(self.dpi)
            .format(self.format)
            .quality(self.quality)
            .spacing(self.spacing)
            .alignment(if self.fixed_width {
                Alignment::Centered
            } else {
                Alignment::LeftAligned
            })
            .background(self.background)
            .max_file_size_mb(self.max_file_size_mb)
            .max_canvas_pixels(self.max_canvas_pixels);

        builder = if self.no_crop {
            builder.crop(false)
        } else {
            builder.crop_options(CropOptions {
                tolerance: self.tolerance,
                margin: self.crop_margin,
            })
        };

        if let Some(limit) = self.max_pages {
            builder = builder.max_pages(limit);
        }
        builder
    }
}

fn parse_format(s: &str) -> Result<OutputFormat, LongshotError> {
    s.parse()
}

fn parse_background(s: &str) -> Result<Rgb<u8>, LongshotError> {
    parse_hex_color(s)
}

// ── Logging ──────────────────────────────────────────────────────────────────

/// Install the stderr tracing subscriber.
///
/// `RUST_LOG` overrides everything. Otherwise `--verbose` shows debug logs,
/// and an active progress bar or `--quiet` hides everything below error.
pub fn init_logging(verbose: bool, quiet: bool, show_progress: bool) {
    let filter = if verbose {
        "debug"
    } else if quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();
}

/// Exit code for a top-level error: the library classification when the
/// chain holds a [`LongshotError`], 255 otherwise.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<LongshotError>())
        .map(LongshotError::exit_code)
        .unwrap_or(255)
}

// ── Single-document progress ─────────────────────────────────────────────────

/// Spinner while the PDF opens, page bar while rendering, spinner again while
/// composing and writing.
pub struct PageProgress {
    bar: ProgressBar,
}

impl PageProgress {
    pub fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(spinner_style());
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for PageProgress {
    fn on_conversion_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Rendering");
        self.bar.set_message("");
    }

    fn on_page_rendered(&self, page_num: usize, _total_pages: usize) {
        self.bar.set_position(page_num as u64);
    }

    fn on_composition_start(&self, page_count: usize) {
        self.bar.set_style(spinner_style());
        self.bar.set_prefix("Composing");
        self.bar.set_message(format!("{page_count} pages"));
    }

    fn on_composition_complete(&self, width: u32, height: u32) {
        self.bar.set_prefix("Encoding");
        self.bar.set_message(format!("{width}x{height} px"));
    }

    fn on_conversion_complete(&self, _stats: &ConversionStats) {
        self.bar.finish_and_clear();
    }
}

// ── Batch progress ───────────────────────────────────────────────────────────

/// One bar over discovered files, one log line per finished file.
pub struct FileProgress {
    bar: ProgressBar,
}

impl FileProgress {
    pub fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(spinner_style());
        bar.set_prefix("Scanning");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    /// Switch from the scanning spinner to the file bar on the first event.
    fn show_files(&self, total: usize) {
        if self.bar.length() == Some(total as u64) {
            return;
        }
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Converting");
    }
}

impl ConversionProgressCallback for FileProgress {
    fn on_batch_phase(&self, phase: BatchPhase) {
        if phase == BatchPhase::Completed {
            self.bar.finish_and_clear();
        }
    }

    fn on_file_start(&self, _index: usize, total: usize, input: &Path) {
        self.show_files(total);
        self.bar.set_message(display_name(input));
    }

    fn on_file_complete(&self, index: usize, total: usize, result: &ConversionResult) {
        self.show_files(total);
        self.bar.println(format_result_line(index, total, result));
        self.bar.inc(1);
    }
}

/// `  ✓ [ 3/10] a.pdf → a.png  2 pages  0.4s`
pub fn format_result_line(index: usize, total: usize, result: &ConversionResult) -> String {
    let counter = format!("[{index:>width$}/{total}]", width = total.to_string().len());
    match result {
        ConversionResult::Succeeded {
            input,
            output,
            page_count,
            elapsed_ms,
        } => format!(
            "  {} {} {} → {}  {}",
            green("✓"),
            dim(&counter),
            display_name(input),
            output.display(),
            dim(&format!(
                "{page_count} pages  {:.1}s",
                *elapsed_ms as f64 / 1000.0
            )),
        ),
        ConversionResult::Failed { input, message, .. } => format!(
            "  {} {} {}  {}",
            red("✗"),
            dim(&counter),
            display_name(input),
            red(&truncate(message, 100)),
        ),
        ConversionResult::Skipped { input, .. } => format!(
            "  {} {} {}  {}",
            yellow("↷"),
            dim(&counter),
            display_name(input),
            dim("output exists, skipped"),
        ),
    }
}

/// The closing summary block printed after every batch run.
pub fn format_batch_summary(report: &BatchReport) -> String {
    let rule = "=".repeat(50);
    let mut out = format!(
        "{rule}\n{}\n{rule}\n\
         Total PDF files found:  {}\n\
         Successfully processed: {}\n\
         Failed:                 {}\n\
         Skipped:                {}\n\
         Processing time:        {:.2} seconds\n",
        bold("Batch Processing Summary"),
        report.discovered,
        green(&report.succeeded.to_string()),
        if report.failed > 0 {
            red(&report.failed.to_string())
        } else {
            report.failed.to_string()
        },
        report.skipped,
        report.elapsed_ms as f64 / 1000.0,
    );

    if report.failed > 0 {
        out.push_str("\nFailed files:\n");
        for failure in report.failures() {
            if let ConversionResult::Failed {
                input,
                kind,
                message,
            } = failure
            {
                out.push_str(&format!(
                    "  {} {} ({}): {}\n",
                    red("✗"),
                    input.display(),
                    kind,
                    message
                ));
            }
        }
    }
    if report.cancelled {
        out.push_str(&format!("\n{} Interrupted before all files were processed\n", yellow("⚠")));
    } else if report.no_work_performed() {
        out.push_str(&format!("\n{} No files were processed\n", yellow("⚠")));
    }
    out
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let head: String = s.chars().take(max_chars - 1).collect();
        format!("{head}\u{2026}")
    } else {
        s.to_string()
    }
}
