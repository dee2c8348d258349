//! CLI binary: one PDF in, one long screenshot out.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig`, asks before overwriting, and turns the outcome into a
//! process exit code.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_longshot::cli::{
    bold, dim, exit_code_for, green, init_logging, red, FormatArgs, PageProgress,
};
use edgequake_longshot::{
    convert_to_file, default_output_path, CancellationToken, ConversionProgressCallback,
    ProgressCallback,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Stitch every page into report_long_screenshot.png
  longshot report.pdf

  # JPEG at quality 90, 20 px between pages
  longshot report.pdf -o report.jpg -f jpeg -q 90 -s 20

  # Keep pages whole and centred on a grey canvas
  longshot slides.pdf --no-crop --fixed-width --background EEEEEE

EXIT CODES:
  0    success (also when overwriting was declined)
  1    invalid input or configuration
  2    rendering failed
  3    composition failed
  4    encoding or writing the output failed
  130  interrupted
  255  unexpected error

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to libpdfium; otherwise ./ then the system library
  RUST_LOG          Override the log filter (e.g. edgequake_longshot=debug)
"#;

/// Convert a PDF into one vertically stitched image.
#[derive(Parser, Debug)]
#[command(
    name = "longshot",
    version,
    about = "Convert a PDF into one long, whitespace-trimmed screenshot",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file to convert.
    input: PathBuf,

    /// Output image path. Default: <input>_long_screenshot.<ext> next to the input.
    #[arg(short, long, env = "LONGSHOT_OUTPUT")]
    output: Option<PathBuf>,

    #[command(flatten)]
    format: FormatArgs,

    /// Overwrite an existing output without asking.
    #[arg(long, env = "LONGSHOT_NO_CONFIRM")]
    no_confirm: bool,

    /// Disable progress bar.
    #[arg(long, env = "LONGSHOT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "LONGSHOT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(long, env = "LONGSHOT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let show_progress = !cli.quiet && !cli.no_progress;
    init_logging(cli.verbose, cli.quiet, show_progress);

    match run(&cli, show_progress).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", red("✘"), e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}

async fn run(cli: &Cli, show_progress: bool) -> Result<()> {
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input, cli.format.format));

    if output_path.exists() && !cli.no_confirm && !confirm_overwrite(&output_path)? {
        println!("Save cancelled by user.");
        return Ok(());
    }

    let progress: Option<ProgressCallback> = if show_progress {
        Some(PageProgress::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let token = CancellationToken::new();
    let mut builder = cli.format.to_builder().cancellation_token(token.clone());
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    let conversion = convert_to_file(&cli.input, &output_path, &config);
    tokio::pin!(conversion);

    let finished = tokio::select! {
        r = &mut conversion => Some(r),
        _ = tokio::signal::ctrl_c() => None,
    };
    let result = match finished {
        Some(r) => r,
        None => {
            token.cancel();
            eprintln!("{}", dim("Interrupted, stopping after the current stage…"));
            // Returns Cancelled at the next stage boundary, or the finished
            // result if the write already happened.
            conversion.await
        }
    };
    let stats = result.context("Conversion failed")?;

    if !cli.quiet {
        eprintln!(
            "{}  {} pages  {}x{} px  {}ms  →  {}",
            green("✔"),
            stats.page_count,
            stats.canvas_width,
            stats.canvas_height,
            stats.total_ms,
            bold(&output_path.display().to_string()),
        );
        eprintln!(
            "   {}",
            dim(&format!(
                "render {}ms / compose {}ms / encode {}ms, {} bytes",
                stats.render_ms, stats.compose_ms, stats.encode_ms, stats.output_bytes
            )),
        );
    }

    Ok(())
}

/// Ask on stdin; anything but y/yes (including EOF) declines.
fn confirm_overwrite(path: &Path) -> Result<bool> {
    print!("File '{}' already exists. Overwrite? (y/n): ", path.display());
    io::stdout().flush().context("Failed to flush stdout")?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read answer from stdin")?;

    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
