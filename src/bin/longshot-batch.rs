//! CLI binary: convert every PDF under a directory into a mirrored image tree.
//!
//! Failures are isolated per file. The summary block is always printed, and
//! the exit code comes from the final report alone.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_longshot::cli::{
    dim, exit_code_for, format_batch_summary, format_result_line, init_logging, red, yellow,
    FileProgress, FormatArgs,
};
use edgequake_longshot::{
    run_batch, BatchConfig, BatchReport, CancellationToken, ConversionProgressCallback,
    ConversionResult, ProgressCallback,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

const AFTER_HELP: &str = r#"EXAMPLES:
  # pdfs/**/*.pdf → images/**/*.png
  longshot-batch

  # Only the top level, JPEG, four documents at a time
  longshot-batch -i scans -o out --no-recursive -f jpeg -j 4

  # Resume an interrupted run
  longshot-batch --skip-existing

EXIT CODES:
  0    every file converted
  1    nothing converted (no PDFs found, all skipped, or bad input directory)
  2    at least one file failed
  130  interrupted
  255  unexpected error
"#;

/// Convert every PDF under a directory into long screenshots.
#[derive(Parser, Debug)]
#[command(
    name = "longshot-batch",
    version,
    about = "Batch-convert a directory of PDFs into long screenshots",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory searched for PDF files.
    #[arg(short, long, env = "LONGSHOT_INPUT_DIR", default_value = "pdfs")]
    input_dir: PathBuf,

    /// Root of the mirrored output tree.
    #[arg(short, long, env = "LONGSHOT_OUTPUT_DIR", default_value = "images")]
    output_dir: PathBuf,

    /// Only look at the top level of the input directory.
    #[arg(long, env = "LONGSHOT_NO_RECURSIVE")]
    no_recursive: bool,

    /// Leave files whose output already exists untouched.
    #[arg(long, env = "LONGSHOT_SKIP_EXISTING")]
    skip_existing: bool,

    /// Documents converted at once.
    #[arg(short, long, env = "LONGSHOT_JOBS", default_value_t = 1,
          value_parser = clap::value_parser!(u16).range(1..))]
    jobs: u16,

    #[command(flatten)]
    format: FormatArgs,

    /// Print the report as JSON on stdout instead of the text summary.
    #[arg(long, env = "LONGSHOT_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "LONGSHOT_VERBOSE")]
    verbose: bool,

    /// Suppress per-file output; the summary is still printed.
    #[arg(long, env = "LONGSHOT_QUIET")]
    quiet: bool,
}

/// Per-file lines without a progress bar, for `--verbose` runs.
struct PlainLines;

impl ConversionProgressCallback for PlainLines {
    fn on_file_complete(&self, index: usize, total: usize, result: &ConversionResult) {
        eprintln!("{}", format_result_line(index, total, result));
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let show_progress = !cli.quiet && !cli.verbose && !cli.json;
    init_logging(cli.verbose, cli.quiet || cli.json, show_progress);

    match run(&cli, show_progress).await {
        Ok(report) => ExitCode::from(report.exit_code()),
        Err(e) => {
            eprintln!("{} {:#}", red("✘"), e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}

async fn run(cli: &Cli, show_progress: bool) -> Result<BatchReport> {
    let batch = BatchConfig::builder()
        .input_dir(&cli.input_dir)
        .output_dir(&cli.output_dir)
        .recursive(!cli.no_recursive)
        .skip_existing(cli.skip_existing)
        .concurrency(cli.jobs as usize)
        .build()
        .context("Invalid configuration")?;

    let progress: Option<ProgressCallback> = if show_progress {
        Some(FileProgress::new() as Arc<dyn ConversionProgressCallback>)
    } else if !cli.quiet && !cli.json {
        Some(Arc::new(PlainLines) as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let token = CancellationToken::new();
    let mut builder = cli.format.to_builder().cancellation_token(token.clone());
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    let interrupt = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!(
                    "{}",
                    dim("Interrupted, finishing in-flight files before stopping…")
                );
                token.cancel();
            }
        })
    };

    let result = run_batch(&batch, &config).await;
    interrupt.abort();

    let report = result.with_context(|| {
        format!("Cannot scan input directory {}", batch.input_dir.display())
    })?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else {
        if report.discovered == 0 {
            eprintln!(
                "{} No PDF files found in {}",
                yellow("⚠"),
                batch.input_dir.display()
            );
        }
        print!("{}", format_batch_summary(&report));
    }

    Ok(report)
}
