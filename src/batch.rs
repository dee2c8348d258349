//! Batch orchestration: convert every PDF under a directory tree.
//!
//! ## Lifecycle
//!
//! ```text
//! BatchPhase:  (idle) ──▶ Scanning ──▶ Processing ──▶ Completed
//!
//! FileState:   Pending ──▶ Skipped
//!                 └──────▶ Converting ──▶ Succeeded | Failed
//! ```
//!
//! The orchestrator is idle until [`run_batch`] is called; only the three
//! active phases are reported. Entering `Converting` is reported through
//! [`crate::ConversionProgressCallback::on_file_start`], so skipped files
//! never start.
//!
//! Files are discovered up front and sorted by path, so a run is
//! deterministic. Each file's output mirrors its position under the input
//! root. Two inputs that mirror to the same output (`a.pdf` and `a.PDF`)
//! cannot both be written: the first in discovery order owns the output and
//! every later one fails with [`LongshotError::OutputCollision`]. A failing
//! file is recorded and the batch moves on; the final [`BatchReport`] alone
//! decides the exit status.
//!
//! With `concurrency > 1` up to that many documents convert at once, but
//! results are still folded into the report one at a time, in discovery
//! order.

use crate::config::{BatchConfig, ConversionConfig, OutputFormat};
use crate::convert::convert_to_file;
use crate::error::{ErrorKind, LongshotError};
use crate::pipeline::input::has_pdf_extension;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::{Entry, HashMap};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Per-file lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    Pending,
    Skipped,
    Converting,
    Succeeded,
    Failed,
}

impl FileState {
    /// Whether `self → next` is a legal transition.
    pub fn can_transition_to(self, next: FileState) -> bool {
        matches!(
            (self, next),
            (FileState::Pending, FileState::Skipped)
                | (FileState::Pending, FileState::Converting)
                | (FileState::Converting, FileState::Succeeded)
                | (FileState::Converting, FileState::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            FileState::Skipped | FileState::Succeeded | FileState::Failed
        )
    }
}

/// Orchestrator phase, reported through
/// [`crate::ConversionProgressCallback::on_batch_phase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPhase {
    Scanning,
    Processing,
    Completed,
}

/// Why a file was not converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// `skip_existing` was set and the mirrored output is already there.
    OutputExists,
}

/// Terminal outcome of one discovered file. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionResult {
    Succeeded {
        input: PathBuf,
        output: PathBuf,
        page_count: usize,
        elapsed_ms: u64,
    },
    Failed {
        input: PathBuf,
        kind: ErrorKind,
        message: String,
    },
    Skipped {
        input: PathBuf,
        output: PathBuf,
        reason: SkipReason,
    },
}

impl ConversionResult {
    pub fn input(&self) -> &Path {
        match self {
            ConversionResult::Succeeded { input, .. }
            | ConversionResult::Failed { input, .. }
            | ConversionResult::Skipped { input, .. } => input,
        }
    }

    pub fn state(&self) -> FileState {
        match self {
            ConversionResult::Succeeded { .. } => FileState::Succeeded,
            ConversionResult::Failed { .. } => FileState::Failed,
            ConversionResult::Skipped { .. } => FileState::Skipped,
        }
    }
}

/// Aggregate outcome of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub discovered: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Terminal results in discovery order.
    pub results: Vec<ConversionResult>,
    /// Set when the run stopped early on a cancellation request.
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl BatchReport {
    pub fn new(discovered: usize) -> Self {
        Self {
            discovered,
            ..Self::default()
        }
    }

    /// Append one terminal result and bump its counter.
    pub fn record(&mut self, result: ConversionResult) {
        debug_assert!(result.state().is_terminal());
        match result.state() {
            FileState::Succeeded => self.succeeded += 1,
            FileState::Failed => self.failed += 1,
            FileState::Skipped => self.skipped += 1,
            FileState::Pending | FileState::Converting => {}
        }
        self.results.push(result);
    }

    /// Nothing was discovered, or everything discovered was skipped.
    pub fn no_work_performed(&self) -> bool {
        self.discovered == 0 || self.skipped == self.discovered
    }

    /// `0` all converted, `1` nothing converted, `2` any failure, `130` cancelled.
    pub fn exit_code(&self) -> u8 {
        if self.cancelled {
            ErrorKind::Cancelled.exit_code()
        } else if self.failed > 0 {
            2
        } else if self.succeeded == 0 {
            1
        } else {
            0
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &ConversionResult> {
        self.results
            .iter()
            .filter(|r| matches!(r, ConversionResult::Failed { .. }))
    }
}

/// Every regular `.pdf` file (any case) under `root`, sorted by path.
///
/// Symlinked directories are not followed. Unreadable subdirectories are
/// logged and skipped; an unreadable root is an error.
pub fn discover_inputs(root: &Path, recursive: bool) -> Result<Vec<PathBuf>, LongshotError> {
    let metadata = match std::fs::metadata(root) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(LongshotError::PermissionDenied {
                path: root.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(LongshotError::InputDirNotFound {
                path: root.to_path_buf(),
            });
        }
    };
    if !metadata.is_dir() {
        return Err(LongshotError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let mut pdf_files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if dir.as_path() == root => {
                debug!("read_dir({}) failed: {}", dir.display(), e);
                return Err(LongshotError::PermissionDenied {
                    path: root.to_path_buf(),
                });
            }
            Err(e) => {
                warn!("Skipping unreadable directory {}: {}", dir.display(), e);
                continue;
            }
        };

        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                if recursive {
                    pending.push(path);
                }
            } else if path.is_file() && has_pdf_extension(&path) {
                pdf_files.push(path);
            }
        }
    }

    pdf_files.sort();
    debug!("Discovered {} PDFs under {}", pdf_files.len(), root.display());
    Ok(pdf_files)
}

/// `in_root/sub/a.pdf` → `out_root/sub/a.<ext>`.
pub fn mirror_output_path(
    input: &Path,
    in_root: &Path,
    out_root: &Path,
    format: OutputFormat,
) -> PathBuf {
    let relative = match input.strip_prefix(in_root) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) => input
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| input.to_path_buf()),
    };
    out_root.join(relative).with_extension(format.extension())
}

/// Convert every PDF under `batch.input_dir` into `batch.output_dir`.
///
/// # Errors
/// Only discovery failures (missing or unreadable input root) are returned
/// as `Err`; per-file failures are recorded in the report.
pub async fn run_batch(
    batch: &BatchConfig,
    config: &ConversionConfig,
) -> Result<BatchReport, LongshotError> {
    let start = Instant::now();
    let cb = config.progress_callback.as_ref();
    let phase = |p: BatchPhase| {
        if let Some(cb) = cb {
            cb.on_batch_phase(p);
        }
    };

    phase(BatchPhase::Scanning);
    let inputs = discover_inputs(&batch.input_dir, batch.recursive)?;
    let total = inputs.len();
    info!(
        "Found {} PDF files in {}",
        total,
        batch.input_dir.display()
    );

    let mut report = BatchReport::new(total);
    phase(BatchPhase::Processing);

    let planned = claim_outputs(inputs, batch, config.format);

    let jobs = planned.into_iter().enumerate().map(|(idx, (input, output, claimed_by))| async move {
        // Cancelled before this file was scheduled.
        if config.cancel.is_cancelled() {
            return None;
        }
        let index = idx + 1;
        let mut state = FileState::Pending;

        let result = if claimed_by.is_none() && batch.skip_existing && output.exists() {
            debug!("Skipping {} (output exists)", input.display());
            ConversionResult::Skipped {
                input: input.clone(),
                output,
                reason: SkipReason::OutputExists,
            }
        } else {
            advance(&input, &mut state, FileState::Converting);
            if let Some(cb) = cb {
                cb.on_file_start(index, total, &input);
            }
            let file_start = Instant::now();
            let outcome = match claimed_by {
                Some(other) => Err(LongshotError::OutputCollision {
                    output: output.clone(),
                    other,
                }),
                None => convert_to_file(&input, &output, config).await,
            };
            match outcome {
                Ok(stats) => {
                    info!("Converted {} → {}", input.display(), output.display());
                    ConversionResult::Succeeded {
                        input: input.clone(),
                        output,
                        page_count: stats.page_count,
                        elapsed_ms: file_start.elapsed().as_millis() as u64,
                    }
                }
                Err(LongshotError::Cancelled) => {
                    debug!("{}: cancelled while converting", input.display());
                    return None;
                }
                Err(e) => {
                    warn!("Failed {}: {}", input.display(), e);
                    ConversionResult::Failed {
                        input: input.clone(),
                        kind: e.kind(),
                        message: e.to_string(),
                    }
                }
            }
        };
        advance(&input, &mut state, result.state());
        Some((index, result))
    });

    let mut results = stream::iter(jobs).buffered(batch.concurrency.max(1));
    while let Some(item) = results.next().await {
        if let Some((index, result)) = item {
            if let Some(cb) = cb {
                cb.on_file_complete(index, total, &result);
            }
            report.record(result);
        }
    }

    report.cancelled = config.cancel.is_cancelled();
    report.elapsed_ms = start.elapsed().as_millis() as u64;
    phase(BatchPhase::Completed);

    info!(
        "Batch complete: {} succeeded, {} failed, {} skipped of {}{}",
        report.succeeded,
        report.failed,
        report.skipped,
        report.discovered,
        if report.cancelled { " (cancelled)" } else { "" }
    );
    Ok(report)
}

/// Pair every input with its mirrored output, and with the earlier input
/// that already owns that output, if any.
fn claim_outputs(
    inputs: Vec<PathBuf>,
    batch: &BatchConfig,
    format: OutputFormat,
) -> Vec<(PathBuf, PathBuf, Option<PathBuf>)> {
    let mut owners: HashMap<PathBuf, PathBuf> = HashMap::with_capacity(inputs.len());
    inputs
        .into_iter()
        .map(|input| {
            let output = mirror_output_path(&input, &batch.input_dir, &batch.output_dir, format);
            let claimed_by = match owners.entry(output.clone()) {
                Entry::Occupied(owner) => {
                    warn!(
                        "{} and {} both map to {}",
                        owner.get().display(),
                        input.display(),
                        output.display()
                    );
                    Some(owner.get().clone())
                }
                Entry::Vacant(slot) => {
                    slot.insert(input.clone());
                    None
                }
            };
            (input, output, claimed_by)
        })
        .collect()
}

fn advance(input: &Path, state: &mut FileState, next: FileState) {
    debug_assert!(state.can_transition_to(next), "{state:?} → {next:?}");
    debug!("{}: {:?} → {:?}", input.display(), state, next);
    *state = next;
}
