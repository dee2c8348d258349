//! Progress-callback trait for conversion and batch events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline renders, composes and writes each document. Events
//! are display-only: nothing a callback does can change the outcome of a run.
//!
//! # Example
//!
//! ```rust
//! use edgequake_longshot::{ConversionConfig, ConversionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     rendered: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_rendered(&self, page_num: usize, total_pages: usize) {
//!         self.rendered.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Rendered {}/{}", page_num, total_pages);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     rendered: AtomicUsize::new(0),
//! });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::batch::{BatchPhase, ConversionResult};
use crate::output::ConversionStats;
use std::path::Path;
use std::sync::Arc;

/// Receives pipeline and batch events.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
///
/// # Thread safety
///
/// With batch concurrency above 1, document-level events for different files
/// may arrive interleaved from different threads. Per-file start/complete
/// events are always delivered from the single task that owns the report.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once the page count is known, before any page is rendered.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after each page is rasterised.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — total pages in the document
    fn on_page_rendered(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called before the canvas is planned.
    fn on_composition_start(&self, page_count: usize) {
        let _ = page_count;
    }

    /// Called with the final canvas size.
    fn on_composition_complete(&self, width: u32, height: u32) {
        let _ = (width, height);
    }

    /// Called once per document after every stage succeeded.
    fn on_conversion_complete(&self, stats: &ConversionStats) {
        let _ = stats;
    }

    /// Called when the batch orchestrator changes phase.
    fn on_batch_phase(&self, phase: BatchPhase) {
        let _ = phase;
    }

    /// Called when a discovered file enters `Converting`. Skipped files
    /// never start; they only complete.
    ///
    /// `index` is 1-based in discovery order.
    fn on_file_start(&self, index: usize, total: usize, input: &Path) {
        let _ = (index, total, input);
    }

    /// Called with each file's terminal result.
    fn on_file_complete(&self, index: usize, total: usize, result: &ConversionResult) {
        let _ = (index, total, result);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
