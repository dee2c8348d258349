//! Cooperative cancellation shared between a run and its interrupt handler.
//!
//! Rendering runs inside pdfium and cannot be interrupted mid-page, so the
//! pipeline polls the token between stages instead. A cancelled document
//! never reaches the output writer, which means no partial image is left on
//! disk.

use crate::error::LongshotError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cloneable cancellation flag. All clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// `Err(LongshotError::Cancelled)` once [`cancel`](Self::cancel) was called.
    pub fn check(&self) -> Result<(), LongshotError> {
        if self.is_cancelled() {
            Err(LongshotError::Cancelled)
        } else {
            Ok(())
        }
    }
}
