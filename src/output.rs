//! Result types for a single-document conversion.

use image::RgbImage;
use serde::{Deserialize, Serialize};

/// The composed canvas plus what it took to build it.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// Opaque RGB long screenshot.
    pub image: RgbImage,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Per-document counters and stage timings, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub page_count: usize,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub render_ms: u64,
    pub compose_ms: u64,
    /// Zero until the canvas is encoded.
    pub encode_ms: u64,
    pub total_ms: u64,
    /// Size of the written file; zero when nothing was written.
    pub output_bytes: u64,
}
