//! Image encoding and the atomic output writer.
//!
//! The composed canvas is always opaque RGB, so both formats receive exactly
//! the pixels the cropper tested. PNG is written losslessly at the highest
//! compression level; JPEG honours the configured quality.
//!
//! Writes go to a temp file in the destination directory which is renamed
//! into place only after every byte is on disk. A failure at any point
//! drops the temp file, so readers never observe a truncated image.

use crate::config::OutputFormat;
use crate::error::LongshotError;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Encode `canvas` in `format`. `quality` is only used for JPEG.
///
/// `path` is reported in errors only; nothing is written.
pub fn encode_image(
    canvas: &RgbImage,
    format: OutputFormat,
    quality: u8,
    path: &Path,
) -> Result<Vec<u8>, LongshotError> {
    let mut buf = Vec::new();
    let (w, h) = canvas.dimensions();

    let result = match format {
        OutputFormat::Png => PngEncoder::new_with_quality(
            &mut buf,
            CompressionType::Best,
            FilterType::Adaptive,
        )
        .write_image(canvas.as_raw(), w, h, ExtendedColorType::Rgb8),
        OutputFormat::Jpeg => JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
            .write_image(canvas.as_raw(), w, h, ExtendedColorType::Rgb8),
    };

    result.map_err(|e| LongshotError::EncodeFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    debug!("Encoded {}x{} canvas as {} → {} bytes", w, h, format, buf.len());
    Ok(buf)
}

/// Write `bytes` to `path` atomically, creating parent directories first.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), LongshotError> {
    let io_err = |source: std::io::Error| LongshotError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(io_err)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".longshot-")
        .suffix(".part")
        .tempfile_in(parent)
        .map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    debug!("Wrote {} bytes → {}", bytes.len(), path.display());
    Ok(())
}
