//! Input validation: reject bad files before pdfium ever sees them.
//!
//! Every check here is cheap (a `stat` and a 4-byte read), so a batch full of
//! junk fails fast without paying for library binding or rendering. Checks
//! run in this order and the first failure wins:
//!
//! 1. exists, is a regular file, is readable
//! 2. has a `.pdf` extension (case-insensitive)
//! 3. is non-empty and no larger than the configured ceiling
//! 4. starts with the `%PDF` magic bytes

use crate::error::LongshotError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A local file that passed every pre-render check.
#[derive(Debug, Clone)]
pub struct ValidatedInput {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Returns `true` when `path` ends in `.pdf`, ignoring case.
pub fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Validate a local PDF path against the size ceiling `max_file_size_bytes`.
pub fn validate_input(
    path: &Path,
    max_file_size_bytes: u64,
) -> Result<ValidatedInput, LongshotError> {
    let path = path.to_path_buf();

    let metadata = match std::fs::metadata(&path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(LongshotError::PermissionDenied { path });
        }
        Err(_) => return Err(LongshotError::FileNotFound { path }),
    };

    if !metadata.is_file() {
        return Err(LongshotError::NotAFile { path });
    }

    if !has_pdf_extension(&path) {
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        return Err(LongshotError::UnsupportedExtension { path, extension });
    }

    let size_bytes = metadata.len();
    if size_bytes == 0 {
        return Err(LongshotError::EmptyFile { path });
    }
    if size_bytes > max_file_size_bytes {
        return Err(LongshotError::FileTooLarge {
            path,
            size_bytes,
            limit_bytes: max_file_size_bytes,
        });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            // Files shorter than 4 bytes cannot hold the magic at all.
            if f.read_exact(&mut magic).is_err() || &magic != b"%PDF" {
                return Err(LongshotError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(LongshotError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(LongshotError::FileNotFound { path });
        }
    }

    debug!("Validated PDF: {} ({} bytes)", path.display(), size_bytes);
    Ok(ValidatedInput { path, size_bytes })
}
