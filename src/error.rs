//! Error types for the edgequake-longshot library.
//!
//! A single fatal error type, [`LongshotError`], covers every way one
//! document's conversion can fail. Each variant belongs to exactly one
//! [`ErrorKind`], and the kind alone decides the process exit code and the
//! `kind` recorded in a batch report:
//!
//! | Kind | Exit code | Examples |
//! |------|-----------|----------|
//! | [`ErrorKind::Validation`]  | 1   | missing file, not a PDF, > 100 MB, encrypted, output collision |
//! | [`ErrorKind::Render`]      | 2   | pdfium failed on a page, pdfium not found |
//! | [`ErrorKind::Composition`] | 3   | empty document, invalid crop box, canvas over budget |
//! | [`ErrorKind::Output`]      | 4   | encoder failure, disk full |
//! | [`ErrorKind::Cancelled`]   | 130 | Ctrl-C |
//! | [`ErrorKind::Internal`]    | 255 | a blocking task panicked |
//!
//! None of these errors is retried. Inside a batch run they are converted to
//! [`crate::batch::ConversionResult::Failed`] and the run moves on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-longshot library.
#[derive(Debug, Error)]
pub enum LongshotError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The path exists but is a directory or another non-regular file.
    #[error("Path is not a file: '{path}'")]
    NotAFile { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file does not carry a `.pdf` extension.
    #[error("Invalid file format for '{path}': expected .pdf, got '{extension}'")]
    UnsupportedExtension { path: PathBuf, extension: String },

    /// The file is zero bytes long.
    #[error("PDF file is empty: '{path}'")]
    EmptyFile { path: PathBuf },

    /// The file is larger than the configured ceiling.
    #[error("File size of '{path}' ({size_bytes} bytes) exceeds the limit of {limit_bytes} bytes")]
    FileTooLarge {
        path: PathBuf,
        size_bytes: u64,
        limit_bytes: u64,
    },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// The PDF is encrypted.
    #[error("PDF '{path}' is encrypted and requires a password.")]
    PasswordRequired { path: PathBuf },

    /// The document has more pages than the configured maximum.
    #[error("PDF '{path}' has {pages} pages, more than the limit of {limit}")]
    TooManyPages {
        path: PathBuf,
        pages: usize,
        limit: usize,
    },

    /// Rendering every page would exceed the configured pixel budget.
    #[error(
        "PDF '{path}' would render to {pixels} pixels, more than the limit of {limit}\n\
Lower --dpi or raise --max-canvas-pixels."
    )]
    DocumentTooLarge { path: PathBuf, pixels: u64, limit: u64 },

    /// Two batch inputs mirror to the same output path.
    #[error("Output '{output}' is already claimed by '{other}'\nRename one of the inputs so their names differ.")]
    OutputCollision { output: PathBuf, other: PathBuf },

    /// Batch input root does not exist.
    #[error("Input directory does not exist: '{path}'")]
    InputDirNotFound { path: PathBuf },

    /// Batch input root exists but is not a directory.
    #[error("Input path is not a directory: '{path}'")]
    NotADirectory { path: PathBuf },

    // ── Render errors ─────────────────────────────────────────────────────
    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place the library next to the\n\
binary, or install it system-wide.\n\
Pre-built libraries: https://github.com/bblanchon/pdfium-binaries/releases"
    )]
    PdfiumBindingFailed(String),

    // ── Composition errors ────────────────────────────────────────────────
    /// There were no pages to stitch.
    #[error("Cannot compose an empty document: no pages were rendered")]
    EmptyDocument,

    /// Pages and crop boxes were not parallel sequences.
    #[error("Composition received {pages} pages but {boxes} crop boxes")]
    PageCountMismatch { pages: usize, boxes: usize },

    /// A crop box does not fit inside its page or has zero area.
    #[error("Invalid crop box for page {page}: {detail}")]
    InvalidCropBox { page: usize, detail: String },

    /// The stitched canvas would not fit in 32-bit pixel dimensions.
    #[error("Canvas of {width}x{height} px is too large to allocate")]
    CanvasTooLarge { width: u64, height: u64 },

    /// The stitched canvas fits in memory addressing but exceeds the pixel budget.
    #[error(
        "Canvas of {width}x{height} px ({pixels} pixels) exceeds the limit of {limit}\n\
Lower --dpi, enable cropping, or raise --max-canvas-pixels."
    )]
    CanvasOverBudget {
        width: u32,
        height: u32,
        pixels: u64,
        limit: u64,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The image encoder rejected the canvas (e.g. JPEG dimension limit).
    #[error("Failed to encode output image '{path}': {detail}")]
    EncodeFailed { path: PathBuf, detail: String },

    /// Could not create or write the output image file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Control ───────────────────────────────────────────────────────────
    /// The user interrupted the run.
    #[error("Conversion cancelled by user")]
    Cancelled,

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`LongshotError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad, missing, oversized, encrypted or corrupt input; bad configuration.
    Validation,
    /// External rasterisation failure.
    Render,
    /// Page stitching failure.
    Composition,
    /// Encoding or writing the output failed.
    Output,
    /// User-initiated interrupt.
    Cancelled,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// Process exit code for a single-document run failing with this kind.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Validation => 1,
            ErrorKind::Render => 2,
            ErrorKind::Composition => 3,
            ErrorKind::Output => 4,
            ErrorKind::Cancelled => 130,
            ErrorKind::Internal => 255,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Render => "render",
            ErrorKind::Composition => "composition",
            ErrorKind::Output => "output",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

impl LongshotError {
    /// The [`ErrorKind`] this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        use LongshotError::*;
        match self {
            FileNotFound { .. }
            | NotAFile { .. }
            | PermissionDenied { .. }
            | UnsupportedExtension { .. }
            | EmptyFile { .. }
            | FileTooLarge { .. }
            | NotAPdf { .. }
            | CorruptPdf { .. }
            | PasswordRequired { .. }
            | TooManyPages { .. }
            | DocumentTooLarge { .. }
            | OutputCollision { .. }
            | InputDirNotFound { .. }
            | NotADirectory { .. }
            | InvalidConfig(_) => ErrorKind::Validation,
            RasterisationFailed { .. } | PdfiumBindingFailed(_) => ErrorKind::Render,
            EmptyDocument
            | PageCountMismatch { .. }
            | InvalidCropBox { .. }
            | CanvasTooLarge { .. }
            | CanvasOverBudget { .. } => ErrorKind::Composition,
            EncodeFailed { .. } | OutputWriteFailed { .. } => ErrorKind::Output,
            Cancelled => ErrorKind::Cancelled,
            Internal(_) => ErrorKind::Internal,
        }
    }

    /// Shorthand for `self.kind().exit_code()`.
    pub fn exit_code(&self) -> u8 {
        self.kind().exit_code()
    }
}
