//! Pipeline stages for PDF-to-long-screenshot conversion.
//!
//! Each submodule implements exactly one transformation step and knows
//! nothing about the others beyond the types it consumes.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ crop ──▶ compose ──▶ encode
//! (checks)  (pdfium)  (per page) (canvas)   (PNG/JPEG + atomic write)
//! ```
//!
//! 1. [`input`]   — cheap file checks before pdfium is touched
//! 2. [`render`]  — rasterise every page through a [`render::PageSource`];
//!    blocking, so callers run it in `spawn_blocking`
//! 3. [`crop`]    — find each page's content box
//! 4. [`compose`] — stack the cropped pages on one background-filled canvas
//! 5. [`encode`]  — serialise the canvas and write it atomically

pub mod compose;
pub mod crop;
pub mod encode;
pub mod input;
pub mod render;
