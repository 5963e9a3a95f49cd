//! Error types for the pagebind library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PagebindError`] — **Fatal**: the pipeline cannot proceed at all
//!   (missing input, corrupt source, invalid settings). Returned as
//!   `Err(PagebindError)` from the top-level entry points. No partial output
//!   is ever produced alongside one of these.
//!
//! * [`PageError`] — **Non-fatal**: a single page failed to render or encode.
//!   Surfaced through the streaming preview so callers can observe where the
//!   decode loop stopped.
//!
//! Cancellation is deliberately *not* an error: a paused preview ends with
//! [`crate::PreviewState::Paused`] and keeps the pages rendered so far.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pagebind library.
///
/// Page-level failures in the preview pipeline use [`PageError`] instead.
#[derive(Debug, Error)]
pub enum PagebindError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The file could not be identified as a supported raster image.
    #[error("File is not a supported image: '{path}'")]
    NotAnImage { path: PathBuf },

    // ── Collection errors ─────────────────────────────────────────────────
    /// An assembly was requested with no images in the collection.
    #[error("No images to merge — add at least one image first")]
    EmptyCollection,

    /// A collection index was outside the current bounds.
    #[error("Index {index} is out of range (collection has {len} images)")]
    IndexOutOfRange { index: usize, len: usize },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The rasteriser returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── Image errors ──────────────────────────────────────────────────────
    /// An image in the collection could not be decoded at assembly time.
    #[error("Failed to decode image '{path}': {detail}")]
    ImageDecodeFailed { path: PathBuf, detail: String },

    /// PNG/JPEG encoding of a rendered surface failed.
    #[error("Image encoding failed: {detail}")]
    EncodeFailed { detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Assembling or serialising the PDF document failed.
    #[error("PDF assembly failed: {detail}")]
    PdfBuildFailed { detail: String },

    /// Building the ZIP archive of exported pages failed.
    #[error("Archive creation failed: {detail}")]
    ArchiveFailed { detail: String },

    /// Could not create or write an output file.
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

    /// A locale catalog document could not be parsed.
    #[error("Invalid locale catalog: {detail}")]
    LocaleCatalog { detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page of the preview pipeline.
///
/// The decode loop logs the failure and stops rendering further pages; the
/// pages already produced are kept but are not promised to be complete.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Page rasterisation failed.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// Encoding the rendered surface to the output format failed.
    #[error("Page {page}: encoding failed: {detail}")]
    EncodeFailed { page: usize, detail: String },
}

impl PageError {
    /// 1-based page number this error refers to.
    pub fn page(&self) -> usize {
        match self {
            PageError::RenderFailed { page, .. } => *page,
            PageError::EncodeFailed { page, .. } => *page,
        }
    }
}
