//! Error types for the slide-narrator library.
//!
//! Three error types mirror the three ways a conversion can go wrong:
//!
//! * [`NarratorError`] — **Fatal**: the job cannot proceed (bad input file,
//!   provider not configured, the output deck cannot be written). Returned as
//!   `Err` from the pre-flight of [`crate::convert_stream`] or turned into the
//!   terminal `error` progress event once the job is running.
//!
//! * [`BackendError`] — **Recovered**: the generation backend failed for one
//!   slide. The narration generator substitutes a placeholder and the job
//!   continues.
//!
//! * [`ShapeError`] — **Recovered**: one shape of an existing slide could not
//!   be drawn. The visualizer skips it and keeps going.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of failures, used by callers that map errors onto
/// their own reporting (HTTP status codes, exit codes, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Missing, unreadable or unsupported source; reported before any slide.
    Input,
    /// The output deck could not be assembled or saved.
    Persistence,
    /// Anything else caught at the orchestrator boundary.
    Internal,
}

/// All fatal errors returned by the slide-narrator library.
#[derive(Debug, Error)]
pub enum NarratorError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Source file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file extension is neither `.pdf` nor `.pptx`.
    #[error("Unsupported file format '{extension}' for '{path}'\nSupported formats: .pdf, .pptx")]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// The file content does not match its declared kind.
    #[error("File '{path}' is not a valid {expected}\nFirst bytes: {magic:?}")]
    BadMagic {
        path: PathBuf,
        expected: &'static str,
        magic: [u8; 4],
    },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// The PPTX package is missing required parts or contains invalid XML.
    #[error("Slide deck '{path}' is corrupt: {detail}")]
    CorruptDeck { path: PathBuf, detail: String },

    /// The source has no pages or slides to narrate.
    #[error("'{path}' contains no pages or slides")]
    EmptySource { path: PathBuf },

    // ── Rendering errors ──────────────────────────────────────────────────
    /// Page index exceeds the document's page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Install libpdfium system-wide, or\n\
  • Place libpdfium in the working directory, or\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (file or directory).\n"
    )]
    PdfiumBindingFailed(String),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Persistence errors ────────────────────────────────────────────────
    /// The output deck could not be modified (slide or notes part missing).
    #[error("Failed to assemble output deck: {0}")]
    DeckAssembly(String),

    /// Could not create or write the output PPTX file.
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

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NarratorError {
    /// Classify this error for callers that need a coarse category.
    pub fn class(&self) -> ErrorClass {
        match self {
            NarratorError::FileNotFound { .. }
            | NarratorError::PermissionDenied { .. }
            | NarratorError::InvalidInput { .. }
            | NarratorError::DownloadFailed { .. }
            | NarratorError::DownloadTimeout { .. }
            | NarratorError::UnsupportedFormat { .. }
            | NarratorError::BadMagic { .. }
            | NarratorError::CorruptPdf { .. }
            | NarratorError::CorruptDeck { .. }
            | NarratorError::EmptySource { .. }
            | NarratorError::ProviderNotConfigured { .. }
            | NarratorError::InvalidConfig(_) => ErrorClass::Input,
            NarratorError::DeckAssembly(_) | NarratorError::OutputWriteFailed { .. } => {
                ErrorClass::Persistence
            }
            NarratorError::PageOutOfRange { .. }
            | NarratorError::RasterisationFailed { .. }
            | NarratorError::PdfiumBindingFailed(_)
            | NarratorError::Internal(_) => ErrorClass::Internal,
        }
    }
}

/// A failure of the generation backend for a single request.
///
/// Never escapes the narration generator: it is logged and replaced by a
/// placeholder narration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// Transport or API error (network, quota, authentication, …).
    #[error("generation request failed: {0}")]
    Request(String),

    /// The backend answered, but with nothing usable.
    #[error("generation backend returned an empty response")]
    EmptyResponse,

    /// The request could not be built (e.g. the image failed to encode).
    #[error("could not build generation request: {0}")]
    InvalidRequest(String),
}

/// A single shape that could not be synthesized into a slide visual.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShapeError {
    /// The shape's embedded image is missing or cannot be decoded.
    #[error("shape '{shape}': image decode failed: {detail}")]
    Decode { shape: String, detail: String },

    /// The shape has no position/size, or a degenerate one.
    #[error("shape '{shape}': unusable geometry")]
    Geometry { shape: String },
}
