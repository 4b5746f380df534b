//! Error types for the slidenotes library.
//!
//! Two distinct error types reflect two distinct layers:
//!
//! * [`NotesError`]: returned by every `convert*` entry point. It falls into
//!   one of two kinds (see [`ErrorKind`]):
//!   - **Dependency**: a required library or OCR engine is missing. Only fixable
//!     by installing or switching a backend.
//!   - **Conversion**: the run cannot complete (unreadable document, bad page
//!     index, OCR engine blew up mid-page, output not writable). Fatal for the
//!     current run and never retried automatically.
//!
//! * [`OcrError`]: raised by an individual [`crate::ocr::OcrBackend`]. The
//!   backend selection chain catches [`OcrError::Unavailable`] to try the next
//!   engine; any error raised while recognising a page is wrapped into
//!   [`NotesError::OcrFailed`] and aborts the whole conversion.
//!
//! There is no "succeeded with warnings" result. Best-effort conditions
//! (progress callback failures, leftover archive deletion, malformed geometry)
//! are logged and never surface here.

use std::path::PathBuf;
use thiserror::Error;

/// The two failure kinds a caller can receive from a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required OCR, rendering or imaging library is absent.
    Dependency,
    /// The current run failed and produced no valid bundle.
    Conversion,
}

/// All fatal errors returned by the slidenotes library.
#[derive(Debug, Error)]
pub enum NotesError {
    // ── Dependency errors ─────────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium and either:\n\
  • place it next to the executable, or\n\
  • set PDFIUM_LIB_PATH=/directory/containing/libpdfium.\n"
    )]
    PdfiumUnavailable(String),

    /// No OCR engine could be initialised.
    #[error("No OCR backend available (tried: {attempted})\n{detail}")]
    OcrBackendsUnavailable { attempted: String, detail: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Document errors ───────────────────────────────────────────────────
    /// pdfium could not open the document.
    #[error("Could not open slide deck '{source_name}': {detail}")]
    DocumentUnreadable { source_name: String, detail: String },

    /// A page inside the resolved range could not be accessed.
    #[error("Page {page} could not be loaded: {detail}")]
    PageAccess { page: usize, detail: String },

    /// Rendering a page to a bitmap failed.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The OCR engine raised while recognising a page.
    #[error("OCR failed on page {page}: {source}")]
    OcrFailed {
        page: usize,
        #[source]
        source: OcrError,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create, clear or write an output file or directory.
    #[error("Failed to write output '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Packaging the zip bundle failed.
    #[error("Failed to package bundle '{path}': {detail}")]
    ArchiveFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NotesError {
    /// Which of the two failure kinds this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            NotesError::PdfiumUnavailable(_) | NotesError::OcrBackendsUnavailable { .. } => {
                ErrorKind::Dependency
            }
            _ => ErrorKind::Conversion,
        }
    }

    pub fn is_dependency(&self) -> bool {
        self.kind() == ErrorKind::Dependency
    }

    pub(crate) fn write_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        NotesError::OutputWriteFailed {
            path: path.into(),
            source,
        }
    }
}

/// An error raised by a single OCR engine.
#[derive(Debug, Error)]
pub enum OcrError {
    /// The engine is not installed or failed to initialise.
    #[error("{backend} is unavailable: {detail}")]
    Unavailable {
        backend: &'static str,
        detail: String,
    },

    /// The engine ran but reported failure.
    #[error("{backend} failed: {detail}")]
    Failed {
        backend: &'static str,
        detail: String,
    },

    /// The engine produced output we could not read at all.
    #[error("{backend} produced unreadable output: {detail}")]
    MalformedOutput {
        backend: &'static str,
        detail: String,
    },

    /// The page bitmap could not be handed to the engine.
    #[error("could not encode page image: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl OcrError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, OcrError::Unavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_errors_are_classified() {
        let e = NotesError::OcrBackendsUnavailable {
            attempted: "paddleocr, tesseract".into(),
            detail: "nothing installed".into(),
        };
        assert_eq!(e.kind(), ErrorKind::Dependency);
        assert!(e.is_dependency());
        assert!(NotesError::PdfiumUnavailable("missing".into()).is_dependency());
    }

    #[test]
    fn backends_unavailable_names_both_engines() {
        let e = NotesError::OcrBackendsUnavailable {
            attempted: "paddleocr, tesseract".into(),
            detail: String::new(),
        };
        let msg = e.to_string();
        assert!(msg.contains("paddleocr"), "got: {msg}");
        assert!(msg.contains("tesseract"), "got: {msg}");
    }

    #[test]
    fn ocr_failure_keeps_its_cause() {
        use std::error::Error as _;

        let e = NotesError::OcrFailed {
            page: 3,
            source: OcrError::Failed {
                backend: "tesseract",
                detail: "segfault".into(),
            },
        };
        assert_eq!(e.kind(), ErrorKind::Conversion);
        assert!(e.to_string().contains("page 3"));
        let cause = e.source().expect("cause preserved");
        assert!(cause.to_string().contains("segfault"));
    }

    #[test]
    fn unavailable_is_detected() {
        let e = OcrError::Unavailable {
            backend: "paddleocr",
            detail: "not on PATH".into(),
        };
        assert!(e.is_unavailable());
        let e = OcrError::Failed {
            backend: "paddleocr",
            detail: "boom".into(),
        };
        assert!(!e.is_unavailable());
    }
}
