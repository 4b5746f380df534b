//! # slidenotes
//!
//! Turn PDF slide decks into reviewable notes bundles.
//!
//! Every slide is rendered, run through an OCR engine and folded into a
//! Markdown section of reading-order bullets. Slides that carry pictures,
//! charts or diagrams keep a PNG preview next to their text; plain text slides
//! do not. The notes file and its previews are then packed into a zip bundle.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    validate the file (exists, readable, %PDF magic)
//!  ├─ 2. Render   rasterise each page via pdfium
//!  ├─ 3. OCR      PaddleOCR, falling back to Tesseract
//!  ├─ 4. Lines    normalise entries, group into bullets
//!  ├─ 5. Regions  find visual content; decide on a preview image
//!  └─ 6. Bundle   <stem>-ocr.md + <stem>-assets/ → <stem>.zip
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use slidenotes::{ConversionConfig, PageSelection, SlideConverter};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .pages(PageSelection::Range(2, 4))
//!         .build()?;
//!     let mut converter = SlideConverter::new(config);
//!     let result = converter.convert("lecture-03.pdf", "bundles", "notes")?;
//!     println!("{} slides, {} previews", result.pages_processed, result.images_saved);
//!     Ok(())
//! }
//! ```
//!
//! ## Runtime requirements
//!
//! * a pdfium shared library (see [`pipeline::render::bind_pdfium`])
//! * the `paddleocr` or `tesseract` executable on `PATH`
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `slides2notes` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod ocr;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, OcrBackendKind, PageSelection};
pub use convert::{convert_file, ConversionResult, SlideConverter};
pub use error::{ErrorKind, NotesError, OcrError};
pub use ocr::{select_backend, OcrBackend};
pub use pipeline::render::{SlideDocument, SlidePage};
pub use progress::{ConversionProgressCallback, ProgressCallback, ProgressError};
