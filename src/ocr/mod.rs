//! OCR engines.
//!
//! Both engines run as external executables: the page bitmap is written to a
//! scratch PNG, the engine is invoked on it, and its output is translated into
//! raw JSON values for [`crate::pipeline::entries`] to normalise. The two
//! engines deliberately produce different shapes (mappings from PaddleOCR,
//! nested `[box, [text, score]]` lists from Tesseract); the normaliser
//! accepts both.
//!
//! Selection order under [`OcrBackendKind::Auto`]: PaddleOCR, then Tesseract.
//! An engine that fails to initialise is skipped with a warning.

pub mod paddle;
pub mod tesseract;

use crate::config::{ConversionConfig, OcrBackendKind};
use crate::error::{NotesError, OcrError};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub use paddle::PaddleOcrBackend;
pub use tesseract::TesseractBackend;

/// A text recogniser for rendered slides.
pub trait OcrBackend: Send {
    /// Short engine name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Recognise text in `image`. Returns the engine's raw entries.
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<serde_json::Value>, OcrError>;
}

/// Initialise the first engine that works for `config`.
pub fn select_backend(config: &ConversionConfig) -> Result<Box<dyn OcrBackend>, NotesError> {
    let order: &[OcrBackendKind] = match config.ocr_backend {
        OcrBackendKind::Auto => &[OcrBackendKind::Paddle, OcrBackendKind::Tesseract],
        OcrBackendKind::Paddle => &[OcrBackendKind::Paddle],
        OcrBackendKind::Tesseract => &[OcrBackendKind::Tesseract],
    };

    let mut attempted = Vec::new();
    let mut failures = Vec::new();
    for kind in order {
        let result: Result<Box<dyn OcrBackend>, OcrError> = match kind {
            OcrBackendKind::Paddle => {
                PaddleOcrBackend::init(config).map(|b| Box::new(b) as Box<dyn OcrBackend>)
            }
            OcrBackendKind::Tesseract => {
                TesseractBackend::init(config).map(|b| Box::new(b) as Box<dyn OcrBackend>)
            }
            OcrBackendKind::Auto => continue,
        };
        match result {
            Ok(backend) => {
                info!("Using OCR backend: {}", backend.name());
                return Ok(backend);
            }
            Err(e) => {
                warn!("OCR backend skipped: {}", e);
                attempted.push(kind_name(*kind));
                failures.push(e.to_string());
            }
        }
    }

    Err(NotesError::OcrBackendsUnavailable {
        attempted: attempted.join(", "),
        detail: failures.join("\n"),
    })
}

fn kind_name(kind: OcrBackendKind) -> &'static str {
    match kind {
        OcrBackendKind::Paddle => paddle::NAME,
        OcrBackendKind::Tesseract => tesseract::NAME,
        OcrBackendKind::Auto => "auto",
    }
}

/// Write `image` as PNG into `dir` for an engine to read.
pub(crate) fn write_scratch_png(image: &DynamicImage, dir: &Path) -> Result<PathBuf, OcrError> {
    let path = dir.join("page.png");
    image.save_with_format(&path, image::ImageFormat::Png)?;
    Ok(path)
}

/// Run `command --version`; any failure means the engine is unusable.
pub(crate) fn probe_version(
    backend: &'static str,
    command: &str,
) -> Result<String, OcrError> {
    let output = std::process::Command::new(command)
        .arg("--version")
        .output()
        .map_err(|e| OcrError::Unavailable {
            backend,
            detail: format!("could not run '{command}': {e}"),
        })?;
    if !output.status.success() {
        return Err(OcrError::Unavailable {
            backend,
            detail: format!(
                "'{command} --version' exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    // Tesseract prints its version to stderr on some builds.
    let text = if output.stdout.is_empty() { &output.stderr } else { &output.stdout };
    Ok(String::from_utf8_lossy(text)
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .to_string())
}
