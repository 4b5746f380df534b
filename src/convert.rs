//! Conversion entry points.
//!
//! [`SlideConverter`] drives one deck at a time through the pipeline:
//!
//! ```text
//! for each page in range:
//!     render ──▶ OCR ──▶ normalise ──▶ group lines ─┐
//!        │                                          ├─▶ PageSection
//!        └──▶ probe layout ──▶ regions ──▶ policy ──┘      (+ slide PNG)
//! then:
//!     front-matter + sections ──▶ <stem>-ocr.md ──▶ <stem>.zip
//! ```
//!
//! Pages are processed strictly in order on the calling thread. The OCR engine
//! is initialised on the first page that needs it and then reused for every
//! later conversion by the same converter, so a batch of decks only pays the
//! engine start-up cost once.
//!
//! Any page failure (render, OCR, image write) aborts the run. The previous
//! run's assets, archives and notes are cleared before the first page, and
//! the new archive is only written after every page succeeded, so a failed
//! run leaves no bundle at all.

use crate::config::ConversionConfig;
use crate::error::NotesError;
use crate::ocr::{self, OcrBackend};
use crate::pipeline::bundle::{self, DocumentMetadata, PageSection};
use crate::pipeline::entries::extract_entries;
use crate::pipeline::lines::{group_lines, LineGroupingParams};
use crate::pipeline::policy::{should_include_image, PageSignals};
use crate::pipeline::regions::{PageLayout, Rect};
use crate::pipeline::render::{self, SlideDocument};
use crate::pipeline::input;
use crate::progress;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// What a successful conversion produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    /// The zip bundle (`<stem>.zip`, or `<stem>-N.zip` on collision).
    pub bundle_path: PathBuf,
    /// The Markdown notes file inside `notes_dir`.
    pub markdown_path: PathBuf,
    pub pages_processed: usize,
    /// Number of slide previews written to the asset directory.
    pub images_saved: usize,
}

/// Converts slide decks into notes bundles.
///
/// # Example
/// ```rust,no_run
/// use slidenotes::{ConversionConfig, SlideConverter};
///
/// # fn main() -> Result<(), slidenotes::NotesError> {
/// let mut converter = SlideConverter::new(ConversionConfig::default());
/// let result = converter.convert("lecture-01.pdf", "bundles", "notes")?;
/// println!("{} pages → {}", result.pages_processed, result.bundle_path.display());
/// # Ok(())
/// # }
/// ```
pub struct SlideConverter {
    config: ConversionConfig,
    backend: Option<Box<dyn OcrBackend>>,
}

impl SlideConverter {
    /// A converter that selects its OCR engine lazily from `config`.
    pub fn new(config: ConversionConfig) -> Self {
        Self {
            config,
            backend: None,
        }
    }

    /// A converter using an already-initialised OCR engine.
    pub fn with_backend(config: ConversionConfig, backend: Box<dyn OcrBackend>) -> Self {
        Self {
            config,
            backend: Some(backend),
        }
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Name of the OCR engine in use, once one has been initialised.
    pub fn backend_name(&self) -> Option<&'static str> {
        self.backend.as_ref().map(|b| b.name())
    }

    /// Convert the PDF at `pdf_path`.
    ///
    /// Writes `<stem>-ocr.md` and `<stem>-assets/` into `notes_dir` and the zip
    /// bundle into `bundle_dir`; both directories are created if missing.
    pub fn convert(
        &mut self,
        pdf_path: impl AsRef<Path>,
        bundle_dir: impl AsRef<Path>,
        notes_dir: impl AsRef<Path>,
    ) -> Result<ConversionResult, NotesError> {
        let pdf_path = input::resolve_local(pdf_path.as_ref())?;
        let source_name = pdf_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| pdf_path.display().to_string());

        let pdfium = render::bind_pdfium()?;
        let document = render::open_file(&pdfium, &pdf_path)?;
        self.convert_document(&document, &source_name, bundle_dir.as_ref(), notes_dir.as_ref())
    }

    /// Convert a PDF held in memory. `source_name` names the outputs
    /// (`deck.pdf` → `deck-ocr.md`, `deck.zip`).
    pub fn convert_bytes(
        &mut self,
        source_name: &str,
        bytes: &[u8],
        bundle_dir: impl AsRef<Path>,
        notes_dir: impl AsRef<Path>,
    ) -> Result<ConversionResult, NotesError> {
        input::check_bytes(bytes, source_name)?;
        let pdfium = render::bind_pdfium()?;
        let document = render::open_bytes(&pdfium, bytes, source_name)?;
        self.convert_document(&document, source_name, bundle_dir.as_ref(), notes_dir.as_ref())
    }

    /// Convert an already-opened document.
    pub fn convert_document(
        &mut self,
        document: &dyn SlideDocument,
        source_name: &str,
        bundle_dir: &Path,
        notes_dir: &Path,
    ) -> Result<ConversionResult, NotesError> {
        let start = Instant::now();
        let stem = input::source_stem(source_name);
        info!("Starting conversion: {}", source_name);

        for dir in [bundle_dir, notes_dir] {
            std::fs::create_dir_all(dir).map_err(|e| NotesError::write_failed(dir, e))?;
        }
        let asset_dir_name = bundle::asset_dir_name(&stem);
        let asset_dir = notes_dir.join(&asset_dir_name);
        bundle::reset_dir(&asset_dir)?;
        bundle::clear_leftover_archives(bundle_dir, &stem);
        let markdown_path = notes_dir.join(bundle::markdown_file_name(&stem));
        bundle::remove_stale_file(&markdown_path);

        // ── Resolve the page range ───────────────────────────────────────
        let document_pages = document.page_count();
        let range = document_pages.and_then(|n| self.config.pages.resolve(n));
        let total = document_pages.map(|_| range.map_or(0, |(s, e)| e - s + 1));
        match document_pages {
            Some(n) => debug!("Document has {} pages, range {:?}", n, range),
            None => warn!("Page count of '{}' is unknown; no pages will be processed", source_name),
        }

        let callback = self.config.progress_callback.clone();
        progress::report(callback.as_ref(), 0, total);

        // ── Per-page loop ────────────────────────────────────────────────
        let mut sections = Vec::new();
        let mut images_saved = 0;
        if let Some((first, last)) = range {
            self.ensure_backend()?;
            let backend = self
                .backend
                .as_deref()
                .ok_or_else(|| NotesError::Internal("OCR backend missing after init".into()))?;

            for (done, index) in (first..=last).enumerate() {
                let section = process_page(
                    &self.config,
                    backend,
                    document,
                    index,
                    &asset_dir,
                    &asset_dir_name,
                )?;
                if section.image.is_some() {
                    images_saved += 1;
                }
                sections.push(section);
                progress::report(callback.as_ref(), done + 1, total);
            }
        }

        // ── Markdown ─────────────────────────────────────────────────────
        let metadata = DocumentMetadata {
            generated_at: Utc::now(),
            render_dpi: self.config.dpi,
            source_pdf: source_name.to_string(),
            page_range: bundle::page_range_label(
                document_pages,
                range,
                self.config.pages.requested(),
            ),
            pages_processed: sections.len(),
            document_pages,
        };
        let markdown = bundle::assemble_markdown(&metadata, &sections);
        write_atomic(&markdown_path, &markdown)?;

        // ── Bundle ───────────────────────────────────────────────────────
        let bundle_path = bundle::unique_archive_path(bundle_dir, &stem);
        bundle::write_archive(&bundle_path, &markdown_path, &asset_dir, &asset_dir_name)?;

        info!(
            "Conversion complete: {} pages, {} images → {} ({}ms)",
            sections.len(),
            images_saved,
            bundle_path.display(),
            start.elapsed().as_millis()
        );

        Ok(ConversionResult {
            bundle_path,
            markdown_path,
            pages_processed: sections.len(),
            images_saved,
        })
    }

    fn ensure_backend(&mut self) -> Result<(), NotesError> {
        if self.backend.is_none() {
            self.backend = Some(ocr::select_backend(&self.config)?);
        }
        Ok(())
    }
}

/// Convert `pdf_path` on a blocking worker thread.
///
/// pdfium and the OCR engines are synchronous, so the whole pipeline runs
/// inside [`tokio::task::spawn_blocking`] with a fresh converter.
///
/// # Example
/// ```rust,no_run
/// use slidenotes::{convert_file, ConversionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let result = convert_file("deck.pdf", "out", "notes", &ConversionConfig::default()).await?;
/// println!("{}", result.markdown_path.display());
/// # Ok(())
/// # }
/// ```
pub async fn convert_file(
    pdf_path: impl AsRef<Path>,
    bundle_dir: impl AsRef<Path>,
    notes_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionResult, NotesError> {
    let pdf_path = pdf_path.as_ref().to_path_buf();
    let bundle_dir = bundle_dir.as_ref().to_path_buf();
    let notes_dir = notes_dir.as_ref().to_path_buf();
    let config = config.clone();

    tokio::task::spawn_blocking(move || {
        SlideConverter::new(config).convert(&pdf_path, &bundle_dir, &notes_dir)
    })
    .await
    .map_err(|e| NotesError::Internal(format!("conversion task panicked: {e}")))?
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn process_page(
    config: &ConversionConfig,
    backend: &dyn OcrBackend,
    document: &dyn SlideDocument,
    index: usize,
    asset_dir: &Path,
    asset_dir_name: &str,
) -> Result<PageSection, NotesError> {
    let number = index + 1;
    let page = document.page(index)?;
    let rendered = page.render(config.dpi)?;

    let raw = backend
        .recognize(&rendered)
        .map_err(|source| NotesError::OcrFailed {
            page: number,
            source,
        })?;
    let entries = extract_entries(&raw);

    let native_lines = page.text_lines().unwrap_or_else(|e| {
        warn!("Page {}: text layer unavailable: {}", number, e);
        Vec::new()
    });

    let layout = PageLayout::probe(&*page);
    let regions = layout.visual_regions(config.region_min_size, config.region_merge_margin);

    let params = LineGroupingParams {
        threshold: config.line_threshold,
        min_confidence: config.min_confidence,
    };
    let lines = group_lines(&entries, &native_lines, &params);

    let signals = PageSignals {
        has_text: !entries.is_empty() || !native_lines.is_empty(),
        has_raster_images: layout.has_raster_images(),
        has_vector_drawings: layout.has_vector_drawings(),
        has_visual_regions: !regions.is_empty(),
    };
    let include = should_include_image(signals);
    debug!(
        "Page {}: {} raw / {} usable entries, {} lines, {} regions, image: {}",
        number,
        raw.len(),
        entries.len(),
        lines.len(),
        regions.len(),
        include
    );

    let image = if include {
        // Cropped previews are a fresh render of the region window, never a
        // cut of the bitmap that went to OCR.
        let clip = Rect::union_all(&regions).filter(|_| config.crop_to_regions);
        let preview = match clip {
            Some(area) => page.render_region(config.dpi, area)?.unwrap_or(rendered),
            None => rendered,
        };
        let file_name = bundle::slide_image_name(number);
        let path = asset_dir.join(&file_name);
        preview
            .save_with_format(&path, image::ImageFormat::Png)
            .map_err(|e| NotesError::write_failed(&path, std::io::Error::other(e)))?;
        Some(format!("{asset_dir_name}/{file_name}"))
    } else {
        None
    };

    Ok(PageSection {
        number,
        image,
        lines,
    })
}

/// Write `contents` to a sibling temp file, then rename over `path`.
fn write_atomic(path: &Path, contents: &str) -> Result<(), NotesError> {
    let tmp_path = path.with_extension("md.tmp");
    std::fs::write(&tmp_path, contents).map_err(|e| NotesError::write_failed(path, e))?;
    std::fs::rename(&tmp_path, path).map_err(|e| NotesError::write_failed(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck-ocr.md");
        write_atomic(&path, "first").unwrap();
        write_atomic(&path, "second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert!(!dir.path().join("deck-ocr.md.tmp").exists());
    }
}
