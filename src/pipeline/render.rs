//! Page access and rasterisation.
//!
//! The converter only talks to [`SlideDocument`] and [`SlidePage`]. The
//! pdfium-backed implementations live here; tests substitute in-memory
//! documents.
//!
//! pdfium uses a bottom-left origin. Everything leaving this module is
//! flipped to a top-left origin in page units so that region geometry lines up
//! with rendered bitmaps.

use crate::error::NotesError;
use crate::pipeline::regions::{DrawingShape, Rect, StructuralBlock};
use image::DynamicImage;
use once_cell::unsync::OnceCell;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A paginated slide deck.
pub trait SlideDocument {
    /// Number of pages, or `None` if it could not be determined.
    fn page_count(&self) -> Option<usize>;

    /// Load the page at 0-based `index`.
    fn page(&self, index: usize) -> Result<Box<dyn SlidePage + '_>, NotesError>;
}

/// One page of a slide deck.
pub trait SlidePage {
    /// Rasterise the whole page at `dpi`.
    fn render(&self, dpi: u32) -> Result<DynamicImage, NotesError>;

    /// Rasterise the `clip` window (page units, top-left origin) at `dpi`.
    ///
    /// The result has the resolution of a full render at `dpi`, clamped to
    /// the page. `None` when the window covers no pixels.
    fn render_region(&self, dpi: u32, clip: Rect) -> Result<Option<DynamicImage>, NotesError> {
        let full = self.render(dpi)?;
        Ok(clip_render(&full, clip, dpi))
    }

    /// The page's native text layer, one trimmed non-empty line per entry.
    fn text_lines(&self) -> Result<Vec<String>, NotesError>;

    /// Typed content blocks (text runs and raster images) with their boxes.
    fn structural_blocks(&self) -> Result<Vec<StructuralBlock>, NotesError>;

    /// Vector drawings on the page.
    fn drawings(&self) -> Result<Vec<DrawingShape>, NotesError>;
}

/// Cut the `clip` window out of a render made at `dpi`.
///
/// Page units map to pixels by `dpi / 72`; the window is rounded outwards and
/// clamped to the bitmap.
pub fn clip_render(rendered: &DynamicImage, clip: Rect, dpi: u32) -> Option<DynamicImage> {
    let scale = dpi as f64 / 72.0;
    let (w, h) = (rendered.width() as f64, rendered.height() as f64);

    let x0 = (clip.x0 * scale).floor().clamp(0.0, w);
    let y0 = (clip.y0 * scale).floor().clamp(0.0, h);
    let x1 = (clip.x1 * scale).ceil().clamp(0.0, w);
    let y1 = (clip.y1 * scale).ceil().clamp(0.0, h);
    if x1 - x0 < 1.0 || y1 - y0 < 1.0 {
        return None;
    }
    Some(rendered.crop_imm(x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
}

/// Bind to a pdfium library.
///
/// Searches, in order:
/// 1. `PDFIUM_LIB_PATH` (the library file itself, or its directory)
/// 2. the current directory
/// 3. system library paths
pub fn bind_pdfium() -> Result<Pdfium, NotesError> {
    let from_env = std::env::var("PDFIUM_LIB_PATH")
        .ok()
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .map(|p| {
            if p.is_file() {
                Pdfium::bind_to_library(&p)
            } else {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&p))
            }
        });

    let bindings = match from_env {
        Some(Ok(bindings)) => Ok(bindings),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| NotesError::PdfiumUnavailable(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Open a PDF file.
pub fn open_file<'a>(pdfium: &'a Pdfium, path: &Path) -> Result<PdfiumDocument<'a>, NotesError> {
    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| NotesError::DocumentUnreadable {
            source_name: path.display().to_string(),
            detail: format!("{:?}", e),
        })?;
    info!("PDF loaded: {} pages", document.pages().len());
    Ok(PdfiumDocument { document })
}

/// Open a PDF held in memory.
pub fn open_bytes<'a>(
    pdfium: &'a Pdfium,
    bytes: &'a [u8],
    source_name: &str,
) -> Result<PdfiumDocument<'a>, NotesError> {
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| NotesError::DocumentUnreadable {
            source_name: source_name.to_string(),
            detail: format!("{:?}", e),
        })?;
    info!("PDF loaded from memory: {} pages", document.pages().len());
    Ok(PdfiumDocument { document })
}

pub struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl SlideDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> Option<usize> {
        Some(self.document.pages().len() as usize)
    }

    fn page(&self, index: usize) -> Result<Box<dyn SlidePage + '_>, NotesError> {
        let number = index + 1;
        if index > u16::MAX as usize {
            return Err(NotesError::PageAccess {
                page: number,
                detail: "page index exceeds pdfium's limit".into(),
            });
        }
        let page = self
            .document
            .pages()
            .get(index as u16)
            .map_err(|e| NotesError::PageAccess {
                page: number,
                detail: format!("{:?}", e),
            })?;
        Ok(Box::new(PdfiumPage {
            page,
            number,
            objects: OnceCell::new(),
        }))
    }
}

pub struct PdfiumPage<'a> {
    page: PdfPage<'a>,
    number: usize,
    objects: OnceCell<ClassifiedObjects>,
}

/// Form XObjects nested deeper than this are not searched.
const MAX_FORM_DEPTH: usize = 8;

/// What a page object contributes to the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentKind {
    Text,
    Image,
    Drawing,
}

/// Content kinds found anywhere inside a form XObject.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct FormContents {
    text: bool,
    image: bool,
    drawing: bool,
}

impl FormContents {
    fn add(&mut self, kind: ContentKind) {
        match kind {
            ContentKind::Text => self.text = true,
            ContentKind::Image => self.image = true,
            ContentKind::Drawing => self.drawing = true,
        }
    }
}

/// One walk over a page's objects, split into blocks and drawings.
#[derive(Debug, Default)]
struct ClassifiedObjects {
    blocks: Vec<StructuralBlock>,
    drawings: Vec<DrawingShape>,
}

impl ClassifiedObjects {
    fn push(&mut self, kind: ContentKind, rect: Rect) {
        match kind {
            ContentKind::Text => self.blocks.push(StructuralBlock::text(rect)),
            ContentKind::Image => self.blocks.push(StructuralBlock::image(rect)),
            ContentKind::Drawing => self.drawings.push(DrawingShape::Rect(rect)),
        }
    }

    /// Child bounds live in form space, so the form's page-space box stands
    /// in for each kind of content it holds.
    fn push_form(&mut self, contents: FormContents, rect: Rect) {
        if contents.text {
            self.push(ContentKind::Text, rect);
        }
        if contents.image {
            self.push(ContentKind::Image, rect);
        }
        if contents.drawing {
            self.push(ContentKind::Drawing, rect);
        }
    }
}

fn content_kind(object: &PdfPageObject) -> Option<ContentKind> {
    match object.object_type() {
        PdfPageObjectType::Image => Some(ContentKind::Image),
        PdfPageObjectType::Text => Some(ContentKind::Text),
        PdfPageObjectType::Path | PdfPageObjectType::Shading => Some(ContentKind::Drawing),
        _ => None,
    }
}

fn scan_form(form: &PdfPageXObjectFormObject, depth: usize, found: &mut FormContents) {
    for child in form.iter() {
        if let Some(kind) = content_kind(&child) {
            found.add(kind);
        } else if depth < MAX_FORM_DEPTH {
            if let Some(inner) = child.as_x_object_form_object() {
                scan_form(inner, depth + 1, found);
            }
        }
    }
}

impl PdfiumPage<'_> {
    /// Convert pdfium bounds to a top-left-origin rectangle.
    fn flip(&self, left: f32, top: f32, right: f32, bottom: f32) -> Rect {
        let h = self.page.height().value as f64;
        Rect::new(left as f64, h - top as f64, right as f64, h - bottom as f64)
    }

    fn classified(&self) -> &ClassifiedObjects {
        self.objects.get_or_init(|| self.classify_objects())
    }

    fn classify_objects(&self) -> ClassifiedObjects {
        let mut classified = ClassifiedObjects::default();

        for object in self.page.objects().iter() {
            let rect = match object.bounds() {
                Ok(b) => {
                    self.flip(b.left().value, b.top().value, b.right().value, b.bottom().value)
                }
                Err(e) => {
                    debug!("Page {}: object without bounds skipped: {:?}", self.number, e);
                    continue;
                }
            };
            if let Some(kind) = content_kind(&object) {
                classified.push(kind, rect);
            } else if let Some(form) = object.as_x_object_form_object() {
                let mut contents = FormContents::default();
                scan_form(form, 1, &mut contents);
                debug!("Page {}: form XObject holds {:?}", self.number, contents);
                classified.push_form(contents, rect);
            }
        }

        classified
    }
}

impl SlidePage for PdfiumPage<'_> {
    fn render(&self, dpi: u32) -> Result<DynamicImage, NotesError> {
        let scale = dpi as f32 / 72.0;
        let width = (self.page.width().value * scale).round() as i32;
        let height = (self.page.height().value * scale).round() as i32;

        let config = PdfRenderConfig::new()
            .set_target_width(width.max(1))
            .set_target_height(height.max(1));

        let bitmap = self
            .page
            .render_with_config(&config)
            .map_err(|e| NotesError::RasterisationFailed {
                page: self.number,
                detail: format!("{:?}", e),
            })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            self.number,
            image.width(),
            image.height()
        );
        Ok(image)
    }

    fn text_lines(&self) -> Result<Vec<String>, NotesError> {
        let text = self.page.text().map_err(|e| NotesError::PageAccess {
            page: self.number,
            detail: format!("text layer unavailable: {:?}", e),
        })?;
        Ok(text
            .all()
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn structural_blocks(&self) -> Result<Vec<StructuralBlock>, NotesError> {
        Ok(self.classified().blocks.clone())
    }

    fn drawings(&self) -> Result<Vec<DrawingShape>, NotesError> {
        Ok(self.classified().drawings.clone())
    }
}
