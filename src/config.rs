//! Configuration types for slide-to-notes conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Every knob lives in one struct so a
//! converter can be cloned into a blocking task or logged in full.
//!
//! The grouping threshold and confidence cut-off are expressed in render pixels
//! at the default 200 DPI. They are *not* rescaled when `dpi` changes; callers
//! rendering at a different resolution should set them explicitly.

use crate::error::NotesError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration for a slide-deck conversion.
///
/// # Example
/// ```rust
/// use slidenotes::{ConversionConfig, PageSelection};
///
/// let config = ConversionConfig::builder()
///     .dpi(150)
///     .lang("de")
///     .pages(PageSelection::Range(2, 4))
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 150);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Rendering DPI for both OCR input and saved previews. Range: 72–600. Default: 200.
    pub dpi: u32,

    /// OCR language code (ISO 639-1, e.g. "en", "de"). Default: "en".
    pub lang: String,

    /// Maximum vertical distance, in render pixels, between an entry's centre
    /// and the current line's centre for the entry to join that line. Default: 24.0.
    pub line_threshold: f64,

    /// Entries below this confidence are discarded before grouping. Default: 0.3.
    pub min_confidence: f64,

    /// Visual candidates narrower or shorter than this (page units) are ignored. Default: 12.0.
    pub region_min_size: f64,

    /// Outward margin applied to each visual candidate before merging. Default: 6.0.
    pub region_merge_margin: f64,

    /// Crop saved previews to the union of detected visual regions. Default: false.
    pub crop_to_regions: bool,

    /// Which OCR engine(s) to try. Default: [`OcrBackendKind::Auto`].
    pub ocr_backend: OcrBackendKind,

    /// Executable used for the full-suite engine. Default: "paddleocr".
    pub paddleocr_command: String,

    /// Executable used for the classical engine. Default: "tesseract".
    pub tesseract_command: String,

    /// Page selection. Default: all pages.
    pub pages: PageSelection,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            dpi: 200,
            lang: "en".to_string(),
            line_threshold: 24.0,
            min_confidence: 0.3,
            region_min_size: 12.0,
            region_merge_margin: 6.0,
            crop_to_regions: false,
            ocr_backend: OcrBackendKind::default(),
            paddleocr_command: "paddleocr".to_string(),
            tesseract_command: "tesseract".to_string(),
            pages: PageSelection::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("dpi", &self.dpi)
            .field("lang", &self.lang)
            .field("line_threshold", &self.line_threshold)
            .field("min_confidence", &self.min_confidence)
            .field("region_min_size", &self.region_min_size)
            .field("region_merge_margin", &self.region_merge_margin)
            .field("crop_to_regions", &self.crop_to_regions)
            .field("ocr_backend", &self.ocr_backend)
            .field("paddleocr_command", &self.paddleocr_command)
            .field("tesseract_command", &self.tesseract_command)
            .field("pages", &self.pages)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.config.lang = lang.into();
        self
    }

    pub fn line_threshold(mut self, px: f64) -> Self {
        self.config.line_threshold = px;
        self
    }

    pub fn min_confidence(mut self, c: f64) -> Self {
        self.config.min_confidence = c;
        self
    }

    pub fn region_min_size(mut self, size: f64) -> Self {
        self.config.region_min_size = size;
        self
    }

    pub fn region_merge_margin(mut self, margin: f64) -> Self {
        self.config.region_merge_margin = margin;
        self
    }

    pub fn crop_to_regions(mut self, v: bool) -> Self {
        self.config.crop_to_regions = v;
        self
    }

    pub fn ocr_backend(mut self, kind: OcrBackendKind) -> Self {
        self.config.ocr_backend = kind;
        self
    }

    pub fn paddleocr_command(mut self, cmd: impl Into<String>) -> Self {
        self.config.paddleocr_command = cmd.into();
        self
    }

    pub fn tesseract_command(mut self, cmd: impl Into<String>) -> Self {
        self.config.tesseract_command = cmd.into();
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, NotesError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(NotesError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.lang.trim().is_empty() {
            return Err(NotesError::InvalidConfig("OCR language must not be empty".into()));
        }
        if !(c.line_threshold.is_finite() && c.line_threshold >= 0.0) {
            return Err(NotesError::InvalidConfig(format!(
                "line threshold must be a non-negative number, got {}",
                c.line_threshold
            )));
        }
        if !c.min_confidence.is_finite() {
            return Err(NotesError::InvalidConfig("min confidence must be finite".into()));
        }
        if !(c.region_min_size >= 0.0 && c.region_merge_margin >= 0.0) {
            return Err(NotesError::InvalidConfig(
                "region size and margin must be non-negative".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which OCR engine(s) the converter may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OcrBackendKind {
    /// Try the full-suite engine first, then the classical engine. (default)
    #[default]
    Auto,
    /// PaddleOCR only.
    Paddle,
    /// Tesseract only.
    Tesseract,
}

/// Specifies which pages of the deck to convert (1-indexed, inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSelection {
    /// Convert all pages (default).
    #[default]
    All,
    /// Convert a single page.
    Single(usize),
    /// Convert a contiguous range of pages.
    Range(usize, usize),
}

impl PageSelection {
    /// Resolve into an inclusive 0-indexed `(start, end)` range.
    ///
    /// Both ends are clamped into `[0, page_count - 1]` and `end` is raised to
    /// `start` if needed, so a non-empty document always yields a range.
    /// Returns `None` only for an empty document.
    pub fn resolve(&self, page_count: usize) -> Option<(usize, usize)> {
        if page_count == 0 {
            return None;
        }
        let last = page_count - 1;
        let (start, end) = match *self {
            PageSelection::All => return Some((0, last)),
            PageSelection::Single(p) => (p, p),
            PageSelection::Range(s, e) => (s, e),
        };
        let start_index = start.saturating_sub(1).min(last);
        let end_index = end.saturating_sub(1).min(last).max(start_index);
        Some((start_index, end_index))
    }

    /// The range a caller asked for, as 1-indexed `(start, end)`.
    pub fn requested(&self) -> Option<(usize, usize)> {
        match *self {
            PageSelection::All => None,
            PageSelection::Single(p) => Some((p, p)),
            PageSelection::Range(s, e) => Some((s, e)),
        }
    }
}

impl std::str::FromStr for PageSelection {
    type Err = String;

    /// Parses `all`, `N` or `N-M`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(PageSelection::All);
        }
        let parse = |v: &str| {
            v.trim()
                .parse::<usize>()
                .map_err(|_| format!("invalid page number '{}'", v.trim()))
        };
        match s.split_once('-') {
            Some((a, b)) => Ok(PageSelection::Range(parse(a)?, parse(b)?)),
            None => Ok(PageSelection::Single(parse(s)?)),
        }
    }
}
