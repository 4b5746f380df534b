//! Notes assembly and packaging.
//!
//! Layout produced for a deck called `deck.pdf`:
//!
//! ```text
//! <notes_dir>/deck-ocr.md              front-matter + "# Slide Notes" + sections
//! <notes_dir>/deck-assets/slide-NNN.png   one per page that kept its preview
//! <bundle_dir>/deck.zip                deck-ocr.md + deck-assets/slide-NNN.png
//! ```
//!
//! The archive is deterministic: entries are written in a fixed order with a
//! fixed timestamp, so converting the same deck twice yields the same bytes.

use crate::error::NotesError;
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const GENERATOR: &str = "slidenotes-ocr";

/// Body used when no page was processed.
pub const NO_SLIDES_PLACEHOLDER: &str = "_No slides were processed._";

/// Markdown fragment for one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSection {
    /// 1-indexed page number.
    pub number: usize,
    /// Relative path of the preview image, if one was saved.
    pub image: Option<String>,
    pub lines: Vec<String>,
}

impl PageSection {
    pub fn render(&self) -> String {
        let mut out = format!("## Slide {}\n\n", self.number);
        if let Some(ref image) = self.image {
            out.push_str(&format!("![Slide {}]({})\n\n", self.number, image));
        }
        out.push_str(&self.lines.join("\n"));
        out
    }
}

/// Front-matter values, fixed once the page loop has finished.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMetadata {
    pub generated_at: DateTime<Utc>,
    pub render_dpi: u32,
    pub source_pdf: String,
    pub page_range: String,
    pub pages_processed: usize,
    pub document_pages: Option<usize>,
}

impl DocumentMetadata {
    pub fn to_front_matter(&self) -> String {
        let mut yaml = String::from("---\n");
        yaml.push_str(&format!("generator: {}\n", GENERATOR));
        yaml.push_str(&format!(
            "generated_at: {}\n",
            self.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
        yaml.push_str(&format!("render_dpi: {}\n", self.render_dpi));
        // A JSON string literal is a valid YAML double-quoted scalar.
        yaml.push_str(&format!(
            "source_pdf: {}\n",
            serde_json::Value::from(self.source_pdf.as_str())
        ));
        yaml.push_str(&format!("page_range: {}\n", self.page_range));
        yaml.push_str(&format!("pages_processed: {}\n", self.pages_processed));
        if let Some(n) = self.document_pages {
            yaml.push_str(&format!("document_pages: {}\n", n));
        }
        yaml.push_str("---\n");
        yaml
    }
}

/// Label for the processed page range.
///
/// * `unknown`: the document's page count could not be determined
/// * `all`: the range spans the whole document (or no range was requested
///   for an empty document)
/// * `start-end`: anything else, 1-indexed
pub fn page_range_label(
    document_pages: Option<usize>,
    processed: Option<(usize, usize)>,
    requested: Option<(usize, usize)>,
) -> String {
    let Some(total) = document_pages else {
        return "unknown".to_string();
    };
    match processed {
        Some((start, end)) if start == 0 && end + 1 == total => "all".to_string(),
        Some((start, end)) => format!("{}-{}", start + 1, end + 1),
        None => match requested {
            Some((start, end)) => format!("{start}-{end}"),
            None => "all".to_string(),
        },
    }
}

/// Assemble the full Markdown document.
pub fn assemble_markdown(metadata: &DocumentMetadata, sections: &[PageSection]) -> String {
    let body = if sections.is_empty() {
        NO_SLIDES_PLACEHOLDER.to_string()
    } else {
        sections
            .iter()
            .map(PageSection::render)
            .collect::<Vec<_>>()
            .join("\n\n")
    };
    format!("{}\n# Slide Notes\n\n{}\n", metadata.to_front_matter(), body)
}

pub fn markdown_file_name(stem: &str) -> String {
    format!("{stem}-ocr.md")
}

pub fn asset_dir_name(stem: &str) -> String {
    format!("{stem}-assets")
}

pub fn slide_image_name(page_number: usize) -> String {
    format!("slide-{page_number:03}.png")
}

/// Remove and recreate `dir` so no file from an earlier run survives.
pub fn reset_dir(dir: &Path) -> Result<(), NotesError> {
    if dir.exists() {
        std::fs::remove_dir_all(dir).map_err(|e| NotesError::write_failed(dir, e))?;
    }
    std::fs::create_dir_all(dir).map_err(|e| NotesError::write_failed(dir, e))
}

/// Delete archives left by an earlier run for `stem` (`stem.zip`,
/// `stem-N.zip`). Failures are logged; the collision-free naming in
/// [`unique_archive_path`] keeps a surviving archive from being overwritten.
pub fn clear_leftover_archives(bundle_dir: &Path, stem: &str) {
    let pattern = match Regex::new(&format!(r"^{}(-\d+)?\.zip$", regex::escape(stem))) {
        Ok(re) => re,
        Err(e) => {
            warn!("Could not build archive pattern for '{}': {}", stem, e);
            return;
        }
    };
    let entries = match std::fs::read_dir(bundle_dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Bundle dir {} not readable: {}", bundle_dir.display(), e);
            return;
        }
    };
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !pattern.is_match(&name) {
            continue;
        }
        match std::fs::remove_file(entry.path()) {
            Ok(()) => debug!("Removed leftover archive {}", name),
            Err(e) => warn!("Could not remove leftover archive {}: {}", name, e),
        }
    }
}

/// Best-effort removal of a previous run's output file.
pub fn remove_stale_file(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed stale {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove stale {}: {}", path.display(), e),
    }
}

/// `stem.zip`, or the first free `stem-N.zip`.
pub fn unique_archive_path(bundle_dir: &Path, stem: &str) -> PathBuf {
    let candidate = bundle_dir.join(format!("{stem}.zip"));
    if !candidate.exists() {
        return candidate;
    }
    (1..)
        .map(|n| bundle_dir.join(format!("{stem}-{n}.zip")))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// PNG files directly inside `asset_dir`, sorted by name.
pub fn list_images(asset_dir: &Path) -> Result<Vec<String>, NotesError> {
    let mut names: Vec<String> = std::fs::read_dir(asset_dir)
        .map_err(|e| NotesError::write_failed(asset_dir, e))?
        .flatten()
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.to_ascii_lowercase().ends_with(".png"))
        .collect();
    names.sort();
    Ok(names)
}

/// Write the zip bundle: the Markdown file at its bare name, then every PNG
/// under `<asset_dir_name>/`.
pub fn write_archive(
    archive_path: &Path,
    markdown_path: &Path,
    asset_dir: &Path,
    asset_dir_name: &str,
) -> Result<(), NotesError> {
    let archive_err = |detail: String| NotesError::ArchiveFailed {
        path: archive_path.to_path_buf(),
        detail,
    };

    let markdown_name = markdown_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| archive_err("markdown path has no file name".into()))?;
    let images = list_images(asset_dir)?;

    let file = File::create(archive_path).map_err(|e| NotesError::write_failed(archive_path, e))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o644);

    let mut add = |name: &str, source: &Path| -> Result<(), NotesError> {
        let bytes = std::fs::read(source).map_err(|e| NotesError::write_failed(source, e))?;
        zip.start_file(name, options)
            .map_err(|e| archive_err(format!("{name}: {e}")))?;
        zip.write_all(&bytes)
            .map_err(|e| archive_err(format!("{name}: {e}")))
    };

    add(&markdown_name, markdown_path)?;
    for image in &images {
        // Archive paths always use '/', whatever the host separator.
        add(&format!("{asset_dir_name}/{image}"), &asset_dir.join(image))?;
    }

    zip.finish().map_err(|e| archive_err(e.to_string()))?;
    debug!(
        "Packaged {} with {} image(s)",
        archive_path.display(),
        images.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn metadata(page_range: &str, document_pages: Option<usize>) -> DocumentMetadata {
        DocumentMetadata {
            generated_at: Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap(),
            render_dpi: 200,
            source_pdf: "week1: intro.pdf".into(),
            page_range: page_range.into(),
            pages_processed: 3,
            document_pages,
        }
    }

    #[test]
    fn front_matter_layout() {
        let fm = metadata("2-4", Some(10)).to_front_matter();
        assert_eq!(
            fm,
            "---\n\
             generator: slidenotes-ocr\n\
             generated_at: 2026-03-02T09:30:00Z\n\
             render_dpi: 200\n\
             source_pdf: \"week1: intro.pdf\"\n\
             page_range: 2-4\n\
             pages_processed: 3\n\
             document_pages: 10\n\
             ---\n"
        );
    }

    #[test]
    fn front_matter_omits_unknown_page_count() {
        let fm = metadata("unknown", None).to_front_matter();
        assert!(fm.contains("page_range: unknown\n"));
        assert!(!fm.contains("document_pages"));
    }

    #[test]
    fn range_labels() {
        assert_eq!(page_range_label(Some(10), Some((0, 9)), None), "all");
        assert_eq!(page_range_label(Some(10), Some((0, 9)), Some((1, 99))), "all");
        assert_eq!(page_range_label(Some(10), Some((1, 3)), Some((2, 4))), "2-4");
        assert_eq!(page_range_label(Some(10), Some((0, 0)), Some((1, 1))), "1-1");
        assert_eq!(page_range_label(None, None, None), "unknown");
        assert_eq!(page_range_label(Some(0), None, None), "all");
        assert_eq!(page_range_label(Some(0), None, Some((2, 3))), "2-3");
    }

    #[test]
    fn section_rendering() {
        let with_image = PageSection {
            number: 2,
            image: Some("deck-assets/slide-002.png".into()),
            lines: vec!["- a".into(), "- b".into()],
        };
        assert_eq!(
            with_image.render(),
            "## Slide 2\n\n![Slide 2](deck-assets/slide-002.png)\n\n- a\n- b"
        );

        let text_only = PageSection {
            number: 1,
            image: None,
            lines: vec!["_No text detected._".into()],
        };
        assert_eq!(text_only.render(), "## Slide 1\n\n_No text detected._");
    }

    #[test]
    fn empty_document_body() {
        let md = assemble_markdown(&metadata("all", Some(0)), &[]);
        assert!(md.ends_with("# Slide Notes\n\n_No slides were processed._\n"));
        assert!(md.starts_with("---\n"));
    }

    #[test]
    fn sections_are_separated_by_blank_lines() {
        let sections = vec![
            PageSection {
                number: 1,
                image: None,
                lines: vec!["- one".into()],
            },
            PageSection {
                number: 2,
                image: None,
                lines: vec!["- two".into()],
            },
        ];
        let md = assemble_markdown(&metadata("all", Some(2)), &sections);
        assert!(md.contains("# Slide Notes\n\n## Slide 1\n\n- one\n\n## Slide 2\n\n- two\n"));
    }

    #[test]
    fn names() {
        assert_eq!(markdown_file_name("deck"), "deck-ocr.md");
        assert_eq!(asset_dir_name("deck"), "deck-assets");
        assert_eq!(slide_image_name(7), "slide-007.png");
        assert_eq!(slide_image_name(1234), "slide-1234.png");
    }

    #[test]
    fn unique_path_appends_counter() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(unique_archive_path(dir.path(), "deck"), dir.path().join("deck.zip"));

        std::fs::write(dir.path().join("deck.zip"), b"old").unwrap();
        assert_eq!(unique_archive_path(dir.path(), "deck"), dir.path().join("deck-1.zip"));

        std::fs::write(dir.path().join("deck-1.zip"), b"older").unwrap();
        assert_eq!(unique_archive_path(dir.path(), "deck"), dir.path().join("deck-2.zip"));
    }

    #[test]
    fn clearing_only_touches_matching_archives() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["deck.zip", "deck-3.zip", "deck-final.zip", "other.zip", "deck.md"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        clear_leftover_archives(dir.path(), "deck");

        let mut left: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        left.sort();
        assert_eq!(left, vec!["deck-final.zip", "deck.md", "other.zip"]);
    }

    #[test]
    fn reset_dir_drops_old_files() {
        let dir = tempfile::tempdir().unwrap();
        let assets = dir.path().join("deck-assets");
        std::fs::create_dir_all(&assets).unwrap();
        std::fs::write(assets.join("slide-009.png"), b"stale").unwrap();

        reset_dir(&assets).unwrap();
        assert!(assets.is_dir());
        assert_eq!(std::fs::read_dir(&assets).unwrap().count(), 0);
    }

    #[test]
    fn archive_contains_markdown_and_images() {
        let dir = tempfile::tempdir().unwrap();
        let md = dir.path().join("deck-ocr.md");
        std::fs::write(&md, "# Slide Notes\n").unwrap();
        let assets = dir.path().join("deck-assets");
        std::fs::create_dir_all(&assets).unwrap();
        std::fs::write(assets.join("slide-002.png"), b"png-2").unwrap();
        std::fs::write(assets.join("slide-001.png"), b"png-1").unwrap();
        std::fs::write(assets.join("notes.txt"), b"ignored").unwrap();

        let archive = dir.path().join("deck.zip");
        write_archive(&archive, &md, &assets, "deck-assets").unwrap();

        let mut zip = zip::ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let names: Vec<String> = (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["deck-ocr.md", "deck-assets/slide-001.png", "deck-assets/slide-002.png"]
        );
        assert_eq!(
            zip.by_name("deck-ocr.md").unwrap().compression(),
            CompressionMethod::Deflated
        );
    }

    #[test]
    fn archive_bytes_are_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        let md = dir.path().join("deck-ocr.md");
        std::fs::write(&md, "same").unwrap();
        let assets = dir.path().join("deck-assets");
        std::fs::create_dir_all(&assets).unwrap();
        std::fs::write(assets.join("slide-001.png"), b"png").unwrap();

        let a = dir.path().join("a.zip");
        let b = dir.path().join("b.zip");
        write_archive(&a, &md, &assets, "deck-assets").unwrap();
        write_archive(&b, &md, &assets, "deck-assets").unwrap();
        assert_eq!(std::fs::read(a).unwrap(), std::fs::read(b).unwrap());
    }
}
