//! End-to-end integration tests for slidenotes.
//!
//! These tests use real PDF decks in `./test_cases/`, a real pdfium library and
//! a real OCR engine. They are gated behind the `E2E_ENABLED` environment
//! variable so they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=. cargo test --test e2e -- --nocapture
//!
//! To restrict to a specific test:
//!   E2E_ENABLED=1 cargo test --test e2e test_convert_deck -- --nocapture

use slidenotes::pipeline::render::{self, SlideDocument};
use slidenotes::pipeline::regions::detect_visual_regions;
use slidenotes::{
    convert_file, ConversionConfig, NotesError, PageSelection, ProgressCallback, ProgressError,
    SlideConverter,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

fn output_dir(name: &str) -> PathBuf {
    let d = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_cases/output")
        .join(name);
    std::fs::create_dir_all(&d).ok();
    d
}

/// Route library logs to the test output (`RUST_LOG=slidenotes=debug`).
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("slidenotes=info")),
        )
        .with_test_writer()
        .try_init();
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP: test file not found: {}", p.display());
            println!("       Place a slide deck at test_cases/slides.pdf");
            return;
        }
        init_tracing();
        p
    }};
}

/// Assert the notes file has the expected overall shape.
fn assert_notes_shape(md: &str, context: &str) {
    assert!(md.starts_with("---\ngenerator: slidenotes-ocr\n"), "[{context}] missing front-matter");
    assert!(md.contains("\n# Slide Notes\n"), "[{context}] missing title");
    assert!(md.ends_with('\n'), "[{context}] Markdown must end with a newline");
    assert!(
        !md.contains("\n\n\n"),
        "[{context}] Output has consecutive blank lines"
    );
    for line in md.lines().skip_while(|l| !l.starts_with("## ")) {
        let ok = line.is_empty()
            || line.starts_with("## Slide ")
            || line.starts_with("![Slide ")
            || line.starts_with("- ")
            || line == "_No text detected._";
        assert!(ok, "[{context}] unexpected body line: {line:?}");
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn test_pdfium_page_probes() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("slides.pdf"));
    let pdfium = render::bind_pdfium().expect("pdfium must bind for e2e tests");
    let document = render::open_file(&pdfium, &path).unwrap();

    let count = document.page_count().unwrap();
    assert!(count > 0);

    let page = document.page(0).unwrap();
    let image = page.render(100).unwrap();
    assert!(image.width() > 0 && image.height() > 0);

    let regions = detect_visual_regions(&*page, 12.0, 6.0);
    println!(
        "page 1: {} text lines, {} regions",
        page.text_lines().unwrap().len(),
        regions.len()
    );
    for r in &regions {
        assert!(r.width() >= 12.0 && r.height() >= 12.0, "{r:?}");
    }

    let err = document.page(count).err().expect("page past the end must fail");
    assert!(matches!(err, NotesError::PageAccess { .. }));
}

#[test]
fn test_convert_deck() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("slides.pdf"));
    let out = output_dir("deck");

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let cb: ProgressCallback = Arc::new(
        move |done: usize, total: Option<usize>| -> Result<(), ProgressError> {
            sink.lock().unwrap().push((done, total));
            Ok(())
        },
    );
    let config = ConversionConfig::builder()
        .pages(PageSelection::Range(1, 3))
        .progress_callback(cb)
        .build()
        .unwrap();

    let mut converter = SlideConverter::new(config);
    let result = converter
        .convert(&path, out.join("bundles"), out.join("notes"))
        .expect("conversion failed");
    println!("backend: {:?}, result: {result:#?}", converter.backend_name());

    assert!(result.pages_processed >= 1 && result.pages_processed <= 3);
    assert!(result.bundle_path.exists());
    let md = std::fs::read_to_string(&result.markdown_path).unwrap();
    assert_notes_shape(&md, "slides.pdf");

    let events = events.lock().unwrap();
    assert_eq!(events.first().map(|e| e.0), Some(0));
    assert_eq!(events.last().map(|e| e.0), Some(result.pages_processed));

    // Second run replaces, never accumulates.
    let again = converter
        .convert(&path, out.join("bundles"), out.join("notes"))
        .unwrap();
    assert_eq!(again.bundle_path, result.bundle_path);
}

#[test]
fn test_convert_bytes() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("slides.pdf"));
    let out = output_dir("bytes");
    let bytes = std::fs::read(&path).unwrap();

    let config = ConversionConfig::builder()
        .pages(PageSelection::Single(1))
        .build()
        .unwrap();
    let result = SlideConverter::new(config)
        .convert_bytes("in-memory.pdf", &bytes, out.join("bundles"), out.join("notes"))
        .unwrap();
    assert_eq!(result.pages_processed, 1);
    assert!(result.markdown_path.ends_with("in-memory-ocr.md"));
}

#[tokio::test]
async fn test_convert_file_async() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("slides.pdf"));
    let out = output_dir("async");
    let config = ConversionConfig::builder()
        .pages(PageSelection::Single(1))
        .build()
        .unwrap();

    let result = convert_file(&path, out.join("bundles"), out.join("notes"), &config)
        .await
        .unwrap();
    assert_eq!(result.pages_processed, 1);
}

#[tokio::test]
async fn test_convert_nonexistent() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
        return;
    }
    let out = output_dir("missing");
    let err = convert_file(
        test_cases_dir().join("does-not-exist.pdf"),
        out.join("bundles"),
        out.join("notes"),
        &ConversionConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, NotesError::FileNotFound { .. }), "{err:?}");
}
