//! CLI binary for slidenotes.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig`, converts each deck in turn and prints where the
//! bundles went.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use slidenotes::{
    ConversionConfig, ConversionProgressCallback, ConversionResult, OcrBackendKind, PageSelection,
    ProgressCallback, ProgressError, SlideConverter,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress bar fed by the converter's `(done, total)` events.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    /// Switch to the full bar once the slide count is known.
    fn activate_bar(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} slides  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_style(style);
        self.bar.set_prefix("Converting");
        self.bar.reset_eta();
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_progress(
        &self,
        pages_done: usize,
        total_pages: Option<usize>,
    ) -> Result<(), ProgressError> {
        match (pages_done, total_pages) {
            (0, Some(total)) => self.activate_bar(total),
            (0, None) => self.bar.set_message("page count unknown"),
            (done, total) => {
                self.bar.println(format!(
                    "  {} Slide {:>3}/{}",
                    green("✓"),
                    done,
                    total.map_or("?".to_string(), |t| t.to_string())
                ));
                self.bar.set_position(done as u64);
            }
        }
        Ok(())
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert one deck; bundle and notes land in ./bundles and ./notes
  slides2notes lecture-01.pdf

  # Several decks, one OCR engine start-up
  slides2notes week*.pdf --bundle-dir out --notes-dir notes

  # Only slides 2 to 4, German OCR, Tesseract only
  slides2notes --pages 2-4 --lang de --backend tesseract deck.pdf

  # Crop previews to the pictures and diagrams on each slide
  slides2notes --crop deck.pdf

OUTPUT:
  <notes-dir>/<stem>-ocr.md            notes with YAML front-matter
  <notes-dir>/<stem>-assets/slide-NNN.png
  <bundle-dir>/<stem>.zip              notes + previews

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH     Directory (or file) of an existing libpdfium
  RUST_LOG            Log filter, e.g. slidenotes=debug
"#;

#[derive(Parser, Debug)]
#[command(
    name = "slides2notes",
    version,
    about = "Turn PDF slide decks into OCR-derived Markdown notes bundles",
    long_about = "Render every slide of a PDF deck, OCR it with PaddleOCR or Tesseract, and \
write reading-order Markdown notes with slide previews for visual content, packed into a zip bundle.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF decks to convert.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory receiving the zip bundles.
    #[arg(long, env = "SLIDES2NOTES_BUNDLE_DIR", default_value = "bundles")]
    bundle_dir: PathBuf,

    /// Directory receiving the Markdown notes and slide previews.
    #[arg(long, env = "SLIDES2NOTES_NOTES_DIR", default_value = "notes")]
    notes_dir: PathBuf,

    /// Pages to convert: "all", "N" or "N-M" (1-indexed, inclusive).
    #[arg(long, env = "SLIDES2NOTES_PAGES", default_value = "all")]
    pages: PageSelection,

    /// Render resolution for OCR and previews.
    #[arg(long, env = "SLIDES2NOTES_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// OCR language (ISO 639-1).
    #[arg(long, env = "SLIDES2NOTES_LANG", default_value = "en")]
    lang: String,

    /// OCR engine selection.
    #[arg(long, env = "SLIDES2NOTES_BACKEND", value_enum, default_value = "auto")]
    backend: BackendArg,

    /// Vertical distance (pixels) within which entries share a line.
    #[arg(long, default_value_t = 24.0)]
    line_threshold: f64,

    /// Drop OCR entries below this confidence.
    #[arg(long, default_value_t = 0.3)]
    min_confidence: f64,

    /// Crop previews to the detected visual regions.
    #[arg(long, env = "SLIDES2NOTES_CROP")]
    crop: bool,

    /// PaddleOCR executable.
    #[arg(long, env = "PADDLEOCR_COMMAND", default_value = "paddleocr")]
    paddleocr: String,

    /// Tesseract executable.
    #[arg(long, env = "TESSERACT_COMMAND", default_value = "tesseract")]
    tesseract: String,

    /// Disable the progress bar.
    #[arg(long, env = "SLIDES2NOTES_NO_PROGRESS")]
    no_progress: bool,

    /// Debug logging.
    #[arg(short, long, env = "SLIDES2NOTES_VERBOSE")]
    verbose: bool,

    /// Errors only.
    #[arg(short, long, env = "SLIDES2NOTES_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum BackendArg {
    Auto,
    Paddle,
    Tesseract,
}

impl From<BackendArg> for OcrBackendKind {
    fn from(v: BackendArg) -> Self {
        match v {
            BackendArg::Auto => OcrBackendKind::Auto,
            BackendArg::Paddle => OcrBackendKind::Paddle,
            BackendArg::Tesseract => OcrBackendKind::Tesseract,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs unless -v is given.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress = show_progress.then(CliProgressCallback::new);
    let config = build_config(&cli, progress.clone().map(|p| p as ProgressCallback))?;

    // ── Run conversions ──────────────────────────────────────────────────
    // pdfium and the OCR engines block, so the whole batch runs on one
    // blocking worker with a single converter.
    let inputs = cli.inputs.clone();
    let bundle_dir = cli.bundle_dir.clone();
    let notes_dir = cli.notes_dir.clone();
    let bar = progress.as_ref().map(|p| p.bar.clone());

    let results = tokio::task::spawn_blocking(move || -> Result<Vec<(PathBuf, ConversionResult)>> {
        let mut converter = SlideConverter::new(config);
        let mut results = Vec::with_capacity(inputs.len());
        for input in inputs {
            if let Some(ref bar) = bar {
                bar.println(format!("{} {}", bold("◆"), input.display()));
            }
            let result = converter
                .convert(&input, &bundle_dir, &notes_dir)
                .with_context(|| format!("Conversion of '{}' failed", input.display()))?;
            results.push((input, result));
        }
        Ok(results)
    })
    .await
    .context("Conversion task panicked")?;

    if let Some(ref p) = progress {
        p.bar.finish_and_clear();
    }
    let results = results?;

    // ── Summary ──────────────────────────────────────────────────────────
    if !cli.quiet {
        for (input, result) in &results {
            eprintln!(
                "{}  {}  {} slides, {} previews  →  {}",
                green("✔"),
                input.display(),
                result.pages_processed,
                result.images_saved,
                bold(&result.bundle_path.display().to_string()),
            );
            eprintln!("   {}", dim(&result.markdown_path.display().to_string()));
        }
    }

    Ok(())
}

fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .dpi(cli.dpi)
        .lang(&cli.lang)
        .pages(cli.pages)
        .ocr_backend(cli.backend.into())
        .line_threshold(cli.line_threshold)
        .min_confidence(cli.min_confidence)
        .crop_to_regions(cli.crop)
        .paddleocr_command(&cli.paddleocr)
        .tesseract_command(&cli.tesseract);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
