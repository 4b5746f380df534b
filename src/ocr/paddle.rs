//! PaddleOCR via its command-line interface.
//!
//! `paddleocr ocr -i page.png --save_path out/ --lang en` writes one
//! `*_res.json` per input. Recent releases wrap the result in a `"res"` key and
//! store detection polygons, texts and scores as parallel arrays:
//!
//! ```json
//! {"res": {"rec_polys": [[[x,y],...]], "rec_texts": ["..."], "rec_scores": [0.98]}}
//! ```
//!
//! Each index becomes one `{"points", "text", "score"}` mapping. Older builds
//! emitted a list of entries directly; that list is passed through unchanged.

use super::{probe_version, write_scratch_png, OcrBackend};
use crate::config::ConversionConfig;
use crate::error::OcrError;
use image::DynamicImage;
use serde_json::{json, Value};
use std::path::Path;
use std::process::Command;
use tracing::debug;

pub const NAME: &str = "paddleocr";

pub struct PaddleOcrBackend {
    command: String,
    lang: String,
}

impl PaddleOcrBackend {
    /// Check the configured executable runs, then build the backend.
    pub fn init(config: &ConversionConfig) -> Result<Self, OcrError> {
        let command = config.paddleocr_command.as_str();
        let version = probe_version(NAME, command)?;
        debug!("PaddleOCR available: {}", version);
        Ok(Self {
            command: command.to_string(),
            lang: paddle_lang(&config.lang),
        })
    }

    fn run(&self, input: &Path, out_dir: &Path) -> Result<(), OcrError> {
        let output = Command::new(&self.command)
            .arg("ocr")
            .arg("-i")
            .arg(input)
            .arg("--lang")
            .arg(&self.lang)
            .arg("--save_path")
            .arg(out_dir)
            .arg("--use_doc_orientation_classify")
            .arg("False")
            .arg("--use_doc_unwarping")
            .arg("False")
            .output()
            .map_err(|e| OcrError::Failed {
                backend: NAME,
                detail: format!("could not run '{}': {}", self.command, e),
            })?;
        if !output.status.success() {
            return Err(OcrError::Failed {
                backend: NAME,
                detail: format!(
                    "exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(())
    }
}

impl OcrBackend for PaddleOcrBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn recognize(&self, image: &DynamicImage) -> Result<Vec<Value>, OcrError> {
        let scratch = tempfile::tempdir()?;
        let input = write_scratch_png(image, scratch.path())?;
        let out_dir = scratch.path().join("out");
        std::fs::create_dir_all(&out_dir)?;

        self.run(&input, &out_dir)?;

        let result_file = std::fs::read_dir(&out_dir)?
            .flatten()
            .map(|e| e.path())
            .find(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with("_res.json"))
            })
            .ok_or_else(|| OcrError::MalformedOutput {
                backend: NAME,
                detail: "no *_res.json result written".into(),
            })?;

        let raw = std::fs::read_to_string(&result_file)?;
        let value: Value = serde_json::from_str(&raw).map_err(|e| OcrError::MalformedOutput {
            backend: NAME,
            detail: format!("{}: {}", result_file.display(), e),
        })?;
        let entries = parse_result(&value)?;
        debug!("PaddleOCR returned {} entries", entries.len());
        Ok(entries)
    }
}

/// PaddleOCR names a few languages differently from ISO 639-1.
fn paddle_lang(lang: &str) -> String {
    match lang {
        "zh" => "ch".to_string(),
        "ja" => "japan".to_string(),
        "ko" => "korean".to_string(),
        other => other.to_string(),
    }
}

/// Translate one result document into raw entries.
pub fn parse_result(value: &Value) -> Result<Vec<Value>, OcrError> {
    let value = value.get("res").unwrap_or(value);

    if let Some(list) = value.as_array() {
        return Ok(list.clone());
    }

    let object = value.as_object().ok_or_else(|| OcrError::MalformedOutput {
        backend: NAME,
        detail: "result is neither an object nor a list".into(),
    })?;

    let empty = Vec::new();
    let array = |key: &str| object.get(key).and_then(Value::as_array);
    let texts = array("rec_texts").unwrap_or(&empty);
    let scores = array("rec_scores").unwrap_or(&empty);
    let polys = array("rec_polys")
        .or_else(|| array("dt_polys"))
        .unwrap_or(&empty);

    Ok(texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            json!({
                "points": polys.get(i).cloned().unwrap_or(Value::Null),
                "text": text,
                "score": scores.get(i).cloned().unwrap_or(Value::Null),
            })
        })
        .collect())
}
