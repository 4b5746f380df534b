//! Tesseract via its command-line interface.
//!
//! Runs `tesseract page.png stdout -l <lang> --psm 3 tsv` and rebuilds text
//! lines from the word-level TSV rows. Each line is emitted in the nested
//! list shape `[[corner; 4], [text, confidence]]` with confidence in `0..=1`.

use super::{probe_version, write_scratch_png, OcrBackend};
use crate::config::ConversionConfig;
use crate::error::OcrError;
use image::DynamicImage;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::process::Command;
use tracing::{debug, warn};

pub const NAME: &str = "tesseract";

pub struct TesseractBackend {
    command: String,
    lang: String,
}

impl TesseractBackend {
    /// Check the executable runs and, where it can tell us, that the language
    /// data is installed.
    pub fn init(config: &ConversionConfig) -> Result<Self, OcrError> {
        let command = config.tesseract_command.as_str();
        let version = probe_version(NAME, command)?;
        debug!("Tesseract available: {}", version);

        let lang = tesseract_lang(&config.lang);
        if let Ok(output) = Command::new(command).arg("--list-langs").output() {
            let listing = String::from_utf8_lossy(&output.stdout);
            let installed: Vec<&str> = listing.lines().skip(1).map(str::trim).collect();
            if !installed.is_empty() && !installed.contains(&lang.as_str()) {
                return Err(OcrError::Unavailable {
                    backend: NAME,
                    detail: format!(
                        "language data '{}' not installed (have: {})",
                        lang,
                        installed.join(", ")
                    ),
                });
            }
        }

        Ok(Self {
            command: command.to_string(),
            lang,
        })
    }
}

impl OcrBackend for TesseractBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn recognize(&self, image: &DynamicImage) -> Result<Vec<Value>, OcrError> {
        let scratch = tempfile::tempdir()?;
        let input = write_scratch_png(image, scratch.path())?;

        let output = Command::new(&self.command)
            .arg(&input)
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .arg("--psm")
            .arg("3")
            .arg("tsv")
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

        let entries = parse_tsv(&String::from_utf8_lossy(&output.stdout))?;
        debug!("Tesseract returned {} lines", entries.len());
        Ok(entries)
    }
}

/// Map ISO 639-1 codes to Tesseract's traineddata names. Unknown codes are
/// passed through so callers can name any installed model directly.
pub fn tesseract_lang(lang: &str) -> String {
    match lang {
        "en" => "eng",
        "de" => "deu",
        "fr" => "fra",
        "es" => "spa",
        "it" => "ita",
        "pt" => "por",
        "ja" => "jpn",
        "zh" | "ch" => "chi_sim",
        "ko" => "kor",
        "ru" => "rus",
        other => other,
    }
    .to_string()
}

#[derive(Default)]
struct LineAccumulator {
    words: Vec<String>,
    confidences: Vec<f64>,
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

impl LineAccumulator {
    fn push(&mut self, text: &str, conf: f64, left: f64, top: f64, width: f64, height: f64) {
        if self.words.is_empty() {
            (self.x0, self.y0) = (left, top);
            (self.x1, self.y1) = (left + width, top + height);
        } else {
            self.x0 = self.x0.min(left);
            self.y0 = self.y0.min(top);
            self.x1 = self.x1.max(left + width);
            self.y1 = self.y1.max(top + height);
        }
        self.words.push(text.to_string());
        self.confidences.push(conf);
    }

    fn into_entry(self) -> Value {
        let mean = self.confidences.iter().sum::<f64>() / self.confidences.len() as f64;
        json!([
            [[self.x0, self.y0], [self.x1, self.y0], [self.x1, self.y1], [self.x0, self.y1]],
            [self.words.join(" "), mean / 100.0]
        ])
    }
}

/// Fold word rows of Tesseract's TSV output into line entries.
pub fn parse_tsv(tsv: &str) -> Result<Vec<Value>, OcrError> {
    let mut rows = tsv.lines();
    let header = rows.next().unwrap_or_default();
    if !header.starts_with("level") {
        return Err(OcrError::MalformedOutput {
            backend: NAME,
            detail: "missing TSV header".into(),
        });
    }

    // Key: (page, block, paragraph, line) so lines stay in reading order.
    let mut lines: BTreeMap<(u32, u32, u32, u32), LineAccumulator> = BTreeMap::new();

    for row in rows {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let text = cols[11].trim();
        let Ok(conf) = cols[10].trim().parse::<f64>() else {
            warn!("Skipping TSV row with bad confidence: {:?}", row);
            continue;
        };
        if text.is_empty() || conf < 0.0 {
            continue;
        }
        let ints: Vec<u32> = cols[1..5].iter().filter_map(|c| c.parse().ok()).collect();
        let nums: Vec<f64> = cols[6..10].iter().filter_map(|c| c.parse().ok()).collect();
        if ints.len() != 4 || nums.len() != 4 {
            warn!("Skipping malformed TSV row: {:?}", row);
            continue;
        }
        lines
            .entry((ints[0], ints[1], ints[2], ints[3]))
            .or_default()
            .push(text, conf, nums[0], nums[1], nums[2], nums[3]);
    }

    Ok(lines.into_values().map(LineAccumulator::into_entry).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::entries::extract_entries;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn tsv(rows: &[&str]) -> String {
        std::iter::once(HEADER)
            .chain(rows.iter().copied())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn words_fold_into_lines() {
        let out = tsv(&[
            "1\t1\t0\t0\t0\t0\t0\t0\t1000\t800\t-1\t",
            "5\t1\t1\t1\t1\t1\t100\t50\t80\t30\t96.0\tQuarterly",
            "5\t1\t1\t1\t1\t2\t190\t52\t60\t30\t90.0\tresults",
            "5\t1\t1\t1\t2\t1\t100\t120\t40\t25\t80.0\tUp",
            "5\t1\t1\t1\t2\t2\t150\t120\t10\t25\t-1\t",
        ]);
        let entries = parse_tsv(&out).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0][1][0], "Quarterly results");
        assert!((entries[0][1][1].as_f64().unwrap() - 0.93).abs() < 1e-9);
        assert_eq!(entries[0][0][0], json!([100.0, 50.0]));
        assert_eq!(entries[0][0][2], json!([250.0, 82.0]));

        let normalised = extract_entries(&entries);
        assert_eq!(normalised[1].text, "Up");
        assert!((normalised[1].confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn empty_page_yields_no_entries() {
        let out = tsv(&["1\t1\t0\t0\t0\t0\t0\t0\t1000\t800\t-1\t"]);
        assert!(parse_tsv(&out).unwrap().is_empty());
    }

    #[test]
    fn headerless_output_is_malformed() {
        assert!(matches!(
            parse_tsv("Error opening data file"),
            Err(OcrError::MalformedOutput { .. })
        ));
    }

    #[test]
    fn language_mapping() {
        assert_eq!(tesseract_lang("en"), "eng");
        assert_eq!(tesseract_lang("zh"), "chi_sim");
        assert_eq!(tesseract_lang("ch"), "chi_sim");
        assert_eq!(tesseract_lang("frk"), "frk");
    }
}
