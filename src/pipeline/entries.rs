//! OCR entry normalisation.
//!
//! OCR engines disagree on how a single detection looks. Newer full-suite
//! engines emit one mapping per line (sometimes wrapped in a `"line"` key),
//! with field names that changed between releases; older ones emit a
//! `[box, [text, score]]` pair. [`extract_entry`] turns any of these into a
//! [`RecognitionEntry`], and quietly skips anything it does not recognise.

use serde_json::{Map, Value};

const BOX_KEYS: &[&str] = &["points", "box", "bbox"];
const TEXT_KEYS: &[&str] = &["text", "transcription", "label"];
const CONFIDENCE_KEYS: &[&str] = &["score", "confidence", "probability", "prob", "certainty"];

/// Where a recognised piece of text sits on the page.
#[derive(Debug, Clone, PartialEq)]
pub enum BoxGeometry {
    /// Corner points in render pixels. May be empty.
    Points(Vec<[f64; 2]>),
    /// The engine reported a box we could not read.
    Unknown,
}

impl BoxGeometry {
    /// Mean `(x, y)` of the corner points; `(0.0, 0.0)` when there are none.
    pub fn anchor(&self) -> (f64, f64) {
        match self {
            BoxGeometry::Points(points) if !points.is_empty() => {
                let n = points.len() as f64;
                let (sx, sy) = points
                    .iter()
                    .fold((0.0, 0.0), |(sx, sy), p| (sx + p[0], sy + p[1]));
                (sx / n, sy / n)
            }
            _ => (0.0, 0.0),
        }
    }

    fn parse(raw: Option<&Value>) -> Self {
        let Some(raw) = raw else {
            return BoxGeometry::Points(Vec::new());
        };
        let Value::Array(items) = raw else {
            return BoxGeometry::Unknown;
        };

        // Flat `[x0, y0, x1, y1]`
        if items.len() == 4 && items.iter().all(Value::is_number) {
            let n: Vec<f64> = items.iter().filter_map(Value::as_f64).collect();
            return BoxGeometry::Points(vec![
                [n[0], n[1]],
                [n[2], n[1]],
                [n[2], n[3]],
                [n[0], n[3]],
            ]);
        }

        let points: Option<Vec<[f64; 2]>> = items
            .iter()
            .map(|p| match p.as_array()?.as_slice() {
                [x, y, ..] => Some([x.as_f64()?, y.as_f64()?]),
                _ => None,
            })
            .collect();
        points.map_or(BoxGeometry::Unknown, BoxGeometry::Points)
    }
}

/// One normalised OCR detection.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionEntry {
    pub geometry: BoxGeometry,
    /// Trimmed, never empty.
    pub text: String,
    /// Usually in `[0, 1]`; 1.0 when the engine does not say.
    pub confidence: f64,
}

/// Normalise one raw engine detection. `None` means "skip this entry".
pub fn extract_entry(raw: &Value) -> Option<RecognitionEntry> {
    let (geometry, text, confidence) = match raw {
        Value::Object(fields) => {
            let inner = fields.get("line").and_then(Value::as_object);
            let scopes: Vec<&Map<String, Value>> = inner.into_iter().chain([fields]).collect();
            (
                BoxGeometry::parse(lookup(&scopes, BOX_KEYS)),
                lookup(&scopes, TEXT_KEYS).map(text_of),
                lookup(&scopes, CONFIDENCE_KEYS),
            )
        }
        Value::Array(pair) if pair.len() == 2 => {
            let geometry = BoxGeometry::parse(Some(&pair[0]));
            let (text, confidence) = match &pair[1] {
                Value::Object(info) => {
                    let scopes = [info];
                    (lookup(&scopes, TEXT_KEYS).map(text_of), lookup(&scopes, CONFIDENCE_KEYS))
                }
                Value::Array(info) if info.len() == 2 => (Some(text_of(&info[0])), Some(&info[1])),
                Value::String(s) => (Some(s.clone()), None),
                _ => return None,
            };
            (geometry, text, confidence)
        }
        _ => return None,
    };

    let text = text?.trim().to_string();
    if text.is_empty() {
        return None;
    }
    Some(RecognitionEntry {
        geometry,
        text,
        confidence: confidence.map_or(1.0, parse_confidence),
    })
}

/// Normalise a whole engine result, dropping skipped entries.
pub fn extract_entries(raw: &[Value]) -> Vec<RecognitionEntry> {
    raw.iter().filter_map(extract_entry).collect()
}

/// First present, non-null field among `keys`, searching `scopes` in order.
fn lookup<'a>(scopes: &[&'a Map<String, Value>], keys: &[&str]) -> Option<&'a Value> {
    for scope in scopes.iter().copied() {
        for key in keys {
            if let Some(v) = scope.get(*key).filter(|v| !v.is_null()) {
                return Some(v);
            }
        }
    }
    None
}

fn text_of(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn parse_confidence(v: &Value) -> f64 {
    let parsed = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|c| c.is_finite()).unwrap_or(1.0)
}
