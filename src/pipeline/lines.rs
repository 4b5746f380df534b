//! Line grouping: turn scattered OCR entries into reading-order bullets.
//!
//! Entries are sorted top-to-bottom, left-to-right by the centre of their
//! boxes and folded into lines: an entry joins the current line when its
//! centre is within `threshold` pixels of the line's centre, otherwise it
//! starts a new line. A line's centre is the centre of its first entry and is
//! never updated, so a slowly drifting row of entries cannot creep across
//! into the next line.
//!
//! When OCR yields nothing usable the page's native text layer takes over, and
//! when that is empty too a single placeholder line is emitted.

use crate::pipeline::entries::RecognitionEntry;
use once_cell::sync::Lazy;
use regex::Regex;

/// Emitted when neither OCR nor the text layer produced anything.
pub const NO_TEXT_PLACEHOLDER: &str = "_No text detected._";

static RE_LINE_BREAKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n|\r|\n").unwrap());

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineGroupingParams {
    /// Maximum vertical centre distance (render pixels) to stay on a line.
    pub threshold: f64,
    /// Entries below this confidence are ignored.
    pub min_confidence: f64,
}

impl Default for LineGroupingParams {
    fn default() -> Self {
        Self {
            threshold: 24.0,
            min_confidence: 0.3,
        }
    }
}

/// Entry texts sharing one vertical band.
#[derive(Debug, Clone, PartialEq)]
pub struct LineGroup {
    pub center_y: f64,
    pub parts: Vec<String>,
}

impl LineGroup {
    /// The line as a Markdown bullet, or `None` if it has no text.
    pub fn render(&self) -> Option<String> {
        let joined = self.parts.join(" ");
        let joined = joined.trim();
        (!joined.is_empty()).then(|| format!("- {joined}"))
    }
}

/// Collapse newlines to spaces and trim.
pub fn sanitize_text(text: &str) -> String {
    RE_LINE_BREAKS.replace_all(text, " ").trim().to_string()
}

/// Cluster `entries` into ordered lines.
pub fn build_groups(entries: &[RecognitionEntry], params: &LineGroupingParams) -> Vec<LineGroup> {
    let mut usable: Vec<((f64, f64), String)> = entries
        .iter()
        .filter(|e| e.confidence >= params.min_confidence)
        .filter_map(|e| {
            let text = sanitize_text(&e.text);
            (!text.is_empty()).then(|| (e.geometry.anchor(), text))
        })
        .collect();

    usable.sort_by(|((ax, ay), _), ((bx, by), _)| ay.total_cmp(by).then(ax.total_cmp(bx)));

    let mut groups: Vec<LineGroup> = Vec::new();
    for ((_, y), text) in usable {
        match groups.last_mut() {
            Some(last) if (y - last.center_y).abs() <= params.threshold => last.parts.push(text),
            _ => groups.push(LineGroup {
                center_y: y,
                parts: vec![text],
            }),
        }
    }
    groups
}

/// Markdown lines for one page.
///
/// OCR groups win; otherwise each native text line becomes a bullet;
/// otherwise the page gets [`NO_TEXT_PLACEHOLDER`].
pub fn group_lines(
    entries: &[RecognitionEntry],
    fallback_lines: &[String],
    params: &LineGroupingParams,
) -> Vec<String> {
    let groups = build_groups(entries, params);
    if !groups.is_empty() {
        return groups.iter().filter_map(LineGroup::render).collect();
    }

    let fallback: Vec<String> = fallback_lines
        .iter()
        .map(|l| sanitize_text(l))
        .filter(|l| !l.is_empty())
        .map(|l| format!("- {l}"))
        .collect();
    if !fallback.is_empty() {
        return fallback;
    }
    vec![NO_TEXT_PLACEHOLDER.to_string()]
}
