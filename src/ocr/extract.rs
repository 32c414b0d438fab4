use anyhow::Result;
use regex::Regex;
use std::cmp::Reverse;
use std::collections::HashSet;
use std::fmt;

use super::engine::OcrFragment;

/// Candidate row patterns, strictest to loosest:
/// 1. exact triple: standalone 3-digit score, whitespace-separated integers
/// 2. band variant: DDD-DDD
/// 3. loose triple with arbitrary non-digit separators
/// 4. bounded loose triple (count <= 4 digits, cumulative <= 6)
///
/// Every score capture is anchored with `(?:^|[^\d-])` so the halves of a
/// band token ("685-689") never match as standalone scores, and the first
/// loose separator excludes `-` for the same reason.
const ROW_PATTERNS: [&str; 4] = [
    r"(?:^|[^\d-])(\d{3})\s+(\d+)\s+(\d+)",
    r"(?:^|[^\d-])(\d{3}-\d{3})\s+(\d+)\s+(\d+)",
    r"(?:^|[^\d-])(\d{3})[^\d-]+(\d+)\D+(\d+)",
    r"(?:^|[^\d-])(\d{3})\s*[^\d-]*(\d{1,4})\s*[^\d]*(\d{1,6})",
];

/// Single pattern used in line mode: score or band, then the two counts.
const LINE_PATTERN: &str = r"(?:^|[^\d-])(\d{3}(?:-\d{3})?)\s+(\d+)\s+(\d+)";

/// A score column label: either one exact score or a banded range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreLabel {
    Single(u32),
    Band { low: u32, high: u32 },
}

impl ScoreLabel {
    /// Parses "690" or "685-689". The band keeps its printed order.
    pub fn parse(text: &str) -> Option<Self> {
        match text.split_once('-') {
            Some((low, high)) => {
                let low = low.parse().ok()?;
                let high = high.parse().ok()?;
                Some(ScoreLabel::Band { low, high })
            }
            None => text.parse().ok().map(ScoreLabel::Single),
        }
    }

    /// The numeric score, or the first component of a band.
    pub fn lower(&self) -> u32 {
        match self {
            ScoreLabel::Single(score) => *score,
            ScoreLabel::Band { low, .. } => *low,
        }
    }
}

impl fmt::Display for ScoreLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreLabel::Single(score) => write!(f, "{}", score),
            ScoreLabel::Band { low, high } => write!(f, "{}-{}", low, high),
        }
    }
}

/// One parsed table row: score band, candidates at the band, cumulative
/// candidates at or above it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRow {
    pub label: ScoreLabel,
    pub count: u32,
    pub cumulative: u32,
}

/// Keeps fragments strictly above the confidence threshold, order preserved.
///
/// Lowering the threshold can only add fragments, never remove accepted ones.
pub fn filter_fragments(fragments: &[OcrFragment], threshold: f32) -> Vec<&OcrFragment> {
    fragments
        .iter()
        .filter(|f| f.confidence > threshold)
        .collect()
}

/// Space-joins fragment texts into one blob, preserving encounter order.
pub fn join_fragments(fragments: &[&OcrFragment]) -> String {
    fragments
        .iter()
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Joins fragments into text, one output line per recognized line.
pub fn join_fragment_lines(fragments: &[&OcrFragment]) -> String {
    let mut out = String::new();
    let mut current_line: Option<u32> = None;

    for fragment in fragments {
        match current_line {
            Some(line) if line == fragment.line => out.push(' '),
            Some(_) => out.push('\n'),
            None => {}
        }
        current_line = Some(fragment.line);
        out.push_str(&fragment.text);
    }

    out
}

/// Validates one raw match into a row. Rejects scores whose lower bound is
/// outside [min_score, max_score] and counts that are zero or unparseable.
fn row_from_captures(
    label: &str,
    count: &str,
    cumulative: &str,
    min_score: u32,
    max_score: u32,
) -> Option<ScoreRow> {
    let label = ScoreLabel::parse(label)?;
    if label.lower() < min_score || label.lower() > max_score {
        return None;
    }
    let count: u32 = count.parse().ok()?;
    let cumulative: u32 = cumulative.parse().ok()?;
    if count == 0 || cumulative == 0 {
        return None;
    }
    Some(ScoreRow {
        label,
        count,
        cumulative,
    })
}

/// Deduplicates by score label (first occurrence wins), then sorts by
/// descending score lower bound. The sort is stable.
pub fn finalize(rows: Vec<ScoreRow>) -> Vec<ScoreRow> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut unique: Vec<ScoreRow> = Vec::new();
    for row in rows {
        if seen.insert(row.label.to_string()) {
            unique.push(row);
        }
    }
    unique.sort_by_key(|r| Reverse(r.label.lower()));
    unique
}

/// Parses a space-joined text blob with every candidate pattern, in order.
pub fn parse_rows(blob: &str, min_score: u32, max_score: u32) -> Result<Vec<ScoreRow>> {
    let mut rows = Vec::new();

    for pattern in ROW_PATTERNS {
        let re = Regex::new(pattern)?;
        for caps in re.captures_iter(blob) {
            if let Some(row) = row_from_captures(&caps[1], &caps[2], &caps[3], min_score, max_score)
            {
                rows.push(row);
            }
        }
    }

    Ok(finalize(rows))
}

/// Line mode: scans raw OCR text line by line with the single triple
/// pattern. Used for engines that emit one table row per text line.
pub fn parse_row_lines(text: &str, min_score: u32, max_score: u32) -> Result<Vec<ScoreRow>> {
    let re = Regex::new(LINE_PATTERN)?;
    let mut rows = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(caps) = re.captures(line) {
            if let Some(row) = row_from_captures(&caps[1], &caps[2], &caps[3], min_score, max_score)
            {
                rows.push(row);
            }
        }
    }

    Ok(finalize(rows))
}

/// Full fragment pipeline: confidence filter, then both parse modes.
///
/// The line-structured scan is the more reliable read when the engine kept
/// one table row per text line, so its rows win deduplication; the blob
/// parse recovers rows whose line structure got mangled.
pub fn extract_rows(
    fragments: &[OcrFragment],
    confidence_threshold: f32,
    min_score: u32,
    max_score: u32,
) -> Result<Vec<ScoreRow>> {
    let kept = filter_fragments(fragments, confidence_threshold);

    let line_rows = parse_row_lines(&join_fragment_lines(&kept), min_score, max_score)?;
    let blob_rows = parse_rows(&join_fragments(&kept), min_score, max_score)?;

    Ok(merge_rows([line_rows, blob_rows]))
}

/// Merges rows parsed from several pages under the same dedup/sort rules.
pub fn merge_rows(batches: impl IntoIterator<Item = Vec<ScoreRow>>) -> Vec<ScoreRow> {
    finalize(batches.into_iter().flatten().collect())
}
