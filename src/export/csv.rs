//! CSV accumulation of parsed score rows.
//!
//! Rows are appended per run in append-only mode for crash safety; the
//! report and export commands read the accumulated file back.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::ocr::extract::{ScoreLabel, ScoreRow};

/// CSV header row.
const CSV_HEADER: &str = "score,count,cumulative";

/// Initializes the CSV file with a header if it doesn't exist or is empty.
///
/// If the file exists and has content, this does nothing (preserves existing data).
pub fn init_csv(path: &Path) -> Result<()> {
    if path.exists() {
        // Check if file has content
        let file = File::open(path).context("Failed to open existing CSV")?;
        let reader = BufReader::new(file);
        if reader.lines().next().is_some() {
            // File has content, don't overwrite
            return Ok(());
        }
    }

    // Create new file with header
    let mut file = File::create(path).context("Failed to create CSV file")?;
    writeln!(file, "{}", CSV_HEADER).context("Failed to write CSV header")?;
    Ok(())
}

/// Appends parsed rows to the CSV file.
///
/// Opens the file in append mode so partial pipeline runs keep what they got.
pub fn append_rows(path: &Path, rows: &[ScoreRow]) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context("Failed to open CSV for append")?;

    for row in rows {
        writeln!(file, "{},{},{}", row.label, row.count, row.cumulative)
            .context("Failed to write CSV row")?;
    }
    Ok(())
}

/// Reads accumulated rows back, in file order. Malformed lines are skipped.
pub fn read_rows(path: &Path) -> Result<Vec<ScoreRow>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut rows = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line == CSV_HEADER {
            continue;
        }

        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 3 {
            continue;
        }
        let (Some(label), Ok(count), Ok(cumulative)) = (
            ScoreLabel::parse(fields[0]),
            fields[1].parse::<u32>(),
            fields[2].parse::<u32>(),
        ) else {
            continue;
        };

        rows.push(ScoreRow {
            label,
            count,
            cumulative,
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn row(label: &str, count: u32, cumulative: u32) -> ScoreRow {
        ScoreRow {
            label: ScoreLabel::parse(label).unwrap(),
            count,
            cumulative,
        }
    }

    #[test]
    fn test_init_csv_creates_header() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("rows.csv");

        init_csv(&csv_path).unwrap();

        let content = std::fs::read_to_string(&csv_path).unwrap();
        assert!(content.starts_with(CSV_HEADER));
    }

    #[test]
    fn test_init_csv_preserves_existing() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("rows.csv");

        std::fs::write(&csv_path, "score,count,cumulative\n690,15,123\n").unwrap();

        init_csv(&csv_path).unwrap();

        let content = std::fs::read_to_string(&csv_path).unwrap();
        assert!(content.contains("690,15,123"));
    }

    #[test]
    fn test_append_and_read_roundtrip() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("rows.csv");

        init_csv(&csv_path).unwrap();
        append_rows(&csv_path, &[row("690", 15, 123), row("685-689", 20, 143)]).unwrap();

        let rows = read_rows(&csv_path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], row("690", 15, 123));
        assert_eq!(rows[1].label.to_string(), "685-689");
        assert_eq!(rows[1].cumulative, 143);
    }

    #[test]
    fn test_read_skips_malformed_lines() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("rows.csv");

        std::fs::write(
            &csv_path,
            "score,count,cumulative\n690,15,123\nnot,a\nabc,1,2\n689,x,3\n688,21,162\n",
        )
        .unwrap();

        let rows = read_rows(&csv_path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label.lower(), 690);
        assert_eq!(rows[1].label.lower(), 688);
    }

    #[test]
    fn test_append_accumulates_across_runs() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("rows.csv");

        init_csv(&csv_path).unwrap();
        append_rows(&csv_path, &[row("690", 15, 123)]).unwrap();
        append_rows(&csv_path, &[row("689", 18, 141)]).unwrap();

        let rows = read_rows(&csv_path).unwrap();
        assert_eq!(rows.len(), 2);
    }
}
