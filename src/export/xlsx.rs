//! Spreadsheet export.
//!
//! Writes a workbook with the extracted rows and the curated/estimated
//! score-band table. Known figures get a green fill, estimates an orange
//! one, matching the published-data conventions of the source dataset.

use anyhow::{anyhow, Context, Result};
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, Worksheet};
use std::path::Path;

use crate::config::{CuratedEntry, CuratedKind};
use crate::ocr::extract::ScoreRow;

const HEADER_FILL: u32 = 0xFFFF99;
const KNOWN_FILL: u32 = 0xCCFFCC;
const ESTIMATED_FILL: u32 = 0xFFE6CC;

struct SheetFormats {
    title: Format,
    header: Format,
    center: Format,
    known: Format,
    estimated: Format,
}

impl SheetFormats {
    fn new() -> Self {
        let centered = |f: Format| f.set_align(FormatAlign::Center);
        Self {
            title: Format::new().set_bold(),
            header: centered(
                Format::new()
                    .set_bold()
                    .set_background_color(Color::RGB(HEADER_FILL)),
            ),
            center: centered(Format::new()),
            known: centered(Format::new().set_background_color(Color::RGB(KNOWN_FILL))),
            estimated: centered(Format::new().set_background_color(Color::RGB(ESTIMATED_FILL))),
        }
    }
}

/// Writes the workbook to `path`.
///
/// The "Extracted" sheet appears only when OCR produced rows; the
/// "Score bands" sheet appears only when curated entries are configured.
pub fn write_workbook(
    path: &Path,
    dataset: &str,
    rows: &[ScoreRow],
    curated: &[CuratedEntry],
) -> Result<()> {
    if rows.is_empty() && curated.is_empty() {
        return Err(anyhow!("Nothing to export: no extracted rows and no curated entries"));
    }

    let formats = SheetFormats::new();
    let mut workbook = Workbook::new();

    if !rows.is_empty() {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Extracted")?;
        write_extracted_sheet(sheet, dataset, rows, &formats)?;
    }

    if !curated.is_empty() {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Score bands")?;
        write_curated_sheet(sheet, dataset, curated, &formats)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to save workbook {}", path.display()))?;
    Ok(())
}

fn write_extracted_sheet(
    sheet: &mut Worksheet,
    dataset: &str,
    rows: &[ScoreRow],
    formats: &SheetFormats,
) -> Result<()> {
    sheet.set_column_width(0, 14)?;
    sheet.set_column_width(1, 10)?;
    sheet.set_column_width(2, 12)?;

    sheet.write_string_with_format(0, 0, &format!("{} (OCR extraction)", dataset), &formats.title)?;

    sheet.write_string_with_format(2, 0, "Score band", &formats.header)?;
    sheet.write_string_with_format(2, 1, "Count", &formats.header)?;
    sheet.write_string_with_format(2, 2, "Cumulative", &formats.header)?;

    for (i, row) in rows.iter().enumerate() {
        let r = 3 + i as u32;
        sheet.write_string_with_format(r, 0, &row.label.to_string(), &formats.center)?;
        sheet.write_number_with_format(r, 1, row.count as f64, &formats.center)?;
        sheet.write_number_with_format(r, 2, row.cumulative as f64, &formats.center)?;
    }

    Ok(())
}

fn write_curated_sheet(
    sheet: &mut Worksheet,
    dataset: &str,
    curated: &[CuratedEntry],
    formats: &SheetFormats,
) -> Result<()> {
    sheet.set_column_width(0, 14)?;
    sheet.set_column_width(1, 12)?;
    sheet.set_column_width(2, 12)?;

    sheet.write_string_with_format(0, 0, &format!("{} score bands", dataset), &formats.title)?;

    sheet.write_string_with_format(2, 0, "Score band", &formats.header)?;
    sheet.write_string_with_format(2, 1, "Source", &formats.header)?;
    sheet.write_string_with_format(2, 2, "Cumulative", &formats.header)?;

    for (i, entry) in curated.iter().enumerate() {
        let r = 3 + i as u32;
        match entry.kind {
            CuratedKind::Known => {
                sheet.write_string_with_format(r, 0, &entry.label, &formats.known)?;
                sheet.write_string_with_format(r, 1, "official", &formats.known)?;
                sheet.write_number_with_format(r, 2, entry.cumulative as f64, &formats.known)?;
            }
            CuratedKind::Estimated => {
                sheet.write_string_with_format(r, 0, &entry.label, &formats.estimated)?;
                sheet.write_string_with_format(r, 1, "estimated", &formats.estimated)?;
                sheet.write_string_with_format(
                    r,
                    2,
                    &format!("~{}", entry.cumulative),
                    &formats.estimated,
                )?;
            }
        }
    }

    let notes_start = 4 + curated.len() as u32;
    sheet.write_string(notes_start, 0, "Data sources:")?;
    sheet.write_string(
        notes_start + 1,
        0,
        "1. Official high-band figures from the provincial score release",
    )?;
    sheet.write_string(
        notes_start + 2,
        0,
        "2. Remaining bands estimated from multi-year trends",
    )?;
    sheet.write_string(
        notes_start + 3,
        0,
        &format!("Generated {}", chrono::Local::now().format("%Y-%m-%d")),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CuratedKind;
    use crate::ocr::extract::ScoreLabel;
    use tempfile::tempdir;

    fn sample_curated() -> Vec<CuratedEntry> {
        vec![
            CuratedEntry {
                label: "700+".to_string(),
                cumulative: 1,
                kind: CuratedKind::Known,
            },
            CuratedEntry {
                label: "660+".to_string(),
                cumulative: 120,
                kind: CuratedKind::Estimated,
            },
        ]
    }

    fn sample_rows() -> Vec<ScoreRow> {
        vec![
            ScoreRow {
                label: ScoreLabel::Single(690),
                count: 15,
                cumulative: 123,
            },
            ScoreRow {
                label: ScoreLabel::Band { low: 685, high: 689 },
                count: 20,
                cumulative: 143,
            },
        ]
    }

    #[test]
    fn test_write_workbook_with_both_sheets() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bands.xlsx");

        write_workbook(&path, "test-dataset", &sample_rows(), &sample_curated()).unwrap();

        let meta = std::fs::metadata(&path).unwrap();
        assert!(meta.len() > 0);
    }

    #[test]
    fn test_write_workbook_rows_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bands.xlsx");

        write_workbook(&path, "test-dataset", &sample_rows(), &[]).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_write_workbook_curated_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bands.xlsx");

        write_workbook(&path, "test-dataset", &[], &sample_curated()).unwrap();
        assert!(path.exists());
    }
}
