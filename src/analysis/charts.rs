//! Chart generation using plotters.
//!
//! Renders the extracted distribution as a bar chart, one bar per score
//! band, band widths respected.

use anyhow::{anyhow, Context, Result};
use plotters::prelude::*;
use std::path::Path;

use crate::ocr::extract::{ScoreLabel, ScoreRow};

const CHART_WIDTH: u32 = 1280;
const CHART_HEIGHT: u32 = 720;

/// The half-open score interval a row's bar spans.
fn band_range(row: &ScoreRow) -> (u32, u32) {
    match row.label {
        ScoreLabel::Single(score) => (score, score + 1),
        ScoreLabel::Band { low, high } => (low, high.max(low) + 1),
    }
}

/// Renders a count-per-band bar chart to `output_path`.
pub fn render_distribution(rows: &[ScoreRow], dataset: &str, output_path: &Path) -> Result<()> {
    if rows.is_empty() {
        return Err(anyhow!("No rows to chart"));
    }

    let x_min = rows.iter().map(|r| band_range(r).0).min().unwrap_or(0);
    let x_max = rows.iter().map(|r| band_range(r).1).max().unwrap_or(1);
    let y_max = rows.iter().map(|r| r.count).max().unwrap_or(1);

    let root = BitMapBackend::new(output_path, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
    root.fill(&WHITE).context("Failed to fill chart background")?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{} score distribution", dataset), ("sans-serif", 32))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max + 1, 0u32..y_max + y_max / 10 + 1)
        .context("Failed to build chart axes")?;

    chart
        .configure_mesh()
        .x_desc("score")
        .y_desc("candidates")
        .draw()
        .context("Failed to draw chart mesh")?;

    chart
        .draw_series(rows.iter().map(|row| {
            let (start, end) = band_range(row);
            Rectangle::new([(start, 0), (end, row.count)], BLUE.mix(0.6).filled())
        }))
        .context("Failed to draw distribution bars")?;

    root.present().context("Failed to save chart")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_range_single() {
        let row = ScoreRow {
            label: ScoreLabel::Single(690),
            count: 15,
            cumulative: 123,
        };
        assert_eq!(band_range(&row), (690, 691));
    }

    #[test]
    fn test_band_range_band() {
        let row = ScoreRow {
            label: ScoreLabel::Band { low: 685, high: 689 },
            count: 20,
            cumulative: 143,
        };
        assert_eq!(band_range(&row), (685, 690));
    }

    #[test]
    fn test_band_range_inverted_band_stays_nonempty() {
        let row = ScoreRow {
            label: ScoreLabel::Band { low: 689, high: 685 },
            count: 20,
            cumulative: 143,
        };
        let (start, end) = band_range(&row);
        assert!(end > start);
    }
}
