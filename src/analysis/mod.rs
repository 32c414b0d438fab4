//! Statistics calculation and chart visualization.
//!
//! This module provides:
//! - reading accumulated rows back from the CSV
//! - distribution statistics (totals, weighted mean, median, consistency)
//! - JSON export of statistics
//! - a distribution bar chart

pub mod charts;
pub mod statistics;

pub use statistics::DistributionStats;

use anyhow::{anyhow, Result};
use std::path::PathBuf;

use crate::ocr::extract::ScoreRow;

/// Runs the report pipeline: read CSV, finalize rows, calculate stats,
/// export JSON, optionally render the chart.
///
/// Returns the finalized rows, the statistics, and the files written.
pub fn generate_report(
    with_chart: bool,
) -> Result<(Vec<ScoreRow>, DistributionStats, Vec<PathBuf>)> {
    let csv_path = crate::paths::get_rows_csv();

    let rows = crate::export::csv::read_rows(&csv_path)?;
    let rows = crate::ocr::extract::finalize(rows);
    if rows.is_empty() {
        return Err(anyhow!("No data in {}", csv_path.display()));
    }

    crate::log(&format!(
        "Loaded {} bands from {}",
        rows.len(),
        csv_path.display()
    ));

    let stats = DistributionStats::from_rows(&rows);

    let exports_dir = crate::paths::get_exports_dir();
    let json_path = exports_dir.join("statistics.json");
    statistics::export_to_json(&stats, &json_path)?;
    crate::log(&format!("Statistics JSON saved: {}", json_path.display()));

    let mut outputs = vec![json_path];
    if with_chart {
        let chart_path = exports_dir.join("distribution.png");
        let dataset = &crate::config::get_config().dataset;
        charts::render_distribution(&rows, dataset, &chart_path)?;
        crate::log(&format!("Chart saved: {}", chart_path.display()));
        outputs.push(chart_path);
    }

    Ok((rows, stats, outputs))
}
