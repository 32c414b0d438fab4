//! Statistics over parsed score-band rows.
//!
//! Rows are expected in final table order: unique labels, descending score.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::ocr::extract::ScoreRow;

/// Summary of one extracted score distribution.
#[derive(Debug, Clone, Serialize)]
pub struct DistributionStats {
    /// Number of distinct score bands
    pub bands: usize,
    /// Smallest band lower bound
    pub score_min: u32,
    /// Largest band lower bound
    pub score_max: u32,
    /// Largest cumulative figure (candidates at or above the lowest band)
    pub total_candidates: u32,
    /// Sum of per-band counts
    pub counted: u64,
    /// Count-weighted mean of band lower bounds
    pub mean_score: f64,
    /// Band lower bound at the cumulative midpoint
    pub median_score: u32,
    /// True when cumulative figures never decrease as scores descend
    pub cumulative_consistent: bool,
}

impl DistributionStats {
    /// Calculates statistics for a finalized row list (descending scores).
    pub fn from_rows(rows: &[ScoreRow]) -> Self {
        if rows.is_empty() {
            return DistributionStats {
                bands: 0,
                score_min: 0,
                score_max: 0,
                total_candidates: 0,
                counted: 0,
                mean_score: 0.0,
                median_score: 0,
                cumulative_consistent: true,
            };
        }

        let score_min = rows.iter().map(|r| r.label.lower()).min().unwrap_or(0);
        let score_max = rows.iter().map(|r| r.label.lower()).max().unwrap_or(0);
        let total_candidates = rows.iter().map(|r| r.cumulative).max().unwrap_or(0);
        let counted: u64 = rows.iter().map(|r| r.count as u64).sum();

        DistributionStats {
            bands: rows.len(),
            score_min,
            score_max,
            total_candidates,
            counted,
            mean_score: weighted_mean(rows),
            median_score: median_by_cumulative(rows, total_candidates),
            cumulative_consistent: check_consistency(rows),
        }
    }
}

/// Count-weighted mean of band lower bounds.
fn weighted_mean(rows: &[ScoreRow]) -> f64 {
    let weight: u64 = rows.iter().map(|r| r.count as u64).sum();
    if weight == 0 {
        return 0.0;
    }
    let sum: u64 = rows
        .iter()
        .map(|r| r.label.lower() as u64 * r.count as u64)
        .sum();
    sum as f64 / weight as f64
}

/// Band lower bound at which half of all candidates are covered.
fn median_by_cumulative(rows: &[ScoreRow], total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let half = total.div_ceil(2);
    for row in rows {
        if row.cumulative >= half {
            return row.label.lower();
        }
    }
    rows.last().map(|r| r.label.lower()).unwrap_or(0)
}

/// Cumulative figures must never decrease as scores descend.
fn check_consistency(rows: &[ScoreRow]) -> bool {
    rows.windows(2).all(|pair| pair[0].cumulative <= pair[1].cumulative)
}

/// Cumulative rank at the first band at or below `score`, i.e. an upper
/// bound on the rank of a candidate with that score. None when the score
/// falls below every band in the table.
pub fn rank_at(rows: &[ScoreRow], score: u32) -> Option<u32> {
    rows.iter()
        .find(|r| r.label.lower() <= score)
        .map(|r| r.cumulative)
}

/// Writes the statistics as pretty-printed JSON.
pub fn export_to_json(stats: &DistributionStats, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(stats).context("Failed to serialize statistics")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::extract::ScoreLabel;

    fn row(label: ScoreLabel, count: u32, cumulative: u32) -> ScoreRow {
        ScoreRow {
            label,
            count,
            cumulative,
        }
    }

    fn sample_rows() -> Vec<ScoreRow> {
        vec![
            row(ScoreLabel::Single(690), 15, 123),
            row(ScoreLabel::Band { low: 685, high: 689 }, 20, 143),
            row(ScoreLabel::Single(684), 57, 200),
        ]
    }

    #[test]
    fn test_stats_basic() {
        let stats = DistributionStats::from_rows(&sample_rows());
        assert_eq!(stats.bands, 3);
        assert_eq!(stats.score_min, 684);
        assert_eq!(stats.score_max, 690);
        assert_eq!(stats.total_candidates, 200);
        assert_eq!(stats.counted, 92);
        assert!(stats.cumulative_consistent);
    }

    #[test]
    fn test_weighted_mean() {
        let rows = vec![
            row(ScoreLabel::Single(700), 1, 1),
            row(ScoreLabel::Single(600), 3, 4),
        ];
        let stats = DistributionStats::from_rows(&rows);
        // (700*1 + 600*3) / 4 = 625
        assert!((stats.mean_score - 625.0).abs() < 0.001);
    }

    #[test]
    fn test_median_by_cumulative() {
        // Total 200, half 100: the first band already covers 123 >= 100
        let stats = DistributionStats::from_rows(&sample_rows());
        assert_eq!(stats.median_score, 690);

        let rows = vec![
            row(ScoreLabel::Single(690), 10, 10),
            row(ScoreLabel::Single(689), 40, 50),
            row(ScoreLabel::Single(688), 50, 100),
        ];
        // Total 100, half 50: reached at 689
        let stats = DistributionStats::from_rows(&rows);
        assert_eq!(stats.median_score, 689);
    }

    #[test]
    fn test_inconsistent_cumulative_detected() {
        let rows = vec![
            row(ScoreLabel::Single(690), 15, 123),
            row(ScoreLabel::Single(689), 20, 100),
        ];
        let stats = DistributionStats::from_rows(&rows);
        assert!(!stats.cumulative_consistent);
    }

    #[test]
    fn test_rank_at() {
        let rows = sample_rows();
        assert_eq!(rank_at(&rows, 690), Some(123));
        assert_eq!(rank_at(&rows, 695), Some(123));
        assert_eq!(rank_at(&rows, 687), Some(143));
        assert_eq!(rank_at(&rows, 684), Some(200));
        assert_eq!(rank_at(&rows, 500), None);
    }

    #[test]
    fn test_empty_rows() {
        let stats = DistributionStats::from_rows(&[]);
        assert_eq!(stats.bands, 0);
        assert_eq!(stats.total_candidates, 0);
        assert!(stats.cumulative_consistent);
    }

    #[test]
    fn test_export_to_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statistics.json");

        let stats = DistributionStats::from_rows(&sample_rows());
        export_to_json(&stats, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"bands\": 3"));
        assert!(content.contains("\"total_candidates\": 200"));
    }
}
