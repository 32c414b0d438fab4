//! scoretab
//!
//! Downloads published exam score-distribution table images, preprocesses
//! and OCRs them, parses the recognized text into score-band rows, and
//! exports the result as CSV, statistics, a chart, and a spreadsheet.

mod analysis;
mod config;
mod export;
mod fetch;
mod ocr;
mod paths;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use ocr::preprocess::Profile;
use ocr::setup::TesseractPaths;

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    let log_path = paths::get_logs_dir().join("scoretab.log");
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let _ = file.write_all(line.as_bytes());
    }
}

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Path to config.json (defaults to the file next to the executable)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download the configured table pages (or take local images), OCR
    /// them, and parse score-band rows
    Extract {
        /// Local image files to process instead of the configured URLs
        #[arg(long)]
        image: Vec<PathBuf>,

        /// Preprocessing profile
        #[arg(long, value_enum, default_value_t = Profile::Table)]
        profile: Profile,

        /// Print the confidence-filtered OCR text per page
        #[arg(long)]
        dump_text: bool,

        /// Don't append parsed rows to rows.csv
        #[arg(long)]
        no_csv: bool,
    },
    /// Print statistics over accumulated rows and export them as JSON
    Report {
        /// Also render the distribution chart PNG
        #[arg(long)]
        chart: bool,

        /// Look up the cumulative rank at the given score(s)
        #[arg(long)]
        rank: Vec<u32>,
    },
    /// Write the spreadsheet (extracted rows + curated score bands)
    Export {
        /// Output workbook path (defaults to exports/<dataset>.xlsx)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    paths::ensure_directories()?;
    config::init_config(cli.config.as_deref());

    match cli.command {
        Command::Extract {
            image,
            profile,
            dump_text,
            no_csv,
        } => cmd_extract(&image, profile, dump_text, no_csv),
        Command::Report { chart, rank } => cmd_report(chart, &rank),
        Command::Export { output } => cmd_export(output),
    }
}

fn cmd_extract(images: &[PathBuf], profile: Profile, dump_text: bool, no_csv: bool) -> Result<()> {
    let config = config::get_config();

    let tess = ocr::ensure_tesseract(&config.ocr.languages, config.ocr.executable.as_deref())?;

    // Assemble sources: explicit local files, or download the configured pages
    let mut sources: Vec<PathBuf> = Vec::new();
    if !images.is_empty() {
        sources.extend(images.iter().cloned());
    } else {
        let images_dir = paths::get_images_dir();
        for (i, url) in config.image_urls.iter().enumerate() {
            let dest = images_dir.join(fetch::page_file_name(&config.dataset, i + 1, url));
            match fetch::download_image(url, &dest) {
                Ok(()) => sources.push(dest),
                Err(e) => log(&format!("Skipping page {}: {}", i + 1, e)),
            }
        }
    }

    if sources.is_empty() {
        return Err(anyhow!("No input images available"));
    }

    let mut batches: Vec<Vec<ocr::ScoreRow>> = Vec::new();
    for source in &sources {
        match process_page(source, profile, &tess, dump_text) {
            Ok(rows) => batches.push(rows),
            Err(e) => log(&format!("Failed to process {}: {}", source.display(), e)),
        }
    }

    let merged = ocr::extract::merge_rows(batches);

    if merged.is_empty() {
        log("No score bands recognized. Check image quality or preprocessing parameters.");
        return Ok(());
    }

    println!();
    println!("{:<10} {:>6} {:>10}", "score", "count", "cumulative");
    for row in &merged {
        println!(
            "{:<10} {:>6} {:>10}",
            row.label.to_string(),
            row.count,
            row.cumulative
        );
    }
    println!("{} band(s) total", merged.len());

    if !no_csv {
        let csv_path = paths::get_rows_csv();
        export::csv::init_csv(&csv_path)?;
        export::csv::append_rows(&csv_path, &merged)?;
        log(&format!(
            "Appended {} row(s) to {}",
            merged.len(),
            csv_path.display()
        ));
    }

    Ok(())
}

/// Runs one page through preprocess → OCR sweep → row parsing.
fn process_page(
    source: &Path,
    profile: Profile,
    tess: &TesseractPaths,
    dump_text: bool,
) -> Result<Vec<ocr::ScoreRow>> {
    let config = config::get_config();

    log(&format!("Processing {}...", source.display()));

    let img = image::open(source)
        .with_context(|| format!("Failed to open {}", source.display()))?;
    let prepared = ocr::preprocess::prepare(&img, profile, &config.preprocess);

    // Keep a copy of what the engine actually saw
    let debug_path = processed_copy_path(source);
    if let Err(e) = prepared.save(&debug_path) {
        log(&format!("Could not save {}: {}", debug_path.display(), e));
    }

    let outcome = ocr::recognize_best(&prepared, tess, &config.ocr)?;
    log(&format!(
        "Best OCR pass: -l {} --psm {} ({} digits in {} fragments)",
        outcome.lang,
        outcome.psm,
        outcome.digit_count,
        outcome.fragments.len()
    ));

    if dump_text {
        let kept = ocr::extract::filter_fragments(&outcome.fragments, config.confidence_threshold);
        println!("{}", ocr::extract::join_fragments(&kept));
    }

    let rows = ocr::extract::extract_rows(
        &outcome.fragments,
        config.confidence_threshold,
        config.score_min,
        config.score_max,
    )?;
    log(&format!(
        "Parsed {} band(s) from {}",
        rows.len(),
        source.display()
    ));

    Ok(rows)
}

fn processed_copy_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("page");
    source.with_file_name(format!("{}_processed.png", stem))
}

fn cmd_report(chart: bool, ranks: &[u32]) -> Result<()> {
    let (rows, stats, _outputs) = analysis::generate_report(chart)?;

    println!();
    println!("Distribution summary");
    println!("  bands:            {}", stats.bands);
    println!("  score range:      {} - {}", stats.score_min, stats.score_max);
    println!("  total candidates: {}", stats.total_candidates);
    println!("  counted:          {}", stats.counted);
    println!("  mean score:       {:.1}", stats.mean_score);
    println!("  median score:     {}", stats.median_score);
    if !stats.cumulative_consistent {
        println!("  warning: cumulative figures decrease between bands (OCR noise likely)");
    }

    for &score in ranks {
        match analysis::statistics::rank_at(&rows, score) {
            Some(rank) => println!("  rank at {}: within top {}", score, rank),
            None => println!("  rank at {}: below every extracted band", score),
        }
    }

    Ok(())
}

fn cmd_export(output: Option<PathBuf>) -> Result<()> {
    let config = config::get_config();

    let csv_path = paths::get_rows_csv();
    let rows = if csv_path.exists() {
        ocr::extract::finalize(export::csv::read_rows(&csv_path)?)
    } else {
        Vec::new()
    };

    let out_path = output.unwrap_or_else(|| {
        paths::get_exports_dir().join(format!("{}.xlsx", config.dataset))
    });
    export::xlsx::write_workbook(&out_path, &config.dataset, &rows, &config.curated)?;
    log(&format!("Workbook saved: {}", out_path.display()));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processed_copy_path() {
        let path = processed_copy_path(Path::new("/tmp/images/page_01.jpg"));
        assert_eq!(path, PathBuf::from("/tmp/images/page_01_processed.png"));
    }

    #[test]
    fn test_cli_parses_extract() {
        let cli = Cli::try_parse_from([
            "scoretab",
            "extract",
            "--image",
            "a.jpg",
            "--image",
            "b.jpg",
            "--profile",
            "standard",
            "--dump-text",
        ])
        .unwrap();

        match cli.command {
            Command::Extract {
                image,
                profile,
                dump_text,
                no_csv,
            } => {
                assert_eq!(image.len(), 2);
                assert_eq!(profile, Profile::Standard);
                assert!(dump_text);
                assert!(!no_csv);
            }
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn test_cli_parses_report_chart() {
        let cli =
            Cli::try_parse_from(["scoretab", "report", "--chart", "--rank", "652"]).unwrap();
        match cli.command {
            Command::Report { chart, rank } => {
                assert!(chart);
                assert_eq!(rank, vec![652]);
            }
            _ => panic!("wrong subcommand"),
        }
    }
}
