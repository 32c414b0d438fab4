//! OCR pipeline: engine setup, recognition sweep, and row extraction.

pub mod engine;
pub mod extract;
pub mod preprocess;
pub mod setup;

pub use engine::OcrFragment;
pub use extract::{ScoreLabel, ScoreRow};
pub use setup::{ensure_tesseract, TesseractPaths};

use anyhow::{anyhow, Result};
use image::GrayImage;

use crate::config::OcrOptions;
use crate::log;

/// The winning recognition result of a sweep.
pub struct SweepOutcome {
    pub fragments: Vec<OcrFragment>,
    pub lang: String,
    pub psm: u32,
    pub digit_count: usize,
}

/// Runs every configured (page segmentation mode x language) combination
/// over the preprocessed image and keeps the outcome with the most
/// recognized digits. Combinations that fail to run are skipped; the sweep
/// errors only when none succeeds.
pub fn recognize_best(
    img: &GrayImage,
    paths: &TesseractPaths,
    options: &OcrOptions,
) -> Result<SweepOutcome> {
    let mut best: Option<SweepOutcome> = None;
    let mut attempts = 0usize;

    for &psm in &options.psm_modes {
        for lang in &options.languages {
            attempts += 1;
            let fragments = match engine::recognize_fragments(img, paths, lang, options.oem, psm) {
                Ok(fragments) => fragments,
                Err(e) => {
                    log(&format!("OCR combination failed: {}", e));
                    continue;
                }
            };

            let digits = engine::digit_count(&fragments);
            if best.as_ref().map_or(true, |b| digits > b.digit_count) {
                best = Some(SweepOutcome {
                    fragments,
                    lang: lang.clone(),
                    psm,
                    digit_count: digits,
                });
            }
        }
    }

    best.ok_or_else(|| anyhow!("All {} OCR combinations failed", attempts))
}
