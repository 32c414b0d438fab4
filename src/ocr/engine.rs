use anyhow::{anyhow, Result};
use image::GrayImage;
use std::process::Command;
use tempfile::NamedTempFile;

use super::setup::TesseractPaths;

/// A recognized text fragment with its confidence score in [0, 1].
#[derive(Debug, Clone)]
pub struct OcrFragment {
    pub text: String,
    pub confidence: f32,
    /// Sequential index of the text line the fragment belongs to
    pub line: u32,
}

/// Runs tesseract on a preprocessed image with one language/psm combination.
/// Returns word-level fragments in reading order.
pub fn recognize_fragments(
    img: &GrayImage,
    paths: &TesseractPaths,
    lang: &str,
    oem: u32,
    psm: u32,
) -> Result<Vec<OcrFragment>> {
    // Save image to temporary file
    let temp_input = NamedTempFile::with_suffix(".png")?;
    img.save(temp_input.path())?;

    // Create temporary output file (tesseract adds the .tsv extension)
    let temp_output = NamedTempFile::new()?;
    let output_base = temp_output.path().to_string_lossy().to_string();

    let output = Command::new(&paths.executable)
        .arg(temp_input.path())
        .arg(&output_base)
        .arg("--tessdata-dir")
        .arg(&paths.tessdata)
        .arg("-l")
        .arg(lang)
        .arg("--oem")
        .arg(oem.to_string())
        .arg("--psm")
        .arg(psm.to_string())
        .arg("tsv")
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("Tesseract failed (-l {} --psm {}): {}", lang, psm, stderr));
    }

    let tsv_path = format!("{}.tsv", output_base);
    let tsv_content = std::fs::read_to_string(&tsv_path)
        .map_err(|e| anyhow!("Failed to read Tesseract output: {}", e))?;

    // Clean up output file
    let _ = std::fs::remove_file(&tsv_path);

    Ok(parse_tsv_output(&tsv_content))
}

/// Parses tesseract TSV output into word fragments.
///
/// Word records carry level 5; their 0-100 confidence is scaled into [0, 1].
/// Records with negative confidence or empty text are dropped.
fn parse_tsv_output(tsv: &str) -> Vec<OcrFragment> {
    let mut fragments = Vec::new();
    let mut current_key: Option<(i32, i32, i32)> = None;
    let mut line_index: u32 = 0;

    for line in tsv.lines().skip(1) {
        // Skip header
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        // TSV fields: level, page_num, block_num, par_num, line_num, word_num,
        //             left, top, width, height, conf, text
        let level: i32 = fields[0].parse().unwrap_or(-1);
        let block_num: i32 = fields[2].parse().unwrap_or(-1);
        let par_num: i32 = fields[3].parse().unwrap_or(-1);
        let line_num: i32 = fields[4].parse().unwrap_or(-1);
        let conf: f32 = fields[10].parse().unwrap_or(-1.0);
        let text = fields[11].trim();

        // Level 5 = word
        if level != 5 || conf < 0.0 || text.is_empty() {
            continue;
        }

        // Line numbers restart per paragraph, so track the full key
        let key = (block_num, par_num, line_num);
        if let Some(prev) = current_key {
            if prev != key {
                line_index += 1;
            }
        }
        current_key = Some(key);

        fragments.push(OcrFragment {
            text: text.to_string(),
            confidence: (conf / 100.0).clamp(0.0, 1.0),
            line: line_index,
        });
    }

    fragments
}

/// Total ASCII digits across all fragment texts. Used to rank sweep outcomes.
pub fn digit_count(fragments: &[OcrFragment]) -> usize {
    fragments
        .iter()
        .map(|f| f.text.chars().filter(|c| c.is_ascii_digit()).count())
        .sum()
}
