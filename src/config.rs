//! Pipeline configuration.
//!
//! Loads settings from config.json at startup. Provides source URLs,
//! OCR sweep options, preprocessing parameters, and plausibility bounds.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<PipelineConfig> = OnceLock::new();

/// Tesseract sweep options.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OcrOptions {
    /// Language models to try, in order. `+`-joined combinations allowed.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    /// Page segmentation modes to try, in order.
    #[serde(default = "default_psm_modes")]
    pub psm_modes: Vec<u32>,
    /// OCR engine mode passed as `--oem`.
    #[serde(default = "default_oem")]
    pub oem: u32,
    /// Explicit tesseract executable path, overriding auto-detection.
    #[serde(default)]
    pub executable: Option<PathBuf>,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            psm_modes: default_psm_modes(),
            oem: default_oem(),
            executable: None,
        }
    }
}

/// Preprocessing parameters shared by both profiles.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PreprocessParams {
    /// Upscale factor applied before filtering (table profile adds one)
    #[serde(default = "default_scale_factor")]
    pub scale_factor: u32,
    /// Median filter radius (1 = 3x3, 2 = 5x5)
    #[serde(default = "default_median_radius")]
    pub median_radius: u32,
    /// Fixed binarization threshold. None selects Otsu's method.
    #[serde(default)]
    pub fixed_threshold: Option<u8>,
    /// Block radius for the adaptive threshold of the table profile
    #[serde(default = "default_adaptive_block_radius")]
    pub adaptive_block_radius: u32,
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self {
            scale_factor: default_scale_factor(),
            median_radius: default_median_radius(),
            fixed_threshold: None,
            adaptive_block_radius: default_adaptive_block_radius(),
        }
    }
}

/// Provenance of a curated score-band entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CuratedKind {
    /// Officially published figure
    Known,
    /// Trend-based estimate
    Estimated,
}

/// A hand-maintained score-band row for the spreadsheet export.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CuratedEntry {
    /// Band label, e.g. "700+"
    pub label: String,
    /// Cumulative candidate count at or above the band
    pub cumulative: u32,
    pub kind: CuratedKind,
}

/// Complete pipeline configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Dataset label used in file names and the workbook title
    #[serde(default = "default_dataset")]
    pub dataset: String,
    /// Published table page images to download
    #[serde(default = "default_image_urls")]
    pub image_urls: Vec<String>,
    /// Smallest plausible score lower bound
    #[serde(default = "default_score_min")]
    pub score_min: u32,
    /// Largest plausible score lower bound
    #[serde(default = "default_score_max")]
    pub score_max: u32,
    /// Fragments at or below this OCR confidence are discarded (0.0-1.0)
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    #[serde(default)]
    pub ocr: OcrOptions,
    #[serde(default)]
    pub preprocess: PreprocessParams,
    /// Curated/estimated bands written to the "Score bands" sheet
    #[serde(default = "default_curated")]
    pub curated: Vec<CuratedEntry>,
}

fn default_dataset() -> String {
    "hubei-2022-physics".to_string()
}

fn default_image_urls() -> Vec<String> {
    vec![
        "https://t1.chei.com.cn/news/img/2197994161.jpg".to_string(),
        "https://t1.chei.com.cn/news/img/2197994162.jpg".to_string(),
        "https://t3.chei.com.cn/news/img/2197994163.jpg".to_string(),
        "https://t2.chei.com.cn/news/img/2197994164.jpg".to_string(),
    ]
}

fn default_score_min() -> u32 {
    400
}

fn default_score_max() -> u32 {
    750
}

fn default_confidence_threshold() -> f32 {
    0.5
}

fn default_languages() -> Vec<String> {
    vec![
        "eng".to_string(),
        "chi_sim".to_string(),
        "chi_sim+eng".to_string(),
    ]
}

fn default_psm_modes() -> Vec<u32> {
    // Uniform block, single column, single word, raw line
    vec![6, 4, 8, 13]
}

fn default_oem() -> u32 {
    3
}

fn default_scale_factor() -> u32 {
    2
}

fn default_median_radius() -> u32 {
    1
}

fn default_adaptive_block_radius() -> u32 {
    5
}

fn default_curated() -> Vec<CuratedEntry> {
    use CuratedKind::{Estimated, Known};
    let entry = |label: &str, cumulative: u32, kind: CuratedKind| CuratedEntry {
        label: label.to_string(),
        cumulative,
        kind,
    };
    vec![
        entry("700+", 1, Known),
        entry("690+", 8, Known),
        entry("680+", 23, Known),
        entry("670+", 56, Known),
        entry("660+", 120, Estimated),
        entry("650+", 250, Estimated),
        entry("640+", 450, Estimated),
        entry("630+", 750, Estimated),
        entry("620+", 1200, Estimated),
        entry("610+", 1800, Estimated),
        entry("600+", 2500, Estimated),
    ]
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dataset: default_dataset(),
            image_urls: default_image_urls(),
            score_min: default_score_min(),
            score_max: default_score_max(),
            confidence_threshold: default_confidence_threshold(),
            ocr: OcrOptions::default(),
            preprocess: PreprocessParams::default(),
            curated: default_curated(),
        }
    }
}

/// Loads configuration from the given path, or config.json next to the
/// executable, or returns defaults.
fn load_config(override_path: Option<&Path>) -> PipelineConfig {
    let config_path = match override_path {
        Some(p) => p.to_path_buf(),
        None => crate::paths::get_exe_dir().join("config.json"),
    };

    if config_path.exists() {
        match fs::read_to_string(&config_path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    crate::log(&format!("Config loaded from {}", config_path.display()));
                    return config;
                }
                Err(e) => {
                    crate::log(&format!(
                        "Failed to parse {}: {}. Using defaults.",
                        config_path.display(),
                        e
                    ));
                }
            },
            Err(e) => {
                crate::log(&format!(
                    "Failed to read {}: {}. Using defaults.",
                    config_path.display(),
                    e
                ));
            }
        }
    } else {
        crate::log("config.json not found. Using default config.");
    }

    PipelineConfig::default()
}

/// Initializes the global configuration. Call once at startup.
pub fn init_config(override_path: Option<&Path>) {
    let _ = CONFIG.set(load_config(override_path));
}

/// Returns a reference to the global configuration.
/// Panics if called before init_config().
pub fn get_config() -> &'static PipelineConfig {
    CONFIG
        .get()
        .expect("Config not initialized. Call init_config() first.")
}
