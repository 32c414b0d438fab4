//! Locates the tesseract installation and its trained data.
//!
//! The executable is never downloaded; trained-data files for the configured
//! languages are fetched into the app-local data directory when missing.

use anyhow::{anyhow, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::log;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";

pub struct TesseractPaths {
    pub executable: PathBuf,
    pub tessdata: PathBuf,
}

/// Returns the app-local directory trained data is downloaded into.
pub fn get_tessdata_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scoretab")
        .join("tessdata")
}

/// Ensures tesseract and the trained data for `languages` are available.
pub fn ensure_tesseract(
    languages: &[String],
    executable_override: Option<&Path>,
) -> Result<TesseractPaths> {
    let executable = find_tesseract_executable(executable_override)?;
    let tessdata = ensure_tessdata(languages)?;

    log(&format!(
        "Tesseract ready: {} (tessdata: {})",
        executable.display(),
        tessdata.display()
    ));

    Ok(TesseractPaths {
        executable,
        tessdata,
    })
}

/// Splits `+`-joined language combinations into the distinct model names.
fn required_models(languages: &[String]) -> Vec<String> {
    let mut models: Vec<String> = Vec::new();
    for lang in languages {
        for part in lang.split('+') {
            let part = part.trim();
            if !part.is_empty() && !models.iter().any(|m| m == part) {
                models.push(part.to_string());
            }
        }
    }
    models
}

/// Returns true if every model has its .traineddata file in `dir`.
fn has_models(dir: &Path, models: &[String]) -> bool {
    models
        .iter()
        .all(|m| dir.join(format!("{}.traineddata", m)).exists())
}

/// Finds the tesseract executable: explicit override, PATH, then common
/// install locations.
pub fn find_tesseract_executable(executable_override: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = executable_override {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(anyhow!(
            "Configured tesseract executable not found: {}",
            path.display()
        ));
    }

    // PATH probe
    if let Ok(output) = std::process::Command::new("tesseract")
        .arg("--version")
        .output()
    {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    let common_paths = [
        "/usr/bin/tesseract",
        "/usr/local/bin/tesseract",
        "/opt/homebrew/bin/tesseract",
        r"C:\Program Files\Tesseract-OCR\tesseract.exe",
        r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
    ];

    for path in &common_paths {
        let p = PathBuf::from(path);
        if p.exists() {
            return Ok(p);
        }
    }

    Err(anyhow!(
        "Tesseract not found. Install tesseract-ocr or set ocr.executable in config.json."
    ))
}

/// Finds or assembles a tessdata directory containing all required models.
fn ensure_tessdata(languages: &[String]) -> Result<PathBuf> {
    let models = required_models(languages);
    if models.is_empty() {
        return Err(anyhow!("No OCR languages configured"));
    }

    let local_dir = get_tessdata_dir();
    if has_models(&local_dir, &models) {
        return Ok(local_dir);
    }

    // A system install that already carries everything wins
    if let Some(dir) = find_system_tessdata(&models) {
        return Ok(dir);
    }

    log(&format!(
        "Trained data incomplete locally, downloading {} model(s)...",
        models.len()
    ));

    fs::create_dir_all(&local_dir)?;
    for model in &models {
        let dest = local_dir.join(format!("{}.traineddata", model));
        if !dest.exists() {
            download_model(model, &dest)?;
        }
    }

    Ok(local_dir)
}

/// Checks TESSDATA_PREFIX and well-known system locations.
fn find_system_tessdata(models: &[String]) -> Option<PathBuf> {
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        for candidate in [PathBuf::from(&prefix), PathBuf::from(&prefix).join("tessdata")] {
            if has_models(&candidate, models) {
                return Some(candidate);
            }
        }
    }

    let system_paths = [
        "/usr/share/tesseract-ocr/5/tessdata",
        "/usr/share/tesseract-ocr/4.00/tessdata",
        "/usr/share/tessdata",
        "/usr/local/share/tessdata",
        "/opt/homebrew/share/tessdata",
        r"C:\Program Files\Tesseract-OCR\tessdata",
    ];

    for path in &system_paths {
        let p = PathBuf::from(path);
        if has_models(&p, models) {
            return Some(p);
        }
    }

    None
}

/// Downloads one trained-data file from the upstream tessdata repository.
fn download_model(model: &str, dest: &Path) -> Result<()> {
    let url = format!("{}/{}.traineddata", TESSDATA_REPO, model);

    log(&format!("Downloading {}.traineddata...", model));

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&url)
        .header("User-Agent", "scoretab")
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}.traineddata: HTTP {}",
            model,
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    let mut file = fs::File::create(dest)?;
    file.write_all(&bytes)?;

    log(&format!(
        "Downloaded {}.traineddata ({} bytes)",
        model,
        bytes.len()
    ));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_required_models_splits_combinations() {
        let languages = vec![
            "eng".to_string(),
            "chi_sim".to_string(),
            "chi_sim+eng".to_string(),
        ];
        assert_eq!(required_models(&languages), vec!["eng", "chi_sim"]);
    }

    #[test]
    fn test_required_models_empty() {
        assert!(required_models(&[]).is_empty());
    }

    #[test]
    fn test_has_models() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("eng.traineddata"), b"x").unwrap();

        assert!(has_models(dir.path(), &["eng".to_string()]));
        assert!(!has_models(
            dir.path(),
            &["eng".to_string(), "chi_sim".to_string()]
        ));
    }

    #[test]
    fn test_missing_override_is_an_error() {
        let dir = tempdir().unwrap();
        let bogus = dir.path().join("no-such-tesseract");
        assert!(find_tesseract_executable(Some(&bogus)).is_err());
    }
}
