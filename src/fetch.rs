//! Downloads published table page images.

use anyhow::{anyhow, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use crate::log;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Downloads a single image to `dest`. Overwrites any existing file.
pub fn download_image(url: &str, dest: &Path) -> Result<()> {
    let client = reqwest::blocking::Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .build()?;

    let response = client
        .get(url)
        .header("User-Agent", "scoretab")
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!("Failed to download {}: HTTP {}", url, response.status()));
    }

    let bytes = response.bytes()?;
    let mut file = fs::File::create(dest)?;
    file.write_all(&bytes)?;

    log(&format!("Downloaded {} ({} bytes)", dest.display(), bytes.len()));
    Ok(())
}

/// Derives the local file name for the i-th configured page (1-based).
pub fn page_file_name(dataset: &str, index: usize, url: &str) -> String {
    // Keep the remote extension when it looks like one, default to .jpg
    let ext = url
        .rsplit('.')
        .next()
        .filter(|e| e.len() <= 4 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("jpg");
    format!("{}_{:02}.{}", dataset, index, ext)
}
