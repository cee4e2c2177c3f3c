use std::fs::{self, File};
use std::path::Path;
use std::time::Duration;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};
use zip::ZipArchive;
use super::types::ZooError;

/// User-Agent sent with download requests
const USER_AGENT: &str = concat!("starport/", env!("CARGO_PKG_VERSION"));

/// Downloads a pretrained bundle archive and extracts it into `dest_dir`.
///
/// The archive is staged next to the destination as a `.part` file so an
/// interrupted download never looks like a cached bundle, then extracted
/// and removed.
pub fn fetch_archive(url: &str, dest_dir: &Path) -> Result<(), ZooError> {
    fs::create_dir_all(dest_dir)?;
    let staging = dest_dir.join("bundle.zip.part");

    let result = download_to(url, &staging).and_then(|_| extract_archive(&staging, dest_dir));

    // The staging file is never useful after this point, success or not
    if staging.exists() {
        let _ = fs::remove_file(&staging);
    }

    result
}

/// Streams the archive at `url` into `staging` with a progress bar
fn download_to(url: &str, staging: &Path) -> Result<(), ZooError> {
    info!("Downloading {}", url);

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(600))
        .build()
        .map_err(|e| ZooError::DownloadFailed(format!("Failed to create HTTP client: {}", e)))?;

    let mut response = client
        .get(url)
        .header("User-Agent", USER_AGENT)
        .send()
        .map_err(|e| ZooError::DownloadFailed(format!("HTTP request failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(ZooError::DownloadFailed(format!(
            "HTTP {} for {}",
            response.status(),
            url
        )));
    }

    let total_bytes = response.content_length().unwrap_or(0);
    let pb = if total_bytes > 0 {
        let pb = ProgressBar::new(total_bytes);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
                .unwrap(),
        );
        pb
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {bytes} {msg}")
                .unwrap(),
        );
        pb
    };
    pb.set_message("Downloading pretrained bundle");

    let mut file = File::create(staging)?;
    let written = std::io::copy(&mut response, &mut pb.wrap_write(&mut file))
        .map_err(|e| ZooError::DownloadFailed(format!("Failed to read response: {}", e)))?;

    pb.finish_with_message("Download complete");
    debug!("Downloaded {} bytes to {}", written, staging.display());
    Ok(())
}

/// Extracts a bundle zip into the destination directory.
///
/// Entry names are resolved through `enclosed_name` so a crafted archive
/// cannot write outside the bundle directory.
fn extract_archive(archive_path: &Path, dest_dir: &Path) -> Result<(), ZooError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| ZooError::InvalidArchive(format!("Failed to open archive: {}", e)))?;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| ZooError::InvalidArchive(format!("Failed to read entry {}: {}", index, e)))?;

        let relative = entry.enclosed_name().ok_or_else(|| {
            ZooError::InvalidArchive(format!("Entry escapes bundle directory: {}", entry.name()))
        })?;
        // Flatten a single top-level directory the way release archives nest
        let relative: std::path::PathBuf = match relative.components().count() {
            0 => continue,
            1 => relative.to_path_buf(),
            _ => relative.components().skip(1).collect(),
        };
        let dest = dest_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&dest)?;
            continue;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&dest)?;
        std::io::copy(&mut entry, &mut out)?;
        debug!("Extracted {}", dest.display());
    }

    info!("Extracted bundle into {}", dest_dir.display());
    Ok(())
}
