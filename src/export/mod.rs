use std::error::Error;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};
use crate::model::StarDist3D;

/// Generated manifest describing the exported archive
#[derive(Debug, Serialize)]
struct Manifest {
    /// Unique id of this export
    id: String,
    /// Catalog name of the exported model
    model: String,
    /// Axes order of the model's input volume
    axes: String,
    /// Number of rays per predicted polyhedron
    n_rays: usize,
    /// Subsampling grid of the network output
    grid: Vec<usize>,
    /// Thresholds packaged with the archive
    thresholds: crate::model::Thresholds,
    /// When the archive was written
    #[serde(with = "chrono::serde::ts_seconds")]
    exported_at: DateTime<Utc>,
    /// Name of the exporting tool
    tool: String,
    /// Version of the exporting tool
    version: String,
}

/// Summary of a completed export
#[derive(Debug)]
pub struct ExportReport {
    /// Path of the written archive
    pub path: PathBuf,
    /// Entry names inside the archive
    pub entries: Vec<String>,
    /// Size of the archive in bytes
    pub bytes: u64,
    /// When the archive was written
    pub exported_at: DateTime<Utc>,
}

/// Exports a loaded model as a TensorFlow-loadable zip archive at `dest`.
///
/// Packages the bundle's `config.json`, its thresholds (generated from the
/// in-memory values when the bundle had no `thresholds.json`), the weights
/// payload byte-for-byte and a generated `manifest.json`. The destination's
/// parent directory must already exist; an existing archive at `dest` is
/// overwritten. The archive is staged to `<dest>.part` and renamed into
/// place so a failed export never leaves a partial archive behind.
pub fn export_tf(
    model: &StarDist3D,
    dest: &Path,
) -> Result<ExportReport, Box<dyn Error + Send + Sync>> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            return Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Export directory does not exist: {}", parent.display()),
            )));
        }
    }

    // The archive must carry a usable ray table, whether or not a
    // prediction ran before the export
    model.rays()?;

    let staging = PathBuf::from(format!("{}.part", dest.display()));
    let exported_at = Utc::now();

    let entries = write_archive(model, &staging, exported_at).map_err(|e| {
        let _ = fs::remove_file(&staging);
        e
    })?;

    let bytes = fs::metadata(&staging)?.len();
    fs::rename(&staging, dest)?;
    info!(
        "Exported '{}' to {} ({} entries, {} bytes)",
        model.name,
        dest.display(),
        entries.len(),
        bytes
    );

    Ok(ExportReport {
        path: dest.to_path_buf(),
        entries,
        bytes,
        exported_at,
    })
}

/// Writes the archive entries into the staging file
fn write_archive(
    model: &StarDist3D,
    staging: &Path,
    exported_at: DateTime<Utc>,
) -> Result<Vec<String>, Box<dyn Error + Send + Sync>> {
    let file = File::create(staging)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut entries = Vec::new();

    // Bundle config, byte-for-byte
    zip.start_file("config.json", options)?;
    zip.write_all(&fs::read(model.bundle.dir.join("config.json"))?)?;
    entries.push("config.json".to_string());

    // Thresholds, from the bundle file or the in-memory fallback values
    zip.start_file("thresholds.json", options)?;
    if model.bundle.has_thresholds_file {
        zip.write_all(&fs::read(model.bundle.dir.join("thresholds.json"))?)?;
    } else {
        zip.write_all(serde_json::to_string_pretty(&model.bundle.thresholds)?.as_bytes())?;
    }
    entries.push("thresholds.json".to_string());

    // Weights payload, byte-for-byte from the mapped file
    zip.start_file(model.bundle.weights_file.as_str(), options)?;
    zip.write_all(&model.bundle.weights)?;
    entries.push(model.bundle.weights_file.clone());

    // Generated manifest
    let manifest = Manifest {
        id: Uuid::new_v4().to_string(),
        model: model.name.clone(),
        axes: model.bundle.config.axes.clone(),
        n_rays: model.bundle.config.n_rays(),
        grid: model.bundle.config.grid.clone(),
        thresholds: model.bundle.thresholds,
        exported_at,
        tool: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    zip.start_file("manifest.json", options)?;
    zip.write_all(serde_json::to_string_pretty(&manifest)?.as_bytes())?;
    entries.push("manifest.json".to_string());

    zip.finish()?;
    Ok(entries)
}
