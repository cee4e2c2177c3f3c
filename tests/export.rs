use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use tempfile::tempdir;
use zip::ZipArchive;

use starport::model::StarDist3D;

const CONFIG_JSON: &str = r#"{
    "n_dim": 3,
    "axes": "ZYX",
    "n_channel_in": 1,
    "n_channel_out": 97,
    "grid": [2, 2, 2],
    "backbone": "unet",
    "train_checkpoint": "weights_best.h5",
    "rays_json": {"name": "Rays_GoldenSpiral", "kwargs": {"n": 96, "anisotropy": null}}
}"#;

/// HDF5 signature followed by a superblock version and filler payload
fn weights_bytes() -> Vec<u8> {
    let mut bytes = b"\x89HDF\r\n\x1a\n\x00".to_vec();
    bytes.extend_from_slice(&[0xAB; 256]);
    bytes
}

fn write_bundle(dir: &Path, with_thresholds: bool) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("config.json"), CONFIG_JSON).unwrap();
    fs::write(dir.join("weights_best.h5"), weights_bytes()).unwrap();
    if with_thresholds {
        fs::write(dir.join("thresholds.json"), r#"{"prob": 0.68, "nms": 0.34}"#).unwrap();
    }
}

fn archive_entries(path: &Path) -> Vec<String> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

fn archive_entry_bytes(path: &Path, name: &str) -> Vec<u8> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).unwrap();
    bytes
}

#[test]
fn export_writes_archive_with_expected_entries() {
    let dir = tempdir().unwrap();
    let bundle_dir = dir.path().join("3d_demo");
    write_bundle(&bundle_dir, true);
    let dest = dir.path().join("adapted.zip");

    let model = StarDist3D::load(&bundle_dir).unwrap();
    model.predict_instances(None).unwrap();
    let report = model.export_tf(&dest).unwrap();

    assert_eq!(report.path, dest);
    assert!(report.bytes > 0);
    assert!(fs::metadata(&dest).unwrap().len() > 0);

    let mut entries = archive_entries(&dest);
    entries.sort();
    assert_eq!(
        entries,
        vec!["config.json", "manifest.json", "thresholds.json", "weights_best.h5"]
    );

    // Weights travel byte-for-byte
    assert_eq!(archive_entry_bytes(&dest, "weights_best.h5"), weights_bytes());
    // Bundle thresholds travel byte-for-byte
    let thresholds: serde_json::Value =
        serde_json::from_slice(&archive_entry_bytes(&dest, "thresholds.json")).unwrap();
    assert_eq!(thresholds["prob"], 0.68);
}

#[test]
fn export_manifest_describes_the_model() {
    let dir = tempdir().unwrap();
    let bundle_dir = dir.path().join("3d_demo");
    write_bundle(&bundle_dir, true);
    let dest = dir.path().join("adapted.zip");

    let model = StarDist3D::load(&bundle_dir).unwrap();
    model.export_tf(&dest).unwrap();

    let manifest: serde_json::Value =
        serde_json::from_slice(&archive_entry_bytes(&dest, "manifest.json")).unwrap();
    assert_eq!(manifest["model"], "3d_demo");
    assert_eq!(manifest["axes"], "ZYX");
    assert_eq!(manifest["n_rays"], 96);
    assert_eq!(manifest["grid"], serde_json::json!([2, 2, 2]));
    assert_eq!(manifest["tool"], "starport");
    assert!(manifest["id"].as_str().is_some());
    assert!(manifest["exported_at"].as_i64().is_some());
}

#[test]
fn export_without_thresholds_file_generates_defaults() {
    let dir = tempdir().unwrap();
    let bundle_dir = dir.path().join("3d_demo");
    write_bundle(&bundle_dir, false);
    let dest = dir.path().join("adapted.zip");

    let model = StarDist3D::load(&bundle_dir).unwrap();
    model.export_tf(&dest).unwrap();

    let thresholds: serde_json::Value =
        serde_json::from_slice(&archive_entry_bytes(&dest, "thresholds.json")).unwrap();
    assert_eq!(thresholds["prob"], 0.5);
    assert_eq!(thresholds["nms"], 0.4);
}

#[test]
fn export_overwrites_previous_archive() {
    let dir = tempdir().unwrap();
    let bundle_dir = dir.path().join("3d_demo");
    write_bundle(&bundle_dir, true);
    let dest = dir.path().join("adapted.zip");

    let model = StarDist3D::load(&bundle_dir).unwrap();
    model.export_tf(&dest).unwrap();
    let first_manifest = archive_entry_bytes(&dest, "manifest.json");

    // Second run replaces the archive without error
    model.export_tf(&dest).unwrap();
    let second_manifest = archive_entry_bytes(&dest, "manifest.json");

    assert_eq!(archive_entries(&dest).len(), 4);
    // A fresh export id proves the file was rewritten, not kept
    assert_ne!(first_manifest, second_manifest);
}

#[test]
fn export_to_missing_directory_fails_cleanly() {
    let dir = tempdir().unwrap();
    let bundle_dir = dir.path().join("3d_demo");
    write_bundle(&bundle_dir, true);
    let dest = dir.path().join("no_such_dir").join("adapted.zip");

    let model = StarDist3D::load(&bundle_dir).unwrap();
    let result = model.export_tf(&dest);

    assert!(result.is_err());
    assert!(!dest.exists());
    // No staging residue either
    assert!(!dir.path().join("no_such_dir").exists());
}

#[test]
fn export_works_without_prior_prediction() {
    let dir = tempdir().unwrap();
    let bundle_dir = dir.path().join("3d_demo");
    write_bundle(&bundle_dir, true);
    let dest = dir.path().join("adapted.zip");

    let model = StarDist3D::load(&bundle_dir).unwrap();
    assert!(!model.rays_materialized());
    model.export_tf(&dest).unwrap();
    // The export materialized the ray table itself
    assert!(model.rays_materialized());
}
