use std::fs;
use std::path::Path;

use tempfile::tempdir;

use starport::config::{ExportConfig, LoggingConfig, PredictConfig, Settings, ZooConfig};
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

fn seed_cached_bundle(zoo_dir: &Path, slug: &str) {
    let bundle = zoo_dir.join(slug);
    fs::create_dir_all(&bundle).unwrap();
    fs::write(bundle.join("config.json"), CONFIG_JSON).unwrap();
    let mut weights = b"\x89HDF\r\n\x1a\n\x00".to_vec();
    weights.extend_from_slice(&[0u8; 128]);
    fs::write(bundle.join("weights_best.h5"), weights).unwrap();
}

fn settings_for(zoo_dir: &Path, export_path: &Path) -> Settings {
    Settings {
        zoo: ZooConfig {
            directory: zoo_dir.to_path_buf(),
            // Unreachable on purpose: cache hits must not touch the network
            base_url: "https://localhost.invalid/models".to_string(),
        },
        export: ExportConfig {
            path: export_path.to_path_buf(),
            model: "3D_demo".to_string(),
        },
        predict: PredictConfig { border: 2 },
        logging: LoggingConfig {
            level: "info".to_string(),
            file: None,
        },
    }
}

#[test]
fn conversion_sequence_produces_archive_from_cache() {
    let dir = tempdir().unwrap();
    let zoo_dir = dir.path().join("zoo");
    seed_cached_bundle(&zoo_dir, "3d_demo");
    let dest = dir.path().join("adapted.zip");
    let settings = settings_for(&zoo_dir, &dest);

    // The original script's sequence: load, dummy-predict, export
    let model = StarDist3D::from_pretrained("3D_demo", &settings).unwrap();
    let prediction = model.predict_instances(None).unwrap();
    assert!(prediction.candidates.is_empty());
    let report = model.export_tf(&settings.export.path).unwrap();

    assert!(report.bytes > 0);
    assert!(dest.is_file());
}

#[test]
fn from_pretrained_accepts_aliases() {
    let dir = tempdir().unwrap();
    let zoo_dir = dir.path().join("zoo");
    seed_cached_bundle(&zoo_dir, "3d_demo");
    let settings = settings_for(&zoo_dir, &dir.path().join("adapted.zip"));

    let model = StarDist3D::from_pretrained("demo3d", &settings).unwrap();
    assert_eq!(model.name, "3D_demo");
}

#[test]
fn from_pretrained_rejects_unknown_models_before_any_write() {
    let dir = tempdir().unwrap();
    let zoo_dir = dir.path().join("zoo");
    fs::create_dir_all(&zoo_dir).unwrap();
    let settings = settings_for(&zoo_dir, &dir.path().join("adapted.zip"));

    let err = StarDist3D::from_pretrained("2D_versatile_fluo", &settings).unwrap_err();
    assert!(err.to_string().contains("Unknown pretrained model"));
    // No bundle directory, no registry, nothing
    assert_eq!(fs::read_dir(&zoo_dir).unwrap().count(), 0);
}
