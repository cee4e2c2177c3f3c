use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use byteorder::ReadBytesExt;
use memmap2::Mmap;
use tracing::{debug, info};
use super::types::{ModelConfig, ModelError, Thresholds};

/// The 8-byte signature at the start of every HDF5 file
const HDF5_SIGNATURE: [u8; 8] = [0x89, b'H', b'D', b'F', b'\r', b'\n', 0x1a, b'\n'];

/// Highest HDF5 superblock version in use
const MAX_SUPERBLOCK_VERSION: u8 = 3;

/// A StarDist bundle materialized on disk: parsed configuration, thresholds
/// and the memory-mapped weights payload.
///
/// The weights are an opaque HDF5 blob; only the signature is checked and the
/// internal layout is never interpreted.
#[derive(Debug)]
pub struct Bundle {
    /// Directory the bundle was loaded from
    pub dir: PathBuf,
    /// Parsed and validated `config.json`
    pub config: ModelConfig,
    /// Thresholds, from `thresholds.json` or the StarDist defaults
    pub thresholds: Thresholds,
    /// Whether the bundle carried its own `thresholds.json`
    pub has_thresholds_file: bool,
    /// Filename of the weights payload inside the bundle
    pub weights_file: String,
    /// Memory-mapped weights payload
    pub weights: Mmap,
}

impl Bundle {
    /// Loads a bundle from a directory laid out in the StarDist convention:
    /// `config.json` (required), `thresholds.json` (optional) and the weights
    /// file named by the config's train checkpoint (required).
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self, ModelError> {
        let dir = dir.as_ref().to_path_buf();

        let config_path = dir.join("config.json");
        if !config_path.is_file() {
            return Err(ModelError::MissingFile(config_path.display().to_string()));
        }
        let config: ModelConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)
            .map_err(|e| ModelError::ParseError(format!("{}: {}", config_path.display(), e)))?;
        config.validate()?;
        debug!(
            "Loaded config: {} rays, grid {:?}, axes {}",
            config.n_rays(),
            config.grid,
            config.axes
        );

        let thresholds_path = dir.join("thresholds.json");
        let (thresholds, has_thresholds_file) = if thresholds_path.is_file() {
            let thresholds: Thresholds =
                serde_json::from_str(&std::fs::read_to_string(&thresholds_path)?).map_err(|e| {
                    ModelError::ParseError(format!("{}: {}", thresholds_path.display(), e))
                })?;
            (thresholds, true)
        } else {
            let thresholds = Thresholds::default();
            info!(
                "No thresholds.json in bundle, using defaults: prob {}, nms {}",
                thresholds.prob, thresholds.nms
            );
            (thresholds, false)
        };

        let weights_file = config.train_checkpoint.clone();
        let weights_path = dir.join(&weights_file);
        if !weights_path.is_file() {
            return Err(ModelError::MissingFile(weights_path.display().to_string()));
        }
        let file = validate_hdf5(&weights_path)?;
        let weights = unsafe { Mmap::map(&file)? };

        Ok(Self {
            dir,
            config,
            thresholds,
            has_thresholds_file,
            weights_file,
            weights,
        })
    }

    /// Path of the weights file inside the bundle
    pub fn weights_path(&self) -> PathBuf {
        self.dir.join(&self.weights_file)
    }
}

/// Checks the HDF5 signature and superblock version of a weights file and
/// returns the opened file on success.
fn validate_hdf5(path: &Path) -> Result<File, ModelError> {
    let mut file = File::open(path)?;

    let mut signature = [0u8; 8];
    file.read_exact(&mut signature).map_err(|_| {
        ModelError::InvalidWeights(format!("{} is too short for an HDF5 file", path.display()))
    })?;
    if signature != HDF5_SIGNATURE {
        return Err(ModelError::InvalidWeights(format!(
            "{} has no HDF5 signature", path.display()
        )));
    }

    let superblock_version = file.read_u8().map_err(|_| {
        ModelError::InvalidWeights(format!("{} ends before the superblock", path.display()))
    })?;
    if superblock_version > MAX_SUPERBLOCK_VERSION {
        return Err(ModelError::InvalidWeights(format!(
            "{} has unknown superblock version: {}",
            path.display(),
            superblock_version
        )));
    }

    Ok(file)
}

/// Checks if a file at the given path is an HDF5 file by verifying its signature.
///
/// # Arguments
///
/// * `path` - Path to the file to check
///
/// # Returns
///
/// `true` if the file exists and starts with the HDF5 signature, `false` otherwise
pub fn is_hdf5_file<P: AsRef<Path>>(path: P) -> bool {
    if let Ok(mut file) = File::open(path) {
        let mut signature = [0u8; 8];
        if file.read_exact(&mut signature).is_ok() {
            return signature == HDF5_SIGNATURE;
        }
    }
    false
}
