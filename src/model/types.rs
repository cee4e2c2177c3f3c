use std::error::Error;
use std::fmt;
use serde::{Deserialize, Serialize};

/// Custom error types for model bundle operations
#[derive(Debug)]
pub enum ModelError {
    /// Wraps std::io::Error for file operations
    IoError(std::io::Error),
    /// A required bundle file is missing
    MissingFile(String),
    /// The bundle configuration violates the StarDist 3D contract
    InvalidConfig(String),
    /// The weights file is not a valid HDF5 payload
    InvalidWeights(String),
    /// A bundle JSON file could not be parsed
    ParseError(String),
}

/// Implements Display trait for ModelError for error reporting
impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ModelError::IoError(e) => write!(f, "I/O error: {}", e),
            ModelError::MissingFile(msg) => write!(f, "Missing bundle file: {}", msg),
            ModelError::InvalidConfig(msg) => write!(f, "Invalid model config: {}", msg),
            ModelError::InvalidWeights(msg) => write!(f, "Invalid weights file: {}", msg),
            ModelError::ParseError(msg) => write!(f, "Failed to parse bundle file: {}", msg),
        }
    }
}

/// Implements Error trait to allow ModelError to be used as a standard error type
impl Error for ModelError {}

/// Allows automatic conversion from std::io::Error to ModelError
impl From<std::io::Error> for ModelError {
    fn from(err: std::io::Error) -> Self {
        ModelError::IoError(err)
    }
}

/// Ray construction parameters stored inside the bundle config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaysKwargs {
    /// Number of rays per predicted polyhedron
    pub n: usize,
    /// Optional per-axis anisotropy of the ray directions
    #[serde(default)]
    pub anisotropy: Option<[f64; 3]>,
}

/// The ray parametrization of the model, as StarDist persists it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaysJson {
    /// Name of the ray class, e.g. Rays_GoldenSpiral
    pub name: String,
    /// Construction parameters of the ray class
    pub kwargs: RaysKwargs,
}

/// The persisted `config.json` of a StarDist 3D bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Dimensionality of the model, always 3 for this tool
    pub n_dim: usize,
    /// Axes order of the input volume
    pub axes: String,
    /// Number of input channels
    #[serde(default = "default_n_channel_in")]
    pub n_channel_in: usize,
    /// Number of output channels (distances plus one probability channel)
    pub n_channel_out: usize,
    /// Subsampling grid of the network output
    pub grid: Vec<usize>,
    /// Network backbone name
    #[serde(default = "default_backbone")]
    pub backbone: String,
    /// Filename of the trained weights inside the bundle
    #[serde(default = "default_train_checkpoint")]
    pub train_checkpoint: String,
    /// Ray parametrization of the predicted polyhedra
    pub rays_json: RaysJson,
}

fn default_n_channel_in() -> usize {
    1
}

fn default_backbone() -> String {
    "unet".to_string()
}

fn default_train_checkpoint() -> String {
    "weights_best.h5".to_string()
}

impl ModelConfig {
    /// Number of rays per predicted polyhedron
    pub fn n_rays(&self) -> usize {
        self.rays_json.kwargs.n
    }

    /// Validates the StarDist 3D invariants of the configuration.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.n_dim != 3 {
            return Err(ModelError::InvalidConfig(format!(
                "Expected a 3D model, got n_dim: {}", self.n_dim
            )));
        }
        if self.n_rays() < 4 {
            return Err(ModelError::InvalidConfig(format!(
                "At least 4 rays are required, got: {}", self.n_rays()
            )));
        }
        // One distance channel per ray plus the object probability channel
        if self.n_channel_out != self.n_rays() + 1 {
            return Err(ModelError::InvalidConfig(format!(
                "n_channel_out must be n_rays + 1 ({}), got: {}",
                self.n_rays() + 1,
                self.n_channel_out
            )));
        }
        if self.grid.len() != 3 {
            return Err(ModelError::InvalidConfig(format!(
                "grid must have 3 entries, got: {}", self.grid.len()
            )));
        }
        // Grid entries divide the input shape, so zero is never valid
        if self.grid.iter().any(|&g| g == 0) {
            return Err(ModelError::InvalidConfig(format!(
                "grid entries must be positive, got: {:?}", self.grid
            )));
        }
        let axes = self.axes.to_uppercase();
        for axis in ['Z', 'Y', 'X'] {
            if !axes.contains(axis) {
                return Err(ModelError::InvalidConfig(format!(
                    "axes must contain {}, got: {}", axis, self.axes
                )));
            }
        }
        Ok(())
    }
}

/// Probability and non-maximum-suppression thresholds of a bundle
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum object probability for a candidate
    pub prob: f32,
    /// Overlap threshold used by downstream suppression
    pub nms: f32,
}

impl Default for Thresholds {
    /// The values StarDist falls back to when a bundle was never optimized
    fn default() -> Self {
        Self { prob: 0.5, nms: 0.4 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_config(n_rays: usize) -> ModelConfig {
        ModelConfig {
            n_dim: 3,
            axes: "ZYX".to_string(),
            n_channel_in: 1,
            n_channel_out: n_rays + 1,
            grid: vec![2, 2, 2],
            backbone: "unet".to_string(),
            train_checkpoint: "weights_best.h5".to_string(),
            rays_json: RaysJson {
                name: "Rays_GoldenSpiral".to_string(),
                kwargs: RaysKwargs { n: n_rays, anisotropy: None },
            },
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(demo_config(96).validate().is_ok());
    }

    #[test]
    fn test_channel_mismatch_rejected() {
        let mut config = demo_config(96);
        config.n_channel_out = 96;
        assert!(matches!(config.validate(), Err(ModelError::InvalidConfig(_))));
    }

    #[test]
    fn test_wrong_dimensionality_rejected() {
        let mut config = demo_config(96);
        config.n_dim = 2;
        assert!(matches!(config.validate(), Err(ModelError::InvalidConfig(_))));
    }

    #[test]
    fn test_bad_grid_rejected() {
        let mut config = demo_config(96);
        config.grid = vec![2, 2];
        assert!(matches!(config.validate(), Err(ModelError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_grid_entry_rejected() {
        let mut config = demo_config(96);
        config.grid = vec![0, 2, 2];
        assert!(matches!(config.validate(), Err(ModelError::InvalidConfig(_))));
    }

    #[test]
    fn test_missing_axis_rejected() {
        let mut config = demo_config(96);
        config.axes = "YX".to_string();
        assert!(matches!(config.validate(), Err(ModelError::InvalidConfig(_))));
    }

    #[test]
    fn test_config_defaults_from_json() {
        let json = r#"{
            "n_dim": 3,
            "axes": "ZYX",
            "n_channel_out": 97,
            "grid": [2, 2, 2],
            "rays_json": {"name": "Rays_GoldenSpiral", "kwargs": {"n": 96, "anisotropy": null}}
        }"#;
        let config: ModelConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.n_channel_in, 1);
        assert_eq!(config.backbone, "unet");
        assert_eq!(config.train_checkpoint, "weights_best.h5");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_thresholds() {
        let thresholds = Thresholds::default();
        assert_eq!(thresholds.prob, 0.5);
        assert_eq!(thresholds.nms, 0.4);
    }
}
