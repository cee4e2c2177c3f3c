use std::error::Error;
use std::fmt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Custom error types for model zoo operations
#[derive(Debug)]
pub enum ZooError {
    /// Wraps std::io::Error for file operations
    IoError(std::io::Error),
    /// The requested pretrained name is not in the catalog
    UnknownModel { requested: String, known: Vec<String> },
    /// The download request failed or returned a non-success status
    DownloadFailed(String),
    /// The downloaded payload is not a usable zip archive
    InvalidArchive(String),
}

/// Implements Display trait for ZooError for error reporting
impl fmt::Display for ZooError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ZooError::IoError(e) => write!(f, "I/O error: {}", e),
            ZooError::UnknownModel { requested, known } => write!(
                f,
                "Unknown pretrained model: '{}'. Known models: {}",
                requested,
                known.join(", ")
            ),
            ZooError::DownloadFailed(msg) => write!(f, "Download failed: {}", msg),
            ZooError::InvalidArchive(msg) => write!(f, "Invalid model archive: {}", msg),
        }
    }
}

/// Implements Error trait to allow ZooError to be used as a standard error type
impl Error for ZooError {}

/// Allows automatic conversion from std::io::Error to ZooError
impl From<std::io::Error> for ZooError {
    fn from(err: std::io::Error) -> Self {
        ZooError::IoError(err)
    }
}

/// A cached pretrained model tracked by the zoo registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Display number assigned by fetch date (1 is newest)
    pub number: Option<usize>,
    /// Catalog name of the pretrained model
    pub name: String,
    /// URL the bundle was fetched from
    pub url: String,
    /// Axes order of the model's input volume
    pub axes: String,
    /// Number of rays per predicted polyhedron
    pub n_rays: usize,
    /// Subsampling grid of the network output
    pub grid: [usize; 3],
    /// When the bundle was fetched into the cache
    #[serde(with = "chrono::serde::ts_seconds")]
    pub fetched_at: DateTime<Utc>,
}
