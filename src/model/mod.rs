mod bundle;
mod stardist;
mod types;

// Re-export from types
pub use types::{ModelConfig, ModelError, Thresholds};
// Re-export from bundle
pub use bundle::{is_hdf5_file, Bundle};
// Re-export from stardist
pub use stardist::StarDist3D;
