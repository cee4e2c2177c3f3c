mod npy;
mod types;

// Re-export from types
pub use types::NpyError;
// Re-export from npy
pub use npy::{is_npy_file, read_npy};
