mod catalog;
mod download;
mod zoo;
mod types;

// Re-export from types
pub use types::{RegistryEntry, ZooError};
// Re-export from catalog
pub use catalog::{lookup, CatalogEntry, CATALOG};
// Re-export from zoo
pub use zoo::Zoo;
