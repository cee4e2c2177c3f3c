use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use super::catalog::{self, CatalogEntry};
use super::download::fetch_archive;
use super::types::{RegistryEntry, ZooError};

/// Name of the registry file inside the zoo directory
const REGISTRY_FILE: &str = "registry.json";

/// Manages the local cache of pretrained bundles, including fetching models
/// from the zoo and tracking them in a JSON registry.
pub struct Zoo {
    /// Directory where cached bundles are stored
    pub directory: PathBuf,
    /// Base URL for pretrained model downloads
    pub base_url: String,
    /// Registry of all cached models keyed by bundle slug
    registry: HashMap<String, RegistryEntry>,
}

impl Zoo {
    /// Creates a zoo over the given cache directory.
    pub fn new(directory: PathBuf, base_url: String) -> Self {
        Self {
            directory,
            base_url,
            registry: HashMap::new(),
        }
    }

    /// Loads or creates the registry file.
    ///
    /// The registry is a JSON file that tracks all cached bundles and their
    /// metadata. Entries are numbered by fetch date, newest first.
    pub fn load_or_create_registry(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let registry_path = self.directory.join(REGISTRY_FILE);

        if registry_path.exists() {
            let content = fs::read_to_string(&registry_path)?;
            self.registry = serde_json::from_str(&content)?;
        }

        self.assign_numbers();
        Ok(())
    }

    /// Ensures the zoo directory exists, creating it if necessary.
    fn ensure_zoo_dir(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if !self.directory.exists() {
            fs::create_dir_all(&self.directory)?;
            info!("Created zoo directory: {}", self.directory.display());
        }
        Ok(())
    }

    /// Assigns display numbers based on fetched_at (1 to newest, 2 to second
    /// newest, etc.)
    fn assign_numbers(&mut self) {
        let mut slugs: Vec<(String, chrono::DateTime<Utc>)> = self
            .registry
            .iter()
            .map(|(slug, entry)| (slug.clone(), entry.fetched_at))
            .collect();

        // Sort by fetched_at in descending order (newest first)
        slugs.sort_by(|a, b| b.1.cmp(&a.1));

        for (i, (slug, _)) in slugs.into_iter().enumerate() {
            if let Some(entry) = self.registry.get_mut(&slug) {
                entry.number = Some(i + 1);
            }
        }
    }

    /// Saves the registry to disk as pretty-printed JSON.
    pub fn save_registry(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let registry_path = self.directory.join(REGISTRY_FILE);
        let content = serde_json::to_string_pretty(&self.registry)?;
        fs::write(registry_path, content)?;
        Ok(())
    }

    /// Scans the zoo directory for bundles and reconciles the registry.
    ///
    /// Bundles removed from disk are dropped from the registry; cache
    /// directories that look like bundles but are missing from the registry
    /// are re-added when their slug is in the catalog.
    pub fn scan(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.load_or_create_registry()?;
        self.ensure_zoo_dir()?;

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{prefix:.bold.dim} {spinner} {wide_msg}")
                .unwrap(),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb.set_message("Checking zoo directory...");

        // Remove entries for bundles that no longer exist
        let directory = self.directory.clone();
        self.registry
            .retain(|slug, _| is_bundle_dir(&directory.join(slug)));

        let mut new_bundles = 0;
        for entry in fs::read_dir(&self.directory)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let slug = entry.file_name().to_string_lossy().to_string();
            if self.registry.contains_key(&slug) {
                continue;
            }
            pb.set_message(format!("Checking bundle: {}...", slug));
            if !is_bundle_dir(&path) {
                info!("Skipping non-bundle directory: {}", slug);
                continue;
            }
            match catalog::lookup(&slug) {
                Ok(catalog_entry) => {
                    self.registry
                        .insert(slug.clone(), registry_entry(catalog_entry, &self.base_url));
                    new_bundles += 1;
                }
                Err(_) => {
                    warn!("Cached bundle '{}' is not in the catalog, ignoring", slug);
                }
            }
        }

        self.assign_numbers();
        pb.disable_steady_tick();
        pb.finish_with_message(format!(
            "Scan complete. Found {} new bundle{}",
            new_bundles,
            if new_bundles == 1 { "" } else { "s" }
        ));

        if new_bundles > 0 {
            self.save_registry()?;
        }
        Ok(())
    }

    /// Gets the registry entry for a pretrained name, if cached.
    pub fn find(&self, name: &str) -> Result<RegistryEntry, Box<dyn Error + Send + Sync>> {
        let catalog_entry = catalog::lookup(name)?;
        self.registry
            .get(catalog_entry.slug)
            .cloned()
            .ok_or_else(|| format!("Model '{}' is not in the cache", name).into())
    }

    /// All registry entries, ordered by display number.
    pub fn entries(&self) -> Vec<RegistryEntry> {
        let mut entries: Vec<RegistryEntry> = self.registry.values().cloned().collect();
        entries.sort_by_key(|entry| entry.number.unwrap_or(usize::MAX));
        entries
    }

    /// Gets the cache directory of a bundle.
    pub fn bundle_path(&self, slug: &str) -> PathBuf {
        self.directory.join(slug)
    }

    /// Fetches a pretrained model into the cache and returns its bundle path.
    ///
    /// Catalog lookup happens before any filesystem work, so an unknown name
    /// never creates files. Already-cached bundles short-circuit without a
    /// network request. The download is staged into a `.part` directory and
    /// renamed into place, so a failed fetch only ever removes what it
    /// created itself.
    pub fn fetch(&mut self, name: &str) -> Result<PathBuf, Box<dyn Error + Send + Sync>> {
        let catalog_entry = catalog::lookup(name)?;

        let bundle_dir = self.bundle_path(catalog_entry.slug);
        if is_bundle_dir(&bundle_dir) {
            info!("Using cached bundle for '{}' at {}", name, bundle_dir.display());
            return Ok(bundle_dir);
        }

        self.ensure_zoo_dir()?;
        let staging_dir = self.directory.join(format!("{}.part", catalog_entry.slug));
        if staging_dir.exists() {
            // Leftover from an interrupted fetch
            fs::remove_dir_all(&staging_dir)?;
        }

        let url = catalog_entry.url(&self.base_url);
        let staged = fetch_archive(&url, &staging_dir)
            .and_then(|_| {
                if is_bundle_dir(&staging_dir) {
                    Ok(())
                } else {
                    Err(ZooError::InvalidArchive(format!(
                        "Archive for '{}' did not contain a config.json",
                        name
                    )))
                }
            })
            .and_then(|_| fs::rename(&staging_dir, &bundle_dir).map_err(ZooError::from));
        if let Err(e) = staged {
            let _ = fs::remove_dir_all(&staging_dir);
            return Err(Box::new(e));
        }

        self.load_or_create_registry()?;
        self.registry.insert(
            catalog_entry.slug.to_string(),
            registry_entry(catalog_entry, &self.base_url),
        );
        self.assign_numbers();
        self.save_registry()?;

        info!("Fetched '{}' into {}", name, bundle_dir.display());
        Ok(bundle_dir)
    }
}

/// A directory is a bundle when the StarDist config marker is present
fn is_bundle_dir(path: &Path) -> bool {
    path.join("config.json").is_file()
}

/// Builds a registry entry from catalog metadata
fn registry_entry(catalog_entry: &CatalogEntry, base_url: &str) -> RegistryEntry {
    RegistryEntry {
        number: None,
        name: catalog_entry.name.to_string(),
        url: catalog_entry.url(base_url),
        axes: catalog_entry.axes.to_string(),
        n_rays: catalog_entry.n_rays,
        grid: catalog_entry.grid,
        fetched_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seed_bundle(zoo_dir: &Path, slug: &str) {
        let bundle = zoo_dir.join(slug);
        fs::create_dir_all(&bundle).unwrap();
        fs::write(bundle.join("config.json"), "{}").unwrap();
    }

    fn test_zoo(directory: &Path) -> Zoo {
        Zoo::new(
            directory.to_path_buf(),
            "https://example.org/models".to_string(),
        )
    }

    #[test]
    fn test_scan_registers_cached_bundles() {
        let dir = tempdir().unwrap();
        seed_bundle(dir.path(), "3d_demo");

        let mut zoo = test_zoo(dir.path());
        zoo.scan().unwrap();

        let entry = zoo.find("3D_demo").unwrap();
        assert_eq!(entry.name, "3D_demo");
        assert_eq!(entry.number, Some(1));
        assert_eq!(entry.n_rays, 96);
        assert!(dir.path().join(REGISTRY_FILE).exists());
    }

    #[test]
    fn test_scan_ignores_unknown_directories() {
        let dir = tempdir().unwrap();
        seed_bundle(dir.path(), "not_a_known_model");

        let mut zoo = test_zoo(dir.path());
        zoo.scan().unwrap();
        assert!(zoo.entries().is_empty());
    }

    #[test]
    fn test_registry_round_trip() {
        let dir = tempdir().unwrap();
        seed_bundle(dir.path(), "3d_demo");
        seed_bundle(dir.path(), "plant_nuclei_3d");

        let mut zoo = test_zoo(dir.path());
        zoo.scan().unwrap();

        let mut reloaded = test_zoo(dir.path());
        reloaded.load_or_create_registry().unwrap();
        assert_eq!(reloaded.entries().len(), 2);
    }

    #[test]
    fn test_scan_drops_removed_bundles() {
        let dir = tempdir().unwrap();
        seed_bundle(dir.path(), "3d_demo");

        let mut zoo = test_zoo(dir.path());
        zoo.scan().unwrap();
        fs::remove_dir_all(dir.path().join("3d_demo")).unwrap();
        zoo.scan().unwrap();

        assert!(zoo.entries().is_empty());
    }

    #[test]
    fn test_unknown_model_creates_no_files() {
        let dir = tempdir().unwrap();
        let zoo_dir = dir.path().join("zoo");
        fs::create_dir_all(&zoo_dir).unwrap();

        let mut zoo = test_zoo(&zoo_dir);
        let err = zoo.fetch("no_such_model").unwrap_err();
        assert!(err.to_string().contains("Unknown pretrained model"));
        assert_eq!(fs::read_dir(&zoo_dir).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_fetch_preserves_existing_directory() {
        let dir = tempdir().unwrap();
        // A stray non-bundle directory already sits at the slug path
        let stray = dir.path().join("3d_demo");
        fs::create_dir_all(&stray).unwrap();
        fs::write(stray.join("notes.txt"), "keep me").unwrap();

        // The test URL is unreachable, so the fetch fails after staging
        let mut zoo = Zoo::new(
            dir.path().to_path_buf(),
            "https://localhost.invalid/models".to_string(),
        );
        assert!(zoo.fetch("3D_demo").is_err());

        assert!(stray.join("notes.txt").exists());
        assert!(!dir.path().join("3d_demo.part").exists());
    }

    #[test]
    fn test_fetch_short_circuits_on_cache_hit() {
        let dir = tempdir().unwrap();
        seed_bundle(dir.path(), "3d_demo");

        // The example URL is unreachable, so a hit must not touch the network
        let mut zoo = test_zoo(dir.path());
        let bundle = zoo.fetch("3D_demo").unwrap();
        assert_eq!(bundle, dir.path().join("3d_demo"));
    }
}
