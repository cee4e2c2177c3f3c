use std::error::Error;
use std::path::Path;
use chrono::{DateTime, Utc};
use ndarray::Array3;
use once_cell::sync::OnceCell;
use tracing::info;
use crate::config::Settings;
use crate::export::{self, ExportReport};
use crate::geom::{golden_spiral, GeomError};
use crate::predict::{self, Prediction};
use crate::zoo::{self, Zoo};
use super::bundle::Bundle;

/// An in-memory handle to a loaded pretrained StarDist 3D model.
///
/// Owns the bundle (config, thresholds, memory-mapped weights) for the
/// lifetime of the process. The ray direction table is built lazily; running
/// a prediction once is the canonical way to materialize it before export.
#[derive(Debug)]
pub struct StarDist3D {
    /// Catalog name the model was loaded under
    pub name: String,
    /// The on-disk bundle backing this handle
    pub bundle: Bundle,
    /// Lazily-built ray direction table
    rays: OnceCell<Vec<[f64; 3]>>,
    /// When the handle was created
    pub loaded_at: DateTime<Utc>,
}

impl StarDist3D {
    /// Loads a pretrained model by catalog name, fetching the bundle into
    /// the zoo cache first when it is not there yet.
    pub fn from_pretrained(
        name: &str,
        settings: &Settings,
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let canonical = zoo::lookup(name)?.name.to_string();
        let mut zoo = Zoo::new(
            settings.zoo.directory.clone(),
            settings.zoo.base_url.clone(),
        );
        let bundle_dir = zoo.fetch(&canonical)?;
        let model = Self::load_named(&bundle_dir, canonical)?;
        Ok(model)
    }

    /// Loads a model from an already-materialized bundle directory.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let name = dir
            .as_ref()
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "unnamed".to_string());
        Self::load_named(dir.as_ref(), name)
    }

    fn load_named(dir: &Path, name: String) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let bundle = Bundle::load(dir)?;
        info!(
            "Loaded model '{}' from {} ({} rays, {} byte weights)",
            name,
            dir.display(),
            bundle.config.n_rays(),
            bundle.weights.len()
        );
        Ok(Self {
            name,
            bundle,
            rays: OnceCell::new(),
            loaded_at: Utc::now(),
        })
    }

    /// The ray direction table, built on first use.
    pub fn rays(&self) -> Result<&[[f64; 3]], GeomError> {
        self.rays
            .get_or_try_init(|| golden_spiral(self.bundle.config.n_rays()))
            .map(Vec::as_slice)
    }

    /// Whether the ray table has been materialized yet
    pub fn rays_materialized(&self) -> bool {
        self.rays.get().is_some()
    }

    /// Runs the instance-prediction entry point.
    ///
    /// With no input a small zero demo volume is synthesized; the resulting
    /// empty probability field yields no candidates, so the call only forces
    /// the lazily-built ray table into existence.
    pub fn predict_instances(
        &self,
        input: Option<&Array3<f32>>,
    ) -> Result<Prediction, Box<dyn Error + Send + Sync>> {
        predict::predict_instances(self, input)
    }

    /// Exports the model as a TensorFlow-loadable zip archive at `dest`,
    /// overwriting any previous archive there.
    pub fn export_tf<P: AsRef<Path>>(
        &self,
        dest: P,
    ) -> Result<ExportReport, Box<dyn Error + Send + Sync>> {
        export::export_tf(self, dest.as_ref())
    }
}
