use super::types::ZooError;

/// A pretrained model known to the zoo
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// Canonical name of the pretrained model
    pub name: &'static str,
    /// Directory name of the cached bundle
    pub slug: &'static str,
    /// Alternative names accepted by lookup
    pub aliases: &'static [&'static str],
    /// Download path relative to the configured base URL
    pub path: &'static str,
    /// Axes order of the model's input volume
    pub axes: &'static str,
    /// Number of rays per predicted polyhedron
    pub n_rays: usize,
    /// Subsampling grid of the network output
    pub grid: [usize; 3],
}

impl CatalogEntry {
    /// Full download URL of the bundle for the given base URL
    pub fn url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.path)
    }
}

/// The pretrained StarDist 3D checkpoints this tool can fetch
pub const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        name: "3D_demo",
        slug: "3d_demo",
        aliases: &["Demo 3D", "demo3d"],
        path: "v0.3/python_demo3d.zip",
        axes: "ZYX",
        n_rays: 96,
        grid: [2, 2, 2],
    },
    CatalogEntry {
        name: "StarDist Plant Nuclei 3D ResNet",
        slug: "plant_nuclei_3d",
        aliases: &["plant_nuclei_3d"],
        path: "v0.1/plant_nuclei_3d_resnet.zip",
        axes: "ZYX",
        n_rays: 96,
        grid: [2, 2, 2],
    },
];

/// Finds a catalog entry by name or alias, case-insensitively.
///
/// Unknown names list the catalog so a typo is easy to correct from the
/// error message alone.
pub fn lookup(name: &str) -> Result<&'static CatalogEntry, ZooError> {
    let wanted = name.to_lowercase();
    CATALOG
        .iter()
        .find(|entry| {
            entry.name.to_lowercase() == wanted
                || entry.slug.to_lowercase() == wanted
                || entry.aliases.iter().any(|alias| alias.to_lowercase() == wanted)
        })
        .ok_or_else(|| ZooError::UnknownModel {
            requested: name.to_string(),
            known: CATALOG.iter().map(|entry| entry.name.to_string()).collect(),
        })
}
