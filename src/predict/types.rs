use crate::geom::{Ellipsoid, GeomError, StarConvexPolyhedron};

/// Voxel margin the original postprocessing excluded at each volume face
pub const DEFAULT_BORDER: usize = 2;

/// Options for candidate extraction from network-output tensors
#[derive(Debug, Clone)]
pub struct PredictOptions {
    /// Minimum object probability for a candidate
    pub threshold: f32,
    /// Voxel margin excluded at each face of the probability volume
    pub border: usize,
    /// Subsampling grid mapping output voxels back to input coordinates
    pub grid: [usize; 3],
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            border: DEFAULT_BORDER,
            grid: [1, 1, 1],
        }
    }
}

/// One detected star-convex shape candidate.
///
/// Candidates are not yet suppressed against each other; the list contains
/// every above-threshold voxel's shape.
pub struct Candidate {
    /// Center of the shape in input-volume coordinates, xyz order
    pub center: [f64; 3],
    /// Object probability at the center voxel
    pub score: f32,
    /// The predicted star-convex shape
    pub polyhedron: StarConvexPolyhedron,
}

impl Candidate {
    /// Fits an ellipsoid through the candidate's surface vertices.
    pub fn fit_ellipsoid(&self) -> Result<Ellipsoid, GeomError> {
        Ellipsoid::fit(self.polyhedron.vertices())
    }
}

/// Result of one instance-prediction run
pub struct Prediction {
    /// Shape of the probability volume the candidates came from, zyx order
    pub shape: [usize; 3],
    /// Probability threshold the candidates were extracted with
    pub threshold: f32,
    /// Extracted candidates, sorted by descending score
    pub candidates: Vec<Candidate>,
}
