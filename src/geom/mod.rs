mod vec3;
mod lattice;
mod polyhedron;
mod ellipsoid;
mod types;

// Re-export from types
pub use types::GeomError;
// Re-export from lattice
pub use lattice::{golden_spiral, DEFAULT_LATTICE, DEFAULT_LATTICE_SIZE};
// Re-export from polyhedron
pub use polyhedron::{BoundingBox3D, StarConvexPolyhedron};
// Re-export from ellipsoid
pub use ellipsoid::Ellipsoid;
// Vector helpers are shared with the prediction code
pub use vec3::{add, cross, dot, norm, normalize, scale, sub};
