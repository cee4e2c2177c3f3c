use crate::geom::{add, cross, dot, normalize, scale, sub};
use crate::geom::lattice::{golden_spiral, DEFAULT_LATTICE, DEFAULT_LATTICE_SIZE};
use crate::geom::GeomError;

/// Axis-aligned bounding box of a polyhedron, in xyz order.
#[derive(Debug, Clone)]
pub struct BoundingBox3D {
    /// Minimum corner of the box
    pub min: [f64; 3],
    /// Maximum corner of the box
    pub max: [f64; 3],
}

impl BoundingBox3D {
    /// Tests whether the given point lies inside the box (faces included).
    pub fn contains(&self, point: [f64; 3]) -> bool {
        point[0] >= self.min[0] && point[0] <= self.max[0]
            && point[1] >= self.min[1] && point[1] <= self.max[1]
            && point[2] >= self.min[2] && point[2] <= self.max[2]
    }
}

/// A star-convex polyhedron: one surface vertex per lattice direction, each
/// placed at its predicted distance from the center.
///
/// This is the shape representation StarDist 3D predicts per object center;
/// the network emits one distance per ray and the rays are the directions of
/// a spherical Fibonacci lattice.
pub struct StarConvexPolyhedron {
    /// Unit directions from the center to each vertex
    lattice: Vec<[f64; 3]>,
    /// Center of the polyhedron, in xyz order
    center: [f64; 3],
    /// Surface vertices, one per lattice direction
    vertices: Vec<[f64; 3]>,
    /// Axis-aligned bounding box over the vertices
    bounding_box: BoundingBox3D,
}

impl StarConvexPolyhedron {
    /// Creates a star-convex polyhedron from a center and per-ray distances.
    ///
    /// The number of vertices is the number of distances; at least 4 are
    /// required and all of them must be finite and non-negative.
    pub fn new(center: [f64; 3], distances: &[f64]) -> Result<Self, GeomError> {
        if distances.len() < 4 {
            return Err(GeomError::InsufficientInput(format!(
                "At least 4 distances are required, got: {}", distances.len()
            )));
        }
        if let Some(d) = distances.iter().find(|d| !d.is_finite() || **d < 0.0) {
            return Err(GeomError::InvalidDistance(format!(
                "Distances must be finite and non-negative, got: {}", d
            )));
        }

        // The 96-point lattice is shared; other sizes are built on demand
        let lattice = if distances.len() == DEFAULT_LATTICE_SIZE {
            DEFAULT_LATTICE.clone()
        } else {
            golden_spiral(distances.len())?
        };

        let mut vertices = Vec::with_capacity(distances.len());
        for (direction, distance) in lattice.iter().zip(distances) {
            vertices.push(add(center, scale(*direction, *distance)));
        }

        let bounding_box = bounding_box(&vertices);

        Ok(Self { lattice, center, vertices, bounding_box })
    }

    /// Tests if the given point is inside the star convex polyhedron.
    ///
    /// Workflow:
    /// 1. Project the point onto the unit sphere around the center.
    /// 2. Find the 3 lattice directions nearest to the projection.
    /// 3. Form the triangle of their surface vertices.
    /// 4. The point is inside when it lies on the same side of that triangle
    ///    as the center.
    pub fn contains(&self, point: [f64; 3]) -> bool {
        if point == self.center {
            return true;
        }
        let triangle = self.nearest_vertices(point);
        side_of_triangle(point, &triangle) == side_of_triangle(self.center, &triangle)
    }

    /// The center of the polyhedron
    pub fn center(&self) -> [f64; 3] {
        self.center
    }

    /// The surface vertices, one per lattice direction
    pub fn vertices(&self) -> &[[f64; 3]] {
        &self.vertices
    }

    /// The axis-aligned bounding box over the vertices
    pub fn bounding_box(&self) -> &BoundingBox3D {
        &self.bounding_box
    }

    /// Finds the surface vertices whose lattice directions are nearest to the
    /// candidate point, projected onto the unit sphere around the center.
    fn nearest_vertices(&self, candidate: [f64; 3]) -> [[f64; 3]; 3] {
        let projected = normalize(sub(candidate, self.center));

        // Nearest on the unit sphere is the largest dot product
        let mut best: [(f64, usize); 3] = [(f64::NEG_INFINITY, 0); 3];
        for (i, direction) in self.lattice.iter().enumerate() {
            let similarity = dot(*direction, projected);
            if similarity > best[2].0 {
                best[2] = (similarity, i);
                if best[2].0 > best[1].0 {
                    best.swap(1, 2);
                }
                if best[1].0 > best[0].0 {
                    best.swap(0, 1);
                }
            }
        }

        [
            self.vertices[best[0].1],
            self.vertices[best[1].1],
            self.vertices[best[2].1],
        ]
    }
}

/// Signed side of the triangle's plane the point lies on (-1, 0 or 1).
fn side_of_triangle(point: [f64; 3], triangle: &[[f64; 3]; 3]) -> i8 {
    let edge_a = sub(triangle[1], triangle[0]);
    let edge_b = sub(triangle[2], triangle[0]);
    let normal = normalize(cross(edge_a, edge_b));
    let to_point = sub(point, triangle[0]);
    let side = dot(normal, to_point);
    if side > 0.0 {
        1
    } else if side < 0.0 {
        -1
    } else {
        0
    }
}

/// Minimum and maximum corners over a vertex list
fn bounding_box(vertices: &[[f64; 3]]) -> BoundingBox3D {
    let mut min = [f64::MAX; 3];
    let mut max = [f64::MIN; 3];
    for vertex in vertices {
        for axis in 0..3 {
            min[axis] = min[axis].min(vertex[axis]);
            max[axis] = max[axis].max(vertex[axis]);
        }
    }
    BoundingBox3D { min, max }
}
