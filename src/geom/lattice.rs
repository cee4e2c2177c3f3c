use once_cell::sync::Lazy;
use crate::geom::GeomError;

/// The golden ratio, which spaces the lattice longitudes
const PHI: f64 = 1.618033988749895; // (1 + sqrt(5)) / 2

/// Number of points in the shared default lattice
pub const DEFAULT_LATTICE_SIZE: usize = 96;

/// The 96-point lattice shared by all polyhedra built from 96 distances.
///
/// Building the lattice is cheap but it sits on the per-candidate path of the
/// prediction, so the common size is computed once.
pub static DEFAULT_LATTICE: Lazy<Vec<[f64; 3]>> =
    Lazy::new(|| golden_spiral(DEFAULT_LATTICE_SIZE).unwrap());

/// Returns the points of a spherical Fibonacci lattice with n points.
///
/// Latitudes step linearly in z from -1 to 1 while longitudes advance by the
/// golden angle, giving a near-uniform covering of the unit sphere. Point
/// order is xyz. At least 4 points are required, matching the minimum ray
/// count of a star-convex polyhedron.
pub fn golden_spiral(n: usize) -> Result<Vec<[f64; 3]>, GeomError> {
    if n < 4 {
        return Err(GeomError::InsufficientInput(format!(
            "A spherical lattice needs at least 4 points, got: {}", n
        )));
    }
    let mut points = Vec::with_capacity(n);
    for k in 0..n {
        let k = k as f64;
        let z = -1.0 + 2.0 * k / (n as f64 - 1.0);
        let radius = (1.0 - z * z).sqrt();
        let theta = 2.0 * std::f64::consts::PI * (1.0 - 1.0 / PHI) * k;
        points.push([radius * theta.cos(), radius * theta.sin(), z]);
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::norm;

    #[test]
    fn test_points_are_unit_norm() {
        for point in golden_spiral(96).unwrap() {
            assert!((norm(point) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_poles() {
        let points = golden_spiral(32).unwrap();
        assert_eq!(points[0], [0.0, 0.0, -1.0]);
        let last = points[31];
        assert!((last[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_point_count() {
        assert_eq!(golden_spiral(7).unwrap().len(), 7);
        assert_eq!(DEFAULT_LATTICE.len(), DEFAULT_LATTICE_SIZE);
    }

    #[test]
    fn test_too_few_points_rejected() {
        assert!(matches!(golden_spiral(3), Err(GeomError::InsufficientInput(_))));
    }
}
