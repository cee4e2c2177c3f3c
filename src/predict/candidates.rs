use std::error::Error;
use ndarray::{Array3, Array4, ArrayView3, ArrayView4};
use tracing::debug;
use crate::geom::StarConvexPolyhedron;
use crate::model::StarDist3D;
use super::types::{Candidate, Prediction, PredictOptions};

/// Shape of the synthesized demo volume used for no-input predictions
const DEMO_SHAPE: (usize, usize, usize) = (10, 10, 10);

/// Runs the model's instance-prediction entry point.
///
/// The network forward pass is delegated to the TensorFlow runtime that
/// consumes the exported archive; here the input only determines the output
/// grid shape and the probability and distance fields are zero. With no
/// input a zero demo volume is synthesized, so the call extracts nothing and
/// only materializes the ray table.
pub fn predict_instances(
    model: &StarDist3D,
    input: Option<&Array3<f32>>,
) -> Result<Prediction, Box<dyn Error + Send + Sync>> {
    let rays = model.rays()?;

    let (z, y, x) = match input {
        Some(volume) => volume.dim(),
        None => DEMO_SHAPE,
    };
    let grid = [
        model.bundle.config.grid[0],
        model.bundle.config.grid[1],
        model.bundle.config.grid[2],
    ];
    // The network output is subsampled by the model grid
    let out_shape = (
        (z / grid[0]).max(1),
        (y / grid[1]).max(1),
        (x / grid[2]).max(1),
    );

    let prob = Array3::<f32>::zeros(out_shape);
    let dist = Array4::<f32>::zeros((out_shape.0, out_shape.1, out_shape.2, rays.len()));

    let options = PredictOptions {
        threshold: model.bundle.thresholds.prob,
        grid,
        ..PredictOptions::default()
    };
    let candidates = candidates_from_tensors(rays, prob.view(), dist.view(), &options)?;

    Ok(Prediction {
        shape: [out_shape.0, out_shape.1, out_shape.2],
        threshold: options.threshold,
        candidates,
    })
}

/// Extracts star-convex shape candidates from network-output tensors.
///
/// Walks every voxel of the probability field inside the border margin and
/// builds one polyhedron per above-threshold voxel from the per-ray
/// distances at that voxel. Centers are scaled back to input coordinates by
/// the model grid. Non-maximum suppression is left to downstream consumers;
/// the returned list contains every candidate, sorted by descending score.
pub fn candidates_from_tensors(
    rays: &[[f64; 3]],
    prob: ArrayView3<f32>,
    dist: ArrayView4<f32>,
    options: &PredictOptions,
) -> Result<Vec<Candidate>, Box<dyn Error + Send + Sync>> {
    let (pz, py, px) = prob.dim();
    let (dz, dy, dx, dn) = dist.dim();
    if (pz, py, px) != (dz, dy, dx) {
        return Err(format!(
            "Probability shape ({}, {}, {}) does not match distance shape ({}, {}, {})",
            pz, py, px, dz, dy, dx
        )
        .into());
    }
    if dn != rays.len() {
        return Err(format!(
            "Distance tensor carries {} rays but the model has {}",
            dn,
            rays.len()
        )
        .into());
    }

    let border = options.border;
    debug!(
        "Extracting candidates within borders z: ({} - {}), y: ({} - {}), x: ({} - {})",
        border,
        pz.saturating_sub(border),
        border,
        py.saturating_sub(border),
        border,
        px.saturating_sub(border)
    );

    let mut candidates = Vec::new();
    for z in border..pz.saturating_sub(border) {
        for y in border..py.saturating_sub(border) {
            for x in border..px.saturating_sub(border) {
                let score = prob[[z, y, x]];
                if score <= options.threshold {
                    continue;
                }
                let distances: Vec<f64> = (0..rays.len())
                    .map(|ray| dist[[z, y, x, ray]] as f64)
                    .collect();
                let center = [
                    (x * options.grid[2]) as f64,
                    (y * options.grid[1]) as f64,
                    (z * options.grid[0]) as f64,
                ];
                let polyhedron = StarConvexPolyhedron::new(center, &distances)?;
                candidates.push(Candidate {
                    center,
                    score,
                    polyhedron,
                });
            }
        }
    }

    // Highest-scoring candidates first
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    debug!(
        "Found {} candidates above threshold {} (non-maxima included)",
        candidates.len(),
        options.threshold
    );
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::golden_spiral;

    fn test_rays() -> Vec<[f64; 3]> {
        golden_spiral(96).unwrap()
    }

    fn zero_tensors(shape: (usize, usize, usize)) -> (Array3<f32>, Array4<f32>) {
        let prob = Array3::<f32>::zeros(shape);
        let dist = Array4::<f32>::zeros((shape.0, shape.1, shape.2, 96));
        (prob, dist)
    }

    #[test]
    fn test_zero_field_yields_no_candidates() {
        let rays = test_rays();
        let (prob, dist) = zero_tensors((10, 10, 10));
        let candidates =
            candidates_from_tensors(&rays, prob.view(), dist.view(), &PredictOptions::default())
                .unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_single_voxel_candidate_contains_center() {
        let rays = test_rays();
        let (mut prob, mut dist) = zero_tensors((10, 10, 10));
        prob[[5, 4, 3]] = 0.9;
        for ray in 0..96 {
            dist[[5, 4, 3, ray]] = 2.0;
        }

        let candidates =
            candidates_from_tensors(&rays, prob.view(), dist.view(), &PredictOptions::default())
                .unwrap();
        assert_eq!(candidates.len(), 1);
        let candidate = &candidates[0];
        assert_eq!(candidate.center, [3.0, 4.0, 5.0]);
        assert_eq!(candidate.score, 0.9);
        assert!(candidate.polyhedron.contains(candidate.center));
    }

    #[test]
    fn test_border_voxels_are_excluded() {
        let rays = test_rays();
        let (mut prob, mut dist) = zero_tensors((10, 10, 10));
        // Inside the default border of 2 on the z face
        prob[[1, 5, 5]] = 0.9;
        for ray in 0..96 {
            dist[[1, 5, 5, ray]] = 2.0;
        }

        let candidates =
            candidates_from_tensors(&rays, prob.view(), dist.view(), &PredictOptions::default())
                .unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_candidates_sorted_by_score() {
        let rays = test_rays();
        let (mut prob, mut dist) = zero_tensors((10, 10, 10));
        prob[[4, 4, 4]] = 0.6;
        prob[[5, 5, 5]] = 0.8;
        for ray in 0..96 {
            dist[[4, 4, 4, ray]] = 1.0;
            dist[[5, 5, 5, ray]] = 1.0;
        }

        let candidates =
            candidates_from_tensors(&rays, prob.view(), dist.view(), &PredictOptions::default())
                .unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].score, 0.8);
        assert_eq!(candidates[1].score, 0.6);
    }

    #[test]
    fn test_grid_scales_centers() {
        let rays = test_rays();
        let (mut prob, mut dist) = zero_tensors((10, 10, 10));
        prob[[5, 5, 5]] = 0.9;
        for ray in 0..96 {
            dist[[5, 5, 5, ray]] = 1.0;
        }

        let options = PredictOptions {
            grid: [2, 2, 2],
            ..PredictOptions::default()
        };
        let candidates =
            candidates_from_tensors(&rays, prob.view(), dist.view(), &options).unwrap();
        assert_eq!(candidates[0].center, [10.0, 10.0, 10.0]);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let rays = test_rays();
        let prob = Array3::<f32>::zeros((10, 10, 10));
        let dist = Array4::<f32>::zeros((10, 10, 9, 96));
        assert!(
            candidates_from_tensors(&rays, prob.view(), dist.view(), &PredictOptions::default())
                .is_err()
        );
    }

    #[test]
    fn test_ray_count_mismatch_rejected() {
        let rays = test_rays();
        let prob = Array3::<f32>::zeros((10, 10, 10));
        let dist = Array4::<f32>::zeros((10, 10, 10, 32));
        assert!(
            candidates_from_tensors(&rays, prob.view(), dist.view(), &PredictOptions::default())
                .is_err()
        );
    }

    #[test]
    fn test_ellipsoid_fit_on_candidate() {
        let rays = test_rays();
        let (mut prob, mut dist) = zero_tensors((10, 10, 10));
        prob[[5, 5, 5]] = 0.9;
        for ray in 0..96 {
            dist[[5, 5, 5, ray]] = 3.0;
        }

        let candidates =
            candidates_from_tensors(&rays, prob.view(), dist.view(), &PredictOptions::default())
                .unwrap();
        let ellipsoid = candidates[0].fit_ellipsoid().unwrap();
        // A constant-distance candidate is a sphere of radius 3 around (5,5,5)
        assert!((ellipsoid.evaluate([8.0, 5.0, 5.0]) - 1.0).abs() < 1e-6);
    }
}
