use tracing::warn;
use crate::geom::GeomError;

/// Number of coefficients of the fitted quadric
const N_COEFFICIENTS: usize = 9;

/// An ellipsoid as the 9 coefficients of the quadric
/// `a x^2 + b y^2 + c z^2 + d xy + e xz + f yz + g x + h y + i z = 1`.
#[derive(Debug, Clone)]
pub struct Ellipsoid {
    /// Quadric coefficients in the order a..i
    pub coefficients: [f64; N_COEFFICIENTS],
}

impl Ellipsoid {
    /// Fits an ellipsoid through the given points by least squares.
    ///
    /// Builds one quadric row per point and solves the normal equations
    /// `(X^T X) beta = X^T y` with `y = 1`. At least 9 points are required;
    /// degenerate point sets (coplanar, duplicated) make the normal matrix
    /// singular, which is reported as an error.
    pub fn fit(points: &[[f64; 3]]) -> Result<Self, GeomError> {
        if points.len() < N_COEFFICIENTS {
            return Err(GeomError::InsufficientInput(format!(
                "An ellipsoid fit needs at least {} points, got: {}",
                N_COEFFICIENTS,
                points.len()
            )));
        }

        // Quadric design matrix rows: x^2 y^2 z^2 xy xz yz x y z
        let rows: Vec<[f64; N_COEFFICIENTS]> = points
            .iter()
            .map(|p| {
                let (x, y, z) = (p[0], p[1], p[2]);
                [x * x, y * y, z * z, x * y, x * z, y * z, x, y, z]
            })
            .collect();

        // Normal equations: lhs = X^T X, rhs = X^T 1
        let mut lhs = [[0.0; N_COEFFICIENTS]; N_COEFFICIENTS];
        let mut rhs = [0.0; N_COEFFICIENTS];
        for row in &rows {
            for i in 0..N_COEFFICIENTS {
                rhs[i] += row[i];
                for j in 0..N_COEFFICIENTS {
                    lhs[i][j] += row[i] * row[j];
                }
            }
        }

        let coefficients = solve(lhs, rhs).map_err(|e| {
            warn!(
                "Not enough independent points to determine the regression, need at least {}",
                N_COEFFICIENTS
            );
            e
        })?;

        Ok(Self { coefficients })
    }

    /// Evaluates the quadric at the given point; 1.0 on the fitted surface.
    pub fn evaluate(&self, point: [f64; 3]) -> f64 {
        let (x, y, z) = (point[0], point[1], point[2]);
        let c = &self.coefficients;
        c[0] * x * x + c[1] * y * y + c[2] * z * z
            + c[3] * x * y + c[4] * x * z + c[5] * y * z
            + c[6] * x + c[7] * y + c[8] * z
    }
}

/// Solves the 9x9 linear system by Gauss-Jordan elimination with partial
/// pivoting. A vanishing pivot means the system is singular.
fn solve(
    mut lhs: [[f64; N_COEFFICIENTS]; N_COEFFICIENTS],
    mut rhs: [f64; N_COEFFICIENTS],
) -> Result<[f64; N_COEFFICIENTS], GeomError> {
    const PIVOT_EPSILON: f64 = 1e-12;

    for column in 0..N_COEFFICIENTS {
        // Pick the row with the largest magnitude in this column
        let pivot_row = (column..N_COEFFICIENTS)
            .max_by(|a, b| {
                lhs[*a][column]
                    .abs()
                    .total_cmp(&lhs[*b][column].abs())
            })
            .unwrap_or(column);
        if lhs[pivot_row][column].abs() < PIVOT_EPSILON {
            return Err(GeomError::SingularMatrix(format!(
                "Normal matrix is singular at column {}", column
            )));
        }
        lhs.swap(column, pivot_row);
        rhs.swap(column, pivot_row);

        let pivot = lhs[column][column];
        for j in 0..N_COEFFICIENTS {
            lhs[column][j] /= pivot;
        }
        rhs[column] /= pivot;

        for row in 0..N_COEFFICIENTS {
            if row == column {
                continue;
            }
            let factor = lhs[row][column];
            if factor == 0.0 {
                continue;
            }
            for j in 0..N_COEFFICIENTS {
                lhs[row][j] -= factor * lhs[column][j];
            }
            rhs[row] -= factor * rhs[column];
        }
    }

    Ok(rhs)
}
