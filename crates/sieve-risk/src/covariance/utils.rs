//! Covariance diagnostics
//!
//! Positive definiteness by Cholesky factorization and the condition number
//! the optimizer's inputs are judged by, from the eigenvalues of cyclic Jacobi
//! sweeps.

use super::CovarianceError;
use ndarray::{Array1, Array2};

/// Sweep limit for [`condition_number`]. Cyclic Jacobi converges
/// quadratically, so a handful of sweeps suffice in practice.
const MAX_SWEEPS: usize = 50;

/// Off-diagonal mass, relative to the Frobenius norm, at which sweeps stop.
const SWEEP_TOLERANCE: f64 = 1e-14;

/// Check if a matrix is positive definite
///
/// Attempts a Cholesky factorization; a pivot at or below the rounding level
/// of the diagonal means the matrix is singular or indefinite.
pub fn is_positive_definite(cov: &Array2<f64>) -> bool {
    let n = cov.nrows();
    if n != cov.ncols() || n == 0 || cov.iter().any(|v| !v.is_finite()) {
        return false;
    }

    let scale = cov.diag().iter().fold(0.0_f64, |m, d| m.max(d.abs()));
    let floor = f64::EPSILON * scale * n as f64;
    let mut l = Array2::<f64>::zeros((n, n));

    for j in 0..n {
        let pivot = cov[[j, j]] - (0..j).map(|k| l[[j, k]] * l[[j, k]]).sum::<f64>();
        if pivot <= floor {
            return false;
        }
        let root = pivot.sqrt();
        l[[j, j]] = root;
        for i in (j + 1)..n {
            let dot: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            l[[i, j]] = (cov[[i, j]] - dot) / root;
        }
    }
    true
}

/// Compute the condition number of a matrix
///
/// The condition number is the ratio of the largest to smallest eigenvalue.
/// A large condition number indicates numerical instability.
///
/// # Returns
/// * Condition number (infinity if the smallest eigenvalue is zero or negative)
pub fn condition_number(cov: &Array2<f64>) -> f64 {
    match symmetric_eigenvalues(cov, MAX_SWEEPS, SWEEP_TOLERANCE) {
        Ok(values) if !values.is_empty() => {
            let max_eig = values[0];
            let min_eig = values[values.len() - 1];
            if min_eig <= f64::EPSILON * max_eig.abs() {
                f64::INFINITY
            } else {
                max_eig / min_eig
            }
        }
        _ => f64::INFINITY,
    }
}

/// Eigenvalues of a symmetric matrix, in descending order
///
/// Cyclic Jacobi: each sweep rotates away every off-diagonal pair once, for
/// `O(n^3)` work per sweep. Stops once the off-diagonal Frobenius norm falls
/// below `tolerance` times the matrix norm, or after `max_sweeps` sweeps.
pub fn symmetric_eigenvalues(
    matrix: &Array2<f64>,
    max_sweeps: usize,
    tolerance: f64,
) -> Result<Array1<f64>, CovarianceError> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(CovarianceError::DimensionMismatch {
            expected: n,
            actual: matrix.ncols(),
        });
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(CovarianceError::NonFinite);
    }

    let mut a = matrix.clone();
    let norm = a.iter().map(|v| v * v).sum::<f64>().sqrt();

    for _ in 0..max_sweeps {
        if off_diagonal_norm(&a) <= tolerance * norm {
            break;
        }
        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[[p, q]];
                if apq.abs() < f64::MIN_POSITIVE {
                    continue;
                }
                let (cos_theta, sin_theta) = compute_rotation(a[[p, p]], a[[q, q]], apq);
                rotate(&mut a, p, q, cos_theta, sin_theta);
            }
        }
    }

    let mut values: Vec<f64> = a.diag().to_vec();
    values.sort_by(|x, y| y.total_cmp(x));
    Ok(Array1::from(values))
}

fn off_diagonal_norm(matrix: &Array2<f64>) -> f64 {
    let n = matrix.nrows();
    let mut sum = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            sum += 2.0 * matrix[[i, j]] * matrix[[i, j]];
        }
    }
    sum.sqrt()
}

/// Compute the rotation (cos, sin) that zeroes `a[p, q]`
fn compute_rotation(app: f64, aqq: f64, apq: f64) -> (f64, f64) {
    let tau = (aqq - app) / (2.0 * apq);
    let t = if tau >= 0.0 {
        1.0 / (tau + (1.0 + tau * tau).sqrt())
    } else {
        -1.0 / (-tau + (1.0 + tau * tau).sqrt())
    };

    let cos_theta = 1.0 / (1.0 + t * t).sqrt();
    (cos_theta, t * cos_theta)
}

/// Apply a Jacobi rotation in the `(p, q)` plane, keeping `a` symmetric
fn rotate(a: &mut Array2<f64>, p: usize, q: usize, c: f64, s: f64) {
    let n = a.nrows();
    let (app, aqq, apq) = (a[[p, p]], a[[q, q]], a[[p, q]]);

    a[[p, p]] = c * c * app - 2.0 * c * s * apq + s * s * aqq;
    a[[q, q]] = s * s * app + 2.0 * c * s * apq + c * c * aqq;
    a[[p, q]] = 0.0;
    a[[q, p]] = 0.0;

    for i in (0..n).filter(|&i| i != p && i != q) {
        let (aip, aiq) = (a[[i, p]], a[[i, q]]);
        a[[i, p]] = c * aip - s * aiq;
        a[[p, i]] = a[[i, p]];
        a[[i, q]] = s * aip + c * aiq;
        a[[q, i]] = a[[i, q]];
    }
}
