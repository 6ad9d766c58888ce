//! Euclidean projection onto the capped simplex
//! `{ w : sum(w) = 1, lower <= w_i <= upper }`.
//!
//! `w_i = clamp(v_i - tau, lower, upper)` where the shift `tau` is found by
//! bisection; the clamped sum is non-increasing in `tau`.

use ndarray::Array1;

const BISECTION_STEPS: usize = 200;

/// Project `v` onto the capped simplex. Requires `n * lower <= 1 <= n * upper`.
pub fn project_capped_simplex(v: &Array1<f64>, lower: f64, upper: f64) -> Array1<f64> {
    let clamped_sum = |tau: f64| v.iter().map(|x| (x - tau).clamp(lower, upper)).sum::<f64>();

    let max = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = v.iter().copied().fold(f64::INFINITY, f64::min);
    let (mut lo, mut hi) = (min - upper, max - lower);

    for _ in 0..BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        if clamped_sum(mid) > 1.0 {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo <= f64::EPSILON * (1.0 + lo.abs().max(hi.abs())) {
            break;
        }
    }

    let tau = 0.5 * (lo + hi);
    v.mapv(|x| (x - tau).clamp(lower, upper))
}
