//! Subspace minimization over the free variables.
//!
//! Once the Cauchy point `x_c` fixes the active set, the quadratic model is
//! minimized over the remaining free coordinates by the direct primal method.
//! With `Z` selecting the free rows, the reduced model gradient at `x_c` is
//!
//! ```text
//! r = Zᵀ (g + θ(x_c − x) − W M c)
//! ```
//!
//! and the unconstrained reduced Newton step follows from the
//! Sherman–Morrison–Woodbury identity:
//!
//! ```text
//! v  = M (ZᵀW)ᵀ r
//! N  = I − M (ZᵀW)ᵀ(ZᵀW) / θ
//! v ← N⁻¹ v
//! du = −r/θ − (ZᵀW) v / θ²
//! ```
//!
//! The step is then truncated by the largest `α ∈ [0, 1]` keeping
//! `x_c + α·du` inside the box.

use crate::{cauchy::CauchyPoint, compact::CompactRepresentation};
use boxopt_core::{
    bounds::Bounds,
    numerical::checked_solve,
    types::{DMatrix, DVector, Scalar},
};
use num_traits::Float;

/// Result of the subspace minimization.
#[derive(Debug, Clone)]
pub struct SubspaceStep<T: Scalar> {
    /// Minimizer candidate, feasible and equal to `x_c` on pinned coordinates
    pub point: DVector<T>,

    /// Indices of the free variables at the Cauchy point
    pub free_variables: Vec<usize>,

    /// Truncation factor applied to the reduced Newton step
    pub alpha: T,

    /// True if the reduced system was singular and `x_c` was returned as is
    pub fell_back_to_cauchy: bool,
}

/// Indices where the feasible point `x_c` lies strictly inside both bounds.
pub fn free_variables<T: Scalar>(cauchy_point: &DVector<T>, bounds: &Bounds<T>) -> Vec<usize> {
    (0..cauchy_point.len())
        .filter(|&i| !bounds.is_at_bound(i, cauchy_point[i]))
        .collect()
}

/// Largest `α ∈ [0, 1]` with `x_c + α·du` feasible on the free coordinates.
///
/// `du[k]` is the step for coordinate `free[k]`. Components whose magnitude
/// does not exceed the smallest positive normal number impose no limit.
pub fn max_feasible_step<T: Scalar>(
    cauchy_point: &DVector<T>,
    du: &DVector<T>,
    free: &[usize],
    bounds: &Bounds<T>,
) -> T {
    let tiny = <T as Float>::min_positive_value();
    let mut alpha = T::one();

    for (k, &i) in free.iter().enumerate() {
        let step = du[k];
        if Float::abs(step) <= tiny {
            continue;
        }
        let room = if step > T::zero() {
            bounds.upper()[i] - cauchy_point[i]
        } else {
            bounds.lower()[i] - cauchy_point[i]
        };
        alpha = Float::min(alpha, room / step);
    }

    Float::max(alpha, T::zero())
}

/// Minimizes the model over the free variables of `cauchy`.
///
/// A singular or ill-conditioned reduced system is logged and answered with
/// the Cauchy point itself, which is always a valid descent candidate.
pub fn minimize<T: Scalar>(
    x: &DVector<T>,
    g: &DVector<T>,
    bounds: &Bounds<T>,
    representation: &CompactRepresentation<T>,
    cauchy: &CauchyPoint<T>,
) -> SubspaceStep<T> {
    let x_c = &cauchy.point;
    let free = free_variables(x_c, bounds);

    let cauchy_only = |free: Vec<usize>, fell_back_to_cauchy: bool| SubspaceStep {
        point: x_c.clone(),
        free_variables: free,
        alpha: T::zero(),
        fell_back_to_cauchy,
    };

    if free.is_empty() {
        return cauchy_only(free, false);
    }

    let theta = representation.theta();
    let w = representation.w();
    let m = representation.m();
    let columns = w.ncols();

    let residual = g + (x_c - x) * theta - w * (m * &cauchy.c);
    let r = DVector::from_fn(free.len(), |k, _| residual[free[k]]);
    let wz = DMatrix::from_fn(free.len(), columns, |k, j| w[(free[k], j)]);

    let rhs = m * wz.tr_mul(&r);
    let n_matrix = DMatrix::identity(columns, columns) - (m * wz.tr_mul(&wz)) / theta;

    let v = match checked_solve(&n_matrix, &rhs) {
        Ok(v) => v,
        Err(err) => {
            log::warn!("subspace minimization fell back to the Cauchy point: {err}");
            return cauchy_only(free, true);
        }
    };

    let du = -(r / theta) - (wz * v) / (theta * theta);
    let alpha = max_feasible_step(x_c, &du, &free, bounds);

    let mut point = x_c.clone();
    for (k, &i) in free.iter().enumerate() {
        point[i] = bounds.clamp(i, x_c[i] + alpha * du[k]);
    }

    SubspaceStep {
        point,
        free_variables: free,
        alpha,
        fell_back_to_cauchy: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cauchy::generalized_cauchy_point, compact::LimitedMemory};
    use approx::assert_relative_eq;

    fn v(values: &[f64]) -> DVector<f64> {
        DVector::from_column_slice(values)
    }

    fn unit_box(n: usize) -> Bounds<f64> {
        Bounds::new(DVector::zeros(n), DVector::from_element(n, 1.0)).unwrap()
    }

    #[test]
    fn test_step_limiter_caps() {
        let bounds = unit_box(2);
        let x_c = v(&[0.5, 0.5]);

        let alpha = max_feasible_step(&x_c, &v(&[1.0, -0.25]), &[0, 1], &bounds);
        assert_relative_eq!(alpha, 0.5);

        let alpha = max_feasible_step(&x_c, &v(&[0.1, -0.1]), &[0, 1], &bounds);
        assert_eq!(alpha, 1.0);

        let alpha = max_feasible_step(&x_c, &v(&[-2.0]), &[1], &bounds);
        assert_relative_eq!(alpha, 0.25);
    }

    #[test]
    fn test_step_limiter_ignores_negligible_and_unbounded_components() {
        let bounds = unit_box(2);
        let x_c = v(&[0.5, 0.5]);
        let alpha = max_feasible_step(&x_c, &v(&[1e-320, 0.0]), &[0, 1], &bounds);
        assert_eq!(alpha, 1.0);

        let unbounded = Bounds::unbounded(2);
        let alpha = max_feasible_step(&x_c, &v(&[1e10, -1e10]), &[0, 1], &unbounded);
        assert_eq!(alpha, 1.0);
    }

    #[test]
    fn test_free_variables() {
        let bounds = unit_box(4);
        assert_eq!(free_variables(&v(&[0.0, 0.5, 1.0, 0.999]), &bounds), vec![1, 3]);
    }

    #[test]
    fn test_no_free_variables_returns_cauchy_point() {
        let bounds = unit_box(2);
        let x = v(&[0.5, 0.5]);
        let g = v(&[4.0, -4.0]);
        let rep = CompactRepresentation::identity(2);
        let cauchy = generalized_cauchy_point(&x, &g, &bounds, &rep);

        let step = minimize(&x, &g, &bounds, &rep, &cauchy);
        assert!(step.free_variables.is_empty());
        assert_eq!(step.point, v(&[0.0, 1.0]));
    }

    #[test]
    fn test_identity_model_gives_projected_step() {
        let bounds = unit_box(3);
        let x = v(&[0.5, 0.5, 0.5]);
        let g = v(&[2.0, -0.2, 0.1]);
        let rep = CompactRepresentation::identity(3);
        let cauchy = generalized_cauchy_point(&x, &g, &bounds, &rep);

        let step = minimize(&x, &g, &bounds, &rep, &cauchy);
        assert_eq!(step.point[0], 0.0);
        assert_relative_eq!(step.point, bounds.project(&(&x - &g)), epsilon = 1e-12);
    }

    #[test]
    fn test_singular_reduced_system_falls_back_to_cauchy_point() {
        // B = I − e₀e₀ᵀ has no curvature along e₀, which makes N singular.
        let w = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 0.0]);
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 0.0]);
        let rep = CompactRepresentation::from_parts(1.0, w, m);

        let bounds = unit_box(2);
        let x = v(&[0.5, 0.5]);
        let g = v(&[0.0, 0.1]);
        let cauchy = generalized_cauchy_point(&x, &g, &bounds, &rep);
        assert_eq!(cauchy.breakpoints_swept, 0);

        let step = minimize(&x, &g, &bounds, &rep, &cauchy);
        assert!(step.fell_back_to_cauchy);
        assert_eq!(step.free_variables, vec![0, 1]);
        assert_eq!(step.alpha, 0.0);
        assert_eq!(step.point, cauchy.point);
    }

    #[test]
    fn test_unbounded_step_is_quasi_newton_step() {
        let a = DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.0, 1.0, 3.0, 0.5, 0.0, 0.5, 2.0]);
        let mut memory = LimitedMemory::<f64>::new(3, 5);
        for s in [v(&[1.0, 0.0, 0.0]), v(&[0.2, 1.0, 0.0]), v(&[0.0, -0.3, 1.0])] {
            let y = &a * &s;
            memory.update(s, y);
        }
        let rep = memory.representation();
        assert!(rep.columns() > 0);

        let bounds = Bounds::unbounded(3);
        let x = v(&[1.0, 2.0, -1.0]);
        let g = v(&[0.7, -1.3, 0.4]);
        let cauchy = generalized_cauchy_point(&x, &g, &bounds, rep);
        let step = minimize(&x, &g, &bounds, rep, &cauchy);

        assert_eq!(step.alpha, 1.0);
        assert!(!step.fell_back_to_cauchy);
        // B (x_s − x) = −g at the unconstrained model minimizer.
        let bs = rep.apply(&(&step.point - &x));
        assert_relative_eq!(bs, -g, epsilon = 1e-8);
    }
}
