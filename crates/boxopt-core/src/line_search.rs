//! Backtracking line search along a feasible segment.
//!
//! Given a feasible point `x`, a feasible target `z`, the direction
//! `d = z − x` and the gradient `g` at `x`, the search looks for a step `t`
//! satisfying the Armijo sufficient-decrease condition
//!
//! ```text
//! f(x + t·d) ≤ f(x) + c₁ · t · gᵀd
//! ```
//!
//! starting from `t = 1` and shrinking `t ← ρ·t` after each rejection. The
//! trial at `t = 1` is `z` itself, so coordinates the target placed on a
//! bound stay exactly on it. Every other trial point is projected onto the
//! box, so rounding in `x + t·d` can never push an iterate outside the
//! bounds. The gradient is evaluated exactly once, at the accepted point.
//!
//! Backtracking stops after `max_iterations` reductions or once the step
//! falls below `min_step_size`, and the search then reports
//! [`OptimizerError::LineSearchFailed`].

use crate::{
    bounds::Bounds,
    cost_function::{checked_cost, checked_gradient, CostFunction},
    error::{OptimizerError, Result},
    types::{DVector, Scalar},
};
use num_traits::Float;
use std::fmt::Debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Result of a successful line search.
#[derive(Debug, Clone)]
pub struct LineSearchResult<T: Scalar> {
    /// Accepted step size `t`
    pub step_size: T,

    /// Accepted point `P(x + t·d)`, or the target itself when `t = 1`
    pub new_point: DVector<T>,

    /// Objective value at the accepted point
    pub new_value: T,

    /// Gradient at the accepted point
    pub new_gradient: DVector<T>,

    /// Objective evaluations performed, including the accepted one
    pub function_evals: usize,

    /// Gradient evaluations performed
    pub gradient_evals: usize,
}

/// Parameters of the backtracking line search.
///
/// The defaults (`c₁ = 0.2`, `ρ = 0.8`) are the constants used by the
/// L-BFGS-B driver.
///
/// ```rust
/// # use boxopt_core::prelude::*;
/// let params = LineSearchParams::<f64>::default()
///     .with_max_iterations(30);
/// assert!(params.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineSearchParams<T: Scalar> {
    /// First step tried
    pub initial_step_size: T,

    /// Step below which the search gives up
    pub min_step_size: T,

    /// Maximum number of step reductions
    pub max_iterations: usize,

    /// Armijo constant c₁ ∈ (0, 1)
    pub c1: T,

    /// Step reduction factor ρ ∈ (0, 1)
    pub rho: T,
}

impl<T: Scalar> Default for LineSearchParams<T> {
    fn default() -> Self {
        Self {
            initial_step_size: T::one(),
            min_step_size: T::MIN_STEP_SIZE,
            max_iterations: 100,
            c1: <T as Scalar>::from_f64(0.2),
            rho: <T as Scalar>::from_f64(0.8),
        }
    }
}

impl<T: Scalar> LineSearchParams<T> {
    /// Sets the first step tried.
    pub fn with_initial_step_size(mut self, step: T) -> Self {
        self.initial_step_size = step;
        self
    }

    /// Sets the Armijo constant.
    pub fn with_c1(mut self, c1: T) -> Self {
        self.c1 = c1;
        self
    }

    /// Sets the step reduction factor.
    pub fn with_rho(mut self, rho: T) -> Self {
        self.rho = rho;
        self
    }

    /// Sets the maximum number of step reductions.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the minimum step size.
    pub fn with_min_step_size(mut self, min_step_size: T) -> Self {
        self.min_step_size = min_step_size;
        self
    }

    /// Validates the parameters.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if `c1` or `rho` lie outside `(0, 1)`,
    /// if a step size is not positive and finite, if the initial step is not
    /// larger than the minimum one, or if `max_iterations` is zero.
    pub fn validate(&self) -> Result<()> {
        let open_unit = |v: T| v > T::zero() && v < T::one();

        if !open_unit(self.c1) {
            return Err(OptimizerError::invalid_configuration(
                "Armijo constant must be in (0, 1)",
                "c1",
                self.c1.to_string(),
            ));
        }
        if !open_unit(self.rho) {
            return Err(OptimizerError::invalid_configuration(
                "Backtracking factor must be in (0, 1)",
                "rho",
                self.rho.to_string(),
            ));
        }
        if !(self.min_step_size > T::zero()) || !Float::is_finite(self.min_step_size) {
            return Err(OptimizerError::invalid_configuration(
                "Minimum step size must be positive and finite",
                "min_step_size",
                self.min_step_size.to_string(),
            ));
        }
        if !(self.initial_step_size > self.min_step_size)
            || !Float::is_finite(self.initial_step_size)
        {
            return Err(OptimizerError::invalid_configuration(
                "Initial step size must be finite and exceed the minimum step size",
                "initial_step_size",
                self.initial_step_size.to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(OptimizerError::invalid_configuration(
                "Maximum backtracking iterations must be at least 1",
                "max_iterations",
                "0",
            ));
        }
        Ok(())
    }
}

/// Interface for step-size selection along a feasible segment.
pub trait LineSearch<T: Scalar>: Debug {
    /// Searches the segment from `point` toward `target`.
    ///
    /// Computes the directional derivative `gᵀ(target − point)` and delegates
    /// to [`LineSearch::search_with_deriv`].
    #[allow(clippy::too_many_arguments)]
    fn search<C>(
        &mut self,
        cost_fn: &C,
        bounds: &Bounds<T>,
        point: &DVector<T>,
        value: T,
        gradient: &DVector<T>,
        target: &DVector<T>,
        params: &LineSearchParams<T>,
    ) -> Result<LineSearchResult<T>>
    where
        C: CostFunction<T> + ?Sized,
    {
        if point.len() != target.len() || point.len() != gradient.len() {
            return Err(OptimizerError::dimension_mismatch(point.len(), target.len()));
        }
        let directional_deriv = gradient.dot(&(target - point));
        self.search_with_deriv(cost_fn, bounds, point, value, target, directional_deriv, params)
    }

    /// Searches toward `target` given a precomputed directional derivative.
    #[allow(clippy::too_many_arguments)]
    fn search_with_deriv<C>(
        &mut self,
        cost_fn: &C,
        bounds: &Bounds<T>,
        point: &DVector<T>,
        value: T,
        target: &DVector<T>,
        directional_deriv: T,
        params: &LineSearchParams<T>,
    ) -> Result<LineSearchResult<T>>
    where
        C: CostFunction<T> + ?Sized;

    /// Human-readable name of the strategy.
    fn name(&self) -> &str;
}

/// Armijo backtracking line search.
#[derive(Debug, Clone, Copy, Default)]
pub struct BacktrackingLineSearch;

impl BacktrackingLineSearch {
    /// Creates a backtracking line search.
    pub fn new() -> Self {
        Self
    }
}

impl<T: Scalar> LineSearch<T> for BacktrackingLineSearch {
    fn search_with_deriv<C>(
        &mut self,
        cost_fn: &C,
        bounds: &Bounds<T>,
        point: &DVector<T>,
        value: T,
        target: &DVector<T>,
        directional_deriv: T,
        params: &LineSearchParams<T>,
    ) -> Result<LineSearchResult<T>>
    where
        C: CostFunction<T> + ?Sized,
    {
        if point.len() != target.len() {
            return Err(OptimizerError::dimension_mismatch(point.len(), target.len()));
        }

        // NaN slopes land here as well.
        if !(directional_deriv <= T::zero()) {
            return Err(OptimizerError::line_search_failed(
                format!(
                    "not a descent direction (slope {:e})",
                    Scalar::to_f64(directional_deriv)
                ),
                0,
                Scalar::to_f64(params.initial_step_size),
            ));
        }

        let direction = target - point;
        let mut step = params.initial_step_size;
        let mut trial = point.clone();
        let mut function_evals = 0;

        for backtrack in 0..=params.max_iterations {
            if step == T::one() {
                trial.copy_from(target);
            } else {
                trial.copy_from(point);
                trial.axpy(step, &direction, T::one());
                bounds.project_mut(&mut trial);
            }

            let trial_value = checked_cost(cost_fn, &trial)?;
            function_evals += 1;

            if trial_value <= value + params.c1 * step * directional_deriv {
                let new_gradient = checked_gradient(cost_fn, &trial)?;
                log::trace!(
                    "line search accepted step {:e} after {} backtracks",
                    Scalar::to_f64(step),
                    backtrack
                );
                return Ok(LineSearchResult {
                    step_size: step,
                    new_point: trial,
                    new_value: trial_value,
                    new_gradient,
                    function_evals,
                    gradient_evals: 1,
                });
            }

            step = step * params.rho;
            if step < params.min_step_size {
                break;
            }
        }

        Err(OptimizerError::line_search_failed(
            "sufficient decrease not achieved",
            function_evals,
            Scalar::to_f64(step),
        ))
    }

    fn name(&self) -> &str {
        "Backtracking"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost_function::{CountingCostFunction, FnCostFunction};
    use approx::assert_relative_eq;

    fn sphere() -> impl CostFunction<f64> {
        FnCostFunction::new(
            |x: &DVector<f64>| x.norm_squared(),
            |x: &DVector<f64>| x * 2.0,
        )
    }

    #[test]
    fn test_default_params() {
        let params = LineSearchParams::<f64>::default();
        assert_eq!(params.c1, 0.2);
        assert_eq!(params.rho, 0.8);
        assert_eq!(params.initial_step_size, 1.0);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_params_validation() {
        let bad = LineSearchParams::<f64>::default().with_c1(1.0);
        assert!(matches!(
            bad.validate(),
            Err(OptimizerError::InvalidConfiguration { .. })
        ));
        assert!(LineSearchParams::<f64>::default().with_rho(0.0).validate().is_err());
        assert!(LineSearchParams::<f64>::default().with_max_iterations(0).validate().is_err());
        assert!(LineSearchParams::<f64>::default()
            .with_min_step_size(-1.0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_full_step_accepted() {
        let f = sphere();
        let bounds = Bounds::unbounded(2);
        let x = DVector::from_vec(vec![1.0, 1.0]);
        let g = f.gradient(&x).unwrap();
        let target = DVector::zeros(2);

        let mut ls = BacktrackingLineSearch::new();
        let result = ls
            .search(&f, &bounds, &x, 2.0, &g, &target, &LineSearchParams::default())
            .unwrap();

        assert_eq!(result.step_size, 1.0);
        assert_eq!(result.new_value, 0.0);
        assert_eq!(result.function_evals, 1);
        assert_eq!(result.gradient_evals, 1);
        assert_relative_eq!(result.new_gradient.norm(), 0.0);
    }

    #[test]
    fn test_backtracks_on_overshoot() {
        let f = CountingCostFunction::new(sphere());
        let bounds = Bounds::unbounded(1);
        let x = DVector::from_vec(vec![1.0]);
        let g = DVector::from_vec(vec![2.0]);
        // t = 1 lands on x = -9, far uphill.
        let target = DVector::from_vec(vec![-9.0]);

        let mut ls = BacktrackingLineSearch::new();
        let params = LineSearchParams::default();
        let result = ls.search(&f, &bounds, &x, 1.0, &g, &target, &params).unwrap();

        let slope = g.dot(&(&target - &x));
        assert!(result.step_size < 1.0);
        assert!(result.new_value <= 1.0 + params.c1 * result.step_size * slope);
        assert!(result.function_evals > 1);
        assert_eq!(f.counts(), (result.function_evals, 1));
    }

    #[test]
    fn test_ascent_direction_fails_without_evaluation() {
        let f = CountingCostFunction::new(sphere());
        let bounds = Bounds::unbounded(1);
        let x = DVector::from_vec(vec![1.0]);
        let g = DVector::from_vec(vec![2.0]);
        let target = DVector::from_vec(vec![2.0]);

        let mut ls = BacktrackingLineSearch::new();
        let err = ls
            .search(&f, &bounds, &x, 1.0, &g, &target, &LineSearchParams::default())
            .unwrap_err();
        assert!(matches!(err, OptimizerError::LineSearchFailed { iterations: 0, .. }));
        assert_eq!(f.counts(), (0, 0));
    }

    #[test]
    fn test_exhausted_backtracking() {
        // The claimed slope is far steeper than the true one, so no step passes.
        let f = sphere();
        let bounds = Bounds::unbounded(1);
        let x = DVector::from_vec(vec![1.0]);
        let target = DVector::zeros(1);
        let params = LineSearchParams::default().with_max_iterations(5);

        let mut ls = BacktrackingLineSearch::new();
        let err = ls
            .search_with_deriv(&f, &bounds, &x, 1.0, &target, -1e6, &params)
            .unwrap_err();
        assert!(matches!(err, OptimizerError::LineSearchFailed { iterations: 6, .. }));
    }

    #[test]
    fn test_full_step_lands_on_target_exactly() {
        let f = sphere();
        let bounds = Bounds::new(DVector::from_vec(vec![0.3]), DVector::from_vec(vec![2.0])).unwrap();
        let x = DVector::from_vec(vec![0.7]);
        let g = DVector::from_vec(vec![1.4]);
        let target = DVector::from_vec(vec![0.3]);

        let mut ls = BacktrackingLineSearch::new();
        let result = ls
            .search(&f, &bounds, &x, 0.49, &g, &target, &LineSearchParams::default())
            .unwrap();
        assert_eq!(result.step_size, 1.0);
        assert_eq!(result.new_point[0], 0.3);
    }

    #[test]
    fn test_trial_points_are_projected() {
        let f = sphere();
        let bounds = Bounds::new(DVector::from_vec(vec![0.5]), DVector::from_vec(vec![2.0])).unwrap();
        let x = DVector::from_vec(vec![1.0]);
        let g = DVector::from_vec(vec![2.0]);
        let target = DVector::from_vec(vec![0.5]);
        // Twice the segment overshoots the lower bound.
        let params = LineSearchParams::default().with_initial_step_size(2.0);

        let mut ls = BacktrackingLineSearch::new();
        let result = ls.search(&f, &bounds, &x, 1.0, &g, &target, &params).unwrap();
        assert_eq!(result.step_size, 2.0);
        assert_eq!(result.new_point[0], 0.5);
        assert!(bounds.contains(&result.new_point));
    }
}
