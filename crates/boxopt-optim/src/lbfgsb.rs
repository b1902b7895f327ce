//! L-BFGS-B: limited-memory BFGS with simple bounds.
//!
//! Each iteration of the solver
//!
//! 1. stops if the projected-gradient infinity norm `‖P(x − g) − x‖∞` is
//!    below the gradient tolerance, or the iteration cap is reached;
//! 2. computes the generalized Cauchy point of the quadratic model, which
//!    fixes the active set;
//! 3. minimizes the model over the free variables and truncates the step to
//!    stay feasible;
//! 4. runs an Armijo backtracking line search from `x` toward that point;
//! 5. offers the correction pair `(s, y)` to the limited memory, which keeps
//!    it only if it passes the curvature test;
//! 6. stops as stalled if the objective changed by less than the function
//!    tolerance.
//!
//! Every iterate is feasible. Numerical breakdowns are recovered locally: a
//! singular compact matrix resets the memory to the identity, a singular
//! subspace system falls back to the Cauchy point, and a failed line search
//! with a non-empty memory discards the memory and retries the iteration
//! along the projected steepest-descent path. Only oracle failures abort a
//! solve.
//!
//! # Example
//!
//! ```rust
//! use boxopt_core::prelude::*;
//! use boxopt_optim::LBFGSB;
//!
//! // minimize (x0 - 2)² + (x1 + 1)² over [0, 1] × [0, 1]
//! let cost = FnCostFunction::new(
//!     |x: &DVector<f64>| (x[0] - 2.0).powi(2) + (x[1] + 1.0).powi(2),
//!     |x: &DVector<f64>| DVector::from_vec(vec![2.0 * (x[0] - 2.0), 2.0 * (x[1] + 1.0)]),
//! );
//! let mut solver = LBFGSB::new(DVector::zeros(2), DVector::from_element(2, 1.0))?;
//! let mut x = DVector::from_vec(vec![0.5, 0.5]);
//! let result = solver.solve(&mut x, &cost)?;
//!
//! assert!(result.converged);
//! assert_eq!(x, DVector::from_vec(vec![1.0, 0.0]));
//! # Ok::<(), boxopt_core::OptimizerError>(())
//! ```

use crate::{
    cauchy::generalized_cauchy_point,
    compact::{LimitedMemory, UpdateOutcome},
    subspace,
};
use boxopt_core::{
    bounds::Bounds,
    callback::{CallbackInfo, NoOpCallback, OptimizationCallback},
    cost_function::{checked_cost, checked_gradient, CostFunction},
    error::{OptimizerError, Result},
    line_search::{BacktrackingLineSearch, LineSearch, LineSearchParams},
    optimizer::{OptimizationResult, Optimizer, StoppingCriterion, TerminationReason},
    types::{DVector, Scalar},
};
use std::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the L-BFGS-B solver.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LBFGSBConfig<T: Scalar> {
    /// Number of correction pairs kept (m)
    pub memory_size: usize,
    /// Tolerances and iteration cap
    pub stopping: StoppingCriterion<T>,
    /// Backtracking line search constants
    pub line_search: LineSearchParams<T>,
}

impl<T: Scalar> Default for LBFGSBConfig<T> {
    fn default() -> Self {
        Self {
            memory_size: 10,
            stopping: StoppingCriterion::default(),
            line_search: LineSearchParams::default(),
        }
    }
}

impl<T: Scalar> LBFGSBConfig<T> {
    /// Creates a new configuration with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the memory size (number of correction pairs to store).
    pub fn with_memory_size(mut self, size: usize) -> Self {
        self.memory_size = size;
        self
    }

    /// Sets the projected-gradient tolerance.
    pub fn with_gradient_tolerance(mut self, tol: T) -> Self {
        self.stopping.gradient_tolerance = tol;
        self
    }

    /// Sets the objective-change tolerance.
    pub fn with_function_tolerance(mut self, tol: T) -> Self {
        self.stopping.function_tolerance = tol;
        self
    }

    /// Sets the iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.stopping.max_iterations = max_iterations;
        self
    }

    /// Replaces the line search parameters.
    pub fn with_line_search(mut self, params: LineSearchParams<T>) -> Self {
        self.line_search = params;
        self
    }

    /// Checks every parameter.
    pub fn validate(&self) -> Result<()> {
        if self.memory_size == 0 {
            return Err(OptimizerError::invalid_configuration(
                "Memory size must be at least 1",
                "memory_size",
                "0",
            ));
        }
        self.stopping.validate()?;
        self.line_search.validate()
    }
}

/// Bound-constrained L-BFGS-B solver.
///
/// The solver owns its box and configuration. The correction history lives
/// in the solver too but is cleared at the start of every solve, so no state
/// leaks from one solve to the next.
#[derive(Debug, Clone)]
pub struct LBFGSB<T: Scalar> {
    bounds: Bounds<T>,
    config: LBFGSBConfig<T>,
    memory: LimitedMemory<T>,
    line_search: BacktrackingLineSearch,
    solution: Option<DVector<T>>,
}

impl<T: Scalar> LBFGSB<T> {
    /// Creates a solver for the box `[lower, upper]` with default configuration.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if the vectors differ in length, `InvalidBounds` if
    /// some `lower[i] > upper[i]`.
    pub fn new(lower: DVector<T>, upper: DVector<T>) -> Result<Self> {
        Self::with_config(lower, upper, LBFGSBConfig::default())
    }

    /// Creates a solver for the box `[lower, upper]` with the given configuration.
    pub fn with_config(lower: DVector<T>, upper: DVector<T>, config: LBFGSBConfig<T>) -> Result<Self> {
        Self::from_bounds(Bounds::new(lower, upper)?, config)
    }

    /// Creates a solver from an already validated box.
    pub fn from_bounds(bounds: Bounds<T>, config: LBFGSBConfig<T>) -> Result<Self> {
        config.validate()?;
        let memory = LimitedMemory::new(bounds.dimension(), config.memory_size);
        Ok(Self {
            bounds,
            config,
            memory,
            line_search: BacktrackingLineSearch::new(),
            solution: None,
        })
    }

    /// The box constraints.
    pub fn bounds(&self) -> &Bounds<T> {
        &self.bounds
    }

    /// The solver configuration.
    pub fn config(&self) -> &LBFGSBConfig<T> {
        &self.config
    }

    /// The limited memory as left by the last solve.
    pub fn memory(&self) -> &LimitedMemory<T> {
        &self.memory
    }

    /// Final iterate of the last solve, if any.
    pub fn solution(&self) -> Option<&DVector<T>> {
        self.solution.as_ref()
    }

    /// Minimizes `cost_fn` from `x0`, overwriting `x0` with the final iterate.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` or `Infeasible` if `x0` does not fit the box (checked
    /// before any evaluation, `x0` untouched), `OracleFailure` if the objective
    /// or gradient fails.
    pub fn solve<C>(&mut self, x0: &mut DVector<T>, cost_fn: &C) -> Result<OptimizationResult<T>>
    where
        C: CostFunction<T> + ?Sized,
    {
        self.solve_with_callback(x0, cost_fn, &mut NoOpCallback)
    }

    /// Like [`LBFGSB::solve`], reporting progress to `callback`.
    pub fn solve_with_callback<C, CB>(
        &mut self,
        x0: &mut DVector<T>,
        cost_fn: &C,
        callback: &mut CB,
    ) -> Result<OptimizationResult<T>>
    where
        C: CostFunction<T> + ?Sized,
        CB: OptimizationCallback<T> + ?Sized,
    {
        let start = Instant::now();
        self.bounds.check_feasible(x0)?;
        self.memory.reset();
        self.solution = None;

        let stopping = self.config.stopping.clone();
        let mut x = x0.clone();
        let mut f = checked_cost(cost_fn, &x)?;
        let mut g = checked_gradient(cost_fn, &x)?;
        let mut function_evaluations = 1;
        let mut gradient_evaluations = 1;

        let mut pg_norm = self.bounds.projected_gradient_norm(&x, &g);
        let mut iteration = 0;
        let mut step_size = T::zero();
        let mut free_count = x.len();

        callback.on_optimization_start(&snapshot(
            iteration, &x, f, &g, pg_norm, step_size, free_count, start.elapsed(),
        ))?;

        let reason = loop {
            if stopping.is_gradient_converged(pg_norm) {
                break TerminationReason::Converged;
            }
            if iteration >= stopping.max_iterations {
                break TerminationReason::MaxIterations;
            }

            let representation = self.memory.representation();
            let cauchy = generalized_cauchy_point(&x, &g, &self.bounds, representation);
            let step = subspace::minimize(&x, &g, &self.bounds, representation, &cauchy);
            free_count = step.free_variables.len();

            let accepted = match self.line_search.search(
                cost_fn,
                &self.bounds,
                &x,
                f,
                &g,
                &step.point,
                &self.config.line_search,
            ) {
                Ok(accepted) => accepted,
                Err(OptimizerError::LineSearchFailed { iterations, reason, .. }) => {
                    function_evaluations += iterations;
                    if self.memory.is_empty() {
                        log::warn!("line search failed along the projected gradient: {reason}");
                        break TerminationReason::LineSearchFailed;
                    }
                    log::warn!("line search failed ({reason}); discarding {} correction pairs", self.memory.len());
                    self.memory.reset();
                    continue;
                }
                Err(err) => return Err(err),
            };

            function_evaluations += accepted.function_evals;
            gradient_evaluations += accepted.gradient_evals;

            let s = &accepted.new_point - &x;
            let y = &accepted.new_gradient - &g;
            let previous_value = f;
            x = accepted.new_point;
            f = accepted.new_value;
            g = accepted.new_gradient;
            step_size = accepted.step_size;
            iteration += 1;

            let outcome = self.memory.update(s, y);
            pg_norm = self.bounds.projected_gradient_norm(&x, &g);

            log::debug!(
                "iteration {iteration}: f = {:e}, |pg|_inf = {:e}, free = {free_count}, step = {:e}, memory = {} ({outcome:?})",
                Scalar::to_f64(f),
                Scalar::to_f64(pg_norm),
                Scalar::to_f64(step_size),
                self.memory.len(),
            );
            if outcome == UpdateOutcome::Reset {
                log::warn!("iteration {iteration}: limited memory reset after singular update");
            }

            let keep_going = callback.on_iteration_end(&snapshot(
                iteration, &x, f, &g, pg_norm, step_size, free_count, start.elapsed(),
            ))?;
            if !keep_going {
                break TerminationReason::CallbackRequest;
            }

            if stopping.is_stalled(previous_value, f) {
                break if stopping.is_gradient_converged(pg_norm) {
                    TerminationReason::Converged
                } else {
                    TerminationReason::Stalled
                };
            }
        };

        let duration = start.elapsed();
        x0.copy_from(&x);

        let mut final_info = snapshot(iteration, &x, f, &g, pg_norm, step_size, free_count, duration);
        final_info.converged = reason == TerminationReason::Converged;
        callback.on_optimization_end(&final_info)?;

        log::info!(
            "L-BFGS-B {reason} after {iteration} iterations ({function_evaluations} f-evals, {gradient_evaluations} g-evals): f = {:e}, |pg|_inf = {:e}",
            Scalar::to_f64(f),
            Scalar::to_f64(pg_norm),
        );

        self.solution = Some(x.clone());

        Ok(OptimizationResult::new(x, f, pg_norm, iteration, duration, reason)
            .with_function_evaluations(function_evaluations)
            .with_gradient_evaluations(gradient_evaluations))
    }
}

#[allow(clippy::too_many_arguments)]
fn snapshot<'a, T: Scalar>(
    iteration: usize,
    point: &'a DVector<T>,
    value: T,
    gradient: &'a DVector<T>,
    gradient_norm: T,
    step_size: T,
    free_variables: usize,
    elapsed: Duration,
) -> CallbackInfo<'a, T> {
    CallbackInfo {
        iteration,
        point,
        value,
        gradient,
        gradient_norm,
        step_size,
        free_variables,
        elapsed,
        converged: false,
    }
}

impl<T: Scalar> Optimizer<T> for LBFGSB<T> {
    fn name(&self) -> &str {
        "L-BFGS-B"
    }

    fn optimize<C>(&mut self, cost_fn: &C, initial_point: &DVector<T>) -> Result<OptimizationResult<T>>
    where
        C: CostFunction<T> + ?Sized,
    {
        let mut x = initial_point.clone();
        self.solve(&mut x, cost_fn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxopt_core::cost_function::{CountingCostFunction, FnCostFunction, QuadraticCost};
    use boxopt_core::types::DMatrix;

    fn v(values: &[f64]) -> DVector<f64> {
        DVector::from_column_slice(values)
    }

    fn sphere() -> impl CostFunction<f64> {
        FnCostFunction::new(
            |x: &DVector<f64>| x.norm_squared(),
            |x: &DVector<f64>| x * 2.0,
        )
    }

    #[test]
    fn test_lbfgsb_config() {
        let config = LBFGSBConfig::<f64>::new()
            .with_memory_size(5)
            .with_gradient_tolerance(1e-6)
            .with_function_tolerance(1e-12)
            .with_max_iterations(50);

        assert_eq!(config.memory_size, 5);
        assert_eq!(config.stopping.gradient_tolerance, 1e-6);
        assert_eq!(config.stopping.function_tolerance, 1e-12);
        assert_eq!(config.stopping.max_iterations, 50);
        assert!(config.validate().is_ok());

        let defaults = LBFGSBConfig::<f64>::default();
        assert_eq!(defaults.memory_size, 10);
        assert_eq!(defaults.stopping.max_iterations, 10_000);
    }

    #[test]
    fn test_invalid_configuration_is_rejected() {
        let config = LBFGSBConfig::<f64>::new().with_memory_size(0);
        let err = LBFGSB::with_config(v(&[0.0]), v(&[1.0]), config).unwrap_err();
        assert!(matches!(err, OptimizerError::InvalidConfiguration { .. }));

        let config = LBFGSBConfig::<f64>::new().with_gradient_tolerance(-1.0);
        assert!(LBFGSB::with_config(v(&[0.0]), v(&[1.0]), config).is_err());
    }

    #[test]
    fn test_invalid_bounds_are_rejected() {
        assert!(matches!(
            LBFGSB::<f64>::new(v(&[0.0, 0.0]), v(&[1.0])),
            Err(OptimizerError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            LBFGSB::<f64>::new(v(&[2.0]), v(&[1.0])),
            Err(OptimizerError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn test_dimension_mismatch_before_evaluation() {
        let cost = CountingCostFunction::new(sphere());
        let mut solver = LBFGSB::new(v(&[-1.0, -1.0]), v(&[1.0, 1.0])).unwrap();
        let mut x = v(&[0.0, 0.0, 0.0]);

        let err = solver.solve(&mut x, &cost).unwrap_err();
        assert!(matches!(err, OptimizerError::DimensionMismatch { .. }));
        assert_eq!(cost.counts(), (0, 0));
        assert!(solver.solution().is_none());
    }

    #[test]
    fn test_infeasible_start_before_evaluation() {
        let cost = CountingCostFunction::new(sphere());
        let mut solver = LBFGSB::new(v(&[-1.0, 0.0]), v(&[1.0, 1.0])).unwrap();
        let mut x = v(&[0.5, -0.1]);

        let err = solver.solve(&mut x, &cost).unwrap_err();
        assert!(matches!(err, OptimizerError::Infeasible { index: 1, .. }));
        assert_eq!(cost.counts(), (0, 0));
        assert_eq!(x, v(&[0.5, -0.1]));
    }

    #[test]
    fn test_zero_gradient_short_circuit() {
        let cost = CountingCostFunction::new(sphere());
        let mut solver = LBFGSB::new(v(&[-1.0, -1.0]), v(&[1.0, 1.0])).unwrap();
        let mut x = v(&[0.0, 0.0]);

        let result = solver.solve(&mut x, &cost).unwrap();
        assert_eq!(result.termination_reason, TerminationReason::Converged);
        assert!(result.converged);
        assert_eq!(result.iterations, 0);
        assert_eq!(x, v(&[0.0, 0.0]));
        assert_eq!(cost.counts(), (1, 1));
        assert_eq!(solver.solution(), Some(&x));
    }

    #[test]
    fn test_solver_memory_stays_within_capacity() {
        let a = DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.0, 1.0, 3.0, 0.5, 0.0, 0.5, 2.0]);
        let cost = QuadraticCost::new(a, v(&[1.0, -2.0, 0.5])).unwrap();
        let config = LBFGSBConfig::new().with_memory_size(2).with_gradient_tolerance(1e-10);
        let mut solver = LBFGSB::with_config(
            DVector::from_element(3, -10.0),
            DVector::from_element(3, 10.0),
            config,
        )
        .unwrap();
        let mut x = v(&[5.0, 5.0, 5.0]);

        solver.solve(&mut x, &cost).unwrap();
        assert!(solver.memory().len() <= 2);
        assert!(solver.bounds().contains(&x));
    }

    #[test]
    fn test_optimizer_trait_leaves_input_untouched() {
        let mut solver = LBFGSB::new(v(&[0.5, -1.0]), v(&[2.0, 1.0])).unwrap();
        let x0 = v(&[1.0, 1.0]);
        let result = solver.optimize(&sphere(), &x0).unwrap();

        assert_eq!(solver.name(), "L-BFGS-B");
        assert_eq!(x0, v(&[1.0, 1.0]));
        assert!(result.converged);
        assert_eq!(result.point[0], 0.5);
        assert!(result.point[1].abs() < 1e-4);
    }
}
