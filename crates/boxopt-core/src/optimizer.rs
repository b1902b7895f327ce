//! Solver-agnostic optimizer interface and result types.
//!
//! # Termination
//!
//! A solve ends for one of the reasons in [`TerminationReason`]:
//!
//! - **Converged**: the projected-gradient infinity norm fell below the
//!   gradient tolerance.
//! - **MaxIterations**: the iteration budget was exhausted. The last iterate
//!   is still a valid, feasible result.
//! - **Stalled**: successive objective values differ by less than the
//!   function tolerance.
//! - **LineSearchFailed**: no step with sufficient decrease could be found,
//!   even along the projected steepest-descent direction.
//! - **CallbackRequest**: an observer asked the solver to stop.
//!
//! Only `Converged` sets [`OptimizationResult::converged`].
//!
//! # Example
//!
//! ```rust
//! # use boxopt_core::prelude::*;
//! let criterion = StoppingCriterion::<f64>::new()
//!     .with_gradient_tolerance(1e-6)
//!     .with_max_iterations(500);
//! assert!(criterion.validate().is_ok());
//! assert!(criterion.is_gradient_converged(1e-7));
//! ```

use crate::{
    cost_function::CostFunction,
    error::{OptimizerError, Result},
    types::{DVector, Scalar},
};
use num_traits::Float;
use std::fmt::{self, Debug};
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Outcome of a solve.
#[derive(Debug, Clone)]
pub struct OptimizationResult<T: Scalar> {
    /// The final iterate, always inside the box
    pub point: DVector<T>,

    /// Objective value at the final iterate
    pub value: T,

    /// Projected-gradient infinity norm at the final iterate
    pub gradient_norm: T,

    /// Number of completed iterations
    pub iterations: usize,

    /// Total number of objective evaluations
    pub function_evaluations: usize,

    /// Total number of gradient evaluations
    pub gradient_evaluations: usize,

    /// Wall-clock time of the solve
    pub duration: Duration,

    /// Why the solver stopped
    pub termination_reason: TerminationReason,

    /// True only when `termination_reason` is `Converged`
    pub converged: bool,
}

impl<T: Scalar> OptimizationResult<T> {
    /// Creates a new optimization result.
    pub fn new(
        point: DVector<T>,
        value: T,
        gradient_norm: T,
        iterations: usize,
        duration: Duration,
        termination_reason: TerminationReason,
    ) -> Self {
        Self {
            point,
            value,
            gradient_norm,
            iterations,
            function_evaluations: 0,
            gradient_evaluations: 0,
            duration,
            termination_reason,
            converged: termination_reason == TerminationReason::Converged,
        }
    }

    /// Sets the function evaluation count.
    pub fn with_function_evaluations(mut self, count: usize) -> Self {
        self.function_evaluations = count;
        self
    }

    /// Sets the gradient evaluation count.
    pub fn with_gradient_evaluations(mut self, count: usize) -> Self {
        self.gradient_evaluations = count;
        self
    }
}

/// Reason a solve terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TerminationReason {
    /// Projected-gradient infinity norm below the gradient tolerance
    Converged,
    /// Iteration cap reached
    MaxIterations,
    /// Objective change below the function tolerance
    Stalled,
    /// Backtracking exhausted along the steepest-descent direction
    LineSearchFailed,
    /// An observer requested termination
    CallbackRequest,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Converged => "converged",
            Self::MaxIterations => "maximum iterations reached",
            Self::Stalled => "stalled",
            Self::LineSearchFailed => "line search failed",
            Self::CallbackRequest => "stopped by callback",
        };
        f.write_str(label)
    }
}

/// Stopping rules of a solve.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StoppingCriterion<T: Scalar> {
    /// Tolerance on `‖P(x − g) − x‖∞`
    pub gradient_tolerance: T,

    /// Tolerance on `|f_old − f|`
    pub function_tolerance: T,

    /// Hard iteration cap
    pub max_iterations: usize,
}

impl<T: Scalar> Default for StoppingCriterion<T> {
    fn default() -> Self {
        Self {
            gradient_tolerance: T::DEFAULT_GRADIENT_TOLERANCE,
            function_tolerance: T::DEFAULT_FUNCTION_TOLERANCE,
            max_iterations: 10_000,
        }
    }
}

impl<T: Scalar> StoppingCriterion<T> {
    /// Creates a stopping criterion with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    /// Sets the gradient tolerance.
    pub fn with_gradient_tolerance(mut self, tol: T) -> Self {
        self.gradient_tolerance = tol;
        self
    }

    /// Sets the function value change tolerance.
    pub fn with_function_tolerance(mut self, tol: T) -> Self {
        self.function_tolerance = tol;
        self
    }

    /// Checks that both tolerances are finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        let valid = |tol: T| Float::is_finite(tol) && tol >= T::zero();

        if !valid(self.gradient_tolerance) {
            return Err(OptimizerError::invalid_configuration(
                "Gradient tolerance must be finite and non-negative",
                "gradient_tolerance",
                self.gradient_tolerance.to_string(),
            ));
        }
        if !valid(self.function_tolerance) {
            return Err(OptimizerError::invalid_configuration(
                "Function tolerance must be finite and non-negative",
                "function_tolerance",
                self.function_tolerance.to_string(),
            ));
        }
        Ok(())
    }

    /// True when the projected-gradient norm is below the gradient tolerance.
    #[inline]
    pub fn is_gradient_converged(&self, projected_gradient_norm: T) -> bool {
        projected_gradient_norm < self.gradient_tolerance
    }

    /// True when two successive objective values differ by less than the
    /// function tolerance.
    #[inline]
    pub fn is_stalled(&self, previous_value: T, value: T) -> bool {
        Float::abs(previous_value - value) < self.function_tolerance
    }
}

/// Common interface of the solvers in this workspace.
///
/// A solver instance owns its bounds and configuration; `optimize` runs a
/// full solve from a copy of `initial_point`.
pub trait Optimizer<T: Scalar>: Debug {
    /// Returns a human-readable name identifying the optimization algorithm.
    fn name(&self) -> &str;

    /// Minimizes `cost_fn` starting from `initial_point`.
    ///
    /// # Errors
    ///
    /// Precondition violations (dimension, feasibility) and oracle failures.
    fn optimize<C>(
        &mut self,
        cost_fn: &C,
        initial_point: &DVector<T>,
    ) -> Result<OptimizationResult<T>>
    where
        C: CostFunction<T> + ?Sized;
}
