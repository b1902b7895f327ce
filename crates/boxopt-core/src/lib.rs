//! Core traits and types for bound-constrained optimization.
//!
//! This crate provides the building blocks shared by the solvers in
//! `boxopt-optim`: the scalar abstraction, box constraints, the objective
//! oracle interface, a backtracking line search, stopping rules, callbacks
//! and conditioning-checked dense linear algebra.
//!
//! # Key Concepts
//!
//! - **Box constraints**: elementwise bounds `l ≤ x ≤ u`, possibly infinite
//! - **Projected gradient**: `P(x − g) − x`, whose infinity norm measures
//!   first-order stationarity on the box
//! - **Oracle**: a deterministic objective and gradient pair
//!
//! # Modules
//!
//! - [`bounds`]: Box constraints and projection
//! - [`callback`]: Observer hooks for solver progress
//! - [`cost_function`]: Objective oracle interface
//! - [`error`]: Error types
//! - [`line_search`]: Armijo backtracking line search
//! - [`numerical`]: Conditioning-checked dense solves
//! - [`optimizer`]: Optimizer trait, stopping criteria, results
//! - [`types`]: Scalar trait and type aliases

pub mod bounds;
pub mod callback;
pub mod cost_function;
pub mod error;
pub mod line_search;
pub mod numerical;
pub mod optimizer;
pub mod types;

// Re-export commonly used items at the crate root
pub use error::{OptimizerError, Result};

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use boxopt_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::bounds::Bounds;
    pub use crate::callback::{
        CallbackInfo, IterateRecorder, LoggingCallback, NoOpCallback, OptimizationCallback,
    };
    pub use crate::cost_function::{
        CostFunction, CountingCostFunction, DerivativeChecker, FnCostFunction, QuadraticCost,
    };
    pub use crate::error::{OptimizerError, Result};
    pub use crate::line_search::{
        BacktrackingLineSearch, LineSearch, LineSearchParams, LineSearchResult,
    };
    pub use crate::optimizer::{OptimizationResult, Optimizer, StoppingCriterion, TerminationReason};
    pub use crate::types::{DMatrix, DVector, Scalar};
}
