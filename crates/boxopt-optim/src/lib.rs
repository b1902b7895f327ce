//! BoxOpt Optimization - the L-BFGS-B solver for bound-constrained problems.
//!
//! This crate implements the limited-memory quasi-Newton method of Byrd, Lu,
//! Nocedal and Zhu for
//!
//! ```text
//! minimize f(x)   subject to   l ≤ x ≤ u
//! ```
//!
//! where each bound may be infinite. The building blocks are exposed as
//! separate modules:
//!
//! - [`compact`]: correction history and the compact form `B = θI − WMWᵀ`
//! - [`cauchy`]: generalized Cauchy point along the projected gradient path
//! - [`subspace`]: minimization of the model over the free variables
//! - [`lbfgsb`]: the driver loop with line search and termination tests
//!
//! # Examples
//!
//! ```rust
//! use boxopt_core::prelude::*;
//! use boxopt_optim::{LBFGSB, LBFGSBConfig};
//!
//! let cost = FnCostFunction::new(
//!     |x: &DVector<f64>| x.iter().map(|v| (v - 3.0).powi(2)).sum::<f64>(),
//!     |x: &DVector<f64>| x.map(|v| 2.0 * (v - 3.0)),
//! );
//!
//! let config = LBFGSBConfig::new()
//!     .with_memory_size(5)
//!     .with_gradient_tolerance(1e-8);
//! let mut solver = LBFGSB::with_config(
//!     DVector::from_element(3, -1.0),
//!     DVector::from_element(3, 2.0),
//!     config,
//! )?;
//!
//! let mut x = DVector::zeros(3);
//! let result = solver.solve(&mut x, &cost)?;
//! assert_eq!(result.termination_reason, TerminationReason::Converged);
//! assert_eq!(x, DVector::from_element(3, 2.0));
//! # Ok::<(), boxopt_core::OptimizerError>(())
//! ```

pub mod cauchy;
pub mod compact;
pub mod lbfgsb;
pub mod subspace;

// Re-export the solver and its building blocks
pub use cauchy::{generalized_cauchy_point, CauchyPoint};
pub use compact::{CompactRepresentation, CorrectionHistory, LimitedMemory, UpdateOutcome};
pub use lbfgsb::{LBFGSBConfig, LBFGSB};
pub use subspace::SubspaceStep;
