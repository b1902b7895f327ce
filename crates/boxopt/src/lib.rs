//! BoxOpt - bound-constrained limited-memory quasi-Newton optimization.
//!
//! This crate bundles [`boxopt_core`] (bounds, oracle trait, line search,
//! stopping rules, callbacks) and [`boxopt_optim`] (the L-BFGS-B solver)
//! behind a single dependency.
//!
//! ```rust
//! use boxopt::prelude::*;
//!
//! let a = DMatrix::from_row_slice(2, 2, &[3.0, 3.1, 3.1, 10.0]);
//! let cost = QuadraticCost::new(a, DVector::from_vec(vec![1.0, 3.0]))?;
//!
//! let lower = DVector::from_vec(vec![f64::NEG_INFINITY, 0.0]);
//! let upper = DVector::from_element(2, f64::INFINITY);
//! let mut solver = LBFGSB::new(lower, upper)?;
//!
//! let mut x = DVector::from_vec(vec![0.3, 0.3]);
//! let result = solver.solve(&mut x, &cost)?;
//! assert!(x[1] >= 0.0);
//! assert!(result.function_evaluations >= result.gradient_evaluations);
//! # Ok::<(), boxopt::OptimizerError>(())
//! ```

pub use boxopt_core;
pub use boxopt_optim;
pub use nalgebra;

pub use boxopt_core::{OptimizerError, Result};
pub use boxopt_optim::{LBFGSBConfig, LBFGSB};

/// Everything needed to set up and run a solve.
pub mod prelude {
    pub use boxopt_core::prelude::*;
    pub use boxopt_optim::{LBFGSBConfig, LBFGSB};
}
