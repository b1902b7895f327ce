//! Error types for bound-constrained optimization.
//!
//! This module defines the error type used throughout the library for
//! precondition violations, oracle failures and numerical breakdowns.

use thiserror::Error;

/// Errors that can occur while setting up or running a solve.
#[derive(Debug, Clone, Error)]
pub enum OptimizerError {
    /// Dimension mismatch between vectors.
    ///
    /// Raised when the starting point, the bounds or a returned gradient do
    /// not share the problem dimension.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions
        expected: String,
        /// Actual dimensions
        actual: String,
    },

    /// Starting point lies outside the box.
    #[error("Starting point is infeasible at index {index}: {value} not in [{lower}, {upper}]")]
    Infeasible {
        /// First offending coordinate
        index: usize,
        /// Value of the coordinate
        value: f64,
        /// Lower bound of the coordinate
        lower: f64,
        /// Upper bound of the coordinate
        upper: f64,
    },

    /// Bounds do not describe a non-empty box.
    #[error("Invalid bounds at index {index}: lower {lower} exceeds upper {upper}")]
    InvalidBounds {
        /// First offending coordinate
        index: usize,
        /// Lower bound of the coordinate
        lower: f64,
        /// Upper bound of the coordinate
        upper: f64,
    },

    /// Invalid optimizer configuration.
    ///
    /// This error occurs when the optimizer is configured with invalid
    /// parameters (e.g., zero history size, negative tolerance).
    #[error("Invalid optimizer configuration: {reason}")]
    InvalidConfiguration {
        /// Description of the configuration error
        reason: String,
        /// Name of the invalid parameter
        parameter: String,
        /// Value that was invalid
        value: String,
    },

    /// A dense linear solve was singular or too ill-conditioned to trust.
    #[error("Numerical singularity: {reason}")]
    NumericSingularity {
        /// Description of the failing system
        reason: String,
    },

    /// The objective or gradient oracle failed.
    ///
    /// Covers explicit errors returned by the oracle as well as non-finite
    /// values and gradients of the wrong length.
    #[error("Oracle failure: {reason}")]
    OracleFailure {
        /// Description of the failure
        reason: String,
    },

    /// Line search failed to find an acceptable step.
    #[error("Line search failed: {reason}")]
    LineSearchFailed {
        /// Description of why the line search failed
        reason: String,
        /// Number of backtracking iterations attempted
        iterations: usize,
        /// Last step size tried
        last_step_size: f64,
    },
}

impl OptimizerError {
    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch<S1, S2>(expected: S1, actual: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: std::fmt::Display,
    {
        Self::DimensionMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create an Infeasible error for coordinate `index`.
    pub fn infeasible(index: usize, value: f64, lower: f64, upper: f64) -> Self {
        Self::Infeasible {
            index,
            value,
            lower,
            upper,
        }
    }

    /// Create an InvalidBounds error for coordinate `index`.
    pub fn invalid_bounds(index: usize, lower: f64, upper: f64) -> Self {
        Self::InvalidBounds {
            index,
            lower,
            upper,
        }
    }

    /// Create an InvalidConfiguration error.
    pub fn invalid_configuration<S1, S2, S3>(reason: S1, parameter: S2, value: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self::InvalidConfiguration {
            reason: reason.into(),
            parameter: parameter.into(),
            value: value.into(),
        }
    }

    /// Create a NumericSingularity error.
    pub fn numeric_singularity<S: Into<String>>(reason: S) -> Self {
        Self::NumericSingularity {
            reason: reason.into(),
        }
    }

    /// Create an OracleFailure error.
    pub fn oracle_failure<S: Into<String>>(reason: S) -> Self {
        Self::OracleFailure {
            reason: reason.into(),
        }
    }

    /// Create a LineSearchFailed error with detailed context.
    pub fn line_search_failed<S: Into<String>>(
        reason: S,
        iterations: usize,
        last_step_size: f64,
    ) -> Self {
        Self::LineSearchFailed {
            reason: reason.into(),
            iterations,
            last_step_size,
        }
    }
}

/// Result type alias for optimizer operations.
pub type Result<T> = std::result::Result<T, OptimizerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = OptimizerError::dimension_mismatch(3, 4);
        assert!(matches!(err, OptimizerError::DimensionMismatch { .. }));
        assert_eq!(err.to_string(), "Dimension mismatch: expected 3, got 4");

        let err = OptimizerError::infeasible(1, 2.0, 0.0, 1.0);
        assert!(matches!(err, OptimizerError::Infeasible { index: 1, .. }));
        assert_eq!(
            err.to_string(),
            "Starting point is infeasible at index 1: 2 not in [0, 1]"
        );
    }

    #[test]
    fn test_error_display() {
        let errors = vec![
            OptimizerError::invalid_bounds(0, 1.0, -1.0),
            OptimizerError::invalid_configuration("must be positive", "memory_size", "0"),
            OptimizerError::numeric_singularity("block matrix"),
            OptimizerError::oracle_failure("objective returned NaN"),
            OptimizerError::line_search_failed("ascent direction", 0, 1.0),
        ];

        for err in errors {
            assert!(!err.to_string().is_empty());
        }
    }

    #[test]
    fn test_line_search_failed_context() {
        let err = OptimizerError::line_search_failed("step underflow", 25, 1e-8);

        if let OptimizerError::LineSearchFailed {
            reason,
            iterations,
            last_step_size,
        } = err
        {
            assert_eq!(reason, "step underflow");
            assert_eq!(iterations, 25);
            assert_eq!(last_step_size, 1e-8);
        } else {
            panic!("Expected LineSearchFailed variant");
        }
    }
}
