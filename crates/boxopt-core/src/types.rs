//! Type definitions and aliases for bound-constrained optimization.
//!
//! This module provides the scalar trait shared by every solver component,
//! the dense vector and matrix aliases, and precision-dependent constants.
//!
//! The `from_f64`, `to_f64` and `from_usize` helpers unwrap a `num_traits`
//! conversion. For `f32` and `f64`, the only implementors, float-to-float
//! and `usize`-to-float casts always succeed, so they never panic.

use nalgebra::{Dyn, OMatrix, OVector, RealField, Scalar as NalgebraScalar};
use num_traits::{Float, FromPrimitive};
use std::fmt::{Debug, Display};

/// Trait for scalar types used in optimization (f32 or f64).
///
/// This trait combines all the necessary numeric traits required by the
/// solver. Because both `RealField` and `Float` provide methods such as
/// `abs`, `max` or `sqrt`, generic code calls them through `Float::abs(x)`
/// and friends.
pub trait Scalar:
    NalgebraScalar
    + RealField
    + Float
    + FromPrimitive
    + Display
    + Debug
    + Default
    + Copy
    + Send
    + Sync
    + 'static
{
    /// Machine epsilon for this scalar type.
    const EPSILON: Self;

    /// Default tolerance on the projected-gradient infinity norm.
    const DEFAULT_GRADIENT_TOLERANCE: Self;

    /// Default tolerance on successive objective differences.
    const DEFAULT_FUNCTION_TOLERANCE: Self;

    /// Smallest step the backtracking line search will try.
    const MIN_STEP_SIZE: Self;

    /// Convert from f64 (for constants).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails, which cannot happen for `f32` or `f64`.
    fn from_f64(v: f64) -> Self {
        <Self as FromPrimitive>::from_f64(v).expect("Failed to convert from f64")
    }

    /// Convert to f64 (for logging/display).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails, which cannot happen for `f32` or `f64`.
    fn to_f64(self) -> f64 {
        num_traits::cast(self).expect("Failed to convert to f64")
    }

    /// Convert from usize (for dimension-scaled tolerances).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails, which cannot happen for `f32` or `f64`.
    fn from_usize(v: usize) -> Self {
        <Self as FromPrimitive>::from_usize(v).expect("Failed to convert from usize")
    }
}

impl Scalar for f32 {
    const EPSILON: Self = f32::EPSILON;
    const DEFAULT_GRADIENT_TOLERANCE: Self = 1e-4;
    const DEFAULT_FUNCTION_TOLERANCE: Self = 1e-8;
    const MIN_STEP_SIZE: Self = 1e-20;
}

impl Scalar for f64 {
    const EPSILON: Self = f64::EPSILON;
    const DEFAULT_GRADIENT_TOLERANCE: Self = 1e-4;
    const DEFAULT_FUNCTION_TOLERANCE: Self = 1e-8;
    const MIN_STEP_SIZE: Self = 1e-20;
}

/// Type alias for a dynamically-sized matrix.
pub type DMatrix<T> = OMatrix<T, Dyn, Dyn>;

/// Type alias for a dynamically-sized vector.
pub type DVector<T> = OVector<T, Dyn>;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_scalar_trait_f64() {
        assert_eq!(<f64 as Scalar>::EPSILON, f64::EPSILON);
        assert_eq!(f64::DEFAULT_GRADIENT_TOLERANCE, 1e-4);
        assert_eq!(f64::DEFAULT_FUNCTION_TOLERANCE, 1e-8);
        assert!(f64::MIN_STEP_SIZE > 0.0);
    }

    #[test]
    fn test_scalar_conversions() {
        let val_f64 = 3.14159;
        let val_f32 = <f32 as Scalar>::from_f64(val_f64);
        assert_relative_eq!(val_f32 as f64, val_f64, epsilon = 1e-6);

        let back_f64 = Scalar::to_f64(val_f32);
        assert_relative_eq!(back_f64, val_f32 as f64);
        assert_eq!(<f64 as Scalar>::from_usize(7), 7.0);
    }

    #[test]
    fn test_tolerance_ordering() {
        assert!(<f32 as Scalar>::EPSILON < f32::DEFAULT_GRADIENT_TOLERANCE);
        assert!(f64::DEFAULT_FUNCTION_TOLERANCE < f64::DEFAULT_GRADIENT_TOLERANCE);
        assert!(f64::MIN_STEP_SIZE < <f64 as Scalar>::EPSILON);
    }
}
