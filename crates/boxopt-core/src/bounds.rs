//! Elementwise box constraints `l ≤ x ≤ u`.
//!
//! A [`Bounds`] value is validated once at construction (equal lengths,
//! `l_i ≤ u_i`, no NaN) and is immutable afterwards, so every consumer can rely
//! on the box being non-empty. Infinite bounds are allowed and mark a
//! coordinate as unbounded on that side.

use crate::{
    error::{OptimizerError, Result},
    types::{DVector, Scalar},
};
use num_traits::Float;

/// Elementwise lower and upper bounds of a box-constrained problem.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds<T: Scalar> {
    lower: DVector<T>,
    upper: DVector<T>,
}

impl<T: Scalar> Bounds<T> {
    /// Creates a box from lower and upper bound vectors.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` when the vectors differ in length and
    /// `InvalidBounds` when some `lower[i] > upper[i]` or a bound is NaN.
    pub fn new(lower: DVector<T>, upper: DVector<T>) -> Result<Self> {
        if lower.len() != upper.len() {
            return Err(OptimizerError::dimension_mismatch(lower.len(), upper.len()));
        }

        for (i, (&l, &u)) in lower.iter().zip(upper.iter()).enumerate() {
            if Float::is_nan(l) || Float::is_nan(u) || l > u {
                return Err(OptimizerError::invalid_bounds(i, Scalar::to_f64(l), Scalar::to_f64(u)));
            }
        }

        Ok(Self { lower, upper })
    }

    /// Creates an unbounded box of dimension `n`.
    pub fn unbounded(n: usize) -> Self {
        Self {
            lower: DVector::from_element(n, <T as Float>::neg_infinity()),
            upper: DVector::from_element(n, <T as Float>::infinity()),
        }
    }

    /// Problem dimension.
    pub fn dimension(&self) -> usize {
        self.lower.len()
    }

    /// Lower bound vector.
    pub fn lower(&self) -> &DVector<T> {
        &self.lower
    }

    /// Upper bound vector.
    pub fn upper(&self) -> &DVector<T> {
        &self.upper
    }

    /// Returns true if `x` has the right dimension and lies inside the box.
    pub fn contains(&self, x: &DVector<T>) -> bool {
        self.check_feasible(x).is_ok()
    }

    /// Checks that `x` has the problem dimension and satisfies `l ≤ x ≤ u`.
    ///
    /// NaN coordinates are reported as infeasible.
    pub fn check_feasible(&self, x: &DVector<T>) -> Result<()> {
        if x.len() != self.dimension() {
            return Err(OptimizerError::dimension_mismatch(self.dimension(), x.len()));
        }

        for i in 0..x.len() {
            let (xi, l, u) = (x[i], self.lower[i], self.upper[i]);
            if !(l <= xi && xi <= u) {
                return Err(OptimizerError::infeasible(
                    i,
                    Scalar::to_f64(xi),
                    Scalar::to_f64(l),
                    Scalar::to_f64(u),
                ));
            }
        }
        Ok(())
    }

    /// Clamps a single coordinate into `[l_i, u_i]`.
    #[inline]
    pub fn clamp(&self, i: usize, value: T) -> T {
        Float::min(Float::max(value, self.lower[i]), self.upper[i])
    }

    /// Projects `x` onto the box.
    pub fn project(&self, x: &DVector<T>) -> DVector<T> {
        DVector::from_iterator(x.len(), x.iter().enumerate().map(|(i, &v)| self.clamp(i, v)))
    }

    /// Projects `x` onto the box in place.
    pub fn project_mut(&self, x: &mut DVector<T>) {
        for i in 0..x.len() {
            x[i] = self.clamp(i, x[i]);
        }
    }

    /// Infinity norm of the projected gradient, `‖P(x − g) − x‖∞`.
    ///
    /// `P` clamps each coordinate of `x − g` into `[l_i, u_i]`. The value is
    /// zero exactly at first-order stationary points of the bounded problem.
    pub fn projected_gradient_norm(&self, x: &DVector<T>, gradient: &DVector<T>) -> T {
        x.iter()
            .zip(gradient.iter())
            .enumerate()
            .map(|(i, (&xi, &gi))| Float::abs(self.clamp(i, xi - gi) - xi))
            .fold(T::zero(), Float::max)
    }

    /// Returns true if coordinate `i` of `value` sits exactly on one of its bounds.
    #[inline]
    pub fn is_at_bound(&self, i: usize, value: T) -> bool {
        value == self.lower[i] || value == self.upper[i]
    }
}
