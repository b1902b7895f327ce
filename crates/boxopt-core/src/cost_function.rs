//! Objective oracle interface.
//!
//! The solver only ever sees the objective through the [`CostFunction`] trait:
//! a value oracle and a gradient oracle bundled as one value. Implementations
//! must be deterministic and free of side effects visible to the solver,
//! because the line search re-evaluates the objective at trial points and
//! assumes identical inputs yield identical outputs.
//!
//! The [`checked_cost`] and [`checked_gradient`] helpers wrap the raw oracle
//! calls and turn non-finite values or wrongly-sized gradients into
//! [`OptimizerError::OracleFailure`].

use crate::{
    error::{OptimizerError, Result},
    types::{DMatrix, DVector, Scalar},
};
use num_traits::Float;
use std::cell::Cell;
use std::fmt::{self, Debug};

/// Trait for objective functions over `ℝⁿ`.
///
/// This is the main trait that optimization algorithms use to evaluate
/// the objective function and its derivatives.
pub trait CostFunction<T: Scalar>: Debug {
    /// Evaluates the objective at `x`.
    fn cost(&self, x: &DVector<T>) -> Result<T>;

    /// Evaluates the gradient at `x`.
    ///
    /// # Default Implementation
    ///
    /// Uses central finite differences. Override whenever an analytic
    /// gradient is available.
    fn gradient(&self, x: &DVector<T>) -> Result<DVector<T>> {
        self.gradient_fd(x)
    }

    /// Evaluates the objective and its gradient at `x`.
    ///
    /// # Default Implementation
    ///
    /// Calls `cost` then `gradient`.
    fn cost_and_gradient(&self, x: &DVector<T>) -> Result<(T, DVector<T>)> {
        let cost = self.cost(x)?;
        let gradient = self.gradient(x)?;
        Ok((cost, gradient))
    }

    /// Approximates the gradient with central differences.
    ///
    /// The step for coordinate `i` is `sqrt(eps) * max(1, |x_i|)`.
    fn gradient_fd(&self, x: &DVector<T>) -> Result<DVector<T>> {
        let n = x.len();
        let sqrt_eps = <T as Float>::sqrt(T::EPSILON);
        let two = T::one() + T::one();
        let mut gradient = DVector::zeros(n);
        let mut probe = x.clone();

        for i in 0..n {
            let h = sqrt_eps * Float::max(T::one(), Float::abs(x[i]));

            probe[i] = x[i] + h;
            let f_plus = self.cost(&probe)?;
            probe[i] = x[i] - h;
            let f_minus = self.cost(&probe)?;
            probe[i] = x[i];

            gradient[i] = (f_plus - f_minus) / (two * h);
        }

        Ok(gradient)
    }
}

/// Evaluates the objective and rejects non-finite values.
pub fn checked_cost<T, C>(cost_fn: &C, x: &DVector<T>) -> Result<T>
where
    T: Scalar,
    C: CostFunction<T> + ?Sized,
{
    let value = cost_fn.cost(x)?;
    if !Float::is_finite(value) {
        return Err(OptimizerError::oracle_failure(format!(
            "objective returned non-finite value {value}"
        )));
    }
    Ok(value)
}

/// Evaluates the gradient and rejects wrong lengths or non-finite entries.
pub fn checked_gradient<T, C>(cost_fn: &C, x: &DVector<T>) -> Result<DVector<T>>
where
    T: Scalar,
    C: CostFunction<T> + ?Sized,
{
    let gradient = cost_fn.gradient(x)?;
    if gradient.len() != x.len() {
        return Err(OptimizerError::oracle_failure(format!(
            "gradient has length {}, expected {}",
            gradient.len(),
            x.len()
        )));
    }
    if let Some(i) = gradient.iter().position(|&g| !Float::is_finite(g)) {
        return Err(OptimizerError::oracle_failure(format!(
            "gradient component {i} is non-finite"
        )));
    }
    Ok(gradient)
}

/// Adapter turning a pair of closures into a [`CostFunction`].
///
/// # Example
///
/// ```rust
/// use boxopt_core::prelude::*;
///
/// let sphere = FnCostFunction::new(
///     |x: &DVector<f64>| x.norm_squared(),
///     |x: &DVector<f64>| x * 2.0,
/// );
/// let x = DVector::from_vec(vec![1.0, 2.0]);
/// assert_eq!(sphere.cost(&x).unwrap(), 5.0);
/// ```
pub struct FnCostFunction<F, G> {
    cost: F,
    gradient: G,
}

impl<F, G> FnCostFunction<F, G> {
    /// Wraps an objective closure and a gradient closure.
    pub fn new(cost: F, gradient: G) -> Self {
        Self { cost, gradient }
    }
}

impl<F, G> Debug for FnCostFunction<F, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCostFunction").finish_non_exhaustive()
    }
}

impl<T, F, G> CostFunction<T> for FnCostFunction<F, G>
where
    T: Scalar,
    F: Fn(&DVector<T>) -> T,
    G: Fn(&DVector<T>) -> DVector<T>,
{
    fn cost(&self, x: &DVector<T>) -> Result<T> {
        Ok((self.cost)(x))
    }

    fn gradient(&self, x: &DVector<T>) -> Result<DVector<T>> {
        Ok((self.gradient)(x))
    }
}

/// Quadratic objective `f(x) = xᵀAx + bᵀx`.
///
/// The gradient is `(A + Aᵀ)x + b`, so the unconstrained minimizer of a
/// symmetric positive definite `A` is `-½ A⁻¹ b`.
#[derive(Debug, Clone)]
pub struct QuadraticCost<T: Scalar> {
    /// Quadratic term
    pub a: DMatrix<T>,
    /// Linear term
    pub b: DVector<T>,
}

impl<T: Scalar> QuadraticCost<T> {
    /// Creates a quadratic objective.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if `a` is not square or does not match `b`.
    pub fn new(a: DMatrix<T>, b: DVector<T>) -> Result<Self> {
        if a.nrows() != a.ncols() || a.nrows() != b.len() {
            return Err(OptimizerError::dimension_mismatch(
                format!("{n}x{n} matrix", n = b.len()),
                format!("{}x{} matrix", a.nrows(), a.ncols()),
            ));
        }
        Ok(Self { a, b })
    }

    /// Problem dimension.
    pub fn dimension(&self) -> usize {
        self.b.len()
    }
}

impl<T: Scalar> CostFunction<T> for QuadraticCost<T> {
    fn cost(&self, x: &DVector<T>) -> Result<T> {
        let ax = &self.a * x;
        Ok(x.dot(&ax) + self.b.dot(x))
    }

    fn gradient(&self, x: &DVector<T>) -> Result<DVector<T>> {
        Ok(&self.a * x + self.a.tr_mul(x) + &self.b)
    }
}

/// Wrapper counting oracle calls, used to audit evaluation budgets.
#[derive(Debug)]
pub struct CountingCostFunction<C> {
    inner: C,
    cost_count: Cell<usize>,
    gradient_count: Cell<usize>,
}

impl<C> CountingCostFunction<C> {
    /// Wraps `inner` with zeroed counters.
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            cost_count: Cell::new(0),
            gradient_count: Cell::new(0),
        }
    }

    /// Returns `(cost_calls, gradient_calls)`.
    pub fn counts(&self) -> (usize, usize) {
        (self.cost_count.get(), self.gradient_count.get())
    }

    /// Resets both counters to zero.
    pub fn reset_counts(&self) {
        self.cost_count.set(0);
        self.gradient_count.set(0);
    }
}

impl<T: Scalar, C: CostFunction<T>> CostFunction<T> for CountingCostFunction<C> {
    fn cost(&self, x: &DVector<T>) -> Result<T> {
        self.cost_count.set(self.cost_count.get() + 1);
        self.inner.cost(x)
    }

    fn gradient(&self, x: &DVector<T>) -> Result<DVector<T>> {
        self.gradient_count.set(self.gradient_count.get() + 1);
        self.inner.gradient(x)
    }
}

/// Compares analytic gradients against finite differences.
pub struct DerivativeChecker;

impl DerivativeChecker {
    /// Returns whether the largest componentwise error is below `tol`,
    /// together with that error.
    pub fn check_gradient<T, C>(cost_fn: &C, x: &DVector<T>, tol: T) -> Result<(bool, T)>
    where
        T: Scalar,
        C: CostFunction<T>,
    {
        let analytic = cost_fn.gradient(x)?;
        let numeric = cost_fn.gradient_fd(x)?;
        if analytic.len() != numeric.len() {
            return Err(OptimizerError::dimension_mismatch(numeric.len(), analytic.len()));
        }

        let max_error = analytic
            .iter()
            .zip(numeric.iter())
            .map(|(&a, &b)| Float::abs(a - b))
            .fold(T::zero(), Float::max);

        Ok((max_error < tol, max_error))
    }
}
