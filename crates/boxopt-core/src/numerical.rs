//! Conditioning-checked dense linear algebra.
//!
//! The limited-memory matrices are small (at most `2m × 2m`) but can become
//! singular when correction pairs are nearly collinear. These helpers replace
//! bare inversion with an LU solve guarded by a reciprocal condition
//! estimate, and report failure as [`OptimizerError::NumericSingularity`]
//! instead of letting NaN or Inf leak into later iterations.

use crate::{
    error::{OptimizerError, Result},
    types::{DMatrix, DVector, Scalar},
};
use num_traits::Float;

const SVD_MAX_ITERATIONS: usize = 200;

/// Returns true if every entry of `matrix` is finite.
pub fn is_finite_matrix<T: Scalar>(matrix: &DMatrix<T>) -> bool {
    matrix.iter().all(|&v| Float::is_finite(v))
}

/// Returns true if every entry of `vector` is finite.
pub fn is_finite_vector<T: Scalar>(vector: &DVector<T>) -> bool {
    vector.iter().all(|&v| Float::is_finite(v))
}

/// Ratio of the smallest to the largest singular value of a square matrix.
///
/// Returns `None` when the matrix has non-finite entries or the SVD does not
/// converge. An empty matrix is perfectly conditioned and a zero matrix has a
/// reciprocal condition of zero.
pub fn reciprocal_condition<T: Scalar>(matrix: &DMatrix<T>) -> Option<T> {
    if matrix.is_empty() {
        return Some(T::one());
    }
    if !is_finite_matrix(matrix) {
        return None;
    }

    let svd = matrix
        .clone()
        .try_svd(false, false, T::EPSILON, SVD_MAX_ITERATIONS)?;
    let sigma_max = svd.singular_values.iter().copied().fold(T::zero(), Float::max);
    let sigma_min = svd
        .singular_values
        .iter()
        .copied()
        .fold(<T as Float>::infinity(), Float::min);

    if sigma_max <= T::zero() {
        Some(T::zero())
    } else {
        Some(sigma_min / sigma_max)
    }
}

/// Singularity threshold for an `n × n` system.
fn singularity_threshold<T: Scalar>(n: usize) -> T {
    T::EPSILON * <T as Scalar>::from_usize(n.max(1))
}

fn check_conditioning<T: Scalar>(matrix: &DMatrix<T>, what: &str) -> Result<()> {
    if matrix.nrows() != matrix.ncols() {
        return Err(OptimizerError::dimension_mismatch(
            format!("square {what}"),
            format!("{}x{}", matrix.nrows(), matrix.ncols()),
        ));
    }

    match reciprocal_condition(matrix) {
        Some(rcond) if rcond > singularity_threshold::<T>(matrix.nrows()) => Ok(()),
        Some(rcond) => Err(OptimizerError::numeric_singularity(format!(
            "{what} is ill-conditioned (reciprocal condition {:e})",
            Scalar::to_f64(rcond)
        ))),
        None => Err(OptimizerError::numeric_singularity(format!(
            "{what} has non-finite entries or its SVD did not converge"
        ))),
    }
}

/// Solves `matrix · x = rhs` after checking that `matrix` is well conditioned.
///
/// # Errors
///
/// `DimensionMismatch` for non-square or mismatched inputs,
/// `NumericSingularity` when the matrix is singular, ill-conditioned or
/// produces a non-finite solution.
pub fn checked_solve<T: Scalar>(matrix: &DMatrix<T>, rhs: &DVector<T>) -> Result<DVector<T>> {
    if matrix.nrows() != rhs.len() {
        return Err(OptimizerError::dimension_mismatch(matrix.nrows(), rhs.len()));
    }
    check_conditioning(matrix, "linear system")?;
    if matrix.is_empty() {
        return Ok(DVector::zeros(0));
    }

    let solution = matrix
        .clone()
        .lu()
        .solve(rhs)
        .ok_or_else(|| OptimizerError::numeric_singularity("LU solve failed"))?;

    if !is_finite_vector(&solution) {
        return Err(OptimizerError::numeric_singularity(
            "linear solve produced non-finite values",
        ));
    }
    Ok(solution)
}

/// Inverts `matrix` after checking that it is well conditioned.
///
/// # Errors
///
/// Same as [`checked_solve`].
pub fn checked_inverse<T: Scalar>(matrix: &DMatrix<T>) -> Result<DMatrix<T>> {
    check_conditioning(matrix, "matrix")?;
    if matrix.is_empty() {
        return Ok(DMatrix::zeros(0, 0));
    }

    let inverse = matrix
        .clone()
        .lu()
        .try_inverse()
        .ok_or_else(|| OptimizerError::numeric_singularity("LU inversion failed"))?;

    if !is_finite_matrix(&inverse) {
        return Err(OptimizerError::numeric_singularity(
            "matrix inverse has non-finite values",
        ));
    }
    Ok(inverse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reciprocal_condition() {
        let identity = DMatrix::<f64>::identity(3, 3);
        assert_relative_eq!(reciprocal_condition(&identity).unwrap(), 1.0, epsilon = 1e-12);

        let diag = DMatrix::from_diagonal(&DVector::from_vec(vec![4.0, 1.0]));
        assert_relative_eq!(reciprocal_condition(&diag).unwrap(), 0.25, epsilon = 1e-12);

        let zero = DMatrix::<f64>::zeros(2, 2);
        assert_eq!(reciprocal_condition(&zero), Some(0.0));

        let nan = DMatrix::from_element(2, 2, f64::NAN);
        assert!(reciprocal_condition(&nan).is_none());
    }

    #[test]
    fn test_checked_solve() {
        let a = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let b = DVector::from_vec(vec![1.0, 2.0]);
        let x = checked_solve(&a, &b).unwrap();
        assert_relative_eq!(&a * &x, b, epsilon = 1e-12);
    }

    #[test]
    fn test_checked_solve_rejects_singular() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let b = DVector::from_vec(vec![1.0, 2.0]);
        assert!(matches!(
            checked_solve(&a, &b),
            Err(OptimizerError::NumericSingularity { .. })
        ));

        let b = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            checked_solve(&a, &b),
            Err(OptimizerError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_checked_inverse() {
        let a = DMatrix::from_row_slice(2, 2, &[2.0, -1.0, -1.0, 2.0]);
        let inv = checked_inverse(&a).unwrap();
        assert_relative_eq!(&a * &inv, DMatrix::identity(2, 2), epsilon = 1e-12);

        let singular = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        assert!(checked_inverse(&singular).is_err());
    }

    #[test]
    fn test_empty_systems() {
        let empty = DMatrix::<f64>::zeros(0, 0);
        assert_eq!(checked_inverse(&empty).unwrap().nrows(), 0);
        assert_eq!(checked_solve(&empty, &DVector::zeros(0)).unwrap().len(), 0);
    }
}
