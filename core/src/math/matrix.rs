use log::debug;
use nalgebra::{Cholesky, DMatrix, Schur, SymmetricEigen};
use ndarray::{Array2, ArrayView2};
use num_complex::Complex64;

use crate::prelude::{EngineError, EngineResult};

const EIGEN_MAX_ITERATIONS: usize = 10_000;

/// Smallest accepted ratio between the extreme eigenvalues of a matrix that
/// is about to be inverted.
const MIN_RECIPROCAL_CONDITION: f64 = 1e-12;

/// Linear-algebra helpers over complex `ndarray` matrices.
///
/// Decompositions are delegated to `nalgebra`; conversions happen here so the
/// rest of the crate only sees `ndarray` types.
pub struct MatrixHelper;

impl MatrixHelper {
    /// Conjugate transpose.
    pub fn adjoint(matrix: ArrayView2<Complex64>) -> Array2<Complex64> {
        matrix.t().mapv(|value| value.conj())
    }

    /// `(A + A^H) / 2`, removing the round-off asymmetry of a Hermitian product.
    pub fn hermitian_part(matrix: ArrayView2<Complex64>) -> Array2<Complex64> {
        let adjoint = Self::adjoint(matrix);
        (&matrix + &adjoint).mapv(|value| value * 0.5)
    }

    pub fn to_nalgebra(matrix: ArrayView2<Complex64>) -> DMatrix<Complex64> {
        let (rows, cols) = matrix.dim();
        DMatrix::from_fn(rows, cols, |row, col| matrix[[row, col]])
    }

    pub fn from_nalgebra(matrix: &DMatrix<Complex64>) -> Array2<Complex64> {
        Array2::from_shape_fn((matrix.nrows(), matrix.ncols()), |(row, col)| {
            matrix[(row, col)]
        })
    }

    /// Eigendecomposition of a Hermitian matrix.
    ///
    /// Returns the real eigenvalues in solver order and the matching unit
    /// eigenvectors as columns.
    pub fn hermitian_eigen(
        matrix: ArrayView2<Complex64>,
    ) -> EngineResult<(Vec<f64>, Array2<Complex64>)> {
        Self::require_square(matrix, "hermitian eigendecomposition")?;
        let decomposition = SymmetricEigen::try_new(
            Self::to_nalgebra(matrix),
            f64::EPSILON,
            EIGEN_MAX_ITERATIONS,
        )
        .ok_or_else(|| {
            EngineError::Numerical("hermitian eigensolver did not converge".into())
        })?;

        let eigenvalues = decomposition.eigenvalues.iter().copied().collect();
        let eigenvectors = Self::from_nalgebra(&decomposition.eigenvectors);
        Ok((eigenvalues, eigenvectors))
    }

    /// Eigenvalues of a general complex square matrix via its Schur form.
    pub fn eigenvalues(matrix: ArrayView2<Complex64>) -> EngineResult<Vec<Complex64>> {
        Self::require_square(matrix, "eigenvalue computation")?;
        let schur = Schur::try_new(
            Self::to_nalgebra(matrix),
            f64::EPSILON,
            EIGEN_MAX_ITERATIONS,
        )
        .ok_or_else(|| EngineError::Numerical("Schur decomposition did not converge".into()))?;

        schur
            .eigenvalues()
            .map(|values| values.iter().copied().collect())
            .ok_or_else(|| {
                EngineError::Numerical("Schur form is not triangular".into())
            })
    }

    /// Solves `A X = B` for Hermitian positive-definite `A`.
    ///
    /// Fails when `A` is singular or its condition number exceeds
    /// `1 / MIN_RECIPROCAL_CONDITION`.
    pub fn solve_hermitian(
        lhs: ArrayView2<Complex64>,
        rhs: ArrayView2<Complex64>,
    ) -> EngineResult<Array2<Complex64>> {
        Self::require_square(lhs, "hermitian solve")?;
        if rhs.nrows() != lhs.nrows() {
            return Err(EngineError::Validation(format!(
                "right-hand side has {} rows, expected {}",
                rhs.nrows(),
                lhs.nrows()
            )));
        }

        let (eigenvalues, _) = Self::hermitian_eigen(lhs)?;
        let largest = eigenvalues.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let smallest = eigenvalues
            .iter()
            .fold(f64::INFINITY, |acc, v| acc.min(v.abs()));
        if largest <= 0.0 || !largest.is_finite() {
            return Err(EngineError::Numerical("system matrix is singular".into()));
        }
        let reciprocal_condition = smallest / largest;
        debug!("hermitian solve reciprocal condition {:.3e}", reciprocal_condition);
        if reciprocal_condition < MIN_RECIPROCAL_CONDITION {
            return Err(EngineError::Numerical(format!(
                "system matrix is ill-conditioned (rcond {:.3e})",
                reciprocal_condition
            )));
        }

        let cholesky = Cholesky::new(Self::to_nalgebra(lhs)).ok_or_else(|| {
            EngineError::Numerical("system matrix is not positive definite".into())
        })?;
        let solution = cholesky.solve(&Self::to_nalgebra(rhs));
        Ok(Self::from_nalgebra(&solution))
    }

    fn require_square(matrix: ArrayView2<Complex64>, operation: &str) -> EngineResult<()> {
        let (rows, cols) = matrix.dim();
        if rows != cols || rows == 0 {
            return Err(EngineError::Validation(format!(
                "{} needs a non-empty square matrix, got {}x{}",
                operation, rows, cols
            )));
        }
        Ok(())
    }
}
