use log::{debug, warn};
use ndarray::{Array2, ArrayView2, Axis};
use num_complex::Complex64;

use crate::math::matrix::MatrixHelper;
use crate::prelude::{EngineError, EngineResult};

/// Negative eigenvalues smaller than this fraction of the largest magnitude
/// are treated as round-off and clamped to zero.
const NEGATIVE_EIGENVALUE_TOLERANCE: f64 = 1e-9;

/// Spatial covariance `(1/N) X X^H` of an `[m x N]` snapshot matrix.
///
/// An optional `[m x m]` calibration matrix is applied elementwise. The result
/// is forced to be exactly Hermitian.
pub fn covariance(
    snapshots: ArrayView2<Complex64>,
    calibration: Option<ArrayView2<Complex64>>,
) -> EngineResult<Array2<Complex64>> {
    let (elements, samples) = snapshots.dim();
    if elements == 0 || samples == 0 {
        return Err(EngineError::Validation(format!(
            "snapshot matrix {}x{} is empty",
            elements, samples
        )));
    }

    let adjoint = MatrixHelper::adjoint(snapshots);
    let mut product = snapshots.dot(&adjoint).mapv(|value| value / samples as f64);

    if let Some(calibration) = calibration {
        if calibration.dim() != (elements, elements) {
            return Err(EngineError::Validation(format!(
                "calibration matrix has shape {:?}, expected {:?}",
                calibration.dim(),
                (elements, elements)
            )));
        }
        product.zip_mut_with(&calibration, |value, weight| *value *= *weight);
    }

    Ok(MatrixHelper::hermitian_part(product.view()))
}

/// Eigenbasis of a covariance split into signal and noise subspaces.
///
/// Eigenpairs are ordered by descending eigenvalue magnitude; equal
/// magnitudes keep the solver's order. Columns of the vector matrices pair
/// with the entries of the value vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct SubspacePartition {
    signal_values: Vec<f64>,
    signal_vectors: Array2<Complex64>,
    noise_values: Vec<f64>,
    noise_vectors: Array2<Complex64>,
}

impl SubspacePartition {
    pub fn elements(&self) -> usize {
        self.signal_vectors.nrows()
    }

    pub fn sources(&self) -> usize {
        self.signal_values.len()
    }

    pub fn signal_values(&self) -> &[f64] {
        &self.signal_values
    }

    /// `[m x n]` signal-subspace basis.
    pub fn signal_vectors(&self) -> ArrayView2<Complex64> {
        self.signal_vectors.view()
    }

    pub fn noise_values(&self) -> &[f64] {
        &self.noise_values
    }

    /// `[m x (m - n)]` noise-subspace basis.
    pub fn noise_vectors(&self) -> ArrayView2<Complex64> {
        self.noise_vectors.view()
    }
}

/// Eigendecomposes `covariance` and keeps the `sources` dominant eigenpairs as
/// the signal subspace.
pub fn separate_subspaces(
    covariance: ArrayView2<Complex64>,
    sources: usize,
) -> EngineResult<SubspacePartition> {
    let elements = covariance.nrows();
    if covariance.ncols() != elements {
        return Err(EngineError::Validation(format!(
            "covariance must be square, got {:?}",
            covariance.dim()
        )));
    }
    if sources == 0 || sources >= elements {
        return Err(EngineError::Configuration(format!(
            "source count {} must lie in [1, {})",
            sources, elements
        )));
    }

    let (mut values, vectors) = MatrixHelper::hermitian_eigen(covariance)?;

    let largest = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    for value in values.iter_mut().filter(|value| **value < 0.0) {
        if value.abs() <= NEGATIVE_EIGENVALUE_TOLERANCE * largest {
            *value = 0.0;
        } else {
            warn!("covariance has a negative eigenvalue {:.3e}", value);
        }
    }

    let order = descending_magnitude_order(&values);
    let (signal, noise) = order.split_at(sources);

    debug!(
        "subspaces: signal {:?}, noise {:?}",
        signal.iter().map(|&idx| values[idx]).collect::<Vec<_>>(),
        noise.iter().map(|&idx| values[idx]).collect::<Vec<_>>()
    );

    Ok(SubspacePartition {
        signal_values: signal.iter().map(|&idx| values[idx]).collect(),
        signal_vectors: vectors.select(Axis(1), signal),
        noise_values: noise.iter().map(|&idx| values[idx]).collect(),
        noise_vectors: vectors.select(Axis(1), noise),
    })
}

/// Indices of `values` by descending magnitude; equal magnitudes keep index
/// order.
fn descending_magnitude_order(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        values[b]
            .abs()
            .total_cmp(&values[a].abs())
            .then_with(|| a.cmp(&b))
    });
    order
}
