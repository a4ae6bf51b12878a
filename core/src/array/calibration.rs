//! Sensor gain/phase estimation from a pilot source at a known angle.
//!
//! With a single pilot in view, the signal subspace is spanned by
//! `Gamma * a(phi)`, where `Gamma` holds the unknown per-element complex gains.
//! Removing the known steering phasors from that subspace leaves `Gamma` as the
//! dominant eigenvector of `W = D^H Vs Vs^H D`, `D = diag(a(phi))`
//! (Soon, Tong, Huang and Liu, IEEE Trans. Signal Processing 42(4), 1994).

use log::debug;
use ndarray::{Array1, Array2, ArrayView2};
use num_complex::Complex64;

use crate::array::geometry::ArrayGeometry;
use crate::array::subspace::{covariance, separate_subspaces, SubspacePartition};
use crate::math::matrix::MatrixHelper;
use crate::prelude::{EngineError, EngineResult};

/// Per-element complex gains, defined up to a global complex scalar.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationVector(Array1<Complex64>);

impl CalibrationVector {
    pub fn new(gains: Array1<Complex64>) -> Self {
        Self(gains)
    }

    /// All-ones vector, i.e. a perfectly matched array.
    pub fn identity(elements: usize) -> Self {
        Self(Array1::from_elem(elements, Complex64::new(1.0, 0.0)))
    }

    pub fn gains(&self) -> &Array1<Complex64> {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rescales so that element 0 is exactly `1 + 0j`.
    pub fn normalized(&self) -> EngineResult<Self> {
        let reference = self
            .0
            .first()
            .copied()
            .filter(|value| value.norm() > f64::EPSILON)
            .ok_or_else(|| {
                EngineError::Numerical("reference element has vanishing gain".into())
            })?;
        Ok(Self(self.0.mapv(|value| value / reference)))
    }

    /// Hadamard multiplier `C_ij = (1 / Gamma_i) conj(1 / Gamma_j)` that removes
    /// these gains from a spatial covariance.
    pub fn correction_matrix(&self) -> EngineResult<Array2<Complex64>> {
        if self.0.iter().any(|value| value.norm() <= f64::EPSILON) {
            return Err(EngineError::Numerical(
                "cannot invert a vanishing element gain".into(),
            ));
        }
        let inverse = self.0.mapv(|value| value.inv());
        let elements = inverse.len();
        Ok(Array2::from_shape_fn((elements, elements), |(i, j)| {
            inverse[i] * inverse[j].conj()
        }))
    }
}

/// Estimates array gains from snapshots of a pilot at a known angle.
#[derive(Debug, Clone)]
pub struct CalibrationEstimator {
    geometry: ArrayGeometry,
}

impl CalibrationEstimator {
    pub fn new(geometry: ArrayGeometry) -> Self {
        Self { geometry }
    }

    /// Separates `snapshots` at rank `sources` and estimates the gains.
    pub fn estimate(
        &self,
        snapshots: ArrayView2<Complex64>,
        known_angle: f64,
        sources: usize,
    ) -> EngineResult<CalibrationVector> {
        if snapshots.nrows() != self.geometry.elements() {
            return Err(EngineError::Validation(format!(
                "snapshots have {} rows, array has {} elements",
                snapshots.nrows(),
                self.geometry.elements()
            )));
        }
        let r = covariance(snapshots, None)?;
        let partition = separate_subspaces(r.view(), sources)?;
        self.estimate_from_partition(&partition, known_angle)
    }

    pub fn estimate_from_partition(
        &self,
        partition: &SubspacePartition,
        known_angle: f64,
    ) -> EngineResult<CalibrationVector> {
        let elements = self.geometry.elements();
        if partition.elements() != elements {
            return Err(EngineError::Validation(format!(
                "partition spans {} elements, array has {}",
                partition.elements(),
                elements
            )));
        }

        let signal = partition.signal_vectors();
        let projector = signal.dot(&MatrixHelper::adjoint(signal));
        let phasors = self.geometry.phasors(known_angle);
        let weighted = Array2::from_shape_fn((elements, elements), |(i, j)| {
            phasors[i].conj() * projector[[i, j]] * phasors[j]
        });

        let (values, vectors) =
            MatrixHelper::hermitian_eigen(MatrixHelper::hermitian_part(weighted.view()).view())?;
        let dominant = values
            .iter()
            .enumerate()
            .fold(0, |best, (idx, value)| {
                if value.abs() > values[best].abs() {
                    idx
                } else {
                    best
                }
            });
        debug!(
            "calibration eigenvalues {:?}, dominant index {}",
            values, dominant
        );

        Ok(CalibrationVector(vectors.column(dominant).to_owned()))
    }
}

/// Running product of successive calibration estimates.
///
/// Each estimate is computed on data that was already corrected with the
/// previous product, so the corrections compose multiplicatively. The tracker
/// is owned by the caller, which serialises updates against covariance
/// computations that read it.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTracker {
    current: CalibrationVector,
}

impl CalibrationTracker {
    pub fn new(elements: usize) -> Self {
        Self {
            current: CalibrationVector::identity(elements),
        }
    }

    pub fn current(&self) -> &CalibrationVector {
        &self.current
    }

    pub fn update(&mut self, estimate: &CalibrationVector) -> EngineResult<&CalibrationVector> {
        if estimate.len() != self.current.len() {
            return Err(EngineError::Validation(format!(
                "calibration update has {} elements, tracker holds {}",
                estimate.len(),
                self.current.len()
            )));
        }
        self.current.0.zip_mut_with(&estimate.0, |acc, gain| *acc *= *gain);
        Ok(&self.current)
    }

    pub fn reset(&mut self) {
        self.current = CalibrationVector::identity(self.current.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::music::MusicEstimator;
    use crate::prelude::AngleEstimator;
    use std::f64::consts::PI;

    fn mismatch() -> Array1<Complex64> {
        Array1::from(vec![
            Complex64::from_polar(1.0, 0.0),
            Complex64::from_polar(0.93, 0.8),
            Complex64::from_polar(1.07, -2.1),
            Complex64::from_polar(0.98, 1.4),
        ])
    }

    /// Pilot tone from `angle` seen through element gains `gains`.
    fn pilot_snapshots(
        geometry: &ArrayGeometry,
        gains: &Array1<Complex64>,
        angle: f64,
    ) -> Array2<Complex64> {
        let phasors = geometry.phasors(angle);
        Array2::from_shape_fn((geometry.elements(), 256), |(k, t)| {
            gains[k] * phasors[k] * Complex64::from_polar(1.0, 2.0 * PI * 0.021 * t as f64)
        })
    }

    fn assert_close(a: &CalibrationVector, b: &CalibrationVector, tolerance: f64) {
        let a = a.normalized().unwrap();
        let b = b.normalized().unwrap();
        for (x, y) in a.gains().iter().zip(b.gains().iter()) {
            assert!((x - y).norm() < tolerance, "{} vs {}", x, y);
        }
    }

    #[test]
    fn recovers_gains_up_to_global_scalar() {
        let geometry = ArrayGeometry::half_wavelength(4).unwrap();
        let gains = mismatch();
        let pilot = 20_f64.to_radians();
        let snapshots = pilot_snapshots(&geometry, &gains, pilot);

        let estimate = CalibrationEstimator::new(geometry)
            .estimate(snapshots.view(), pilot, 1)
            .unwrap();
        assert_eq!(estimate.len(), 4);
        assert_close(&estimate, &CalibrationVector::new(gains), 1e-8);
    }

    #[test]
    fn correction_restores_direction_finding() {
        let geometry = ArrayGeometry::half_wavelength(4).unwrap();
        let gains = mismatch();
        let pilot = 0.0;
        let estimate = CalibrationEstimator::new(geometry)
            .estimate(pilot_snapshots(&geometry, &gains, pilot).view(), pilot, 1)
            .unwrap();

        let target = -25_f64.to_radians();
        let snapshots = pilot_snapshots(&geometry, &gains, target);
        let correction = estimate.correction_matrix().unwrap();
        let corrected = covariance(snapshots.view(), Some(correction.view())).unwrap();
        let partition = separate_subspaces(corrected.view(), 1).unwrap();
        let angles = MusicEstimator::new(geometry)
            .estimate_angles(&partition)
            .unwrap();
        assert!((angles[0] - target).abs() < 0.2_f64.to_radians());
    }

    #[test]
    fn tracker_composes_estimates() {
        let mut tracker = CalibrationTracker::new(2);
        let first = CalibrationVector::new(Array1::from(vec![
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 2.0),
        ]));
        let second = CalibrationVector::new(Array1::from(vec![
            Complex64::new(2.0, 0.0),
            Complex64::new(0.0, 1.0),
        ]));
        tracker.update(&first).unwrap();
        let combined = tracker.update(&second).unwrap();
        assert_eq!(combined.gains()[0], Complex64::new(2.0, 0.0));
        assert_eq!(combined.gains()[1], Complex64::new(-2.0, 0.0));

        assert!(tracker.update(&CalibrationVector::identity(3)).is_err());
        tracker.reset();
        assert_eq!(tracker.current(), &CalibrationVector::identity(2));
    }

    #[test]
    fn vanishing_gains_are_numerical_errors() {
        let gains = CalibrationVector::new(Array1::from(vec![
            Complex64::new(0.0, 0.0),
            Complex64::new(1.0, 0.0),
        ]));
        assert!(matches!(gains.normalized(), Err(EngineError::Numerical(_))));
        assert!(matches!(
            gains.correction_matrix(),
            Err(EngineError::Numerical(_))
        ));
    }

    #[test]
    fn estimate_rejects_wrong_element_count() {
        let geometry = ArrayGeometry::half_wavelength(4).unwrap();
        let snapshots = Array2::<Complex64>::ones((3, 16));
        assert!(matches!(
            CalibrationEstimator::new(geometry).estimate(snapshots.view(), 0.0, 1),
            Err(EngineError::Validation(_))
        ));
    }
}
