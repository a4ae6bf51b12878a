//! MUSIC pseudo-spectrum over an angle grid.
//!
//! Each candidate angle is scored by the inverse of the steering vector's
//! energy inside the noise subspace: `P(phi) = 1 / (e^H Vn Vn^H e)`.

use log::debug;
use ndarray::ArrayView2;
use num_complex::Complex64;

use crate::array::geometry::{angle_grid, ArrayGeometry};
use crate::array::subspace::SubspacePartition;
use crate::prelude::{AngleEstimator, EngineError, EngineResult};

/// Grid used by [`AngleEstimator::estimate_angles`] unless overridden:
/// 0.1 degree steps over `(-pi/2, pi/2]`.
const DEFAULT_GRID_POINTS: usize = 1800;

#[derive(Debug, Clone)]
pub struct MusicEstimator {
    geometry: ArrayGeometry,
    grid: Vec<f64>,
}

impl MusicEstimator {
    pub fn new(geometry: ArrayGeometry) -> Self {
        Self {
            geometry,
            grid: angle_grid(DEFAULT_GRID_POINTS),
        }
    }

    /// Replaces the grid used when estimating angles through the trait.
    pub fn with_grid(mut self, grid: Vec<f64>) -> Self {
        self.grid = grid;
        self
    }

    pub fn geometry(&self) -> &ArrayGeometry {
        &self.geometry
    }

    pub fn grid(&self) -> &[f64] {
        &self.grid
    }

    /// Pseudo-spectrum value for every angle of `grid`.
    pub fn scan(&self, grid: &[f64], noise: ArrayView2<Complex64>) -> EngineResult<Vec<f64>> {
        let elements = self.geometry.elements();
        if noise.nrows() != elements || noise.ncols() == 0 {
            return Err(EngineError::Validation(format!(
                "noise subspace has shape {:?}, expected {} rows and at least one column",
                noise.dim(),
                elements
            )));
        }

        grid.iter()
            .map(|&angle| {
                let steering = self.geometry.steering_vector(angle);
                let denominator: f64 = noise
                    .columns()
                    .into_iter()
                    .map(|column| {
                        column
                            .iter()
                            .zip(steering.iter())
                            .map(|(v, e)| v.conj() * e)
                            .sum::<Complex64>()
                            .norm_sqr()
                    })
                    .sum();

                if !denominator.is_finite() || denominator <= f64::MIN_POSITIVE {
                    return Err(EngineError::Numerical(format!(
                        "steering vector at {:.6} rad is orthogonal to the noise subspace",
                        angle
                    )));
                }
                Ok(1.0 / denominator)
            })
            .collect()
    }
}

impl AngleEstimator for MusicEstimator {
    /// Scans the configured grid and returns the strongest `sources` peaks.
    fn estimate_angles(&self, partition: &SubspacePartition) -> EngineResult<Vec<f64>> {
        let spectrum = self.scan(&self.grid, partition.noise_vectors())?;
        let peaks = find_peaks(&self.grid, &spectrum, partition.sources());
        debug!("music peaks {:?}", peaks);
        Ok(peaks)
    }
}

/// Angles of the strict local maxima of `spectrum`, strongest first.
///
/// Edge samples count as maxima when they exceed their single neighbour. At
/// most `count` angles are returned.
pub fn find_peaks(grid: &[f64], spectrum: &[f64], count: usize) -> Vec<f64> {
    let len = grid.len().min(spectrum.len());
    let mut peaks: Vec<usize> = (0..len)
        .filter(|&idx| {
            let value = spectrum[idx];
            let above_left = idx == 0 || value > spectrum[idx - 1];
            let above_right = idx + 1 == len || value > spectrum[idx + 1];
            value.is_finite() && above_left && above_right
        })
        .collect();
    peaks.sort_by(|&a, &b| spectrum[b].total_cmp(&spectrum[a]).then_with(|| a.cmp(&b)));
    peaks.into_iter().take(count).map(|idx| grid[idx]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::fixtures::plane_wave_snapshots;
    use crate::array::subspace::{covariance, separate_subspaces};
    use ndarray::Array2;

    fn partition_for(angles: &[f64], noise: f64) -> (MusicEstimator, SubspacePartition) {
        let geometry = ArrayGeometry::half_wavelength(4).unwrap();
        let snapshots = plane_wave_snapshots(&geometry, angles, 512, noise, 3);
        let r = covariance(snapshots.view(), None).unwrap();
        let partition = separate_subspaces(r.view(), angles.len()).unwrap();
        (MusicEstimator::new(geometry), partition)
    }

    fn argmax(values: &[f64]) -> usize {
        values
            .iter()
            .enumerate()
            .fold(0, |best, (idx, value)| if *value > values[best] { idx } else { best })
    }

    #[test]
    fn spectrum_peaks_at_broadside_source() {
        let (music, partition) = partition_for(&[0.0], 1e-6);
        let grid = angle_grid(180);
        let spectrum = music.scan(&grid, partition.noise_vectors()).unwrap();
        assert_eq!(spectrum.len(), grid.len());
        assert!(grid[argmax(&spectrum)].abs() < 1e-9);
    }

    #[test]
    fn noiseless_spectrum_peaks_at_broadside_source() {
        let (music, partition) = partition_for(&[0.0], 0.0);
        let grid = angle_grid(180);
        let spectrum = music.scan(&grid, partition.noise_vectors()).unwrap();
        let best = argmax(&spectrum);
        assert!(grid[best].abs() < 1e-9);
        assert!(spectrum[best] > 1e12 * spectrum[0]);
    }

    #[test]
    fn spectrum_peaks_near_oblique_source() {
        let target = 30_f64.to_radians();
        let (music, partition) = partition_for(&[target], 1e-3);
        let grid = angle_grid(1800);
        let spectrum = music.scan(&grid, partition.noise_vectors()).unwrap();
        assert!((grid[argmax(&spectrum)] - target).abs() < 1_f64.to_radians());
    }

    #[test]
    fn trait_estimate_resolves_two_sources() {
        let targets = [-40_f64.to_radians(), 20_f64.to_radians()];
        let (music, partition) = partition_for(&targets, 1e-3);
        let mut angles = music.estimate_angles(&partition).unwrap();
        angles.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(angles.len(), 2);
        for (estimate, target) in angles.iter().zip(targets.iter()) {
            assert!((estimate - target).abs() < 1_f64.to_radians());
        }
    }

    #[test]
    fn scan_rejects_mismatched_noise_subspace() {
        let geometry = ArrayGeometry::half_wavelength(4).unwrap();
        let music = MusicEstimator::new(geometry);
        let noise = Array2::<Complex64>::zeros((3, 2));
        assert!(matches!(
            music.scan(&[0.0], noise.view()),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn scan_reports_vanishing_denominator() {
        let geometry = ArrayGeometry::half_wavelength(4).unwrap();
        let music = MusicEstimator::new(geometry);
        let noise = Array2::<Complex64>::zeros((4, 1));
        assert!(matches!(
            music.scan(&[0.0], noise.view()),
            Err(EngineError::Numerical(_))
        ));
    }

    #[test]
    fn find_peaks_orders_by_height() {
        let grid = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let spectrum = [5.0, 1.0, 3.0, 1.0, 7.0, 7.0, 2.0];
        assert_eq!(find_peaks(&grid, &spectrum, 3), vec![0.0, 2.0]);
        assert_eq!(find_peaks(&grid, &spectrum, 1), vec![0.0]);
    }
}
