pub mod calibration;
pub mod esprit;
pub mod geometry;
pub mod music;
pub mod subspace;

pub use calibration::{CalibrationEstimator, CalibrationTracker, CalibrationVector};
pub use esprit::EspritEstimator;
pub use geometry::{angle_grid, ArrayGeometry};
pub use music::{find_peaks, MusicEstimator};
pub use subspace::{covariance, separate_subspaces, SubspacePartition};

#[cfg(test)]
pub(crate) mod fixtures {
    use ndarray::Array2;
    use num_complex::Complex64;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::f64::consts::PI;

    use super::geometry::ArrayGeometry;

    /// Snapshots of unit-amplitude tones arriving from `angles`, one distinct
    /// tone frequency per source, plus uniform complex noise of the given
    /// amplitude drawn from a seeded generator.
    pub fn plane_wave_snapshots(
        geometry: &ArrayGeometry,
        angles: &[f64],
        samples: usize,
        noise: f64,
        seed: u64,
    ) -> Array2<Complex64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut snapshots = Array2::zeros((geometry.elements(), samples));
        for (source, &angle) in angles.iter().enumerate() {
            let steering = geometry.steering_vector(angle);
            let frequency = 0.013 + 0.071 * source as f64;
            for t in 0..samples {
                let tone = Complex64::from_polar(1.0, 2.0 * PI * frequency * t as f64);
                for k in 0..geometry.elements() {
                    snapshots[[k, t]] += steering[k] * tone;
                }
            }
        }
        if noise > 0.0 {
            snapshots.mapv_inplace(|value: Complex64| {
                value
                    + Complex64::new(
                        rng.gen_range(-noise..noise),
                        rng.gen_range(-noise..noise),
                    )
            });
        }
        snapshots
    }
}
