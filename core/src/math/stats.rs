use num_complex::Complex64;
use rustfft::num_traits::Zero;

pub struct StatsHelper;

impl StatsHelper {
    /// Centroid of a set of complex points.
    pub fn mean(samples: &[Complex64]) -> Complex64 {
        if samples.is_empty() {
            return Complex64::zero();
        }
        samples.iter().sum::<Complex64>() / samples.len() as f64
    }

    /// Mean squared magnitude.
    pub fn average_energy(samples: &[Complex64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().map(|value| value.norm_sqr()).sum::<f64>() / samples.len() as f64
    }

    pub fn rms(samples: &[Complex64]) -> f64 {
        Self::average_energy(samples).sqrt()
    }
}
