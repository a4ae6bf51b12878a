use log::warn;
use ndarray::Array1;
use num_complex::Complex64;
use std::f64::consts::{FRAC_PI_2, PI};

use crate::prelude::{EngineError, EngineResult};

/// Uniform linear array layout.
///
/// Angles are measured from broadside, in radians, and share one sign
/// convention between steering vectors and angle recovery:
/// `omega = 2 pi sin(-phi) d / lambda`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrayGeometry {
    elements: usize,
    element_spacing: f64,
    wavelength: f64,
}

impl ArrayGeometry {
    pub fn new(elements: usize, element_spacing: f64, wavelength: f64) -> EngineResult<Self> {
        if elements < 2 {
            return Err(EngineError::Configuration(format!(
                "array needs at least two elements, got {}",
                elements
            )));
        }
        if !(element_spacing.is_finite() && element_spacing > 0.0) {
            return Err(EngineError::Configuration(format!(
                "element spacing must be positive, got {}",
                element_spacing
            )));
        }
        if !(wavelength.is_finite() && wavelength > 0.0) {
            return Err(EngineError::Configuration(format!(
                "wavelength must be positive, got {}",
                wavelength
            )));
        }
        Ok(Self {
            elements,
            element_spacing,
            wavelength,
        })
    }

    /// Array with half-wavelength element spacing.
    pub fn half_wavelength(elements: usize) -> EngineResult<Self> {
        Self::new(elements, 0.5, 1.0)
    }

    pub fn elements(&self) -> usize {
        self.elements
    }

    pub fn element_spacing(&self) -> f64 {
        self.element_spacing
    }

    pub fn wavelength(&self) -> f64 {
        self.wavelength
    }

    /// Element spacing in wavelengths.
    pub fn spacing_ratio(&self) -> f64 {
        self.element_spacing / self.wavelength
    }

    /// Inter-element phase step of a plane wave arriving from `angle`.
    pub fn omega_from_angle(&self, angle: f64) -> f64 {
        2.0 * PI * (-angle).sin() * self.spacing_ratio()
    }

    /// Inverse of [`Self::omega_from_angle`], in `(-pi/2, pi/2]`.
    ///
    /// Phase steps beyond the visible region are clamped onto endfire.
    pub fn angle_from_omega(&self, omega: f64) -> f64 {
        let argument = -omega / (2.0 * PI) / self.spacing_ratio();
        if argument.abs() > 1.0 + 1e-9 {
            warn!(
                "phase step {:.6} rad is outside the visible region, clamping",
                omega
            );
        }
        let angle = argument.clamp(-1.0, 1.0).asin();
        if angle <= -FRAC_PI_2 {
            FRAC_PI_2
        } else {
            angle
        }
    }

    /// `[1, e^{j omega}, ..., e^{j (m-1) omega}]` for a wave from `angle`.
    pub fn steering_vector(&self, angle: f64) -> Array1<Complex64> {
        let omega = self.omega_from_angle(angle);
        Array1::from_shape_fn(self.elements, |k| {
            Complex64::from_polar(1.0, omega * k as f64)
        })
    }

    /// Steering phasors referenced to the centre of the aperture.
    pub fn phasors(&self, angle: f64) -> Array1<Complex64> {
        let centre = (self.elements - 1) as f64 / 2.0;
        Array1::from_shape_fn(self.elements, |k| {
            let position = (k as f64 - centre) * self.element_spacing;
            let path = position * (-angle).sin();
            Complex64::from_polar(1.0, 2.0 * PI * path / self.wavelength)
        })
    }
}

/// `points` uniformly spaced angles covering `(-pi/2, pi/2]`.
pub fn angle_grid(points: usize) -> Vec<f64> {
    (1..=points)
        .map(|idx| -FRAC_PI_2 + PI * idx as f64 / points as f64)
        .collect()
}
