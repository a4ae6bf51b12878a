use serde::{Deserialize, Serialize};

use crate::array::geometry::ArrayGeometry;
use crate::array::subspace::SubspacePartition;
use crate::ofdm::frame::FrameGeometry;
use crate::ofdm::channel::PeriodogramSize;

/// Construction-time parameters of the OFDM radar frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfdmConfig {
    pub carriers: usize,
    pub guard_length: usize,
    pub border_margin: usize,
    pub symbols: usize,
    /// Zero-padded range FFT size for the periodogram, defaults to `carriers`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periodogram_carriers: Option<usize>,
    /// Zero-padded Doppler FFT size for the periodogram, defaults to `symbols`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periodogram_symbols: Option<usize>,
}

impl OfdmConfig {
    pub fn geometry(&self) -> EngineResult<FrameGeometry> {
        FrameGeometry::new(
            self.carriers,
            self.guard_length,
            self.border_margin,
            self.symbols,
        )
    }

    pub fn periodogram_size(&self, geometry: &FrameGeometry) -> EngineResult<PeriodogramSize> {
        PeriodogramSize::new(
            geometry,
            self.periodogram_carriers.unwrap_or(geometry.carriers()),
            self.periodogram_symbols.unwrap_or(geometry.symbols()),
        )
    }
}

/// Construction-time parameters of a uniform linear antenna array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayConfig {
    pub elements: usize,
    /// Element spacing in metres.
    pub element_spacing: f64,
    /// Carrier wavelength in metres.
    pub wavelength: f64,
}

impl ArrayConfig {
    pub fn geometry(&self) -> EngineResult<ArrayGeometry> {
        ArrayGeometry::new(self.elements, self.element_spacing, self.wavelength)
    }
}

/// Error taxonomy shared by every estimator in the core.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Invalid construction-time parameters; never worth retrying.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Malformed call-time input; retry with corrected input.
    #[error("validation error: {0}")]
    Validation(String),
    /// Singular or ill-conditioned numerics.
    #[error("numerical error: {0}")]
    Numerical(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Seam shared by the direction-of-arrival estimators.
///
/// Implementors turn a subspace partition into angle estimates in radians,
/// in the (-pi/2, pi/2] domain. No ordering of the returned angles is implied.
pub trait AngleEstimator {
    fn estimate_angles(&self, partition: &SubspacePartition) -> EngineResult<Vec<f64>>;
}
