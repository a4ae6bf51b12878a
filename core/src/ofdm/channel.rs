//! Frequency-domain channel estimation and range-Doppler periodogram.
//!
//! The received frame is divided by the known pilot frame carrier by
//! carrier. The per-symbol channel estimate is then transformed back to the
//! delay domain (range) and across symbols to the Doppler domain.

use log::debug;
use ndarray::{Array2, ArrayView2, Axis};
use num_complex::Complex64;
use rustfft::num_traits::Zero;

use crate::math::fft::FftHelper;
use crate::math::window::{fftshift, fftshift_axis, hamming};
use crate::ofdm::frame::{FrameGeometry, OfdmTransform};
use crate::prelude::{EngineError, EngineResult};

/// FFT sizes of the periodogram; larger than the frame means zero-padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodogramSize {
    carriers: usize,
    symbols: usize,
}

impl PeriodogramSize {
    pub fn new(geometry: &FrameGeometry, carriers: usize, symbols: usize) -> EngineResult<Self> {
        if carriers < geometry.carriers() || symbols < geometry.symbols() {
            return Err(EngineError::Configuration(format!(
                "periodogram size {}x{} is smaller than the {}x{} frame",
                carriers,
                symbols,
                geometry.carriers(),
                geometry.symbols()
            )));
        }
        Ok(Self { carriers, symbols })
    }

    /// Periodogram without zero-padding.
    pub fn unpadded(geometry: &FrameGeometry) -> Self {
        Self {
            carriers: geometry.carriers(),
            symbols: geometry.symbols(),
        }
    }

    pub fn carriers(&self) -> usize {
        self.carriers
    }

    pub fn symbols(&self) -> usize {
        self.symbols
    }
}

/// Complex range-Doppler map indexed `[range, doppler]`.
///
/// The Doppler axis is centred: column `symbols / 2` is zero Doppler.
#[derive(Debug, Clone, PartialEq)]
pub struct Periodogram {
    data: Array2<Complex64>,
}

impl Periodogram {
    pub fn data(&self) -> &Array2<Complex64> {
        &self.data
    }

    pub fn into_inner(self) -> Array2<Complex64> {
        self.data
    }

    pub fn range_bins(&self) -> usize {
        self.data.nrows()
    }

    pub fn doppler_bins(&self) -> usize {
        self.data.ncols()
    }

    pub fn magnitude(&self) -> Array2<f64> {
        self.data.mapv(|value| value.norm())
    }

    pub fn power(&self) -> Array2<f64> {
        self.data.mapv(|value| value.norm_sqr())
    }

    /// Strongest cell as `(range bin, signed Doppler bin)`.
    pub fn peak(&self) -> Option<(usize, isize)> {
        let centre = (self.doppler_bins() / 2) as isize;
        self.data
            .indexed_iter()
            .map(|((range, doppler), value)| (range, doppler, value.norm_sqr()))
            .filter(|(_, _, power)| power.is_finite())
            .fold(None, |best: Option<(usize, usize, f64)>, candidate| match best {
                Some(current) if current.2 >= candidate.2 => Some(current),
                _ => Some(candidate),
            })
            .map(|(range, doppler, _)| (range, doppler as isize - centre))
    }
}

/// Estimates the channel of a received frame against a known pilot frame.
#[derive(Clone)]
pub struct ChannelEstimator {
    transform: OfdmTransform,
    size: PeriodogramSize,
    window: Vec<f64>,
    range_fft: FftHelper,
    doppler_fft: FftHelper,
}

impl ChannelEstimator {
    pub fn new(transform: OfdmTransform) -> Self {
        let size = PeriodogramSize::unpadded(transform.geometry());
        Self::build(transform, size)
    }

    /// Estimator with a zero-padded periodogram.
    ///
    /// `size` must cover the frame of `transform`; a size validated against a
    /// different, smaller frame is rejected.
    pub fn with_size(transform: OfdmTransform, size: PeriodogramSize) -> EngineResult<Self> {
        let geometry = transform.geometry();
        if size.carriers() < geometry.carriers() || size.symbols() < geometry.symbols() {
            return Err(EngineError::Configuration(format!(
                "periodogram size {}x{} is smaller than the {}x{} frame",
                size.carriers(),
                size.symbols(),
                geometry.carriers(),
                geometry.symbols()
            )));
        }
        Ok(Self::build(transform, size))
    }

    fn build(transform: OfdmTransform, size: PeriodogramSize) -> Self {
        let window = fftshift(&hamming(transform.geometry().carriers()));
        Self {
            transform,
            size,
            window,
            range_fft: FftHelper::new(size.carriers()),
            doppler_fft: FftHelper::new(size.symbols()),
        }
    }

    pub fn geometry(&self) -> &FrameGeometry {
        self.transform.geometry()
    }

    pub fn size(&self) -> PeriodogramSize {
        self.size
    }

    /// Carrier taper applied to every estimate, already centred on carrier 0.
    pub fn window(&self) -> &[f64] {
        &self.window
    }

    /// Windowed `[M x N]` ratio of received to known carriers.
    ///
    /// Excluded carriers are 0 in the result. A known symbol of zero
    /// magnitude on an active carrier is rejected.
    pub fn estimate_channel(
        &self,
        known: ArrayView2<Complex64>,
        received: &[Complex64],
    ) -> EngineResult<Array2<Complex64>> {
        self.transform.require_block_shape(known, "known transmit block")?;
        let geometry = self.transform.geometry();

        let mut reference = known.to_owned();
        for carrier in geometry.excluded_carriers() {
            reference.column_mut(carrier).fill(Complex64::new(1.0, 0.0));
        }
        if let Some(((symbol, carrier), _)) = reference
            .indexed_iter()
            .find(|(_, value)| value.is_zero())
        {
            return Err(EngineError::Validation(format!(
                "known symbol {} carrier {} has zero magnitude",
                symbol, carrier
            )));
        }

        let mut estimate = self.transform.receive_frame(received)?;
        estimate.zip_mut_with(&reference, |rx, tx| *rx /= *tx);
        for mut row in estimate.rows_mut() {
            for (carrier, value) in row.iter_mut().enumerate() {
                *value = if geometry.is_active(carrier) {
                    *value * self.window[carrier]
                } else {
                    Complex64::zero()
                };
            }
        }
        Ok(estimate)
    }

    /// Range-Doppler map `[range, doppler]` of a received frame.
    pub fn periodogram(
        &self,
        known: ArrayView2<Complex64>,
        received: &[Complex64],
    ) -> EngineResult<Periodogram> {
        let estimate = self.estimate_channel(known, received)?;
        let mut padded = self.zero_pad(&estimate);

        self.doppler_fft.forward_axis(&mut padded, Axis(0));
        self.range_fft.inverse_axis(&mut padded, Axis(1));
        let centred = fftshift_axis(&padded, Axis(0));
        let data = centred.reversed_axes();

        debug!(
            "periodogram: {} range bins x {} doppler bins",
            data.nrows(),
            data.ncols()
        );
        Ok(Periodogram { data })
    }

    /// Places an `[M x N]` estimate into the `[symbols x carriers]` FFT grid.
    ///
    /// Symbols beyond `M` stay zero. The negative-frequency half of each
    /// symbol moves to the end of the padded spectrum so that padding
    /// interpolates instead of shifting the delay axis.
    fn zero_pad(&self, estimate: &Array2<Complex64>) -> Array2<Complex64> {
        let (symbols, carriers) = estimate.dim();
        if (symbols, carriers) == (self.size.symbols(), self.size.carriers()) {
            return estimate.clone();
        }

        let half = carriers / 2;
        let offset = self.size.carriers() - carriers;
        let mut padded = Array2::zeros((self.size.symbols(), self.size.carriers()));
        for ((symbol, carrier), value) in estimate.indexed_iter() {
            let target = if carrier < half { carrier } else { carrier + offset };
            padded[[symbol, target]] = *value;
        }
        padded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modulation::{Constellation, ConstellationScheme};
    use crate::ofdm::reference::ReferenceFrame;
    use std::f64::consts::PI;

    fn setup(
        carriers: usize,
        guard: usize,
        margin: usize,
        symbols: usize,
    ) -> (ChannelEstimator, ReferenceFrame) {
        let geometry = FrameGeometry::new(carriers, guard, margin, symbols).unwrap();
        let transform = OfdmTransform::new(geometry);
        let constellation = Constellation::new(ConstellationScheme::Qam { order: 16 }).unwrap();
        let reference = ReferenceFrame::generate(&transform, &constellation, 42).unwrap();
        (ChannelEstimator::new(transform), reference)
    }

    /// Delays the whole frame by `delay` samples and rotates symbol `m` by
    /// `2 pi doppler m / M`.
    fn echo(
        estimator: &ChannelEstimator,
        frame: &[Complex64],
        delay: usize,
        doppler: i32,
    ) -> Vec<Complex64> {
        let geometry = estimator.geometry();
        let symbol_length = geometry.symbol_length();
        let symbols = geometry.symbols() as f64;
        (0..frame.len())
            .map(|n| {
                let sample = if n >= delay {
                    frame[n - delay]
                } else {
                    Complex64::zero()
                };
                let symbol = (n / symbol_length) as f64;
                let phase = 2.0 * PI * doppler as f64 * symbol / symbols;
                sample * Complex64::from_polar(1.0, phase)
            })
            .collect()
    }

    #[test]
    fn clean_channel_estimate_equals_window() {
        let (estimator, reference) = setup(32, 8, 2, 4);
        let estimate = estimator
            .estimate_channel(reference.symbols.view(), &reference.samples)
            .unwrap();
        let geometry = estimator.geometry();
        for row in estimate.rows() {
            for (carrier, value) in row.iter().enumerate() {
                if geometry.is_active(carrier) {
                    let expected = estimator.window()[carrier];
                    assert!((value - Complex64::new(expected, 0.0)).norm() < 1e-9);
                } else {
                    assert_eq!(*value, Complex64::zero());
                }
            }
        }
    }

    #[test]
    fn window_is_centred_on_carrier_zero() {
        let (estimator, _) = setup(32, 8, 2, 4);
        let window = estimator.window();
        assert!((window[0] - 1.0).abs() < 0.01);
        assert!(window[16] < 0.1);
    }

    #[test]
    fn estimate_rejects_malformed_inputs() {
        let (estimator, reference) = setup(32, 8, 2, 4);
        assert!(matches!(
            estimator.estimate_channel(reference.symbols.view(), &reference.samples[1..]),
            Err(EngineError::Validation(_))
        ));
        let wrong_shape = Array2::<Complex64>::ones((3, 32));
        assert!(matches!(
            estimator.estimate_channel(wrong_shape.view(), &reference.samples),
            Err(EngineError::Validation(_))
        ));
        let mut silent = reference.symbols.clone();
        silent[[1, 0]] = Complex64::zero();
        assert!(matches!(
            estimator.estimate_channel(silent.view(), &reference.samples),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn periodogram_is_transposed_range_by_doppler() {
        let (estimator, reference) = setup(32, 8, 2, 4);
        let periodogram = estimator
            .periodogram(reference.symbols.view(), &reference.samples)
            .unwrap();
        assert_eq!(periodogram.range_bins(), 32);
        assert_eq!(periodogram.doppler_bins(), 4);
        assert_eq!(periodogram.peak(), Some((0, 0)));
    }

    #[test]
    fn periodogram_locates_delayed_moving_target() {
        let (estimator, reference) = setup(64, 16, 4, 16);
        let received = echo(&estimator, &reference.samples, 5, 3);
        let periodogram = estimator
            .periodogram(reference.symbols.view(), &received)
            .unwrap();
        assert_eq!(periodogram.peak(), Some((5, 3)));
    }

    #[test]
    fn padded_periodogram_scales_target_position() {
        let (base, reference) = setup(64, 16, 4, 16);
        let geometry = base.geometry().clone();
        let size = PeriodogramSize::new(&geometry, 128, 32).unwrap();
        let estimator = ChannelEstimator::with_size(OfdmTransform::new(geometry), size).unwrap();
        let received = echo(&estimator, &reference.samples, 5, -2);
        let periodogram = estimator
            .periodogram(reference.symbols.view(), &received)
            .unwrap();
        assert_eq!(periodogram.range_bins(), 128);
        assert_eq!(periodogram.doppler_bins(), 32);
        assert_eq!(periodogram.peak(), Some((10, -4)));
    }

    #[test]
    fn periodogram_size_cannot_shrink_frame() {
        let geometry = FrameGeometry::new(64, 16, 4, 16).unwrap();
        assert!(matches!(
            PeriodogramSize::new(&geometry, 32, 16),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn estimator_rejects_size_of_smaller_frame() {
        let small = FrameGeometry::new(16, 4, 2, 4).unwrap();
        let size = PeriodogramSize::new(&small, 16, 4).unwrap();
        let transform = OfdmTransform::new(FrameGeometry::new(64, 16, 4, 16).unwrap());
        assert!(matches!(
            ChannelEstimator::with_size(transform.clone(), size),
            Err(EngineError::Configuration(_))
        ));

        let short_doppler = PeriodogramSize::new(&small, 64, 4).unwrap();
        assert!(matches!(
            ChannelEstimator::with_size(transform, short_doppler),
            Err(EngineError::Configuration(_))
        ));
    }
}
