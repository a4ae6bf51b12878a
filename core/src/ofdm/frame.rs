use log::{debug, info};
use ndarray::{s, Array2, ArrayView1, ArrayView2};
use num_complex::Complex64;
use rustfft::num_traits::Zero;

use crate::math::fft::FftHelper;
use crate::prelude::{EngineError, EngineResult};

/// Fixed layout of an OFDM radar frame.
///
/// The excluded carriers form one contiguous band of `2 * border_margin`
/// indices starting at `carriers / 2 - border_margin`, i.e. around the
/// Nyquist/DC split of an unshifted spectrum. Every other carrier is active.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameGeometry {
    carriers: usize,
    guard_length: usize,
    border_margin: usize,
    symbols: usize,
    carrier_mask: Vec<bool>,
}

impl FrameGeometry {
    pub fn new(
        carriers: usize,
        guard_length: usize,
        border_margin: usize,
        symbols: usize,
    ) -> EngineResult<Self> {
        if carriers == 0 || symbols == 0 {
            return Err(EngineError::Configuration(format!(
                "frame needs at least one carrier and one symbol, got {}x{}",
                symbols, carriers
            )));
        }
        if guard_length > carriers {
            return Err(EngineError::Configuration(format!(
                "cyclic prefix of {} samples exceeds the {}-carrier symbol",
                guard_length, carriers
            )));
        }
        if border_margin > carriers / 2 {
            return Err(EngineError::Configuration(format!(
                "border margin {} does not fit into {} carriers",
                border_margin, carriers
            )));
        }

        let band_start = carriers / 2 - border_margin;
        let band = band_start..band_start + 2 * border_margin;
        let carrier_mask = (0..carriers).map(|idx| !band.contains(&idx)).collect();

        info!(
            "frame geometry: {} carriers, {} guard, {} symbols, excluded band {:?}",
            carriers, guard_length, symbols, band
        );

        Ok(Self {
            carriers,
            guard_length,
            border_margin,
            symbols,
            carrier_mask,
        })
    }

    pub fn carriers(&self) -> usize {
        self.carriers
    }

    pub fn guard_length(&self) -> usize {
        self.guard_length
    }

    pub fn border_margin(&self) -> usize {
        self.border_margin
    }

    pub fn symbols(&self) -> usize {
        self.symbols
    }

    /// Samples per time-domain symbol, cyclic prefix included.
    pub fn symbol_length(&self) -> usize {
        self.carriers + self.guard_length
    }

    pub fn frame_length(&self) -> usize {
        self.symbol_length() * self.symbols
    }

    pub fn carrier_mask(&self) -> &[bool] {
        &self.carrier_mask
    }

    pub fn is_active(&self, carrier: usize) -> bool {
        self.carrier_mask.get(carrier).copied().unwrap_or(false)
    }

    pub fn active_carriers(&self) -> Vec<usize> {
        (0..self.carriers).filter(|&idx| self.carrier_mask[idx]).collect()
    }

    pub fn excluded_carriers(&self) -> Vec<usize> {
        (0..self.carriers).filter(|&idx| !self.carrier_mask[idx]).collect()
    }
}

/// Per-symbol OFDM modulator/demodulator with cyclic-prefix handling.
#[derive(Clone)]
pub struct OfdmTransform {
    geometry: FrameGeometry,
    fft: FftHelper,
}

impl OfdmTransform {
    pub fn new(geometry: FrameGeometry) -> Self {
        let fft = FftHelper::new(geometry.carriers());
        Self { geometry, fft }
    }

    pub fn geometry(&self) -> &FrameGeometry {
        &self.geometry
    }

    /// Masks, inverse-transforms and prefixes one frequency-domain symbol.
    pub fn forward(&self, symbol: ArrayView1<Complex64>) -> EngineResult<Vec<Complex64>> {
        let carriers = self.geometry.carriers();
        let guard = self.geometry.guard_length();
        if symbol.len() != carriers {
            return Err(EngineError::Validation(format!(
                "frequency symbol has {} carriers, expected {}",
                symbol.len(),
                carriers
            )));
        }

        let mut body: Vec<Complex64> = symbol
            .iter()
            .zip(self.geometry.carrier_mask())
            .map(|(&value, &active)| if active { value } else { Complex64::zero() })
            .collect();
        self.fft.inverse(&mut body);

        let mut output = Vec::with_capacity(carriers + guard);
        output.extend_from_slice(&body[carriers - guard..]);
        output.extend_from_slice(&body);
        Ok(output)
    }

    /// Strips the cyclic prefix and transforms one received symbol.
    pub fn backward(&self, samples: ArrayView1<Complex64>) -> EngineResult<Vec<Complex64>> {
        let guard = self.geometry.guard_length();
        if samples.len() != self.geometry.symbol_length() {
            return Err(EngineError::Validation(format!(
                "time symbol has {} samples, expected {}",
                samples.len(),
                self.geometry.symbol_length()
            )));
        }

        let mut spectrum: Vec<Complex64> = samples.iter().skip(guard).copied().collect();
        self.fft.forward(&mut spectrum);
        Ok(spectrum)
    }

    /// Modulates an `[M x N]` frequency block into one contiguous frame.
    pub fn modulate_frame(&self, symbols: ArrayView2<Complex64>) -> EngineResult<Vec<Complex64>> {
        self.require_block_shape(symbols, "frequency block")?;
        let mut frame = Vec::with_capacity(self.geometry.frame_length());
        for row in symbols.rows() {
            frame.extend(self.forward(row)?);
        }
        Ok(frame)
    }

    /// Splits a frame of `M * (N + N_guard)` samples into symbols and
    /// demodulates each of them into an `[M x N]` block.
    pub fn receive_frame(&self, samples: &[Complex64]) -> EngineResult<Array2<Complex64>> {
        if samples.len() != self.geometry.frame_length() {
            return Err(EngineError::Validation(format!(
                "received frame has {} samples, expected {}",
                samples.len(),
                self.geometry.frame_length()
            )));
        }

        let symbol_length = self.geometry.symbol_length();
        let mut block = Array2::zeros((self.geometry.symbols(), self.geometry.carriers()));
        for (idx, chunk) in samples.chunks(symbol_length).enumerate() {
            let spectrum = self.backward(ArrayView1::from(chunk))?;
            block
                .slice_mut(s![idx, ..])
                .assign(&ArrayView1::from(spectrum.as_slice()));
        }
        debug!(
            "received frame demodulated into {}x{} block",
            block.nrows(),
            block.ncols()
        );
        Ok(block)
    }

    pub(crate) fn require_block_shape(
        &self,
        block: ArrayView2<Complex64>,
        what: &str,
    ) -> EngineResult<()> {
        let expected = (self.geometry.symbols(), self.geometry.carriers());
        if block.dim() != expected {
            return Err(EngineError::Validation(format!(
                "{} has shape {:?}, expected {:?}",
                what,
                block.dim(),
                expected
            )));
        }
        Ok(())
    }
}
