//! Symbol alphabets and index/bit-to-symbol mapping.
//!
//! Every alphabet is zero-mean with unit average energy, so frames built from
//! different schemes share the same transmit power.

use log::info;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::math::stats::StatsHelper;
use crate::prelude::{EngineError, EngineResult};

/// Closed set of supported modulation schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "lowercase")]
pub enum ConstellationScheme {
    /// Square QAM; `order` must be `4^k` for some `k >= 1`.
    Qam { order: u32 },
    /// Antipodal `[+1, -1]`.
    Bpsk,
    /// Unit-circle PSK; `order` must be a power of two, at least 2, so that
    /// every symbol carries a whole number of bits.
    Psk { order: u32 },
}

/// Immutable symbol table for one scheme.
#[derive(Debug, Clone, PartialEq)]
pub struct Constellation {
    scheme: ConstellationScheme,
    bits_per_symbol: usize,
    symbols: Vec<Complex64>,
}

impl Constellation {
    pub fn new(scheme: ConstellationScheme) -> EngineResult<Self> {
        let (bits_per_symbol, symbols) = match scheme {
            ConstellationScheme::Qam { order } => {
                let bits = power_of_two_exponent(order).filter(|bits| *bits > 0 && bits % 2 == 0);
                let bits = bits.ok_or_else(|| {
                    EngineError::Configuration(format!(
                        "invalid order {} for QAM, expected 4^k with k >= 1",
                        order
                    ))
                })?;
                (bits, normalize(square_grid(bits)))
            }
            ConstellationScheme::Bpsk => (
                1,
                vec![Complex64::new(1.0, 0.0), Complex64::new(-1.0, 0.0)],
            ),
            ConstellationScheme::Psk { order } => {
                let bits = power_of_two_exponent(order).filter(|bits| *bits > 0);
                let bits = bits.ok_or_else(|| {
                    EngineError::Configuration(format!(
                        "invalid order {} for PSK, expected a power of two >= 2",
                        order
                    ))
                })?;
                let symbols = (0..order)
                    .map(|k| Complex64::from_polar(1.0, 2.0 * PI * k as f64 / order as f64))
                    .collect();
                (bits, symbols)
            }
        };

        info!(
            "constellation {:?}: {} symbols, {} bits per symbol",
            scheme,
            symbols.len(),
            bits_per_symbol
        );

        Ok(Self {
            scheme,
            bits_per_symbol,
            symbols,
        })
    }

    pub fn scheme(&self) -> ConstellationScheme {
        self.scheme
    }

    pub fn order(&self) -> usize {
        self.symbols.len()
    }

    pub fn bits_per_symbol(&self) -> usize {
        self.bits_per_symbol
    }

    pub fn symbols(&self) -> &[Complex64] {
        &self.symbols
    }

    /// Maps data indices in `[0, order)` to their symbols.
    pub fn modulate_data(&self, data: &[i64]) -> EngineResult<Vec<Complex64>> {
        data.iter()
            .enumerate()
            .map(|(position, &value)| {
                usize::try_from(value)
                    .ok()
                    .and_then(|idx| self.symbols.get(idx).copied())
                    .ok_or_else(|| {
                        EngineError::Validation(format!(
                            "data value {} at position {} is outside [0, {})",
                            value,
                            position,
                            self.order()
                        ))
                    })
            })
            .collect()
    }

    /// Maps a bit stream, most significant bit first, to symbols.
    pub fn modulate_bits(&self, bits: &[u8]) -> EngineResult<Vec<Complex64>> {
        if let Some(position) = bits.iter().position(|&bit| bit > 1) {
            return Err(EngineError::Validation(format!(
                "bit stream holds non-binary value {} at position {}",
                bits[position], position
            )));
        }
        if bits.len() % self.bits_per_symbol != 0 {
            return Err(EngineError::Validation(format!(
                "bit stream length {} is not a multiple of {}",
                bits.len(),
                self.bits_per_symbol
            )));
        }

        let data: Vec<i64> = bits
            .chunks(self.bits_per_symbol)
            .map(|chunk| chunk.iter().fold(0_i64, |acc, &bit| (acc << 1) | i64::from(bit)))
            .collect();
        self.modulate_data(&data)
    }
}

fn power_of_two_exponent(order: u32) -> Option<usize> {
    if order.is_power_of_two() {
        Some(order.trailing_zeros() as usize)
    } else {
        None
    }
}

/// Integer lattice `x + jy` with `x, y` in `[0, 2^(bits/2))`, `x` major.
fn square_grid(bits: usize) -> Vec<Complex64> {
    let edge = 1_usize << (bits / 2);
    (0..edge)
        .flat_map(|x| (0..edge).map(move |y| Complex64::new(x as f64, y as f64)))
        .collect()
}

fn normalize(points: Vec<Complex64>) -> Vec<Complex64> {
    let centre = StatsHelper::mean(&points);
    let centred: Vec<Complex64> = points.into_iter().map(|point| point - centre).collect();
    let scale = StatsHelper::average_energy(&centred).sqrt();
    centred.into_iter().map(|point| point / scale).collect()
}
