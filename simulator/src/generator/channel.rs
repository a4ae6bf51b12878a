use anyhow::ensure;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use radarcore::ofdm::FrameGeometry;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Point target seen by the OFDM radar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoTarget {
    /// Round-trip delay in samples; must not exceed the cyclic prefix.
    pub delay_samples: usize,
    /// Phase progression per frame, in Doppler bins (`cycles / M` per symbol).
    pub doppler_bins: f64,
    pub amplitude: f64,
}

impl Default for EchoTarget {
    fn default() -> Self {
        Self {
            delay_samples: 4,
            doppler_bins: 2.0,
            amplitude: 1.0,
        }
    }
}

/// Single-target echo channel with additive complex Gaussian noise.
pub struct EchoChannel<'a> {
    geometry: &'a FrameGeometry,
    target: EchoTarget,
    noise_std: f64,
}

impl<'a> EchoChannel<'a> {
    pub fn new(
        geometry: &'a FrameGeometry,
        target: EchoTarget,
        noise_std: f64,
    ) -> anyhow::Result<Self> {
        ensure!(
            target.delay_samples <= geometry.guard_length(),
            "target delay {} exceeds the {}-sample cyclic prefix",
            target.delay_samples,
            geometry.guard_length()
        );
        ensure!(noise_std >= 0.0, "noise deviation must be non-negative");
        Ok(Self {
            geometry,
            target,
            noise_std,
        })
    }

    /// Delays, Doppler-rotates and scales the transmitted frame, then adds
    /// noise drawn from `rng`.
    pub fn propagate(
        &self,
        frame: &[Complex64],
        rng: &mut StdRng,
    ) -> anyhow::Result<Vec<Complex64>> {
        ensure!(
            frame.len() == self.geometry.frame_length(),
            "frame has {} samples, expected {}",
            frame.len(),
            self.geometry.frame_length()
        );
        let noise = Normal::new(0.0, self.noise_std / 2.0_f64.sqrt())?;
        let symbol_length = self.geometry.symbol_length();
        let symbols = self.geometry.symbols() as f64;
        let delay = self.target.delay_samples;

        Ok((0..frame.len())
            .map(|n| {
                let delayed = if n >= delay {
                    frame[n - delay]
                } else {
                    Complex64::new(0.0, 0.0)
                };
                let symbol = (n / symbol_length) as f64;
                let rotation = Complex64::from_polar(
                    self.target.amplitude,
                    2.0 * PI * self.target.doppler_bins * symbol / symbols,
                );
                delayed * rotation + Complex64::new(noise.sample(rng), noise.sample(rng))
            })
            .collect())
    }
}
