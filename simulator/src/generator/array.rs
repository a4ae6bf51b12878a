use anyhow::ensure;
use ndarray::{Array1, Array2};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Normal, StandardNormal};
use radarcore::array::ArrayGeometry;
use std::f64::consts::PI;

/// Linear array in free space listening to far-field single-tone emitters.
///
/// The receiver oscillator is off by a random ppm error, so every source shows
/// up as a slow complex tone. An uncalibrated array also carries random
/// per-element gains `Gamma`.
pub struct SingleToneReceiverArray {
    geometry: ArrayGeometry,
    sample_rate_hz: f64,
    offset_hz: f64,
    tone_spacing_hz: f64,
    noise_std: f64,
    gains: Array1<Complex64>,
}

impl SingleToneReceiverArray {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        geometry: ArrayGeometry,
        carrier_hz: f64,
        ppm: f64,
        sample_rate_hz: f64,
        tone_spacing_hz: f64,
        snr_db: f64,
        calibrated: bool,
        rng: &mut StdRng,
    ) -> anyhow::Result<Self> {
        ensure!(carrier_hz > 0.0, "carrier frequency must be positive");
        ensure!(sample_rate_hz > 0.0, "sample rate must be positive");
        ensure!(ppm >= 0.0, "oscillator error must be non-negative");

        let deviation: f64 = rng.sample(StandardNormal);
        let offset_hz = carrier_hz * deviation * ppm / 2e6;
        let snr = 10_f64.powf(snr_db / 10.0);
        let elements = geometry.elements();
        let gains = if calibrated {
            Array1::from_elem(elements, Complex64::new(1.0, 0.0))
        } else {
            Array1::from_shape_fn(elements, |_| {
                let phase = 2.0 * PI * rng.gen::<f64>();
                Complex64::from_polar(0.9 + 0.2 * rng.gen::<f64>(), phase)
            })
        };

        Ok(Self {
            geometry,
            sample_rate_hz,
            offset_hz,
            tone_spacing_hz,
            noise_std: (1.0 / (2.0 * snr)).sqrt(),
            gains,
        })
    }

    /// Element gains applied to every received snapshot.
    pub fn gains(&self) -> &Array1<Complex64> {
        &self.gains
    }

    pub fn offset_hz(&self) -> f64 {
        self.offset_hz
    }

    /// `[m x samples]` snapshots of unit-power emitters at `angles`.
    ///
    /// Source `s` transmits `s * tone_spacing_hz` above the carrier so that
    /// distinct sources stay incoherent.
    pub fn receive(
        &self,
        angles: &[f64],
        samples: usize,
        rng: &mut StdRng,
    ) -> anyhow::Result<Array2<Complex64>> {
        ensure!(!angles.is_empty(), "at least one emitter is required");
        ensure!(samples > 0, "snapshot count must be positive");
        let noise = Normal::new(0.0, self.noise_std)?;
        let elements = self.geometry.elements();

        let mut snapshots = Array2::<Complex64>::zeros((elements, samples));
        for (source, &angle) in angles.iter().enumerate() {
            let frequency = self.offset_hz + source as f64 * self.tone_spacing_hz;
            let response = &self.geometry.phasors(angle) * &self.gains;
            for ((element, t), value) in snapshots.indexed_iter_mut() {
                let phase = 2.0 * PI * frequency * t as f64 / self.sample_rate_hz;
                *value += response[element] * Complex64::from_polar(1.0, phase);
            }
        }
        snapshots
            .mapv_inplace(|value| value + Complex64::new(noise.sample(rng), noise.sample(rng)));
        Ok(snapshots)
    }
}
