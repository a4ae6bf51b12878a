use crate::generator::array::SingleToneReceiverArray;
use crate::generator::channel::EchoChannel;
use crate::workflow::config::{DoaScenario, OfdmScenario, WorkflowConfig};
use anyhow::Context;
use log::info;
use radarcore::array::{
    covariance, separate_subspaces, CalibrationEstimator, CalibrationTracker, EspritEstimator,
    MusicEstimator,
};
use radarcore::modulation::Constellation;
use radarcore::ofdm::{ChannelEstimator, OfdmTransform, ReferenceFrame};
use radarcore::AngleEstimator;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
pub struct OfdmReport {
    pub range_bins: usize,
    pub doppler_bins: usize,
    /// Strongest periodogram cell as `(range bin, signed Doppler bin)`.
    pub peak: Option<(usize, isize)>,
    /// Cell the simulated target should occupy.
    pub expected: (usize, isize),
    pub peak_power: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct DoaReport {
    pub truth_deg: Vec<f64>,
    pub music_deg: Vec<f64>,
    pub esprit_deg: Vec<f64>,
    pub signal_eigenvalues: Vec<f64>,
    pub noise_eigenvalues: Vec<f64>,
    /// Simulated element gains relative to element 0, as `(magnitude, phase
    /// in degrees)`.
    pub array_gains: Vec<(f64, f64)>,
    /// Estimated gains in the same form, when a pilot calibration ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calibration: Option<Vec<(f64, f64)>>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct WorkflowResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ofdm: Option<OfdmReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doa: Option<DoaReport>,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> anyhow::Result<WorkflowResult> {
        let ofdm = self
            .config
            .ofdm
            .as_ref()
            .map(|scenario| self.execute_ofdm(scenario).context("running OFDM scenario"))
            .transpose()?;
        let doa = self
            .config
            .doa
            .as_ref()
            .map(|scenario| self.execute_doa(scenario).context("running DOA scenario"))
            .transpose()?;
        Ok(WorkflowResult { ofdm, doa })
    }

    pub fn execute_ofdm(&self, scenario: &OfdmScenario) -> anyhow::Result<OfdmReport> {
        let geometry = scenario.frame.geometry().context("building frame geometry")?;
        let size = scenario
            .frame
            .periodogram_size(&geometry)
            .context("sizing periodogram")?;
        let constellation =
            Constellation::new(scenario.constellation).context("building constellation")?;
        let transform = OfdmTransform::new(geometry.clone());
        let reference = ReferenceFrame::generate(&transform, &constellation, scenario.seed)
            .context("generating reference frame")?;

        let channel = EchoChannel::new(&geometry, scenario.target.clone(), scenario.noise_std)?;
        let mut rng = StdRng::seed_from_u64(scenario.noise_seed);
        let received = channel.propagate(&reference.samples, &mut rng)?;

        let estimator =
            ChannelEstimator::with_size(transform, size).context("sizing channel estimator")?;
        let periodogram = estimator
            .periodogram(reference.symbols.view(), &received)
            .context("computing periodogram")?;
        let peak = periodogram.peak();
        let peak_power = peak
            .map(|(range, doppler)| {
                let column = (doppler + (periodogram.doppler_bins() / 2) as isize) as usize;
                periodogram.data()[[range, column]].norm_sqr()
            })
            .unwrap_or(0.0);

        let range_scale = size.carriers() as f64 / geometry.carriers() as f64;
        let doppler_scale = size.symbols() as f64 / geometry.symbols() as f64;
        let expected = (
            (scenario.target.delay_samples as f64 * range_scale).round() as usize,
            (scenario.target.doppler_bins * doppler_scale).round() as isize,
        );
        info!(
            "ofdm periodogram {}x{}: peak {:?}, expected {:?}",
            periodogram.range_bins(),
            periodogram.doppler_bins(),
            peak,
            expected
        );

        Ok(OfdmReport {
            range_bins: periodogram.range_bins(),
            doppler_bins: periodogram.doppler_bins(),
            peak,
            expected,
            peak_power,
        })
    }

    pub fn execute_doa(&self, scenario: &DoaScenario) -> anyhow::Result<DoaReport> {
        let geometry = scenario
            .array_config()
            .geometry()
            .context("building array geometry")?;
        let mut rng = StdRng::seed_from_u64(scenario.seed);
        let receiver = SingleToneReceiverArray::new(
            geometry,
            scenario.carrier_hz,
            scenario.ppm,
            scenario.sample_rate_hz,
            scenario.tone_spacing_hz,
            scenario.snr_db,
            scenario.calibrated,
            &mut rng,
        )?;
        info!("receiver oscillator offset {:.1} Hz", receiver.offset_hz());

        let mut tracker = CalibrationTracker::new(geometry.elements());
        let calibration = match scenario.pilot_deg {
            Some(pilot_deg) => {
                let pilot = pilot_deg.to_radians();
                let snapshots = receiver.receive(&[pilot], scenario.snapshots, &mut rng)?;
                let estimate = CalibrationEstimator::new(geometry)
                    .estimate(snapshots.view(), pilot, 1)
                    .context("estimating element gains")?;
                let current = tracker.update(&estimate.normalized()?)?;
                Some(
                    current
                        .gains()
                        .iter()
                        .map(|gain| (gain.norm(), gain.arg().to_degrees()))
                        .collect(),
                )
            }
            None => None,
        };

        let angles: Vec<f64> = scenario.sources_deg.iter().map(|deg| deg.to_radians()).collect();
        let snapshots = receiver.receive(&angles, scenario.snapshots, &mut rng)?;
        let correction = tracker.current().correction_matrix()?;
        let r = covariance(snapshots.view(), Some(correction.view()))?;
        let partition = separate_subspaces(r.view(), angles.len())?;

        let estimators: [(&str, Box<dyn AngleEstimator>); 2] = [
            ("music", Box::new(MusicEstimator::new(geometry))),
            ("esprit", Box::new(EspritEstimator::new(geometry))),
        ];
        let mut results = Vec::with_capacity(estimators.len());
        for (name, estimator) in estimators.iter() {
            let mut degrees: Vec<f64> = estimator
                .estimate_angles(&partition)
                .with_context(|| format!("estimating angles with {}", name))?
                .into_iter()
                .map(f64::to_degrees)
                .collect();
            degrees.sort_by(|a, b| a.total_cmp(b));
            info!("{} angles {:?} deg", name, degrees);
            results.push(degrees);
        }
        let esprit_deg = results.pop().unwrap_or_default();
        let music_deg = results.pop().unwrap_or_default();

        let reference = receiver.gains()[0];
        let array_gains = receiver
            .gains()
            .iter()
            .map(|gain| {
                let relative = gain / reference;
                (relative.norm(), relative.arg().to_degrees())
            })
            .collect();

        let mut truth_deg = scenario.sources_deg.clone();
        truth_deg.sort_by(|a, b| a.total_cmp(b));

        Ok(DoaReport {
            truth_deg,
            music_deg,
            esprit_deg,
            signal_eigenvalues: partition.signal_values().to_vec(),
            noise_eigenvalues: partition.noise_values().to_vec(),
            array_gains,
            calibration,
        })
    }
}
