use anyhow::Context;
use radarcore::modulation::ConstellationScheme;
use radarcore::prelude::{ArrayConfig, OfdmConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::generator::channel::EchoTarget;

const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Pilot frame, target and noise for one range-Doppler run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfdmScenario {
    pub frame: OfdmConfig,
    pub constellation: ConstellationScheme,
    /// Seed of the pilot frame shared by transmitter and receiver.
    pub seed: u64,
    pub target: EchoTarget,
    pub noise_std: f64,
    pub noise_seed: u64,
}

impl Default for OfdmScenario {
    fn default() -> Self {
        Self {
            frame: OfdmConfig {
                carriers: 1024,
                guard_length: 256,
                border_margin: 32,
                symbols: 64,
                periodogram_carriers: None,
                periodogram_symbols: None,
            },
            constellation: ConstellationScheme::Qam { order: 16 },
            seed: 1,
            target: EchoTarget::default(),
            noise_std: 0.1,
            noise_seed: 2,
        }
    }
}

/// Single-tone emitters seen by a linear array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoaScenario {
    pub elements: usize,
    /// Element spacing in metres, half a wavelength when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_spacing: Option<f64>,
    pub carrier_hz: f64,
    pub ppm: f64,
    pub sample_rate_hz: f64,
    /// Frequency step between successive emitters.
    pub tone_spacing_hz: f64,
    pub snr_db: f64,
    pub sources_deg: Vec<f64>,
    pub snapshots: usize,
    pub calibrated: bool,
    /// Known emitter angle used to estimate element gains before the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pilot_deg: Option<f64>,
    pub seed: u64,
}

impl Default for DoaScenario {
    fn default() -> Self {
        Self {
            elements: 4,
            element_spacing: None,
            carrier_hz: 2.4e9,
            ppm: 20.0,
            sample_rate_hz: 1e6,
            tone_spacing_hz: 5e3,
            snr_db: 30.0,
            sources_deg: vec![30.0],
            snapshots: 1024,
            calibrated: true,
            pilot_deg: None,
            seed: 3,
        }
    }
}

impl DoaScenario {
    pub fn wavelength(&self) -> f64 {
        SPEED_OF_LIGHT / self.carrier_hz
    }

    pub fn array_config(&self) -> ArrayConfig {
        let wavelength = self.wavelength();
        ArrayConfig {
            elements: self.elements,
            element_spacing: self.element_spacing.unwrap_or(wavelength / 2.0),
            wavelength,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ofdm: Option<OfdmScenario>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doa: Option<DoaScenario>,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Default scenarios for whichever runs were requested on the command line.
    pub fn from_args(ofdm: bool, doa: bool) -> Self {
        Self {
            ofdm: ofdm.then(OfdmScenario::default),
            doa: doa.then(DoaScenario::default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_selects_scenarios() {
        let cfg = WorkflowConfig::from_args(true, false);
        assert_eq!(cfg.ofdm.unwrap().frame.carriers, 1024);
        assert!(cfg.doa.is_none());
    }

    #[test]
    fn half_wavelength_spacing_by_default() {
        let doa = DoaScenario::default();
        let array = doa.array_config();
        assert!((array.element_spacing / array.wavelength - 0.5).abs() < 1e-12);
        assert!((array.wavelength - 0.124913524).abs() < 1e-6);
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            concat!(
                "ofdm:\n",
                "  frame:\n",
                "    carriers: 64\n",
                "    guard_length: 16\n",
                "    border_margin: 4\n",
                "    symbols: 16\n",
                "  constellation:\n",
                "    scheme: psk\n",
                "    order: 8\n",
                "  target:\n",
                "    delay_samples: 5\n",
                "    doppler_bins: 3.0\n",
                "    amplitude: 0.5\n",
                "doa:\n",
                "  sources_deg: [-20.0, 35.0]\n",
                "  calibrated: false\n",
                "  pilot_deg: 0.0\n",
            )
            .as_bytes(),
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();

        let ofdm = cfg.ofdm.unwrap();
        assert_eq!(ofdm.frame.symbols, 16);
        assert_eq!(ofdm.constellation, ConstellationScheme::Psk { order: 8 });
        assert_eq!(ofdm.target.delay_samples, 5);
        assert_eq!(ofdm.noise_seed, 2);

        let doa = cfg.doa.unwrap();
        assert_eq!(doa.sources_deg, vec![-20.0, 35.0]);
        assert_eq!(doa.pilot_deg, Some(0.0));
        assert_eq!(doa.elements, 4);
    }

    #[test]
    fn config_load_reports_missing_file() {
        assert!(WorkflowConfig::load("/nonexistent/workflow.yaml").is_err());
    }
}
