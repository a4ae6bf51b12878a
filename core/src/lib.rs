//! Signal-processing core for OFDM radar ranging and array direction finding.
//!
//! The OFDM chain turns a received frame and its known pilot symbols into a
//! range-Doppler periodogram. The array chain turns element snapshots into a
//! spatial covariance, splits it into signal and noise subspaces, and feeds
//! the MUSIC, ESPRIT and gain-calibration estimators. Every operation is a
//! pure computation over caller-owned buffers.

pub mod array;
pub mod math;
pub mod modulation;
pub mod ofdm;
pub mod prelude;

pub use prelude::{AngleEstimator, EngineError, EngineResult};
