use serde::{Serialize, Deserialize};

use crate::gnss::signal::SatelliteId;

pub mod config;
pub mod correlator;
pub mod doppler;
pub mod dump;
pub mod dwell;
pub mod engine;
pub mod replica;
pub mod search;
pub mod telemetry;
pub mod threshold;

pub use self::config::{AcquisitionConfig, ResolvedConfig};
pub use self::doppler::{DopplerBin, DopplerGrid};
pub use self::dwell::CombiningMode;
pub use self::engine::AcquisitionEngine;
pub use self::threshold::Threshold;

/// Outcome of one acquisition attempt; emitted exactly once per attempt that is not aborted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionResult {
	pub detected: bool,
	pub doppler_hz: DopplerBin,
	pub code_phase_samples: usize,
	/// `f64::INFINITY` when a fixed threshold of zero is crossed
	pub peak_to_threshold_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcquisitionState {
	Idle,
	Searching,
	Detected,
	NotDetected,
}

/// What travels from an engine to its owning channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionReport {
	pub channel: usize,
	pub sv: SatelliteId,
	/// Absolute index of the first sample of the dwell that produced the decision
	pub sample_idx: usize,
	pub result: AcquisitionResult,
}
