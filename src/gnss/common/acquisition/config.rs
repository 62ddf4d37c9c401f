use std::path::PathBuf;

use serde::{Serialize, Deserialize};

use crate::AcqError;
use crate::gnss::signal::{Modulation, SatelliteId};
use super::doppler::DopplerGrid;
use super::dwell::CombiningMode;
use super::replica::samples_per_code;
use super::threshold::{cfar_threshold, Threshold};

pub const DEFAULT_SAMPLE_RATE_HZ:f64 = 4.0e6;
pub const DEFAULT_DOPPLER_MAX_HZ:u32 = 5000;
pub const DEFAULT_DOPPLER_STEP_HZ:u32 = 500;

/// Highest sample rate accepted, well above any front end this engine is fed from
pub const MAX_SAMPLE_RATE_HZ:f64 = 1.0e9;
/// Longest coherent block, in samples, the engine will buffer and transform
pub const MAX_VECTOR_LENGTH:usize = 1 << 26;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
	pub sample_rate_hz: f64,
	pub intermediate_frequency_hz: f64,
	pub doppler_max_hz: u32,
	pub doppler_step_hz: u32,
	pub coherent_integration_ms: u32,
	pub max_dwells: u32,
	/// Zero selects `fixed_threshold`
	pub false_alarm_probability: f64,
	/// Compared against the dwell-averaged statistic (accumulated sum divided by the dwells so far), so the
	/// same value holds for any `max_dwells`.  In `Magnitude` combining the statistic is a magnitude, not a power.
	pub fixed_threshold: Option<f64>,
	pub combining: CombiningMode,
	pub dump_filename: Option<PathBuf>,
}

impl Default for AcquisitionConfig {
	fn default() -> Self {
		Self {
			sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
			intermediate_frequency_hz: 0.0,
			doppler_max_hz: DEFAULT_DOPPLER_MAX_HZ,
			doppler_step_hz: DEFAULT_DOPPLER_STEP_HZ,
			coherent_integration_ms: 1,
			max_dwells: 1,
			false_alarm_probability: 0.0,
			fixed_threshold: None,
			combining: CombiningMode::Power,
			dump_filename: None,
		}
	}
}

/// The configuration as it will actually run for one satellite, with every correction applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConfig {
	pub config: AcquisitionConfig,
	/// Requested coherent length when it had to be floored to a whole number of code periods
	pub truncated_from_ms: Option<u32>,
	/// Set when pfa = 1 fell back to the fixed threshold
	pub threshold_fallback: bool,
	pub samples_per_code: usize,
	pub code_periods: usize,
	pub vector_length: usize,
	pub num_doppler_bins: usize,
	pub threshold: Threshold,
}

impl ResolvedConfig {

	pub fn grid(&self) -> DopplerGrid {
		DopplerGrid{ max_hz: self.config.doppler_max_hz, step_hz: self.config.doppler_step_hz }
	}

}

impl AcquisitionConfig {

	/// Validates the configuration for `sv` and applies the coherent length and threshold rules
	pub fn resolve(&self, sv:SatelliteId, modulation:Modulation) -> Result<ResolvedConfig, AcqError> {
		sv.check(modulation)?;

		let fs = self.sample_rate_hz;
		if !(fs.is_finite() && fs > 0.0 && fs <= MAX_SAMPLE_RATE_HZ) { return Err(AcqError::InvalidSampleRate(fs)); }
		if !self.intermediate_frequency_hz.is_finite() { return Err(AcqError::InvalidIntermediateFrequency(self.intermediate_frequency_hz)); }

		let spc = samples_per_code(sv.signal, fs);
		if spc < sv.signal.code_length_chips() { return Err(AcqError::SampleRateTooLow(fs)); }

		let grid = DopplerGrid::new(self.doppler_max_hz, self.doppler_step_hz)?;
		if self.max_dwells < 1 { return Err(AcqError::InvalidDwellCount); }

		let period_ms = sv.signal.code_period_ms();
		let code_periods = (self.coherent_integration_ms / period_ms) as usize;
		if code_periods == 0 {
			return Err(AcqError::InvalidCoherentLength{ requested_ms: self.coherent_integration_ms, period_ms });
		}
		let vector_length = spc.checked_mul(code_periods).filter(|n| *n <= MAX_VECTOR_LENGTH)
			.ok_or(AcqError::CoherentBlockTooLong{ samples_per_code: spc, code_periods })?;
		let used_ms = (code_periods as u32) * period_ms;
		let truncated_from_ms = if used_ms != self.coherent_integration_ms { Some(self.coherent_integration_ms) } else { None };

		let (threshold, threshold_fallback) = self.resolve_threshold(grid.len(), spc)?;

		let mut config = self.clone();
		config.coherent_integration_ms = used_ms;

		Ok(ResolvedConfig { config, truncated_from_ms, threshold_fallback, samples_per_code: spc, code_periods,
			vector_length, num_doppler_bins: grid.len(), threshold })
	}

	fn resolve_threshold(&self, num_doppler_bins:usize, profile_length:usize) -> Result<(Threshold, bool), AcqError> {
		let pfa = self.false_alarm_probability;
		if !(pfa >= 0.0 && pfa <= 1.0) { return Err(AcqError::InvalidFalseAlarmProbability(pfa)); }

		let fixed = match self.fixed_threshold {
			Some(t) if t.is_finite() && t >= 0.0 => Some(t),
			Some(_) => return Err(AcqError::MissingFixedThreshold(pfa)),
			None => None,
		};

		if pfa == 0.0 {
			fixed.map(|t| (Threshold::Fixed(t), false)).ok_or(AcqError::MissingFixedThreshold(pfa))
		} else if pfa == 1.0 {
			fixed.map(|t| (Threshold::Fixed(t), true)).ok_or(AcqError::MissingFixedThreshold(pfa))
		} else if self.combining != CombiningMode::Power {
			Err(AcqError::IncompatibleCombining)
		} else {
			Ok((cfar_threshold(pfa, num_doppler_bins, profile_length), false))
		}
	}

}
