use serde::{Serialize, Deserialize};

use super::correlator::CorrelationProfile;
use super::threshold::peak_of;

/// How successive dwells on the same Doppler bin are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombiningMode {
	/// Sum of squared magnitudes, the profile cells as produced by the correlator
	Power,
	/// Sum of magnitudes
	Magnitude,
}

impl Default for CombiningMode {
	fn default() -> Self { CombiningMode::Power }
}

/// Running non-coherent sum for the current Doppler bin
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulatedStatistic {
	pub sum: Vec<f64>,
	pub dwells: u32,
}

impl AccumulatedStatistic {

	/// Dwell-averaged cells; keeps the noise-only mean of each cell independent of the dwell count
	pub fn mean(&self) -> Vec<f64> {
		let n = self.dwells.max(1) as f64;
		self.sum.iter().map(|v| v / n).collect()
	}

	pub fn peak(&self) -> (usize, f64) {
		let (lag, peak) = peak_of(&self.sum);
		(lag, peak / (self.dwells.max(1) as f64))
	}

}

#[derive(Debug, Clone)]
pub struct DwellAccumulator {
	pub mode: CombiningMode,
	statistic: AccumulatedStatistic,
}

impl DwellAccumulator {

	pub fn new(mode:CombiningMode) -> Self {
		Self { mode, statistic: AccumulatedStatistic{ sum: vec![], dwells: 0 } }
	}

	pub fn accumulate(&mut self, profile:&CorrelationProfile) -> &AccumulatedStatistic {
		if self.statistic.dwells == 0 || self.statistic.sum.len() != profile.len() {
			self.statistic.sum = vec![0.0; profile.len()];
			self.statistic.dwells = 0;
		}

		let mode = self.mode;
		for (acc, v) in self.statistic.sum.iter_mut().zip(profile.values.iter()) {
			*acc += match mode {
				CombiningMode::Power     => *v,
				CombiningMode::Magnitude => v.sqrt(),
			};
		}
		self.statistic.dwells += 1;

		&self.statistic
	}

	pub fn reset(&mut self) {
		self.statistic.sum.iter_mut().for_each(|v| *v = 0.0);
		self.statistic.dwells = 0;
	}

	pub fn dwells(&self) -> u32 { self.statistic.dwells }

	pub fn statistic(&self) -> &AccumulatedStatistic { &self.statistic }

}
