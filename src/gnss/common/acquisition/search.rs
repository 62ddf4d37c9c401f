use super::{AcquisitionResult, AcquisitionState};
use super::correlator::CorrelationProfile;
use super::doppler::{DopplerBin, DopplerGrid};
use super::dwell::{CombiningMode, DwellAccumulator};
use super::threshold::{Decision, Threshold};

/// What happened as a result of one dwell round
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
	/// Below threshold with dwells left on this bin
	Dwell{ doppler_hz:DopplerBin, dwell:u32, peak_lag:usize, peak:f64 },
	/// Dwell budget spent on `doppler_hz`; the search moved on to `next_hz`
	BinAbandoned{ doppler_hz:DopplerBin, peak_lag:usize, peak:f64, next_hz:DopplerBin },
	Detected(AcquisitionResult),
	Exhausted(AcquisitionResult),
	/// No attempt is in progress, the profile was not consumed
	Inactive,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
	doppler_hz: DopplerBin,
	lag: usize,
	peak: f64,
}

/// Sequential detection over the Doppler grid with a per-bin dwell budget.
///
/// Owns nothing but bookkeeping: correlation happens elsewhere and profiles are fed in one dwell at a
/// time, in grid order, which keeps the outcome reproducible however the correlations were computed.
#[derive(Debug, Clone)]
pub struct SearchMachine {
	grid: DopplerGrid,
	threshold: Threshold,
	max_dwells: u32,
	accumulator: DwellAccumulator,
	bin_idx: usize,
	rounds: usize,
	state: AcquisitionState,
	best: Option<Candidate>,
}

impl SearchMachine {

	pub fn new(grid:DopplerGrid, threshold:Threshold, max_dwells:u32, combining:CombiningMode) -> Self {
		Self { grid, threshold, max_dwells: max_dwells.max(1), accumulator: DwellAccumulator::new(combining),
			bin_idx: 0, rounds: 0, state: AcquisitionState::Idle, best: None }
	}

	pub fn state(&self) -> AcquisitionState { self.state }

	pub fn rounds(&self) -> usize { self.rounds }

	pub fn threshold(&self) -> Threshold { self.threshold }

	/// Upper bound on dwell rounds before the machine must terminate
	pub fn max_rounds(&self) -> usize { self.grid.len() * (self.max_dwells as usize) }

	/// Doppler hypothesis the next profile must be computed for
	pub fn current_doppler(&self) -> Option<DopplerBin> { match self.state {
		AcquisitionState::Searching => self.grid.bin(self.bin_idx),
		_ => None,
	}}

	pub fn dwells_on_bin(&self) -> u32 { self.accumulator.dwells() }

	/// Begins a fresh attempt; nothing carries over from a previous one
	pub fn start(&mut self) {
		self.accumulator.reset();
		self.bin_idx = 0;
		self.rounds = 0;
		self.best = None;
		self.state = AcquisitionState::Searching;
	}

	/// Drops any attempt in progress without producing a result
	pub fn abort(&mut self) {
		self.accumulator.reset();
		self.bin_idx = 0;
		self.best = None;
		self.state = AcquisitionState::Idle;
	}

	pub fn advance(&mut self, profile:&CorrelationProfile) -> Step {
		let doppler_hz = match self.current_doppler() {
			Some(d) => d,
			None => return Step::Inactive,
		};

		let statistic = self.accumulator.accumulate(profile);
		let dwell = statistic.dwells;
		let mean = statistic.mean();
		self.rounds += 1;

		match self.threshold.decide(&mean) {
			Decision::Detected{ lag, peak:_, ratio } => {
				self.state = AcquisitionState::Detected;
				Step::Detected(AcquisitionResult{ detected: true, doppler_hz, code_phase_samples: lag, peak_to_threshold_ratio: ratio })
			},
			Decision::Below{ lag, peak } => {
				let stronger = self.best.map(|b| peak > b.peak).unwrap_or(true);
				if stronger { self.best = Some(Candidate{ doppler_hz, lag, peak }); }

				if dwell < self.max_dwells {
					return Step::Dwell{ doppler_hz, dwell, peak_lag: lag, peak };
				}

				self.accumulator.reset();
				self.bin_idx += 1;
				match self.grid.bin(self.bin_idx) {
					Some(next_hz) => Step::BinAbandoned{ doppler_hz, peak_lag: lag, peak, next_hz },
					None => {
						self.state = AcquisitionState::NotDetected;
						let best = self.best.unwrap_or(Candidate{ doppler_hz, lag, peak });
						Step::Exhausted(AcquisitionResult{ detected: false, doppler_hz: best.doppler_hz,
							code_phase_samples: best.lag, peak_to_threshold_ratio: self.threshold.ratio(best.peak) })
					}
				}
			}
		}
	}

}
