use std::sync::Arc;

use log::warn;
use num_complex::Complex;

use crate::{AcqError, SampleBlock};
use crate::block::ResultSender;
use crate::gnss::galileo_e1::MemoryCodeBook;
use crate::gnss::signal::{Modulation, SatelliteId};
use super::{AcquisitionConfig, AcquisitionReport, AcquisitionResult, AcquisitionState, ResolvedConfig};
use super::correlator::Correlator;
use super::replica::{ReplicaCode, ReplicaGenerator};
use super::search::{SearchMachine, Step};
use super::telemetry::{AcquisitionEvent, AcquisitionObserver, LogObserver};
use super::threshold::peak_of;

#[cfg(test)]
mod tests;

struct Assignment {
	sv: SatelliteId,
	modulation: Modulation,
	resolved: ResolvedConfig,
	replica: ReplicaCode,
	correlator: Correlator,
}

/// One search channel's acquisition engine.
///
/// Samples arrive in blocks of any size and are buffered into coherent blocks of `vector_length`
/// samples, each of which is one dwell.  A gap in the sample indices throws the partial buffer away;
/// the dwell is not counted and nothing is made up to fill the hole.
pub struct AcquisitionEngine<O: AcquisitionObserver = LogObserver> {
	pub channel: usize,
	generator: ReplicaGenerator,
	results: ResultSender,
	observer: O,
	assignment: Option<Assignment>,
	machine: Option<SearchMachine>,
	buffer: Vec<Complex<f64>>,
	buffer_start_idx: usize,
	next_idx: Option<usize>,
	hint: Option<AcquisitionResult>,
	magnitude: f64,
}

impl AcquisitionEngine<LogObserver> {

	pub fn new(channel:usize, results:ResultSender) -> Self {
		Self::with_observer(channel, results, Arc::new(MemoryCodeBook::new()), LogObserver)
	}

}

impl<O: AcquisitionObserver> AcquisitionEngine<O> {

	pub fn with_observer(channel:usize, results:ResultSender, code_book:Arc<MemoryCodeBook>, observer:O) -> Self {
		Self { channel, generator: ReplicaGenerator::new(code_book), results, observer, assignment: None, machine: None,
			buffer: vec![], buffer_start_idx: 0, next_idx: None, hint: None, magnitude: 0.0 }
	}

	pub fn state(&self) -> AcquisitionState {
		self.machine.as_ref().map(|m| m.state()).unwrap_or(AcquisitionState::Idle)
	}

	pub fn satellite(&self) -> Option<SatelliteId> { self.assignment.as_ref().map(|a| a.sv) }

	pub fn resolved_config(&self) -> Option<&ResolvedConfig> { self.assignment.as_ref().map(|a| &a.resolved) }

	pub fn replica(&self) -> Option<&ReplicaCode> { self.assignment.as_ref().map(|a| &a.replica) }

	/// Last result this engine emitted, until the next reset
	pub fn hint(&self) -> Option<AcquisitionResult> { self.hint }

	/// Peak cell of the most recent dwell
	pub fn magnitude(&self) -> f64 { self.magnitude }

	pub fn observer(&self) -> &O { &self.observer }

	/// Binds the engine to a satellite.  An attempt in progress is aborted.  A configuration problem is
	/// reported here and leaves the engine unassigned, so `start` refuses until a good assignment arrives.
	pub fn assign(&mut self, sv:SatelliteId, modulation:Modulation, config:AcquisitionConfig) -> Result<&ResolvedConfig, AcqError> {
		let prepared = self.prepare(sv, modulation, &config);

		self.abort_attempt();
		self.hint = None;
		self.machine = None;

		let (resolved, fresh) = match prepared {
			Ok(p) => p,
			Err(e) => {
				self.assignment = None;
				return Err(e);
			}
		};

		let replica_regenerated = fresh.is_some();
		if let Some((replica, correlator)) = fresh {
			self.assignment = Some(Assignment { sv, modulation, resolved, replica, correlator });
		} else if let Some(a) = self.assignment.as_mut() {
			a.resolved = resolved;
		}

		let assignment = self.assignment.as_ref().ok_or(AcqError::NotAssigned)?;
		self.observer.on_event(self.channel, &AcquisitionEvent::Assigned{ sv, modulation, config: &assignment.resolved, replica_regenerated });

		Ok(&assignment.resolved)
	}

	// Resolves the configuration and builds a new replica unless the current one still fits
	fn prepare(&self, sv:SatelliteId, modulation:Modulation, config:&AcquisitionConfig) -> Result<(ResolvedConfig, Option<(ReplicaCode, Correlator)>), AcqError> {
		let resolved = config.resolve(sv, modulation)?;

		let reusable = self.assignment.as_ref().filter(|a| a.sv == sv && a.modulation == modulation
			&& a.resolved.config.sample_rate_hz == resolved.config.sample_rate_hz
			&& a.resolved.code_periods == resolved.code_periods).is_some();
		if reusable { return Ok((resolved, None)); }

		let replica = self.generator.generate(sv, modulation, resolved.config.sample_rate_hz, 0)?.tiled(resolved.code_periods);
		let correlator = Correlator::new(&replica);
		Ok((resolved, Some((replica, correlator))))
	}

	/// Begins a fresh attempt from the first Doppler bin
	pub fn start(&mut self) -> Result<(), AcqError> {
		let a = self.assignment.as_ref().ok_or(AcqError::NotAssigned)?;
		if self.state() == AcquisitionState::Searching { return Err(AcqError::AlreadySearching); }

		let cfg = &a.resolved;
		let mut machine = SearchMachine::new(cfg.grid(), cfg.threshold, cfg.config.max_dwells, cfg.config.combining);
		machine.start();

		self.buffer.clear();
		self.next_idx = None;
		self.magnitude = 0.0;
		self.machine = Some(machine);
		self.observer.on_event(self.channel, &AcquisitionEvent::Started{ sv: a.sv, num_doppler_bins: cfg.num_doppler_bins, max_dwells: cfg.config.max_dwells });
		Ok(())
	}

	/// Returns to IDLE.  An attempt in progress is dropped without a result; when idle this does nothing.
	pub fn reset(&mut self) {
		if self.machine.is_none() { return; }
		self.abort_attempt();
		self.machine = None;
		self.hint = None;
	}

	fn abort_attempt(&mut self) {
		if let (Some(m), Some(a)) = (self.machine.as_mut(), self.assignment.as_ref()) {
			if m.state() == AcquisitionState::Searching {
				let rounds = m.rounds();
				m.abort();
				self.observer.on_event(self.channel, &AcquisitionEvent::Aborted{ sv: a.sv, rounds });
			}
		}
		self.buffer.clear();
		self.next_idx = None;
	}

	/// Feeds samples in.  Returns the result if this block completed the attempt; the same result is also
	/// pushed to the result channel.
	pub fn provide_block(&mut self, block:&SampleBlock) -> Option<AcquisitionResult> {
		if self.state() != AcquisitionState::Searching { return None; }

		// Drop anything already seen, discard the partial dwell on a gap
		let mut skip:usize = 0;
		if let Some(expected) = self.next_idx {
			if block.end_idx() <= expected { return None; }
			if block.first_idx < expected {
				skip = expected - block.first_idx;
			} else if block.first_idx > expected {
				let dropped = self.buffer.len();
				self.buffer.clear();
				self.observer.on_event(self.channel, &AcquisitionEvent::SamplesDiscarded{ expected_idx: expected, got_idx: block.first_idx, dropped });
			}
		}
		if self.buffer.is_empty() { self.buffer_start_idx = block.first_idx + skip; }
		self.buffer.extend_from_slice(&block.samples[skip..]);
		self.next_idx = Some(block.end_idx());

		let vector_length = self.assignment.as_ref().map(|a| a.resolved.vector_length)?;
		while self.buffer.len() >= vector_length {
			let dwell_start_idx = self.buffer_start_idx;
			let signal:Vec<Complex<f64>> = self.buffer.drain(..vector_length).collect();
			self.buffer_start_idx += vector_length;

			if let Some(result) = self.dwell(&signal, dwell_start_idx) {
				self.buffer.clear();
				return Some(result);
			}
		}

		None
	}

	// One correlation round on the current bin
	fn dwell(&mut self, signal:&[Complex<f64>], sample_idx:usize) -> Option<AcquisitionResult> {
		let a = self.assignment.as_ref()?;
		let machine = self.machine.as_mut()?;
		let doppler_hz = machine.current_doppler()?;

		let profile = match a.correlator.correlate(signal, doppler_hz, a.resolved.config.intermediate_frequency_hz) {
			Ok(p) => p,
			Err(e) => {
				warn!("Channel {}: {} dwell at sample {} skipped, {}", self.channel, a.sv, sample_idx, e);
				return None;
			}
		};
		let (peak_lag, peak) = peak_of(&profile.values);
		self.magnitude = peak;
		let dwell = machine.dwells_on_bin() + 1;
		let threshold = machine.threshold().value();

		let step = machine.advance(&profile);
		self.observer.on_event(self.channel, &AcquisitionEvent::Dwell{ sv: a.sv, doppler_hz, dwell, peak_lag, peak, threshold, profile: &profile });

		let result = match step {
			Step::Detected(r) | Step::Exhausted(r) => r,
			Step::BinAbandoned{ doppler_hz, peak_lag:_, peak, next_hz:_ } => {
				self.observer.on_event(self.channel, &AcquisitionEvent::BinAbandoned{ sv: a.sv, doppler_hz, peak });
				return None;
			},
			Step::Dwell{ .. } | Step::Inactive => return None,
		};

		let report = AcquisitionReport{ channel: self.channel, sv: a.sv, sample_idx, result };
		self.observer.on_event(self.channel, &AcquisitionEvent::Finished(&report));
		self.results.send(report);
		self.hint = Some(result);
		Some(result)
	}

}
