use std::sync::Arc;

use num_complex::Complex;

use crate::AcqError;
use crate::gnss::galileo_e1::{self, MemoryCodeBook};
use crate::gnss::gps_l1_ca;
use crate::gnss::signal::{Modulation, SatelliteId, Signal};
use super::config::MAX_SAMPLE_RATE_HZ;

/// Local reference waveform; `samples` holds `periods` back-to-back copies of one code period
#[derive(Debug, Clone)]
pub struct ReplicaCode {
	pub sv: SatelliteId,
	pub modulation: Modulation,
	pub sample_rate_hz: f64,
	pub samples_per_code: usize,
	pub periods: usize,
	samples: Vec<Complex<f64>>,
}

impl ReplicaCode {

	pub fn samples(&self) -> &[Complex<f64>] { &self.samples }

	pub fn len(&self) -> usize { self.samples.len() }

	pub fn is_empty(&self) -> bool { self.samples.is_empty() }

	/// One code period of the waveform
	pub fn period(&self) -> &[Complex<f64>] { &self.samples[..self.samples_per_code] }

	/// Repeats the single period end to end; the period is exactly periodic so the seams are continuous
	pub fn tiled(&self, periods:usize) -> ReplicaCode {
		let periods = periods.max(1);
		let one = self.period();
		let mut samples:Vec<Complex<f64>> = Vec::with_capacity(one.len() * periods);
		for _ in 0..periods { samples.extend_from_slice(one); }
		ReplicaCode { sv: self.sv, modulation: self.modulation, sample_rate_hz: self.sample_rate_hz,
			samples_per_code: self.samples_per_code, periods, samples }
	}

}

/// Number of samples spanning one code period at `fs`
pub fn samples_per_code(signal:Signal, fs:f64) -> usize {
	(fs * (signal.code_period_ms() as f64) / 1000.0).round() as usize
}

/// Produces replicas for any supported signal; Galileo memory codes come from the shared code book
#[derive(Debug, Clone, Default)]
pub struct ReplicaGenerator {
	code_book: Arc<MemoryCodeBook>,
}

impl ReplicaGenerator {

	pub fn new(code_book:Arc<MemoryCodeBook>) -> Self { Self { code_book } }

	fn primary_code(&self, sv:&SatelliteId) -> Result<Vec<i8>, AcqError> { match sv.signal {
		Signal::GpsL1Ca => gps_l1_ca::signal_modulation::prn_int(sv.prn),
		Signal::GalileoE1B | Signal::GalileoE1C => self.code_book.chips(sv).map(|c| c.to_vec()),
	}}

	/// Single code period sampled at `fs`, starting `code_phase_offset` chips into the code
	pub fn generate(&self, sv:SatelliteId, modulation:Modulation, fs:f64, code_phase_offset:usize) -> Result<ReplicaCode, AcqError> {
		if !(fs.is_finite() && fs > 0.0 && fs <= MAX_SAMPLE_RATE_HZ) { return Err(AcqError::InvalidSampleRate(fs)); }
		sv.check(modulation)?;

		let code:Vec<i8> = self.primary_code(&sv)?;
		let n_chips:usize = code.len();
		let n_samples:usize = samples_per_code(sv.signal, fs);
		if n_samples < n_chips { return Err(AcqError::SampleRateTooLow(fs)); }

		let chips_per_sample:f64 = (n_chips as f64) / (n_samples as f64);
		let samples:Vec<Complex<f64>> = (0..n_samples).map(|i| {
			let chip_phase:f64 = (i as f64) * chips_per_sample;
			let whole:usize = chip_phase.floor() as usize;
			let frac:f64 = chip_phase - (whole as f64);
			let chip:f64 = code[(whole + code_phase_offset) % n_chips] as f64;
			Complex{ re: chip * galileo_e1::signal_modulation::subcarrier(sv.signal, modulation, frac), im: 0.0 }
		}).collect();

		Ok(ReplicaCode { sv, modulation, sample_rate_hz: fs, samples_per_code: n_samples, periods: 1, samples })
	}

}
