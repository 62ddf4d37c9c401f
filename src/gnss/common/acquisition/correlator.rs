use std::f64::consts;
use std::sync::Arc;

use rustfft::{Fft, FftPlanner};
use num_complex::Complex;

use crate::AcqError;
use super::replica::ReplicaCode;

/// Non-negative cell values, one per code phase lag over a single code period
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationProfile {
	pub values: Vec<f64>,
}

impl CorrelationProfile {

	pub fn len(&self) -> usize { self.values.len() }

	pub fn is_empty(&self) -> bool { self.values.is_empty() }

}

/// Parallel code phase search over one coherent block.  Holds the conjugated spectrum of the replica so
/// each correlation is a forward FFT, a multiply and an inverse FFT.  `correlate` takes `&self` and
/// allocates its own working buffers, so one correlator can serve several threads at once.
pub struct Correlator {
	pub fs: f64,
	pub len_fft: usize,
	pub profile_len: usize,
	fft: Arc<dyn Fft<f64>>,
	ifft: Arc<dyn Fft<f64>>,
	local_code_freq_domain: Vec<Complex<f64>>,
}

impl std::fmt::Debug for Correlator {
	fn fmt(&self, f:&mut std::fmt::Formatter) -> std::fmt::Result {
		f.debug_struct("Correlator").field("fs", &self.fs).field("len_fft", &self.len_fft).field("profile_len", &self.profile_len).finish()
	}
}

impl Correlator {

	pub fn new(replica:&ReplicaCode) -> Self {
		let len_fft:usize = replica.len();

		let mut planner = FftPlanner::<f64>::new();
		let fft  = planner.plan_fft_forward(len_fft);
		let ifft = planner.plan_fft_inverse(len_fft);

		let mut local_code:Vec<Complex<f64>> = replica.samples().to_vec();
		fft.process(&mut local_code);
		let local_code_freq_domain:Vec<Complex<f64>> = local_code.into_iter().map(|p| p.conj()).collect();

		Self { fs: replica.sample_rate_hz, len_fft, profile_len: replica.samples_per_code, fft, ifft, local_code_freq_domain }
	}

	/// Wipes off the carrier at `intermediate_frequency_hz + doppler_hz` and correlates against the replica.
	///
	/// Each cell is |c|^2 / (P * N) with P the block power and N the profile length, which under noise
	/// alone is exponentially distributed with rate N.
	pub fn correlate(&self, block:&[Complex<f64>], doppler_hz:i32, intermediate_frequency_hz:f64) -> Result<CorrelationProfile, AcqError> {
		if block.len() != self.len_fft {
			return Err(AcqError::BlockLength{ expected: self.len_fft, got: block.len() });
		}

		// Wipe the carrier off the input signal
		let phase_step_rad:f64 = (-2.0 * consts::PI * (intermediate_frequency_hz + doppler_hz as f64)) / self.fs;
		let mut buffer:Vec<Complex<f64>> = block.iter().enumerate().map(|(idx, x)| {
			let phase = phase_step_rad * (idx as f64);
			x * Complex{ re: phase.cos(), im: phase.sin() }
		}).collect();

		let input_power_total:f64 = buffer.iter().map(|c| c.norm_sqr()).sum();
		if !(input_power_total > 0.0) {
			return Ok(CorrelationProfile{ values: vec![0.0; self.profile_len] });
		}

		// Multiplication in the frequency domain is circular correlation in the time domain
		self.fft.process(&mut buffer);
		for (a, b) in buffer.iter_mut().zip(self.local_code_freq_domain.iter()) { *a *= b; }
		self.ifft.process(&mut buffer);

		// rustfft leaves the inverse unnormalized, so the correlation is buffer / len_fft
		let scale:f64 = 1.0 / ((self.len_fft as f64) * (self.len_fft as f64) * input_power_total * (self.profile_len as f64));
		let values:Vec<f64> = buffer[..self.profile_len].iter().map(|c| c.norm_sqr() * scale).collect();

		Ok(CorrelationProfile{ values })
	}

}

#[cfg(test)]
mod tests {
	use super::*;
	use std::thread;

	use rand::SeedableRng;
	use rand::rngs::StdRng;
	use rand_distr::{Distribution, Normal};

	use crate::gnss::common::acquisition::replica::ReplicaGenerator;
	use crate::gnss::common::acquisition::threshold::peak_of;
	use crate::gnss::signal::{Modulation, SatelliteId, Signal};

	const FS:f64 = 2.046e6;

	fn gps_replica(prn:usize, periods:usize) -> ReplicaCode {
		ReplicaGenerator::default().generate(SatelliteId::new(Signal::GpsL1Ca, prn), Modulation::Bpsk, FS, 0).unwrap().tiled(periods)
	}

	fn delayed_signal(replica:&ReplicaCode, delay:usize, doppler_hz:f64) -> Vec<Complex<f64>> {
		let n = replica.len();
		(0..n).map(|i| {
			let phase = 2.0 * consts::PI * doppler_hz * (i as f64) / FS;
			replica.samples()[(i + n - delay) % n] * Complex{ re: phase.cos(), im: phase.sin() }
		}).collect()
	}

	#[test]
	fn finds_code_phase_and_doppler() {
		let replica = gps_replica(5, 1);
		let correlator = Correlator::new(&replica);
		let signal = delayed_signal(&replica, 321, 1500.0);

		let on = correlator.correlate(&signal, 1500, 0.0).unwrap();
		assert_eq!(on.len(), 2046);
		let (lag, peak) = peak_of(&on.values);
		assert_eq!(lag, 321);
		// Noise-free and perfectly aligned, |c|^2 = L^2 and P = L, so the cell is 1
		assert!((peak - 1.0).abs() < 1e-9, "peak {}", peak);

		let off = correlator.correlate(&signal, -1500, 0.0).unwrap();
		assert!(peak_of(&off.values).1 < 0.05);
	}

	#[test]
	fn intermediate_frequency_is_removed() {
		let replica = gps_replica(5, 1);
		let correlator = Correlator::new(&replica);
		let signal = delayed_signal(&replica, 10, 4000.0 + 500.0);
		let profile = correlator.correlate(&signal, 500, 4000.0).unwrap();
		assert_eq!(peak_of(&profile.values).0, 10);
	}

	#[test]
	fn profile_spans_one_code_period() {
		let replica = gps_replica(1, 4);
		let correlator = Correlator::new(&replica);
		assert_eq!(correlator.len_fft, 4 * 2046);
		let signal = delayed_signal(&replica, 2046 + 77, 0.0);
		let profile = correlator.correlate(&signal, 0, 0.0).unwrap();
		assert_eq!(profile.len(), 2046);
		assert_eq!(peak_of(&profile.values).0, 77);
	}

	#[test]
	fn noise_cells_have_mean_one_over_n() {
		let replica = gps_replica(12, 1);
		let correlator = Correlator::new(&replica);
		let mut rng = StdRng::seed_from_u64(7);
		let normal = Normal::new(0.0, 1.0).unwrap();

		let mut total = 0.0;
		let trials = 20;
		for _ in 0..trials {
			let noise:Vec<Complex<f64>> = (0..replica.len()).map(|_| Complex{ re: normal.sample(&mut rng), im: normal.sample(&mut rng) }).collect();
			let profile = correlator.correlate(&noise, 0, 0.0).unwrap();
			total += profile.values.iter().sum::<f64>() / (profile.len() as f64);
		}
		let mean = total / (trials as f64);
		let expected = 1.0 / 2046.0;
		assert!((mean - expected).abs() / expected < 0.05, "mean {} expected {}", mean, expected);
	}

	#[test]
	fn silent_block_and_wrong_length() {
		let replica = gps_replica(2, 1);
		let correlator = Correlator::new(&replica);
		let zeros = vec![Complex{ re: 0.0, im: 0.0 }; replica.len()];
		assert!(correlator.correlate(&zeros, 0, 0.0).unwrap().values.iter().all(|v| *v == 0.0));
		assert_eq!(correlator.correlate(&zeros[1..], 0, 0.0), Err(AcqError::BlockLength{ expected: 2046, got: 2045 }));
	}

	#[test]
	fn concurrent_bins_match_sequential() {
		let replica = gps_replica(21, 1);
		let correlator = Arc::new(Correlator::new(&replica));
		let signal = Arc::new(delayed_signal(&replica, 900, 2000.0));
		let bins:Vec<i32> = vec![-2000, 0, 2000, 4000];

		let sequential:Vec<CorrelationProfile> = bins.iter().map(|b| correlator.correlate(&signal, *b, 0.0).unwrap()).collect();
		let handles:Vec<_> = bins.iter().map(|b| {
			let (c, s, b) = (correlator.clone(), signal.clone(), *b);
			thread::spawn(move || c.correlate(&s, b, 0.0).unwrap())
		}).collect();
		let parallel:Vec<CorrelationProfile> = handles.into_iter().map(|h| h.join().unwrap()).collect();

		assert_eq!(sequential, parallel);
	}

}
