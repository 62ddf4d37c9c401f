use super::*;
use std::f64::consts;

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::block::{result_channel, ResultReceiver};
use crate::gnss::common::acquisition::Threshold;
use crate::gnss::common::acquisition::telemetry::{Counters, CountingObserver};
use crate::gnss::signal::Signal;

const FS:f64 = 2.046e6;

fn gps(prn:usize) -> SatelliteId { SatelliteId::new(Signal::GpsL1Ca, prn) }

fn counting_engine() -> (AcquisitionEngine<CountingObserver>, ResultReceiver, Arc<Counters>) {
	let (tx, rx) = result_channel();
	let observer = CountingObserver::default();
	let counters = observer.counters.clone();
	(AcquisitionEngine::with_observer(0, tx, Arc::new(MemoryCodeBook::new()), observer), rx, counters)
}

fn quiet_config(doppler_max_hz:u32, max_dwells:u32) -> AcquisitionConfig {
	AcquisitionConfig { sample_rate_hz: FS, doppler_max_hz, doppler_step_hz: 500, max_dwells,
		fixed_threshold: Some(10.0), ..AcquisitionConfig::default() }
}

// Satellite `prn` delayed by `delay` samples at `doppler_hz`, in complex Gaussian noise of total variance `noise_var`
fn scenario(prn:usize, delay:usize, doppler_hz:f64, noise_var:f64, len:usize, seed:u64) -> Vec<Complex<f64>> {
	let code = ReplicaGenerator::default().generate(gps(prn), Modulation::Bpsk, FS, 0).unwrap();
	let period = code.len();
	let mut rng = StdRng::seed_from_u64(seed);
	let noise = Normal::new(0.0, (noise_var / 2.0).sqrt()).unwrap();

	(0..len).map(|i| {
		let phase = 2.0 * consts::PI * doppler_hz * (i as f64) / FS;
		let s = code.samples()[(i + period - (delay % period)) % period] * Complex{ re: phase.cos(), im: phase.sin() };
		s + Complex{ re: noise.sample(&mut rng), im: noise.sample(&mut rng) }
	}).collect()
}

fn noise(len:usize, seed:u64) -> Vec<Complex<f64>> {
	let mut rng = StdRng::seed_from_u64(seed);
	(0..len).map(|_| Complex{ re: rng.gen_range(-1.0..1.0), im: rng.gen_range(-1.0..1.0) }).collect()
}

// Feeds `samples` starting at absolute index `first_idx` in chunks of `chunk`; returns the first result
fn feed<O: AcquisitionObserver>(engine:&mut AcquisitionEngine<O>, first_idx:usize, samples:&[Complex<f64>], chunk:usize) -> Option<AcquisitionResult> {
	let mut result = None;
	for (k, c) in samples.chunks(chunk).enumerate() {
		let r = engine.provide_block(&SampleBlock::new(first_idx + k*chunk, c.to_vec()));
		if result.is_none() { result = r; }
	}
	result
}

#[test]
fn detects_gps_satellite_in_noise() {
	let (mut engine, mut rx, counters) = counting_engine();
	let config = AcquisitionConfig { sample_rate_hz: FS, doppler_max_hz: 5000, doppler_step_hz: 500,
		coherent_integration_ms: 2, false_alarm_probability: 1e-3, ..AcquisitionConfig::default() };

	let resolved = engine.assign(gps(1), Modulation::Bpsk, config).unwrap().clone();
	assert_eq!(resolved.vector_length, 4092);
	assert_eq!(resolved.num_doppler_bins, 21);
	assert!(matches!(resolved.threshold, Threshold::Cfar{ .. }));

	engine.start().unwrap();
	assert_eq!(engine.state(), AcquisitionState::Searching);

	let samples = scenario(1, 137, 2500.0, 10.0, 21*4092, 7);
	let result = feed(&mut engine, 0, &samples, 1000).unwrap();

	assert!(result.detected);
	assert_eq!(result.doppler_hz, 2500);
	assert_eq!(result.code_phase_samples, 137);
	assert!(result.peak_to_threshold_ratio > 1.0);
	assert_eq!(engine.state(), AcquisitionState::Detected);
	assert_eq!(engine.hint(), Some(result));
	assert!(engine.magnitude() > 0.0);

	// Bin 2500 [Hz] is the sixteenth visited
	let report = rx.try_recv().unwrap();
	assert_eq!(report.result, result);
	assert_eq!(report.sv, gps(1));
	assert_eq!(report.sample_idx, 15*4092);
	assert!(rx.try_recv().is_none());

	assert_eq!(Counters::get(&counters.attempts), 1);
	assert_eq!(Counters::get(&counters.dwells), 16);
	assert_eq!(Counters::get(&counters.detections), 1);
}

#[test]
fn noise_only_terminates_after_bins_times_dwells() {
	let (mut engine, mut rx, counters) = counting_engine();
	engine.assign(gps(7), Modulation::Bpsk, quiet_config(1000, 2)).unwrap();
	engine.start().unwrap();

	// 5 bins x 2 dwells, with a few code periods to spare
	let samples = noise(13*2046, 11);
	let result = feed(&mut engine, 0, &samples, 700).unwrap();

	assert!(!result.detected);
	assert!(result.peak_to_threshold_ratio < 1.0);
	assert_eq!(engine.state(), AcquisitionState::NotDetected);
	assert_eq!(Counters::get(&counters.dwells), 10);
	assert_eq!(Counters::get(&counters.exhaustions), 1);

	let report = rx.try_recv().unwrap();
	assert_eq!(report.sample_idx, 9*2046);
	assert!(rx.try_recv().is_none());

	// Nothing more happens until the next start
	assert_eq!(engine.provide_block(&SampleBlock::new(samples.len(), noise(4092, 12))), None);
	assert_eq!(Counters::get(&counters.dwells), 10);
}

#[test]
fn reset_aborts_without_a_result() {
	let (mut engine, mut rx, counters) = counting_engine();
	engine.assign(gps(3), Modulation::Bpsk, quiet_config(1000, 2)).unwrap();
	engine.start().unwrap();
	assert_eq!(feed(&mut engine, 0, &noise(3000, 1), 500), None);
	assert_eq!(Counters::get(&counters.dwells), 1);

	engine.reset();
	assert_eq!(engine.state(), AcquisitionState::Idle);
	assert_eq!(engine.hint(), None);
	assert!(rx.try_recv().is_none());
	assert_eq!(Counters::get(&counters.aborts), 1);

	// Idle reset does nothing
	engine.reset();
	assert_eq!(Counters::get(&counters.aborts), 1);

	// A fresh attempt starts on the first bin with an empty buffer, wherever the stream now is
	engine.start().unwrap();
	let result = feed(&mut engine, 100_000, &noise(10*2046, 2), 2046).unwrap();
	assert!(!result.detected);
	assert_eq!(Counters::get(&counters.attempts), 2);
	assert_eq!(Counters::get(&counters.dwells), 11);
	assert_eq!(rx.try_recv().map(|r| r.sample_idx), Some(100_000 + 9*2046));
}

#[test]
fn reset_clears_the_hint() {
	let (mut engine, _rx, _counters) = counting_engine();
	engine.assign(gps(3), Modulation::Bpsk, quiet_config(0, 1)).unwrap();
	engine.start().unwrap();
	let result = feed(&mut engine, 0, &noise(2046, 3), 2046);
	assert!(result.is_some());
	assert_eq!(engine.hint(), result);

	engine.reset();
	assert_eq!(engine.state(), AcquisitionState::Idle);
	assert_eq!(engine.hint(), None);
}

#[test]
fn gap_discards_partial_dwell() {
	let (mut engine, _rx, counters) = counting_engine();
	engine.assign(gps(9), Modulation::Bpsk, quiet_config(0, 3)).unwrap();
	engine.start().unwrap();

	engine.provide_block(&SampleBlock::new(0, noise(1000, 1)));
	// Samples 1000..1500 never arrive
	engine.provide_block(&SampleBlock::new(1500, noise(2046, 2)));
	assert_eq!(Counters::get(&counters.discards), 1);
	assert_eq!(Counters::get(&counters.dwells), 1);

	// Overlapping samples are skipped, not counted twice
	engine.provide_block(&SampleBlock::new(3000, noise(2046, 3)));
	assert_eq!(Counters::get(&counters.dwells), 1);
	engine.provide_block(&SampleBlock::new(5046, noise(546, 4)));
	assert_eq!(Counters::get(&counters.dwells), 2);

	// Entirely stale blocks are ignored
	engine.provide_block(&SampleBlock::new(0, noise(2046, 5)));
	assert_eq!(Counters::get(&counters.dwells), 2);
	assert_eq!(Counters::get(&counters.discards), 1);
	assert_eq!(engine.state(), AcquisitionState::Searching);
}

#[test]
fn galileo_coherent_length_is_floored() {
	let mut rng = StdRng::seed_from_u64(5);
	let sv = SatelliteId::new(Signal::GalileoE1B, 11);
	let mut book = MemoryCodeBook::new();
	book.insert(sv, (0..4092).map(|_| if rng.gen::<bool>() { 1 } else { -1 }).collect()).unwrap();

	let (tx, _rx) = result_channel();
	let mut engine = AcquisitionEngine::with_observer(4, tx, Arc::new(book), ());
	let config = AcquisitionConfig { coherent_integration_ms: 10, fixed_threshold: Some(0.05), ..AcquisitionConfig::default() };

	let resolved = engine.assign(sv, Modulation::Cboc, config).unwrap();
	assert_eq!(resolved.config.coherent_integration_ms, 8);
	assert_eq!(resolved.truncated_from_ms, Some(10));
	assert_eq!(resolved.vector_length, 32000);
	assert_eq!(engine.replica().map(|r| r.len()), Some(32000));
}

#[test]
fn detects_galileo_cboc_pilot() {
	let fs = 4.0e6;
	let sv = SatelliteId::new(Signal::GalileoE1C, 19);
	let mut rng = StdRng::seed_from_u64(23);
	let mut book = MemoryCodeBook::new();
	book.insert(sv, (0..4092).map(|_| if rng.gen::<bool>() { 1 } else { -1 }).collect()).unwrap();
	let book = Arc::new(book);

	let (tx, mut rx) = result_channel();
	let mut engine = AcquisitionEngine::with_observer(2, tx, book.clone(), ());
	let config = AcquisitionConfig { sample_rate_hz: fs, doppler_max_hz: 5000, doppler_step_hz: 500,
		coherent_integration_ms: 10, false_alarm_probability: 1e-3, ..AcquisitionConfig::default() };

	let resolved = engine.assign(sv, Modulation::Cboc, config).unwrap().clone();
	assert_eq!(resolved.config.coherent_integration_ms, 8);
	assert_eq!(resolved.samples_per_code, 16000);
	assert_eq!(resolved.vector_length, 2*16000);
	engine.start().unwrap();

	// Pilot delayed by 137 samples at +2500 [Hz]; the 500 [Hz] neighbours sit on nulls of the 8 [ms] integration
	let code = ReplicaGenerator::new(book).generate(sv, Modulation::Cboc, fs, 0).unwrap();
	let period = code.len();
	let noise = Normal::new(0.0, (10.0f64 / 2.0).sqrt()).unwrap();
	let samples:Vec<Complex<f64>> = (0..16*32000).map(|i| {
		let phase = 2.0 * consts::PI * 2500.0 * (i as f64) / fs;
		let s = code.samples()[(i + period - 137) % period] * Complex{ re: phase.cos(), im: phase.sin() };
		s + Complex{ re: noise.sample(&mut rng), im: noise.sample(&mut rng) }
	}).collect();

	let result = feed(&mut engine, 0, &samples, 5000).unwrap();
	assert!(result.detected);
	assert_eq!(result.doppler_hz, 2500);
	assert_eq!(result.code_phase_samples, 137);

	let report = rx.try_recv().unwrap();
	assert_eq!(report.sv, sv);
	assert_eq!(report.channel, 2);
	assert_eq!(report.sample_idx, 15*32000);
}

#[test]
fn configuration_errors_surface_at_assignment() {
	let (mut engine, _rx, _counters) = counting_engine();
	assert_eq!(engine.start(), Err(AcqError::NotAssigned));

	let bad_length = AcquisitionConfig { coherent_integration_ms: 0, ..quiet_config(1000, 1) };
	assert_eq!(engine.assign(gps(1), Modulation::Bpsk, bad_length).err(),
		Some(AcqError::InvalidCoherentLength{ requested_ms: 0, period_ms: 1 }));

	let no_threshold = AcquisitionConfig { fixed_threshold: None, ..quiet_config(1000, 1) };
	assert_eq!(engine.assign(gps(1), Modulation::Bpsk, no_threshold).err(), Some(AcqError::MissingFixedThreshold(0.0)));

	assert_eq!(engine.assign(gps(33), Modulation::Bpsk, quiet_config(1000, 1)).err(),
		Some(AcqError::UnknownPrn{ signal: Signal::GpsL1Ca, prn: 33 }));
	assert_eq!(engine.assign(gps(1), Modulation::Cboc, quiet_config(1000, 1)).err(),
		Some(AcqError::UnsupportedModulation{ signal: Signal::GpsL1Ca, modulation: Modulation::Cboc }));

	let missing_code = SatelliteId::new(Signal::GalileoE1C, 2);
	let galileo = AcquisitionConfig { coherent_integration_ms: 4, ..quiet_config(1000, 1) };
	assert_eq!(engine.assign(missing_code, Modulation::Cboc, galileo).err(),
		Some(AcqError::MissingMemoryCode{ signal: Signal::GalileoE1C, prn: 2 }));

	let too_fast = AcquisitionConfig { sample_rate_hz: 1e30, ..quiet_config(1000, 1) };
	assert_eq!(engine.assign(gps(1), Modulation::Bpsk, too_fast).err(), Some(AcqError::InvalidSampleRate(1e30)));

	// A failed assignment drops the previous one
	engine.assign(gps(4), Modulation::Bpsk, quiet_config(1000, 1)).unwrap();
	assert!(engine.assign(gps(40), Modulation::Bpsk, quiet_config(1000, 1)).is_err());
	assert_eq!(engine.satellite(), None);
	assert!(engine.replica().is_none());
	assert_eq!(engine.start(), Err(AcqError::NotAssigned));

	engine.assign(gps(4), Modulation::Bpsk, quiet_config(1000, 1)).unwrap();
	engine.start().unwrap();
	assert_eq!(engine.start(), Err(AcqError::AlreadySearching));
}

#[test]
fn failed_reassignment_aborts_and_unassigns() {
	let (mut engine, mut rx, counters) = counting_engine();
	engine.assign(gps(5), Modulation::Bpsk, quiet_config(1000, 2)).unwrap();
	engine.start().unwrap();
	feed(&mut engine, 0, &noise(2046, 1), 2046);
	assert_eq!(engine.state(), AcquisitionState::Searching);

	let bad = AcquisitionConfig { max_dwells: 0, ..quiet_config(1000, 2) };
	assert_eq!(engine.assign(gps(5), Modulation::Bpsk, bad).err(), Some(AcqError::InvalidDwellCount));
	assert_eq!(engine.state(), AcquisitionState::Idle);
	assert_eq!(Counters::get(&counters.aborts), 1);
	assert_eq!(engine.satellite(), None);
	assert_eq!(engine.hint(), None);

	// Samples are ignored until a good assignment and a start
	assert_eq!(feed(&mut engine, 2046, &noise(20*2046, 2), 2046), None);
	assert!(rx.try_recv().is_none());
	assert_eq!(engine.start(), Err(AcqError::NotAssigned));
}

#[derive(Default)]
struct Regenerations(Vec<bool>);

impl AcquisitionObserver for Regenerations {
	fn on_event(&mut self, _channel:usize, event:&AcquisitionEvent) {
		if let AcquisitionEvent::Assigned{ replica_regenerated, .. } = event { self.0.push(*replica_regenerated); }
	}
}

#[test]
fn replica_is_rebuilt_only_when_needed() {
	let (tx, _rx) = result_channel();
	let mut engine = AcquisitionEngine::with_observer(1, tx, Arc::new(MemoryCodeBook::new()), Regenerations::default());

	engine.assign(gps(2), Modulation::Bpsk, quiet_config(1000, 1)).unwrap();
	// Only the search parameters change
	engine.assign(gps(2), Modulation::Bpsk, quiet_config(3000, 4)).unwrap();
	assert_eq!(engine.resolved_config().map(|r| r.num_doppler_bins), Some(13));
	engine.assign(gps(3), Modulation::Bpsk, quiet_config(3000, 4)).unwrap();
	engine.assign(gps(3), Modulation::Bpsk, AcquisitionConfig { coherent_integration_ms: 2, ..quiet_config(3000, 4) }).unwrap();

	assert_eq!(engine.observer().0, vec![true, false, true, true]);
	assert_eq!(engine.replica().map(|r| r.len()), Some(4092));
}

#[test]
fn reassignment_aborts_the_running_attempt() {
	let (mut engine, mut rx, counters) = counting_engine();
	engine.assign(gps(5), Modulation::Bpsk, quiet_config(1000, 2)).unwrap();
	engine.start().unwrap();
	feed(&mut engine, 0, &noise(2046, 1), 2046);

	engine.assign(gps(6), Modulation::Bpsk, quiet_config(1000, 2)).unwrap();
	assert_eq!(engine.state(), AcquisitionState::Idle);
	assert_eq!(Counters::get(&counters.aborts), 1);
	assert!(rx.try_recv().is_none());
}
