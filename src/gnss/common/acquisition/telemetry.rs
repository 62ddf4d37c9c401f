use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, info, warn};

use crate::gnss::signal::{Modulation, SatelliteId};
use super::{AcquisitionReport, ResolvedConfig};
use super::correlator::CorrelationProfile;
use super::doppler::DopplerBin;

/// State transitions and per-dwell detail emitted by an engine.  The decision logic never sees these.
#[derive(Debug)]
pub enum AcquisitionEvent<'a> {
	Assigned{ sv:SatelliteId, modulation:Modulation, config:&'a ResolvedConfig, replica_regenerated:bool },
	Started{ sv:SatelliteId, num_doppler_bins:usize, max_dwells:u32 },
	Dwell{ sv:SatelliteId, doppler_hz:DopplerBin, dwell:u32, peak_lag:usize, peak:f64, threshold:Option<f64>, profile:&'a CorrelationProfile },
	BinAbandoned{ sv:SatelliteId, doppler_hz:DopplerBin, peak:f64 },
	Finished(&'a AcquisitionReport),
	Aborted{ sv:SatelliteId, rounds:usize },
	SamplesDiscarded{ expected_idx:usize, got_idx:usize, dropped:usize },
}

pub trait AcquisitionObserver {
	fn on_event(&mut self, channel:usize, event:&AcquisitionEvent);
}

impl AcquisitionObserver for () {
	fn on_event(&mut self, _channel:usize, _event:&AcquisitionEvent) {}
}

impl<A: AcquisitionObserver, B: AcquisitionObserver> AcquisitionObserver for (A, B) {
	fn on_event(&mut self, channel:usize, event:&AcquisitionEvent) {
		self.0.on_event(channel, event);
		self.1.on_event(channel, event);
	}
}

impl<O: AcquisitionObserver> AcquisitionObserver for Option<O> {
	fn on_event(&mut self, channel:usize, event:&AcquisitionEvent) {
		if let Some(o) = self.as_mut() { o.on_event(channel, event); }
	}
}

/// Forwards events to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl AcquisitionObserver for LogObserver {

	fn on_event(&mut self, channel:usize, event:&AcquisitionEvent) { match event {
		AcquisitionEvent::Assigned{ sv, modulation, config, replica_regenerated } => {
			if let Some(requested) = config.truncated_from_ms {
				warn!("Channel {}: coherent integration should be a multiple of the {} code period; {} [ms] requested, {} [ms] will be used",
					channel, sv.signal, requested, config.config.coherent_integration_ms);
			}
			if config.threshold_fallback {
				warn!("Channel {}: false alarm probability of 1 cannot be met, using the fixed threshold {:?}", channel, config.threshold);
			}
			info!("Channel {}: assigned {} {:?}, {} samples/code, vector length {}, {} Doppler bins, threshold {:?}{}",
				channel, sv, modulation, config.samples_per_code, config.vector_length, config.num_doppler_bins, config.threshold,
				if *replica_regenerated { ", replica regenerated" } else { "" });
		},
		AcquisitionEvent::Started{ sv, num_doppler_bins, max_dwells } =>
			info!("Channel {}: searching for {} over {} bins x {} dwells", channel, sv, num_doppler_bins, max_dwells),
		AcquisitionEvent::Dwell{ sv, doppler_hz, dwell, peak_lag, peak, threshold, profile:_ } =>
			debug!("Channel {}: {} {:6} [Hz] dwell {} peak {:.6} at {} (threshold {:?})", channel, sv, doppler_hz, dwell, peak, peak_lag, threshold),
		AcquisitionEvent::BinAbandoned{ sv, doppler_hz, peak } =>
			debug!("Channel {}: {} abandoning {} [Hz], best {:.6}", channel, sv, doppler_hz, peak),
		AcquisitionEvent::Finished(report) => {
			let r = &report.result;
			if r.detected {
				info!("Channel {}: {} detected at {} [Hz], code phase {} [samples], peak/threshold {:.3}",
					channel, report.sv, r.doppler_hz, r.code_phase_samples, r.peak_to_threshold_ratio);
			} else {
				info!("Channel {}: {} not detected (strongest {} [Hz], {} [samples], peak/threshold {:.3})",
					channel, report.sv, r.doppler_hz, r.code_phase_samples, r.peak_to_threshold_ratio);
			}
		},
		AcquisitionEvent::Aborted{ sv, rounds } =>
			info!("Channel {}: search for {} aborted after {} dwells", channel, sv, rounds),
		AcquisitionEvent::SamplesDiscarded{ expected_idx, got_idx, dropped } =>
			warn!("Channel {}: expected sample {} but got {}, discarded {} buffered samples", channel, expected_idx, got_idx, dropped),
	}}

}

/// Shared counters, readable while the engine runs elsewhere
#[derive(Debug, Default)]
pub struct Counters {
	pub attempts: AtomicU64,
	pub dwells: AtomicU64,
	pub detections: AtomicU64,
	pub exhaustions: AtomicU64,
	pub aborts: AtomicU64,
	pub discards: AtomicU64,
}

impl Counters {
	pub fn get(counter:&AtomicU64) -> u64 { counter.load(Ordering::Relaxed) }
}

#[derive(Debug, Default, Clone)]
pub struct CountingObserver {
	pub counters: Arc<Counters>,
}

impl AcquisitionObserver for CountingObserver {

	fn on_event(&mut self, _channel:usize, event:&AcquisitionEvent) {
		let c = &self.counters;
		let counter = match event {
			AcquisitionEvent::Started{ .. } => &c.attempts,
			AcquisitionEvent::Dwell{ .. } => &c.dwells,
			AcquisitionEvent::Finished(r) if r.result.detected => &c.detections,
			AcquisitionEvent::Finished(_) => &c.exhaustions,
			AcquisitionEvent::Aborted{ .. } => &c.aborts,
			AcquisitionEvent::SamplesDiscarded{ .. } => &c.discards,
			_ => return,
		};
		counter.fetch_add(1, Ordering::Relaxed);
	}

}
