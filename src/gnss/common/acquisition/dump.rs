use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use log::warn;
use serde::Serialize;

use super::telemetry::{AcquisitionEvent, AcquisitionObserver};

#[derive(Debug, Serialize)]
struct DwellRecord<'a> {
	channel: usize,
	prn: usize,
	doppler_hz: i32,
	dwell: u32,
	threshold: Option<f64>,
	peak: f64,
	peak_lag: usize,
	profile: &'a [f64],
}

/// Appends every dwell's correlation profile as one JSON line
pub struct ProfileDump<W: Write> {
	dst: Option<W>,
}

impl ProfileDump<BufWriter<File>> {

	pub fn create<P: AsRef<Path>>(path:P) -> io::Result<Self> {
		Ok(Self::new(BufWriter::new(File::create(path)?)))
	}

}

impl<W: Write> ProfileDump<W> {

	pub fn new(dst:W) -> Self { Self { dst: Some(dst) } }

	pub fn into_inner(mut self) -> Option<W> {
		if let Some(dst) = self.dst.as_mut() { let _ = dst.flush(); }
		self.dst.take()
	}

}

impl<W: Write> AcquisitionObserver for ProfileDump<W> {

	fn on_event(&mut self, channel:usize, event:&AcquisitionEvent) {
		let record = match event {
			AcquisitionEvent::Dwell{ sv, doppler_hz, dwell, peak_lag, peak, threshold, profile } => DwellRecord {
				channel, prn: sv.prn, doppler_hz: *doppler_hz, dwell: *dwell, threshold: *threshold,
				peak: *peak, peak_lag: *peak_lag, profile: &profile.values },
			_ => return,
		};

		if let Some(dst) = self.dst.as_mut() {
			let written = serde_json::to_writer(&mut *dst, &record).map_err(io::Error::from).and_then(|_| dst.write_all(b"\n"));
			if let Err(e) = written {
				// Stop dumping rather than fail the search
				warn!("Channel {}: profile dump disabled, {}", channel, e);
				self.dst = None;
			}
		}
	}

}

impl<W: Write> Drop for ProfileDump<W> {
	fn drop(&mut self) {
		if let Some(dst) = self.dst.as_mut() { let _ = dst.flush(); }
	}
}
