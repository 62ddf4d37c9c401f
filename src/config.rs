use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};

use crate::AcqError;
use crate::gnss::common::acquisition::AcquisitionConfig;
use crate::gnss::galileo_e1::MemoryCodeBook;
use crate::gnss::signal::{Modulation, SatelliteId, Signal};
use crate::io::SampleFormat;

/// One search channel: which satellite it looks for and anything it does differently from the rest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
	pub signal: Signal,
	pub prn: usize,
	#[serde(default)]
	pub modulation: Option<Modulation>,
	/// Replaces the shared false alarm probability unless absent or zero
	#[serde(default)]
	pub false_alarm_probability: Option<f64>,
}

impl ChannelConfig {

	pub fn new(signal:Signal, prn:usize) -> Self {
		Self { signal, prn, modulation: None, false_alarm_probability: None }
	}

	pub fn satellite(&self) -> SatelliteId { SatelliteId::new(self.signal, self.prn) }

	pub fn modulation(&self) -> Modulation { self.modulation.unwrap_or_else(|| self.signal.default_modulation()) }

}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
	pub acquisition: AcquisitionConfig,
	pub code_book: Option<PathBuf>,
	pub sample_format: SampleFormat,
	pub channels: Vec<ChannelConfig>,
}

impl ReceiverConfig {

	pub fn from_reader<R: Read>(src:R) -> serde_json::Result<Self> { serde_json::from_reader(src) }

	pub fn load<P: AsRef<Path>>(path:P) -> io::Result<Self> {
		let f = BufReader::new(File::open(path)?);
		Self::from_reader(f).map_err(io::Error::from)
	}

	/// Acquisition settings for channel `idx` with its overrides applied
	pub fn acquisition_for(&self, idx:usize) -> AcquisitionConfig {
		let mut config = self.acquisition.clone();
		let pfa_override = self.channels.get(idx).and_then(|c| c.false_alarm_probability).filter(|pfa| *pfa != 0.0);
		if let Some(pfa) = pfa_override { config.false_alarm_probability = pfa; }
		config
	}

	/// Galileo memory codes, empty when no code book is configured
	pub fn load_code_book(&self) -> Result<MemoryCodeBook, AcqError> {
		match &self.code_book {
			Some(path) => {
				let f = File::open(path).map_err(|e| AcqError::InvalidMemoryCode(format!("{}: {}", path.display(), e)))?;
				MemoryCodeBook::from_reader(BufReader::new(f))
			},
			None => Ok(MemoryCodeBook::new()),
		}
	}

}

#[cfg(test)]
mod tests {
	use super::*;

	const RECEIVER_JSON:&str = r#"{
		"acquisition": { "sample_rate_hz": 4092000.0, "doppler_max_hz": 6000, "false_alarm_probability": 0.001 },
		"sample_format": "cbyte",
		"channels": [
			{ "signal": "gps_l1_ca", "prn": 3 },
			{ "signal": "galileo_e1b", "prn": 11, "modulation": "boc11", "false_alarm_probability": 0.0001 },
			{ "signal": "gps_l1_ca", "prn": 8, "false_alarm_probability": 0.0 }
		]
	}"#;

	#[test]
	fn parses_receiver_json() {
		let config = ReceiverConfig::from_reader(RECEIVER_JSON.as_bytes()).unwrap();
		assert_eq!(config.sample_format, SampleFormat::ComplexI8);
		assert_eq!(config.acquisition.sample_rate_hz, 4.092e6);
		assert_eq!(config.acquisition.doppler_max_hz, 6000);
		// Unspecified fields keep their defaults
		assert_eq!(config.acquisition.doppler_step_hz, 500);
		assert_eq!(config.code_book, None);

		assert_eq!(config.channels.len(), 3);
		assert_eq!(config.channels[0].satellite(), SatelliteId::new(Signal::GpsL1Ca, 3));
		assert_eq!(config.channels[0].modulation(), Modulation::Bpsk);
		assert_eq!(config.channels[1].modulation(), Modulation::Boc11);
	}

	#[test]
	fn per_channel_false_alarm_probability() {
		let config = ReceiverConfig::from_reader(RECEIVER_JSON.as_bytes()).unwrap();
		assert_eq!(config.acquisition_for(0).false_alarm_probability, 1e-3);
		assert_eq!(config.acquisition_for(1).false_alarm_probability, 1e-4);
		// Zero means "use the shared value"
		assert_eq!(config.acquisition_for(2).false_alarm_probability, 1e-3);
		assert_eq!(config.acquisition_for(9), config.acquisition);
	}

	#[test]
	fn missing_code_book_file_is_reported() {
		let config = ReceiverConfig { code_book: Some(PathBuf::from("/nonexistent/e1_codes.json")), ..ReceiverConfig::default() };
		assert!(matches!(config.load_code_book(), Err(AcqError::InvalidMemoryCode(_))));
		assert!(ReceiverConfig::default().load_code_book().unwrap().is_empty());
	}

}
