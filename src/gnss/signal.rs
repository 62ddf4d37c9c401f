use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Deserialize};

use crate::AcqError;
use crate::gnss::constants::{gps, galileo};

/// The spreading codes this receiver knows how to replicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
	#[serde(rename = "gps_l1_ca")]
	GpsL1Ca,
	#[serde(rename = "galileo_e1b")]
	GalileoE1B,
	#[serde(rename = "galileo_e1c")]
	GalileoE1C,
}

/// Sub-carrier applied on top of the primary code chips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modulation {
	Bpsk,
	Boc11,
	Cboc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SatelliteId {
	pub signal: Signal,
	pub prn: usize,
}

impl Signal {

	pub fn chip_rate_hz(&self) -> f64 { match self {
		Signal::GpsL1Ca => gps::L1_CA_CHIP_RATE_HZ,
		Signal::GalileoE1B | Signal::GalileoE1C => galileo::E1_CHIP_RATE_HZ,
	}}

	pub fn code_length_chips(&self) -> usize { match self {
		Signal::GpsL1Ca => gps::L1_CA_CODE_LENGTH,
		Signal::GalileoE1B | Signal::GalileoE1C => galileo::E1_CODE_LENGTH,
	}}

	pub fn code_period_ms(&self) -> u32 { match self {
		Signal::GpsL1Ca => gps::L1_CA_CODE_PERIOD_MS,
		Signal::GalileoE1B | Signal::GalileoE1C => galileo::E1_CODE_PERIOD_MS,
	}}

	pub fn max_prn(&self) -> usize { match self {
		Signal::GpsL1Ca => gps::L1_CA_MAX_PRN,
		Signal::GalileoE1B | Signal::GalileoE1C => galileo::E1_MAX_PRN,
	}}

	pub fn supports(&self, modulation:Modulation) -> bool { match (self, modulation) {
		(Signal::GpsL1Ca, Modulation::Bpsk) => true,
		(Signal::GalileoE1B, Modulation::Boc11) | (Signal::GalileoE1B, Modulation::Cboc) => true,
		(Signal::GalileoE1C, Modulation::Boc11) | (Signal::GalileoE1C, Modulation::Cboc) => true,
		_ => false,
	}}

	/// Modulation used when none is requested explicitly
	pub fn default_modulation(&self) -> Modulation { match self {
		Signal::GpsL1Ca => Modulation::Bpsk,
		Signal::GalileoE1B | Signal::GalileoE1C => Modulation::Boc11,
	}}

}

impl SatelliteId {

	pub fn new(signal:Signal, prn:usize) -> Self { Self { signal, prn } }

	/// Rejects PRNs outside the signal's range and modulations the signal does not carry
	pub fn check(&self, modulation:Modulation) -> Result<(), AcqError> {
		if self.prn < 1 || self.prn > self.signal.max_prn() {
			return Err(AcqError::UnknownPrn{ signal: self.signal, prn: self.prn });
		}
		if !self.signal.supports(modulation) {
			return Err(AcqError::UnsupportedModulation{ signal: self.signal, modulation });
		}
		Ok(())
	}

}

impl fmt::Display for SatelliteId {

	fn fmt(&self, f:&mut fmt::Formatter) -> fmt::Result {
		let prefix = match self.signal {
			Signal::GpsL1Ca    => "G",
			Signal::GalileoE1B => "E",
			Signal::GalileoE1C => "E",
		};
		write!(f, "{}{:02} ({})", prefix, self.prn, self.signal)
	}

}

impl fmt::Display for Signal {

	fn fmt(&self, f:&mut fmt::Formatter) -> fmt::Result {
		let name = match self {
			Signal::GpsL1Ca    => "gps_l1_ca",
			Signal::GalileoE1B => "galileo_e1b",
			Signal::GalileoE1C => "galileo_e1c",
		};
		f.write_str(name)
	}

}

impl FromStr for Signal {
	type Err = AcqError;

	fn from_str(s:&str) -> Result<Self, Self::Err> { match s {
		"gps_l1_ca"   | "1C" => Ok(Signal::GpsL1Ca),
		"galileo_e1b" | "1B" => Ok(Signal::GalileoE1B),
		"galileo_e1c"        => Ok(Signal::GalileoE1C),
		other => Err(AcqError::UnknownSignal(other.to_string())),
	}}

}

impl FromStr for Modulation {
	type Err = AcqError;

	fn from_str(s:&str) -> Result<Self, Self::Err> { match s {
		"bpsk"  => Ok(Modulation::Bpsk),
		"boc11" => Ok(Modulation::Boc11),
		"cboc"  => Ok(Modulation::Cboc),
		other => Err(AcqError::UnknownModulation(other.to_string())),
	}}

}
