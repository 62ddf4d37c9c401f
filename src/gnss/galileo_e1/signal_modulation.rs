use std::collections::{BTreeMap, HashMap};
use std::io::Read;

use serde::{Serialize, Deserialize};

use crate::AcqError;
use crate::gnss::constants::galileo;
use crate::gnss::signal::{Modulation, SatelliteId, Signal};

// On-disk layout: PRN -> ICD hex string, one table per component
#[derive(Debug, Default, Serialize, Deserialize)]
struct CodeBookFile {
	#[serde(default)]
	e1b: BTreeMap<usize, String>,
	#[serde(default)]
	e1c: BTreeMap<usize, String>,
}

/// Galileo E1 primary codes, which are memory codes rather than shift register outputs
#[derive(Debug, Clone, Default)]
pub struct MemoryCodeBook {
	codes: HashMap<SatelliteId, Vec<i8>>,
}

impl MemoryCodeBook {

	pub fn new() -> Self { Self::default() }

	pub fn from_reader<R: Read>(src:R) -> Result<Self, AcqError> {
		let file:CodeBookFile = serde_json::from_reader(src).map_err(|e| AcqError::InvalidMemoryCode(e.to_string()))?;
		let mut book = Self::new();
		for (prn, hex) in file.e1b.iter() { book.insert_hex(SatelliteId::new(Signal::GalileoE1B, *prn), hex)?; }
		for (prn, hex) in file.e1c.iter() { book.insert_hex(SatelliteId::new(Signal::GalileoE1C, *prn), hex)?; }
		Ok(book)
	}

	pub fn from_json(s:&str) -> Result<Self, AcqError> { Self::from_reader(s.as_bytes()) }

	pub fn insert_hex(&mut self, sv:SatelliteId, hex:&str) -> Result<(), AcqError> {
		let chips = hex_to_chips(hex)?;
		self.insert(sv, chips)
	}

	pub fn insert(&mut self, sv:SatelliteId, chips:Vec<i8>) -> Result<(), AcqError> {
		match sv.signal {
			Signal::GalileoE1B | Signal::GalileoE1C => (),
			other => return Err(AcqError::InvalidMemoryCode(format!("{} does not use memory codes", other))),
		}
		if sv.prn < 1 || sv.prn > galileo::E1_MAX_PRN {
			return Err(AcqError::UnknownPrn{ signal: sv.signal, prn: sv.prn });
		}
		if chips.len() != galileo::E1_CODE_LENGTH {
			return Err(AcqError::InvalidMemoryCode(format!("expected {} chips, got {}", galileo::E1_CODE_LENGTH, chips.len())));
		}
		self.codes.insert(sv, chips);
		Ok(())
	}

	pub fn chips(&self, sv:&SatelliteId) -> Result<&[i8], AcqError> {
		self.codes.get(sv).map(|v| v.as_slice()).ok_or(AcqError::MissingMemoryCode{ signal: sv.signal, prn: sv.prn })
	}

	pub fn len(&self) -> usize { self.codes.len() }

	pub fn is_empty(&self) -> bool { self.codes.is_empty() }

}

/// Expands an ICD hex string, most significant bit first, into +1 (logic 0) / -1 (logic 1) chips
pub fn hex_to_chips(hex:&str) -> Result<Vec<i8>, AcqError> {
	let hex = hex.trim();
	if hex.len() != galileo::E1_CODE_HEX_DIGITS {
		return Err(AcqError::InvalidMemoryCode(format!("expected {} hex digits, got {}", galileo::E1_CODE_HEX_DIGITS, hex.len())));
	}

	let mut chips:Vec<i8> = Vec::with_capacity(galileo::E1_CODE_LENGTH);
	for c in hex.chars() {
		let nibble = c.to_digit(16).ok_or_else(|| AcqError::InvalidMemoryCode(format!("'{}' is not a hex digit", c)))?;
		for bit in (0..4).rev() {
			chips.push(if (nibble >> bit) & 1 == 1 { -1 } else { 1 });
		}
	}
	Ok(chips)
}

fn boc11(chip_frac:f64) -> f64 { if chip_frac < 0.5 { 1.0 } else { -1.0 } }

fn boc61(chip_frac:f64) -> f64 { if ((chip_frac * 12.0) as usize) % 2 == 0 { 1.0 } else { -1.0 } }

/// Sub-carrier value at a fractional position within a chip, in [0, 1)
pub fn subcarrier(signal:Signal, modulation:Modulation, chip_frac:f64) -> f64 {
	match modulation {
		Modulation::Bpsk  => 1.0,
		Modulation::Boc11 => boc11(chip_frac),
		Modulation::Cboc  => {
			let sign = match signal {
				Signal::GalileoE1C => -1.0,
				_ => 1.0,
			};
			galileo::CBOC_ALPHA * boc11(chip_frac) + sign * galileo::CBOC_BETA * boc61(chip_frac)
		},
	}
}
