use crate::AcqError;
use crate::gnss::constants::gps;
use crate::gnss::signal::Signal;

// Ten-stage shift register, state[0] is stage 1 and state[9] is stage 10
struct ShiftRegister {
	state: [bool; 10],
	feedback_taps: &'static [usize],
}

impl ShiftRegister {

	fn new(feedback_taps:&'static [usize]) -> Self { Self { state: [true; 10], feedback_taps } }

	fn stage(&self, n:usize) -> bool { self.state[n-1] }

	fn shift(&mut self) {
		let feedback:bool = self.feedback_taps.iter().fold(false, |acc, n| acc ^ self.stage(*n));
		for idx in (1..10).rev() { self.state[idx] = self.state[idx-1]; }
		self.state[0] = feedback;
	}

}

const G1_TAPS:[usize; 2] = [3, 10];
const G2_TAPS:[usize; 6] = [2, 3, 6, 8, 9, 10];

/// C/A Gold code as logic levels
pub fn prn_bits(prn:usize) -> Result<Vec<bool>, AcqError> {
	if prn < 1 || prn > gps::L1_CA_MAX_PRN {
		return Err(AcqError::UnknownPrn{ signal: Signal::GpsL1Ca, prn });
	}

	let (tap_a, tap_b) = gps::L1_CA_G2_TAPS[prn-1];
	let mut g1 = ShiftRegister::new(&G1_TAPS);
	let mut g2 = ShiftRegister::new(&G2_TAPS);

	Ok((0..gps::L1_CA_CODE_LENGTH).map(|_| {
		let bit = g1.stage(10) ^ g2.stage(tap_a) ^ g2.stage(tap_b);
		g1.shift();
		g2.shift();
		bit
	}).collect())
}

/// C/A code chips mapped to +1 (logic 0) and -1 (logic 1)
pub fn prn_int(prn:usize) -> Result<Vec<i8>, AcqError> {
	Ok(prn_bits(prn)?.into_iter().map(|b| if b { -1 } else { 1 }).collect())
}
