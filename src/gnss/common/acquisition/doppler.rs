use crate::AcqError;

/// A single frequency hypothesis in [Hz]
pub type DopplerBin = i32;

/// The finite set of Doppler hypotheses tested during one acquisition attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DopplerGrid {
	pub max_hz: u32,
	pub step_hz: u32,
}

impl DopplerGrid {

	pub fn new(max_hz:u32, step_hz:u32) -> Result<Self, AcqError> {
		if step_hz == 0 || max_hz > (i32::MAX as u32) {
			return Err(AcqError::InvalidDopplerGrid{ max_hz, step_hz });
		}
		Ok(Self { max_hz, step_hz })
	}

	/// 2*floor(max/step) + 1, used directly in the false alarm threshold
	pub fn len(&self) -> usize { 2 * (self.max_hz / self.step_hz) as usize + 1 }

	pub fn is_empty(&self) -> bool { false }

	pub fn bin(&self, idx:usize) -> Option<DopplerBin> {
		if idx < self.len() {
			Some((-(self.max_hz as i64) + (idx as i64) * (self.step_hz as i64)) as DopplerBin)
		} else { None }
	}

	/// Ascending from -max, never past +max
	pub fn iter(&self) -> impl Iterator<Item = DopplerBin> {
		let grid = *self;
		(0..grid.len()).filter_map(move |idx| grid.bin(idx))
	}

	pub fn enumerate(max_hz:u32, step_hz:u32) -> Result<Vec<DopplerBin>, AcqError> {
		Ok(Self::new(max_hz, step_hz)?.iter().collect())
	}

}
