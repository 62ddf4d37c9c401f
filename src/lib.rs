use num_complex::Complex;

pub mod block;
pub mod config;
pub mod error;
pub mod io;
pub mod gnss;

pub use error::AcqError;

/// A contiguous run of baseband samples along with the absolute index of its first sample
#[derive(Debug, Clone)]
pub struct SampleBlock {
	pub first_idx: usize,
	pub samples: Vec<Complex<f64>>,
}

impl SampleBlock {

	pub fn new(first_idx:usize, samples:Vec<Complex<f64>>) -> Self { Self { first_idx, samples } }

	pub fn len(&self) -> usize { self.samples.len() }

	pub fn is_empty(&self) -> bool { self.samples.is_empty() }

	/// Index one past the last sample in this block
	pub fn end_idx(&self) -> usize { self.first_idx + self.samples.len() }

}
