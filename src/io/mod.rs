use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read};
use std::path::Path;
use std::str::FromStr;

use byteorder::{ByteOrder, LittleEndian};
use log::warn;
use num_complex::Complex;
use serde::{Serialize, Deserialize};

use crate::{AcqError, SampleBlock};

pub const DEFAULT_BLOCK_SIZE:usize = 4096;

/// Interleaved I/Q layouts of recorded sample files, all little-endian
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleFormat {
	#[serde(rename = "gr_complex")]
	ComplexF32,
	#[serde(rename = "cshort")]
	ComplexI16,
	#[serde(rename = "cbyte")]
	ComplexI8,
}

impl Default for SampleFormat {
	fn default() -> Self { SampleFormat::ComplexI16 }
}

impl SampleFormat {

	pub fn bytes_per_sample(&self) -> usize { match self {
		SampleFormat::ComplexF32 => 8,
		SampleFormat::ComplexI16 => 4,
		SampleFormat::ComplexI8  => 2,
	}}

	fn decode(&self, bytes:&[u8]) -> Complex<f64> { match self {
		SampleFormat::ComplexF32 => Complex{ re: LittleEndian::read_f32(&bytes[0..4]) as f64, im: LittleEndian::read_f32(&bytes[4..8]) as f64 },
		SampleFormat::ComplexI16 => Complex{ re: LittleEndian::read_i16(&bytes[0..2]) as f64, im: LittleEndian::read_i16(&bytes[2..4]) as f64 },
		SampleFormat::ComplexI8  => Complex{ re: (bytes[0] as i8) as f64, im: (bytes[1] as i8) as f64 },
	}}

}

impl FromStr for SampleFormat {
	type Err = AcqError;

	fn from_str(s:&str) -> Result<Self, AcqError> { match s {
		"gr_complex" | "f32" => Ok(SampleFormat::ComplexF32),
		"cshort" | "i16"     => Ok(SampleFormat::ComplexI16),
		"cbyte" | "i8"       => Ok(SampleFormat::ComplexI8),
		other => Err(AcqError::UnsupportedSampleFormat(other.to_string())),
	}}
}

/// Cuts a byte stream of recorded samples into `SampleBlock`s, numbering samples from zero
pub struct SampleReader<R: Read> {
	src: R,
	format: SampleFormat,
	block_size: usize,
	next_idx: usize,
	buffer: Vec<u8>,
}

impl SampleReader<BufReader<File>> {

	pub fn open<P: AsRef<Path>>(path:P, format:SampleFormat, block_size:usize) -> io::Result<Self> {
		Ok(Self::new(BufReader::new(File::open(path)?), format, block_size))
	}

}

impl<R: Read> SampleReader<R> {

	pub fn new(src:R, format:SampleFormat, block_size:usize) -> Self {
		let block_size = block_size.max(1);
		Self { src, format, block_size, next_idx: 0, buffer: vec![0; block_size * format.bytes_per_sample()] }
	}

	/// Index of the next sample to be read
	pub fn position(&self) -> usize { self.next_idx }

	/// Reads up to one block.  `Ok(None)` at end of stream; a trailing partial sample is ignored.
	pub fn next_block(&mut self) -> io::Result<Option<SampleBlock>> {
		let mut filled:usize = 0;
		while filled < self.buffer.len() {
			match self.src.read(&mut self.buffer[filled..]) {
				Ok(0) => break,
				Ok(n) => filled += n,
				Err(e) if e.kind() == ErrorKind::Interrupted => continue,
				Err(e) => return Err(e),
			}
		}

		let bps = self.format.bytes_per_sample();
		let n_samples = filled / bps;
		if n_samples == 0 { return Ok(None); }

		let samples:Vec<Complex<f64>> = self.buffer[..n_samples*bps].chunks_exact(bps).map(|b| self.format.decode(b)).collect();
		let block = SampleBlock::new(self.next_idx, samples);
		self.next_idx += n_samples;
		Ok(Some(block))
	}

}

impl<R: Read> Iterator for SampleReader<R> {
	type Item = SampleBlock;

	fn next(&mut self) -> Option<SampleBlock> {
		match self.next_block() {
			Ok(block) => block,
			Err(e) => {
				warn!("Stopped reading samples at index {}: {}", self.next_idx, e);
				None
			}
		}
	}
}
