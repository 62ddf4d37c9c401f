use thiserror::Error;

use crate::gnss::signal::{Modulation, Signal};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AcqError {
	#[error("sample rate must be positive and at most 1 GHz, got {0} [Hz]")]
	InvalidSampleRate(f64),
	#[error("intermediate frequency must be finite, got {0} [Hz]")]
	InvalidIntermediateFrequency(f64),
	#[error("sample rate {0} [Hz] is too low to hold one code period")]
	SampleRateTooLow(f64),
	#[error("invalid Doppler grid: max={max_hz} [Hz], step={step_hz} [Hz]")]
	InvalidDopplerGrid{ max_hz:u32, step_hz:u32 },
	#[error("coherent block of {code_periods} periods x {samples_per_code} samples is too long")]
	CoherentBlockTooLong{ samples_per_code:usize, code_periods:usize },
	#[error("max_dwells must be at least 1")]
	InvalidDwellCount,
	#[error("coherent integration of {requested_ms} [ms] is shorter than one {period_ms} [ms] code period")]
	InvalidCoherentLength{ requested_ms:u32, period_ms:u32 },
	#[error("{modulation:?} is not a supported modulation for {signal:?}")]
	UnsupportedModulation{ signal:Signal, modulation:Modulation },
	#[error("PRN {prn} is out of range for {signal:?}")]
	UnknownPrn{ signal:Signal, prn:usize },
	#[error("no memory code loaded for {signal:?} PRN {prn}")]
	MissingMemoryCode{ signal:Signal, prn:usize },
	#[error("invalid memory code: {0}")]
	InvalidMemoryCode(String),
	#[error("false alarm probability must lie in [0, 1], got {0}")]
	InvalidFalseAlarmProbability(f64),
	#[error("a fixed threshold is required when the false alarm probability is {0}")]
	MissingFixedThreshold(f64),
	#[error("CFAR thresholds assume power combining; magnitude combining needs a fixed threshold")]
	IncompatibleCombining,
	#[error("unknown signal \"{0}\"")]
	UnknownSignal(String),
	#[error("unknown modulation \"{0}\"")]
	UnknownModulation(String),
	#[error("unsupported sample format \"{0}\"")]
	UnsupportedSampleFormat(String),
	#[error("sample block holds {got} samples, correlator expects {expected}")]
	BlockLength{ expected:usize, got:usize },
	#[error("engine has no satellite assigned")]
	NotAssigned,
	#[error("an acquisition attempt is already in progress")]
	AlreadySearching,
	#[error("engine task is no longer running")]
	EngineStopped,
}
