use serde::{Serialize, Deserialize};

/// Detection threshold applied to the dwell-averaged statistic
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Threshold {
	Fixed(f64),
	Cfar{ pfa:f64, value:f64 },
	/// The configuration cannot produce a meaningful threshold; no cell ever crosses it
	Never,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
	Detected{ lag:usize, peak:f64, ratio:f64 },
	Below{ lag:usize, peak:f64 },
}

/// Constant false alarm rate threshold for `num_doppler_bins * profile_length` exponential cells of rate `profile_length`.
///
/// Solves P(all cells below T) = 1 - pfa, so each cell's quantile is v = (1 - pfa)^(1/ncells) and
/// T = -ln(1 - v) / lambda.  Anything that does not yield a finite, non-negative T never detects.
pub fn cfar_threshold(target_pfa:f64, num_doppler_bins:usize, profile_length:usize) -> Threshold {
	if !(target_pfa > 0.0 && target_pfa < 1.0) || num_doppler_bins == 0 || profile_length == 0 {
		return Threshold::Never;
	}

	let ncells:f64 = (num_doppler_bins as f64) * (profile_length as f64);
	let lambda:f64 = profile_length as f64;

	// 1 - v computed without cancellation; v itself is within ~1e-9 of one for realistic grids
	let one_minus_v:f64 = -((-target_pfa).ln_1p() / ncells).exp_m1();
	let value:f64 = -one_minus_v.ln() / lambda;

	if value.is_finite() && value >= 0.0 { Threshold::Cfar{ pfa: target_pfa, value } }
	else { Threshold::Never }
}

impl Threshold {

	pub fn value(&self) -> Option<f64> { match self {
		Threshold::Fixed(t) => Some(*t),
		Threshold::Cfar{ pfa:_, value } => Some(*value),
		Threshold::Never => None,
	}}

	pub fn is_never(&self) -> bool { *self == Threshold::Never }

	/// Peak-to-threshold ratio, zero when the threshold can never be crossed and infinite for a positive
	/// peak over a zero threshold
	pub fn ratio(&self, peak:f64) -> f64 { match self.value() {
		Some(t) if t > 0.0 => peak / t,
		Some(_) => if peak > 0.0 { f64::INFINITY } else { 0.0 },
		None => 0.0,
	}}

	/// Compares the largest cell against the threshold; NaN cells never win
	pub fn decide(&self, statistic:&[f64]) -> Decision {
		let (lag, peak) = peak_of(statistic);
		match self.value() {
			Some(t) if peak > t => Decision::Detected{ lag, peak, ratio: self.ratio(peak) },
			_ => Decision::Below{ lag, peak },
		}
	}

}

/// Index and value of the first maximum, ignoring NaN
pub fn peak_of(statistic:&[f64]) -> (usize, f64) {
	statistic.iter().enumerate().fold((0, 0.0), |(best_idx, best), (idx, v)| {
		if *v > best { (idx, *v) } else { (best_idx, best) }
	})
}
